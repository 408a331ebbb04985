use std::collections::HashSet;
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::Id;
use crate::error::{self, PollError};

pub const OPTION_COUNT: RangeInclusive<usize> = 2..=10;
pub const CREATE_QUESTION_MIN_LEN: usize = 1;
pub const UPDATE_QUESTION_MIN_LEN: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Poll {
    pub id: Id,
    pub owner_id: Id,
    pub question: String,
    pub options: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Poll {
    pub fn is_owned_by(&self, user_id: &Id) -> bool {
        self.owner_id == *user_id
    }
}

/// Question and options exactly as a caller submitted them.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UnvalidatedPollSettings {
    pub question: String,
    pub options: Vec<String>,
}

impl UnvalidatedPollSettings {
    pub fn new<Q, O>(question: Q, options: &[O]) -> Self
    where
        Q: Into<String>,
        O: AsRef<str>,
    {
        Self {
            question: question.into(),
            options: options.iter().map(|o| o.as_ref().to_string()).collect(),
        }
    }
}

/// Trimmed question and 2-10 distinct, non-empty, trimmed options.
#[derive(Clone, Debug, PartialEq)]
pub struct PollSettings {
    question: String,
    options: Vec<String>,
}

impl PollSettings {
    pub fn for_create(settings: UnvalidatedPollSettings) -> Result<Self, PollError> {
        Self::validate(settings, CREATE_QUESTION_MIN_LEN)
    }

    pub fn for_update(settings: UnvalidatedPollSettings) -> Result<Self, PollError> {
        Self::validate(settings, UPDATE_QUESTION_MIN_LEN)
    }

    fn validate(
        UnvalidatedPollSettings { question, options }: UnvalidatedPollSettings,
        question_min_len: usize,
    ) -> Result<Self, PollError> {
        let question = question.trim().to_string();
        let len = question.chars().count();
        if len < question_min_len {
            return Err(error::poll_question_too_short(question_min_len, len));
        }

        let options: Vec<String> = options.iter()
            .map(|option| option.trim())
            .filter(|option| !option.is_empty())
            .map(String::from)
            .collect();
        if !OPTION_COUNT.contains(&options.len()) {
            return Err(error::poll_option_limit_exceeded(OPTION_COUNT, options.len()));
        }

        let mut seen = HashSet::new();
        for option in &options {
            if !seen.insert(option.as_str()) {
                return Err(error::poll_option_duplicate(option));
            }
        }

        Ok(Self { question, options })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.question, self.options)
    }
}

/// A validated poll ready to be inserted.
#[derive(Clone, Debug)]
pub struct NewPoll {
    pub id: Id,
    pub owner_id: Id,
    pub settings: PollSettings,
    pub created_at: DateTime<Utc>,
}

impl NewPoll {
    pub fn new(owner_id: Id, settings: PollSettings) -> NewPoll {
        NewPoll {
            id: Id::new(),
            owner_id,
            settings,
            created_at: Utc::now(),
        }
    }
}

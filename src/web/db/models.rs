use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::store::StoreError;
use crate::voting;
use super::schema;

#[derive(Queryable, Selectable)]
#[diesel(table_name = schema::polls)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Poll {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Poll> for voting::Poll {
    type Error = StoreError;
    fn try_from(Poll { id, user_id, question, options, created_at, updated_at }: Poll) -> Result<Self, Self::Error> {
        // rows written outside this service could break the option invariant
        if options.len() < 2 || options.iter().any(|o| o.trim().is_empty()) {
            return Err(StoreError::MalformedRow {
                table: "polls",
                id: id.to_string(),
                reason: format!("expected at least 2 non-empty options, got {options:?}"),
            });
        }

        Ok(voting::Poll {
            id: voting::Id(id),
            owner_id: voting::Id(user_id),
            question,
            options,
            created_at,
            updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::polls)]
pub struct NewPoll {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<voting::NewPoll> for NewPoll {
    fn from(voting::NewPoll { id, owner_id, settings, created_at }: voting::NewPoll) -> Self {
        let (question, options) = settings.into_parts();
        Self {
            id: id.0,
            user_id: owner_id.0,
            question,
            options,
            created_at,
            updated_at: created_at,
        }
    }
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = schema::polls)]
pub struct PollChanges {
    pub question: String,
    pub options: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl PollChanges {
    pub fn new(settings: voting::PollSettings, updated_at: DateTime<Utc>) -> Self {
        let (question, options) = settings.into_parts();
        Self { question, options, updated_at }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
}

impl From<User> for voting::User {
    fn from(value: User) -> Self {
        voting::User::new(voting::Id(value.id), value.display_name)
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = schema::votes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Vote {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub user_id: Option<Uuid>,
    pub option_index: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Vote> for voting::Vote {
    type Error = StoreError;
    fn try_from(Vote { id, poll_id, user_id, option_index, created_at }: Vote) -> Result<Self, Self::Error> {
        let option_index = u32::try_from(option_index).map_err(|_| StoreError::MalformedRow {
            table: "votes",
            id: id.to_string(),
            reason: format!("negative option index {option_index}"),
        })?;

        Ok(voting::Vote {
            id: voting::Id(id),
            poll_id: voting::Id(poll_id),
            user_id: user_id.map(voting::Id),
            option_index,
            created_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::votes)]
pub struct NewVote {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub user_id: Option<Uuid>,
    pub option_index: i32,
    pub created_at: DateTime<Utc>,
}

impl From<voting::NewVote> for NewVote {
    fn from(voting::NewVote { id, poll_id, user_id, option_index, created_at }: voting::NewVote) -> Self {
        Self {
            id: id.0,
            poll_id: poll_id.0,
            user_id: user_id.map(|id| id.0),
            // bounded by the poll's option count, at most 10
            option_index: option_index as i32,
            created_at,
        }
    }
}

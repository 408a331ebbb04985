use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::id::Id;
use super::poll::Poll;
use super::poll_result::PollResult;
use crate::error::{self, PollError};
use crate::store::{Store, StoreError};

/// Length of the rolling window that throttles anonymous votes on a poll.
pub const ANONYMOUS_WINDOW_MINUTES: i64 = 60;
/// Anonymous votes a poll accepts per window, across all anonymous voters.
pub const ANONYMOUS_VOTES_PER_WINDOW: u64 = 1;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Vote {
    pub id: Id,
    pub poll_id: Id,
    pub user_id: Option<Id>,
    pub option_index: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewVote {
    pub id: Id,
    pub poll_id: Id,
    pub user_id: Option<Id>,
    pub option_index: u32,
    pub created_at: DateTime<Utc>,
}

/// Who is casting a vote, as resolved by the caller's identity provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Voter {
    Authenticated(Id),
    Anonymous,
}

impl Voter {
    pub fn user_id(&self) -> Option<&Id> {
        match self {
            Voter::Authenticated(id) => Some(id),
            Voter::Anonymous => None,
        }
    }
}

impl From<Option<Id>> for Voter {
    fn from(value: Option<Id>) -> Self {
        value.map_or(Voter::Anonymous, Voter::Authenticated)
    }
}

/// A vote attempt as received, before any checks.
#[derive(Clone, Debug)]
pub struct ReceivedVote {
    pub poll_id: String,
    pub voter: Voter,
    pub option_index: f64,
}

/// A structurally sound vote: non-empty poll id and a whole, non-negative option index.
#[derive(Clone, Debug)]
pub struct ValidatedVote {
    poll_id: String,
    voter: Voter,
    option_index: u64,
}

/// A vote that passed every check and may be recorded.
#[derive(Clone, Debug)]
pub struct AcceptedVote {
    poll: Poll,
    voter: Voter,
    option_index: u32,
}

impl ReceivedVote {
    pub fn new(poll_id: impl Into<String>, voter: Voter, option_index: f64) -> Self {
        Self { poll_id: poll_id.into(), voter, option_index }
    }

    pub fn validate(self) -> Result<ValidatedVote, PollError> {
        let poll_id = self.poll_id.trim();
        if poll_id.is_empty() {
            return Err(error::poll_id_missing());
        }

        let index = self.option_index;
        if !index.is_finite() || index < 0.0 || index.fract() != 0.0 {
            return Err(error::vote_option_invalid(index));
        }

        Ok(ValidatedVote {
            poll_id: poll_id.to_string(),
            voter: self.voter,
            option_index: index as u64,
        })
    }
}

impl ValidatedVote {
    /// Checks the vote against the poll and the vote history as of `now`.
    ///
    /// The anonymous limit is a read followed later by a write, so concurrent anonymous voters
    /// can both get through. It throttles; it does not guarantee a cap.
    pub fn admit<S: Store + ?Sized>(self, store: &mut S, now: DateTime<Utc>) -> Result<AcceptedVote, PollError> {
        let poll = match Id::parse(&self.poll_id) {
            Some(id) => store.find_poll(&id).map_err(error::persistence("load poll"))?,
            None => None,
        };
        let Some(poll) = poll else {
            return Err(error::poll_not_found(&self.poll_id));
        };

        if self.option_index >= poll.options.len() as u64 {
            return Err(error::vote_option_out_of_bounds(self.option_index, poll.options.len()));
        }

        match &self.voter {
            Voter::Authenticated(user_id) => {
                let existing = store.find_vote(&poll.id, user_id)
                    .map_err(error::persistence("check previous votes"))?;
                if existing.is_some() {
                    return Err(error::vote_duplicate(&poll.id));
                }
            }
            Voter::Anonymous => {
                let since = now - TimeDelta::minutes(ANONYMOUS_WINDOW_MINUTES);
                let recent = store.count_anonymous_votes_since(&poll.id, since)
                    .map_err(error::persistence("check recent votes"))?;
                if recent >= ANONYMOUS_VOTES_PER_WINDOW {
                    return Err(error::vote_rate_limited(ANONYMOUS_WINDOW_MINUTES));
                }
            }
        }

        Ok(AcceptedVote {
            poll,
            voter: self.voter,
            option_index: self.option_index as u32,
        })
    }
}

impl AcceptedVote {
    pub fn poll(&self) -> &Poll {
        &self.poll
    }

    /// Inserts the vote. A constraint violation here means another request won a race: the same
    /// user voted concurrently, or the poll was deleted.
    pub fn record<S: Store + ?Sized>(self, store: &mut S, now: DateTime<Utc>) -> Result<(Poll, Vote), PollError> {
        let new_vote = NewVote {
            id: Id::new(),
            poll_id: self.poll.id.clone(),
            user_id: self.voter.user_id().cloned(),
            option_index: self.option_index,
            created_at: now,
        };

        match store.insert_vote(new_vote) {
            Ok(vote) => Ok((self.poll, vote)),
            Err(StoreError::UniqueViolation(_)) => Err(error::vote_duplicate(&self.poll.id)),
            Err(StoreError::ForeignKeyViolation(_)) => Err(error::poll_not_found(&self.poll.id.to_string())),
            Err(err) => Err(error::persistence("submit vote")(err)),
        }
    }
}

/// The vote that was stored and the poll's results including it.
#[derive(Debug, Serialize)]
pub struct VoteReceipt {
    pub vote: Vote,
    pub results: PollResult,
}

pub fn submit_vote<S: Store + ?Sized>(
    store: &mut S,
    poll_id: &str,
    voter: Voter,
    option_index: f64,
) -> Result<VoteReceipt, PollError> {
    submit_vote_at(store, poll_id, voter, option_index, Utc::now())
}

pub fn submit_vote_at<S: Store + ?Sized>(
    store: &mut S,
    poll_id: &str,
    voter: Voter,
    option_index: f64,
    now: DateTime<Utc>,
) -> Result<VoteReceipt, PollError> {
    let accepted = ReceivedVote::new(poll_id, voter, option_index)
        .validate()
        .and_then(|vote| vote.admit(store, now))
        .map_err(|err| {
            debug!(poll_id, error = %err, "vote rejected");
            err
        })?;

    // nothing may fail once the vote is stored, so the tally is read first
    let mut counts = store.vote_counts(&accepted.poll().id).map_err(error::persistence("load results"))?;
    let (poll, vote) = accepted.record(store, now)?;
    info!(poll_id = %poll.id, option_index = vote.option_index, anonymous = vote.user_id.is_none(), "vote recorded");

    let recorded = vote.option_index as i32;
    match counts.iter_mut().find(|(index, _)| *index == recorded) {
        Some((_, count)) => *count += 1,
        None => counts.push((recorded, 1)),
    }
    let results = PollResult::evaluate(&poll, &counts, now);
    Ok(VoteReceipt { vote, results })
}

pub fn has_voted<S: Store + ?Sized>(store: &mut S, poll_id: &Id, user_id: &Id) -> Result<bool, PollError> {
    let vote = store.find_vote(poll_id, user_id).map_err(error::persistence("check previous votes"))?;
    Ok(vote.is_some())
}

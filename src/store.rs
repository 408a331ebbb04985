#[cfg(test)]
pub mod memory;

use chrono::{DateTime, Utc};
use diesel::result::{DatabaseErrorKind, Error as DbError};
use thiserror::Error;

use crate::voting::{Id, NewPoll, NewVote, Poll, PollSettings, User, Vote};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("malformed {table} row {id}: {reason}")]
    MalformedRow {
        table: &'static str,
        id: String,
        reason: String,
    },

    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Query(DbError),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::UniqueViolation(info.message().to_string())
            }
            DbError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                StoreError::ForeignKeyViolation(info.message().to_string())
            }
            DbError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
                StoreError::Unavailable(info.message().to_string())
            }
            other => StoreError::Query(other),
        }
    }
}

/// Everything the poll and vote workflows need from durable storage.
///
/// Implementations must reject a second vote with the same `(poll_id, user_id)` when the user is
/// known, reporting [`StoreError::UniqueViolation`], and must delete a poll's votes together with
/// the poll.
pub trait Store {
    fn find_poll(&mut self, id: &Id) -> Result<Option<Poll>, StoreError>;

    /// Newest first.
    fn polls_by_owner(&mut self, owner_id: &Id) -> Result<Vec<Poll>, StoreError>;

    /// Newest first.
    fn all_polls(&mut self) -> Result<Vec<Poll>, StoreError>;

    fn insert_poll(&mut self, poll: NewPoll) -> Result<Poll, StoreError>;

    /// Only touches the poll when `owner_id` owns it; `None` otherwise.
    fn update_poll(
        &mut self,
        id: &Id,
        owner_id: &Id,
        settings: PollSettings,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Poll>, StoreError>;

    /// Only deletes when `owner_id` owns the poll. Returns whether a row went away.
    fn delete_poll(&mut self, id: &Id, owner_id: &Id) -> Result<bool, StoreError>;

    fn find_user(&mut self, id: &Id) -> Result<Option<User>, StoreError>;

    fn find_vote(&mut self, poll_id: &Id, user_id: &Id) -> Result<Option<Vote>, StoreError>;

    fn count_anonymous_votes_since(
        &mut self,
        poll_id: &Id,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    fn insert_vote(&mut self, vote: NewVote) -> Result<Vote, StoreError>;

    /// `(option_index, votes)` for every index that has at least one vote, as stored.
    fn vote_counts(&mut self, poll_id: &Id) -> Result<Vec<(i32, u64)>, StoreError>;
}

use std::ops::RangeInclusive;

use serde::Serialize;
use thiserror::Error;
use tracing::error;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::store::StoreError;
use crate::voting::Id;

/// The category of a failed operation, as reported to callers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Auth,
    Duplicate,
    RateLimit,
    Persistence,
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    Auth(String),

    #[error("Duplicate vote: {0}")]
    Duplicate(String),

    #[error("Rate limited: {0}")]
    RateLimit(String),

    #[error("Failed to {action}: {source}")]
    Persistence {
        action: &'static str,
        #[source]
        source: StoreError,
    },
}

impl PollError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PollError::Validation(_) => ErrorKind::Validation,
            PollError::NotFound(_) => ErrorKind::NotFound,
            PollError::Auth(_) => ErrorKind::Auth,
            PollError::Duplicate(_) => ErrorKind::Duplicate,
            PollError::RateLimit(_) => ErrorKind::RateLimit,
            PollError::Persistence { .. } => ErrorKind::Persistence,
        }
    }

    /// Message safe to hand back to a caller. Store details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            PollError::Validation(message)
            | PollError::NotFound(message)
            | PollError::Auth(message)
            | PollError::Duplicate(message)
            | PollError::RateLimit(message) => message.clone(),
            PollError::Persistence { action, .. } => {
                format!("Failed to {action}. Please try again.")
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Auth => StatusCode::FORBIDDEN,
            ErrorKind::Duplicate => StatusCode::CONFLICT,
            ErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    kind: ErrorKind,
    message: String,
}

impl Reply for PollError {
    fn into_response(self) -> Response {
        if let PollError::Persistence { .. } = self {
            error!(error = %self, "store operation failed");
        }
        let body = ErrorBody { kind: self.kind(), message: self.message() };
        reply::with_status(reply::json(&body), self.status()).into_response()
    }
}

pub fn poll_id_missing() -> PollError {
    PollError::Validation(String::from("poll id is required"))
}

pub fn poll_question_too_short(min: usize, len: usize) -> PollError {
    PollError::Validation(format!("poll's question must be at least {min} characters, got {len}"))
}

pub fn poll_option_limit_exceeded(limits: RangeInclusive<usize>, count: usize) -> PollError {
    PollError::Validation(format!(
        "poll must have between {} and {} non-empty options, got {count}",
        limits.start(), limits.end()
    ))
}

pub fn poll_option_duplicate(option: &str) -> PollError {
    PollError::Validation(format!("poll option '{option}' appears more than once"))
}

pub fn vote_option_invalid(option_index: f64) -> PollError {
    PollError::Validation(format!("option index must be a non-negative integer, got {option_index}"))
}

pub fn vote_option_out_of_bounds(option_index: u64, option_count: usize) -> PollError {
    PollError::Validation(format!(
        "option index {option_index} is out of range for a poll with {option_count} options"
    ))
}

pub fn poll_not_found(poll_id: &str) -> PollError {
    PollError::NotFound(format!("poll {poll_id} not found"))
}

pub fn login_required(action: &str) -> PollError {
    PollError::Auth(format!("you must be logged in to {action} a poll"))
}

pub fn poll_not_owned(action: &str) -> PollError {
    PollError::Auth(format!("you can only {action} your own polls"))
}

pub fn vote_duplicate(poll_id: &Id) -> PollError {
    PollError::Duplicate(format!("you have already voted on poll {poll_id}"))
}

pub fn vote_rate_limited(window_minutes: i64) -> PollError {
    PollError::RateLimit(format!(
        "too many anonymous votes on this poll in the last {window_minutes} minutes, try again later or sign in"
    ))
}

/// Wraps a store failure for `map_err`, naming what was being attempted.
pub fn persistence(action: &'static str) -> impl FnOnce(StoreError) -> PollError {
    move |source| PollError::Persistence { action, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_kind() {
        let cases = [
            (poll_id_missing(), StatusCode::BAD_REQUEST),
            (poll_not_found("abc"), StatusCode::NOT_FOUND),
            (login_required("create"), StatusCode::FORBIDDEN),
            (vote_duplicate(&Id::nil()), StatusCode::CONFLICT),
            (vote_rate_limited(60), StatusCode::TOO_MANY_REQUESTS),
            (
                persistence("record vote")(StoreError::Unavailable(String::from("down"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn persistence_message_hides_store_details() {
        let err = persistence("record vote")(StoreError::Unavailable(String::from("password=hunter2")));
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(err.message(), "Failed to record vote. Please try again.");
        assert!(err.to_string().contains("hunter2"));
    }

    #[test]
    fn limit_messages_name_the_range() {
        let err = poll_option_limit_exceeded(2..=10, 1);
        assert_eq!(err.message(), "poll must have between 2 and 10 non-empty options, got 1");

        let err = poll_question_too_short(3, 2);
        assert_eq!(err.message(), "poll's question must be at least 3 characters, got 2");
    }
}

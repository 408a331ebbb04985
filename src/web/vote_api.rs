use std::convert::Infallible;

use serde::Deserialize;
use warp::http::StatusCode;
use warp::reply::Response;

use crate::voting::{self, Id, Voter};
use super::db::{with_store, DbPool};
use super::respond;

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// Kept as a float so fractional or negative input reaches validation instead of failing to parse.
    pub option_index: f64,
}

pub async fn submit(
    poll_id: String,
    identity: Option<Id>,
    request: VoteRequest,
    pool: DbPool,
) -> Result<Response, Infallible> {
    let voter = Voter::from(identity);
    let result = with_store(pool, move |conn| {
        voting::submit_vote(conn, &poll_id, voter, request.option_index)
    }).await;
    Ok(respond(result, StatusCode::CREATED))
}

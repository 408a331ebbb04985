use std::convert::Infallible;

use warp::http::StatusCode;
use warp::reply::Response;

use crate::voting::{self, Id, UnvalidatedPollSettings, Voter};
use super::db::{with_store, DbPool};
use super::respond;

pub async fn list(pool: DbPool) -> Result<Response, Infallible> {
    let result = with_store(pool, |conn| voting::list_with_vote_counts(conn)).await;
    Ok(respond(result, StatusCode::OK))
}

pub async fn mine(identity: Option<Id>, pool: DbPool) -> Result<Response, Infallible> {
    let result = with_store(pool, move |conn| voting::list_for_owner(conn, identity.as_ref())).await;
    Ok(respond(result, StatusCode::OK))
}

pub async fn create(
    identity: Option<Id>,
    settings: UnvalidatedPollSettings,
    pool: DbPool,
) -> Result<Response, Infallible> {
    let result = with_store(pool, move |conn| voting::create(conn, settings, identity.as_ref())).await;
    Ok(respond(result, StatusCode::CREATED))
}

pub async fn get(poll_id: String, identity: Option<Id>, pool: DbPool) -> Result<Response, Infallible> {
    let viewer = Voter::from(identity);
    let result = with_store(pool, move |conn| voting::view(conn, &poll_id, &viewer)).await;
    Ok(respond(result, StatusCode::OK))
}

pub async fn update(
    poll_id: String,
    identity: Option<Id>,
    settings: UnvalidatedPollSettings,
    pool: DbPool,
) -> Result<Response, Infallible> {
    let result = with_store(pool, move |conn| {
        voting::update(conn, &poll_id, settings, identity.as_ref())
    }).await;
    Ok(respond(result, StatusCode::OK))
}

pub async fn delete(poll_id: String, identity: Option<Id>, pool: DbPool) -> Result<Response, Infallible> {
    let result = with_store(pool, move |conn| voting::delete(conn, &poll_id, identity.as_ref())).await;
    Ok(super::respond_empty(result))
}

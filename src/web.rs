mod db;
mod poll_api;
mod result_api;
mod vote_api;

use std::convert::Infallible;
use std::net::SocketAddr;

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};
use warp::{Filter, Rejection};

use crate::config::Config;
use crate::error::PollError;
use crate::voting::Id;
pub use db::DbPool;

/// Header carrying the caller's user id, set by the identity provider in front of this service.
pub const IDENTITY_HEADER: &str = "x-user-id";

const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to open database pool: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: warp::Error,
    },
}

pub(crate) fn respond<T: Serialize>(result: Result<T, PollError>, status: StatusCode) -> Response {
    match result {
        Ok(value) => reply::with_status(reply::json(&value), status).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) fn respond_empty(result: Result<(), PollError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

fn with_pool(pool: DbPool) -> impl Filter<Extract = (DbPool,), Error = Infallible> + Clone {
    warp::any().map(move || pool.clone())
}

fn identity() -> impl Filter<Extract = (Option<Id>,), Error = Rejection> + Clone {
    warp::header::optional::<Uuid>(IDENTITY_HEADER).map(|user_id: Option<Uuid>| user_id.map(Id))
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

pub fn routes(pool: DbPool) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let list_polls = warp::get()
        .and(warp::path!("api" / "polls"))
        .and(with_pool(pool.clone()))
        .and_then(poll_api::list);

    let my_polls = warp::get()
        .and(warp::path!("api" / "polls" / "mine"))
        .and(identity())
        .and(with_pool(pool.clone()))
        .and_then(poll_api::mine);

    let create_poll = warp::post()
        .and(warp::path!("api" / "polls"))
        .and(identity())
        .and(json_body())
        .and(with_pool(pool.clone()))
        .and_then(poll_api::create);

    let get_poll = warp::get()
        .and(warp::path!("api" / "polls" / String))
        .and(identity())
        .and(with_pool(pool.clone()))
        .and_then(poll_api::get);

    let update_poll = warp::put()
        .and(warp::path!("api" / "polls" / String))
        .and(identity())
        .and(json_body())
        .and(with_pool(pool.clone()))
        .and_then(poll_api::update);

    let delete_poll = warp::delete()
        .and(warp::path!("api" / "polls" / String))
        .and(identity())
        .and(with_pool(pool.clone()))
        .and_then(poll_api::delete);

    let submit_vote = warp::post()
        .and(warp::path!("api" / "polls" / String / "votes"))
        .and(identity())
        .and(json_body())
        .and(with_pool(pool.clone()))
        .and_then(vote_api::submit);

    let get_result = warp::get()
        .and(warp::path!("api" / "polls" / String / "results"))
        .and(with_pool(pool))
        .and_then(result_api::get_result);

    list_polls
        .or(my_polls)
        .or(create_poll)
        .or(get_poll)
        .or(update_poll)
        .or(delete_poll)
        .or(submit_vote)
        .or(get_result)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

/// Renders malformed requests the same way as core validation failures.
async fn handle_rejection(err: Rejection) -> Result<Response, Rejection> {
    let message = if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        format!("malformed request body: {e}")
    } else if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        format!("{IDENTITY_HEADER} must be a user id: {e}")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        format!("request body is larger than {MAX_BODY_BYTES} bytes")
    } else {
        return Err(err);
    };
    Ok(PollError::Validation(message).into_response())
}

pub async fn setup(config: Config) -> Result<(), ServerError> {
    let pool = db::establish_pool(&config)?;

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };
    let (addr, server) = warp::serve(routes(pool))
        .try_bind_with_graceful_shutdown(config.addr, shutdown)
        .map_err(|source| ServerError::Bind { addr: config.addr, source })?;

    info!(%addr, "listening");
    server.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::PgConnection;
    use serde_json::Value;

    use super::*;

    // never connects; only requests rejected before reaching the store are sent
    fn offline_pool() -> DbPool {
        Pool::builder()
            .min_idle(Some(0))
            .build_unchecked(ConnectionManager::<PgConnection>::new("postgres://localhost/unused"))
    }

    fn body_of(response: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn malformed_vote_body_is_a_validation_error() {
        let response = warp::test::request()
            .method("POST")
            .path(&format!("/api/polls/{}/votes", Uuid::new_v4()))
            .header("content-type", "application/json")
            .body(r#"{"option_index": "first"}"#)
            .reply(&routes(offline_pool()))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(&response)["kind"], "validation");
    }

    #[tokio::test]
    async fn identity_header_must_be_a_uuid() {
        let response = warp::test::request()
            .method("GET")
            .path("/api/polls/mine")
            .header(IDENTITY_HEADER, "alice")
            .reply(&routes(offline_pool()))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_of(&response);
        assert_eq!(body["kind"], "validation");
        assert!(body["message"].as_str().unwrap().starts_with(IDENTITY_HEADER));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = warp::test::request()
            .method("GET")
            .path("/api/ballots")
            .reply(&routes(offline_pool()))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn empty_success_is_no_content() {
        assert_eq!(respond_empty(Ok(())).status(), StatusCode::NO_CONTENT);
    }
}

use std::convert::Infallible;

use warp::http::StatusCode;
use warp::reply::Response;

use crate::voting;
use super::db::{with_store, DbPool};
use super::respond;

pub async fn get_result(poll_id: String, pool: DbPool) -> Result<Response, Infallible> {
    let result = with_store(pool, move |conn| voting::results_for(conn, &poll_id)).await;
    Ok(respond(result, StatusCode::OK))
}

pub mod models;
pub mod schema;

use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use tracing::info;

use crate::config::Config;
use crate::error::{self, PollError};
use crate::store::{Store, StoreError};
use crate::voting::{self, Id};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn establish_pool(config: &Config) -> Result<DbPool, PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
    let pool = Pool::builder()
        .max_size(config.pool_size)
        .build(manager)?;
    info!(max_connections = config.pool_size, "database pool ready");
    Ok(pool)
}

/// Runs `f` against a pooled connection on the blocking thread pool.
pub async fn with_store<T, F>(pool: DbPool, f: F) -> Result<T, PollError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, PollError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()
            .map_err(|err| error::persistence("connect to database")(StoreError::Unavailable(err.to_string())))?;
        f(&mut *conn)
    });

    match task.await {
        Ok(result) => result,
        Err(err) => Err(error::persistence("finish request")(StoreError::Unavailable(err.to_string()))),
    }
}

fn polls_from_rows(rows: Vec<models::Poll>) -> Result<Vec<voting::Poll>, StoreError> {
    rows.into_iter().map(voting::Poll::try_from).collect()
}

impl Store for PgConnection {
    fn find_poll(&mut self, id: &Id) -> Result<Option<voting::Poll>, StoreError> {
        schema::polls::table
            .find(id.0)
            .select(models::Poll::as_select())
            .first::<models::Poll>(self)
            .optional()?
            .map(voting::Poll::try_from)
            .transpose()
    }

    fn polls_by_owner(&mut self, owner_id: &Id) -> Result<Vec<voting::Poll>, StoreError> {
        let rows = schema::polls::table
            .filter(schema::polls::user_id.eq(owner_id.0))
            .order(schema::polls::created_at.desc())
            .select(models::Poll::as_select())
            .load(self)?;
        polls_from_rows(rows)
    }

    fn all_polls(&mut self) -> Result<Vec<voting::Poll>, StoreError> {
        let rows = schema::polls::table
            .order(schema::polls::created_at.desc())
            .select(models::Poll::as_select())
            .load(self)?;
        polls_from_rows(rows)
    }

    fn insert_poll(&mut self, poll: voting::NewPoll) -> Result<voting::Poll, StoreError> {
        diesel::insert_into(schema::polls::table)
            .values(&models::NewPoll::from(poll))
            .returning(models::Poll::as_returning())
            .get_result::<models::Poll>(self)?
            .try_into()
    }

    fn update_poll(
        &mut self,
        id: &Id,
        owner_id: &Id,
        settings: voting::PollSettings,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<voting::Poll>, StoreError> {
        let target = schema::polls::table
            .filter(schema::polls::id.eq(id.0))
            .filter(schema::polls::user_id.eq(owner_id.0));
        diesel::update(target)
            .set(&models::PollChanges::new(settings, updated_at))
            .returning(models::Poll::as_returning())
            .get_result::<models::Poll>(self)
            .optional()?
            .map(voting::Poll::try_from)
            .transpose()
    }

    fn delete_poll(&mut self, id: &Id, owner_id: &Id) -> Result<bool, StoreError> {
        // votes go with it through ON DELETE CASCADE
        let target = schema::polls::table
            .filter(schema::polls::id.eq(id.0))
            .filter(schema::polls::user_id.eq(owner_id.0));
        let deleted = diesel::delete(target).execute(self)?;
        Ok(deleted > 0)
    }

    fn find_user(&mut self, id: &Id) -> Result<Option<voting::User>, StoreError> {
        let user = schema::users::table
            .find(id.0)
            .select(models::User::as_select())
            .first::<models::User>(self)
            .optional()?;
        Ok(user.map(voting::User::from))
    }

    fn find_vote(&mut self, poll_id: &Id, user_id: &Id) -> Result<Option<voting::Vote>, StoreError> {
        schema::votes::table
            .filter(schema::votes::poll_id.eq(poll_id.0))
            .filter(schema::votes::user_id.eq(user_id.0))
            .select(models::Vote::as_select())
            .first::<models::Vote>(self)
            .optional()?
            .map(voting::Vote::try_from)
            .transpose()
    }

    fn count_anonymous_votes_since(&mut self, poll_id: &Id, since: DateTime<Utc>) -> Result<u64, StoreError> {
        let count: i64 = schema::votes::table
            .filter(schema::votes::poll_id.eq(poll_id.0))
            .filter(schema::votes::user_id.is_null())
            .filter(schema::votes::created_at.ge(since))
            .count()
            .get_result(self)?;
        Ok(count as u64)
    }

    fn insert_vote(&mut self, vote: voting::NewVote) -> Result<voting::Vote, StoreError> {
        diesel::insert_into(schema::votes::table)
            .values(&models::NewVote::from(vote))
            .returning(models::Vote::as_returning())
            .get_result::<models::Vote>(self)?
            .try_into()
    }

    fn vote_counts(&mut self, poll_id: &Id) -> Result<Vec<(i32, u64)>, StoreError> {
        let rows: Vec<(i32, i64)> = schema::votes::table
            .filter(schema::votes::poll_id.eq(poll_id.0))
            .group_by(schema::votes::option_index)
            .select((schema::votes::option_index, count_star()))
            .load(self)?;
        Ok(rows.into_iter().map(|(index, count)| (index, count as u64)).collect())
    }
}

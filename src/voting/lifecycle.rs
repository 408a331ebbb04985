//! Creating, reading, editing and deleting polls.
//!
//! Edit and delete check, in order: malformed input, missing identity, missing poll, ownership.
//! The store-level write is scoped to the owner as well, so a poll that changed hands or vanished
//! between the check and the write is reported as not found.

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::id::Id;
use super::poll::{NewPoll, Poll, PollSettings, UnvalidatedPollSettings};
use super::poll_result::{total_votes, PollResult};
use super::vote::Voter;
use crate::error::{self, PollError};
use crate::store::Store;

/// A poll as listed, with the same vote total its results report.
#[derive(Debug, Serialize)]
pub struct PollSummary {
    #[serde(flatten)]
    pub poll: Poll,
    pub total_votes: u64,
}

/// Everything needed to show a poll page.
#[derive(Debug, Serialize)]
pub struct PollView {
    pub poll: Poll,
    pub owner_name: Option<String>,
    pub results: PollResult,
    /// `None` for anonymous viewers.
    pub has_voted: Option<bool>,
}

fn require_poll_id(poll_id: &str) -> Result<&str, PollError> {
    let poll_id = poll_id.trim();
    if poll_id.is_empty() {
        return Err(error::poll_id_missing());
    }
    Ok(poll_id)
}

fn find<S: Store + ?Sized>(store: &mut S, poll_id: &str) -> Result<Poll, PollError> {
    let poll = match Id::parse(poll_id) {
        Some(id) => store.find_poll(&id).map_err(error::persistence("load poll"))?,
        None => None,
    };
    poll.ok_or_else(|| error::poll_not_found(poll_id))
}

pub fn create<S: Store + ?Sized>(
    store: &mut S,
    settings: UnvalidatedPollSettings,
    owner_id: Option<&Id>,
) -> Result<Poll, PollError> {
    let settings = PollSettings::for_create(settings)?;
    let owner_id = owner_id.ok_or_else(|| error::login_required("create"))?;

    let poll = store.insert_poll(NewPoll::new(owner_id.clone(), settings))
        .map_err(error::persistence("create poll"))?;
    info!(poll_id = %poll.id, owner_id = %poll.owner_id, options = poll.options.len(), "poll created");
    Ok(poll)
}

pub fn get_by_id<S: Store + ?Sized>(store: &mut S, poll_id: &str) -> Result<Poll, PollError> {
    let poll_id = require_poll_id(poll_id)?;
    find(store, poll_id)
}

pub fn update<S: Store + ?Sized>(
    store: &mut S,
    poll_id: &str,
    settings: UnvalidatedPollSettings,
    requester_id: Option<&Id>,
) -> Result<Poll, PollError> {
    let poll_id = require_poll_id(poll_id)?;
    let settings = PollSettings::for_update(settings)?;
    let requester_id = requester_id.ok_or_else(|| error::login_required("update"))?;

    let poll = find(store, poll_id)?;
    if !poll.is_owned_by(requester_id) {
        return Err(error::poll_not_owned("update"));
    }

    // votes cast for options beyond the new list stay as they are
    let updated = store.update_poll(&poll.id, requester_id, settings, Utc::now())
        .map_err(error::persistence("update poll"))?
        .ok_or_else(|| error::poll_not_found(poll_id))?;
    info!(poll_id = %updated.id, options = updated.options.len(), "poll updated");
    Ok(updated)
}

pub fn delete<S: Store + ?Sized>(
    store: &mut S,
    poll_id: &str,
    requester_id: Option<&Id>,
) -> Result<(), PollError> {
    let poll_id = require_poll_id(poll_id)?;
    let requester_id = requester_id.ok_or_else(|| error::login_required("delete"))?;

    let poll = find(store, poll_id)?;
    if !poll.is_owned_by(requester_id) {
        return Err(error::poll_not_owned("delete"));
    }

    let deleted = store.delete_poll(&poll.id, requester_id)
        .map_err(error::persistence("delete poll"))?;
    if !deleted {
        return Err(error::poll_not_found(poll_id));
    }
    info!(poll_id = %poll.id, "poll deleted");
    Ok(())
}

pub fn list_for_owner<S: Store + ?Sized>(store: &mut S, owner_id: Option<&Id>) -> Result<Vec<Poll>, PollError> {
    let owner_id = owner_id.ok_or_else(|| error::login_required("list"))?;
    store.polls_by_owner(owner_id).map_err(error::persistence("load polls"))
}

pub fn list_with_vote_counts<S: Store + ?Sized>(store: &mut S) -> Result<Vec<PollSummary>, PollError> {
    let polls = store.all_polls().map_err(error::persistence("load polls"))?;
    polls.into_iter()
        .map(|poll| {
            let total_votes = total_votes(store, &poll)?;
            Ok(PollSummary { poll, total_votes })
        })
        .collect()
}

pub fn view<S: Store + ?Sized>(store: &mut S, poll_id: &str, viewer: &Voter) -> Result<PollView, PollError> {
    let poll = get_by_id(store, poll_id)?;
    let owner_name = store.find_user(&poll.owner_id)
        .map_err(error::persistence("load poll owner"))?
        .map(|user| user.display_name);
    let counts = store.vote_counts(&poll.id).map_err(error::persistence("load results"))?;
    let results = PollResult::evaluate(&poll, &counts, Utc::now());
    let has_voted = match viewer.user_id() {
        Some(user_id) => Some(super::vote::has_voted(store, &poll.id, user_id)?),
        None => None,
    };
    Ok(PollView { poll, owner_name, results, has_voted })
}

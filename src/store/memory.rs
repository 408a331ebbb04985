use chrono::{DateTime, Utc};

use super::{Store, StoreError};
use crate::voting::{Id, NewPoll, NewVote, Poll, PollSettings, User, Vote};

/// In-process store for tests. Mirrors the database's constraints.
#[derive(Default)]
pub struct MemoryStore {
    pub users: Vec<User>,
    pub polls: Vec<Poll>,
    pub votes: Vec<Vote>,
    /// Makes every write fail as if the database had gone away.
    pub fail_writes: bool,
    /// Makes `vote_counts` fail.
    pub fail_tally: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn votes_for(&self, poll_id: &Id) -> Vec<&Vote> {
        self.votes.iter().filter(|v| v.poll_id == *poll_id).collect()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable(String::from("writes disabled")));
        }
        Ok(())
    }

    fn newest_first<'a>(polls: impl DoubleEndedIterator<Item = &'a Poll>) -> Vec<Poll> {
        let mut polls: Vec<Poll> = polls.rev().cloned().collect();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        polls
    }
}

impl Store for MemoryStore {
    fn find_poll(&mut self, id: &Id) -> Result<Option<Poll>, StoreError> {
        Ok(self.polls.iter().find(|p| p.id == *id).cloned())
    }

    fn polls_by_owner(&mut self, owner_id: &Id) -> Result<Vec<Poll>, StoreError> {
        Ok(Self::newest_first(self.polls.iter().filter(|p| p.owner_id == *owner_id)))
    }

    fn all_polls(&mut self) -> Result<Vec<Poll>, StoreError> {
        Ok(Self::newest_first(self.polls.iter()))
    }

    fn insert_poll(&mut self, poll: NewPoll) -> Result<Poll, StoreError> {
        self.check_writable()?;
        if self.polls.iter().any(|p| p.id == poll.id) {
            return Err(StoreError::UniqueViolation(format!("polls_pkey ({})", poll.id)));
        }
        let (question, options) = poll.settings.into_parts();
        let poll = Poll {
            id: poll.id,
            owner_id: poll.owner_id,
            question,
            options,
            created_at: poll.created_at,
            updated_at: poll.created_at,
        };
        self.polls.push(poll.clone());
        Ok(poll)
    }

    fn update_poll(
        &mut self,
        id: &Id,
        owner_id: &Id,
        settings: PollSettings,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Poll>, StoreError> {
        self.check_writable()?;
        let Some(poll) = self.polls.iter_mut().find(|p| p.id == *id && p.owner_id == *owner_id) else {
            return Ok(None);
        };
        let (question, options) = settings.into_parts();
        poll.question = question;
        poll.options = options;
        poll.updated_at = updated_at;
        Ok(Some(poll.clone()))
    }

    fn delete_poll(&mut self, id: &Id, owner_id: &Id) -> Result<bool, StoreError> {
        self.check_writable()?;
        let before = self.polls.len();
        self.polls.retain(|p| !(p.id == *id && p.owner_id == *owner_id));
        if self.polls.len() == before {
            return Ok(false);
        }
        self.votes.retain(|v| v.poll_id != *id);
        Ok(true)
    }

    fn find_user(&mut self, id: &Id) -> Result<Option<User>, StoreError> {
        Ok(self.users.iter().find(|u| u.id == *id).cloned())
    }

    fn find_vote(&mut self, poll_id: &Id, user_id: &Id) -> Result<Option<Vote>, StoreError> {
        Ok(self.votes.iter()
            .find(|v| v.poll_id == *poll_id && v.user_id.as_ref() == Some(user_id))
            .cloned())
    }

    fn count_anonymous_votes_since(
        &mut self,
        poll_id: &Id,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self.votes.iter()
            .filter(|v| v.poll_id == *poll_id && v.user_id.is_none() && v.created_at >= since)
            .count() as u64)
    }

    fn insert_vote(&mut self, vote: NewVote) -> Result<Vote, StoreError> {
        self.check_writable()?;
        if !self.polls.iter().any(|p| p.id == vote.poll_id) {
            return Err(StoreError::ForeignKeyViolation(format!("votes_poll_id_fkey ({})", vote.poll_id)));
        }
        if let Some(user_id) = &vote.user_id {
            if self.votes.iter().any(|v| v.poll_id == vote.poll_id && v.user_id.as_ref() == Some(user_id)) {
                return Err(StoreError::UniqueViolation(format!("votes_poll_id_user_id_key ({user_id})")));
            }
        }
        let vote = Vote {
            id: vote.id,
            poll_id: vote.poll_id,
            user_id: vote.user_id,
            option_index: vote.option_index,
            created_at: vote.created_at,
        };
        self.votes.push(vote.clone());
        Ok(vote)
    }

    fn vote_counts(&mut self, poll_id: &Id) -> Result<Vec<(i32, u64)>, StoreError> {
        if self.fail_tally {
            return Err(StoreError::Unavailable(String::from("tally unavailable")));
        }
        let mut counts: Vec<(i32, u64)> = vec![];
        for vote in self.votes.iter().filter(|v| v.poll_id == *poll_id) {
            let option_index = vote.option_index as i32;
            match counts.iter_mut().find(|(index, _)| *index == option_index) {
                Some((_, count)) => *count += 1,
                None => counts.push((option_index, 1)),
            }
        }
        Ok(counts)
    }
}

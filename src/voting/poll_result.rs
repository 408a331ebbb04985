use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::Id;
use super::poll::Poll;
use crate::error::{self, PollError};
use crate::store::Store;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptionTally {
    pub option_index: u32,
    pub label: String,
    pub votes: u64,
    pub percentage: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PollResult {
    pub poll_id: Id,
    pub evaluated_at: DateTime<Utc>,

    /// One entry per option, in option order, including options nobody picked.
    pub tally: Vec<OptionTally>,
    pub total_votes: u64,
    /// Options sharing the highest non-zero count.
    pub leaders: Vec<u32>,
    /// Votes pointing past the end of the option list, left behind by an edit. Not counted.
    pub stale_votes: u64,
}

impl PollResult {
    /// Builds the tally from per-index counts as the store reports them.
    pub fn evaluate(poll: &Poll, counts: &[(i32, u64)], evaluated_at: DateTime<Utc>) -> PollResult {
        let mut votes = vec![0u64; poll.options.len()];
        let mut stale_votes = 0;
        for &(option_index, count) in counts {
            let slot = usize::try_from(option_index).ok().and_then(|i| votes.get_mut(i));
            match slot {
                Some(slot) => *slot += count,
                None => stale_votes += count,
            }
        }

        let total_votes: u64 = votes.iter().sum();
        let tally = poll.options.iter()
            .zip(&votes)
            .enumerate()
            .map(|(index, (label, &count))| OptionTally {
                option_index: index as u32,
                label: label.clone(),
                votes: count,
                percentage: percentage(count, total_votes),
            })
            .collect();

        let most = votes.iter().copied().max().unwrap_or(0);
        let leaders = if most == 0 {
            vec![]
        } else {
            (0..votes.len() as u32).filter(|&i| votes[i as usize] == most).collect()
        };

        PollResult {
            poll_id: poll.id.clone(),
            evaluated_at,
            tally,
            total_votes,
            leaders,
            stale_votes,
        }
    }

    pub fn votes_for(&self, option_index: u32) -> Option<u64> {
        self.tally.get(option_index as usize).map(|t| t.votes)
    }
}

/// Share of `total` held by `count`, as a whole percent rounded half-up. Zero when nobody voted.
pub fn percentage(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * count + total) / (2 * total)) as u32
}

pub fn results_for<S: Store + ?Sized>(store: &mut S, poll_id: &str) -> Result<PollResult, PollError> {
    let poll = super::lifecycle::get_by_id(store, poll_id)?;
    let counts = store.vote_counts(&poll.id).map_err(error::persistence("load results"))?;
    Ok(PollResult::evaluate(&poll, &counts, Utc::now()))
}

/// Votes counted toward the poll's results. Votes for options removed by an edit are left out.
pub fn total_votes<S: Store + ?Sized>(store: &mut S, poll: &Poll) -> Result<u64, PollError> {
    let counts = store.vote_counts(&poll.id).map_err(error::persistence("count votes"))?;
    Ok(counts.iter()
        .filter(|&&(index, _)| usize::try_from(index).is_ok_and(|i| i < poll.options.len()))
        .map(|&(_, count)| count)
        .sum())
}

mod id;
mod lifecycle;
mod poll;
mod poll_result;
mod user;
mod vote;

pub use id::Id;
pub use lifecycle::{
    create, delete, get_by_id, list_for_owner, list_with_vote_counts, update, view, PollSummary, PollView,
};
pub use poll::{NewPoll, Poll, PollSettings, UnvalidatedPollSettings};
pub use poll_result::{percentage, results_for, total_votes, OptionTally, PollResult};
pub use user::User;
pub use vote::{
    has_voted, submit_vote, submit_vote_at, AcceptedVote, NewVote, ReceivedVote, ValidatedVote, Vote, VoteReceipt,
    Voter,
};

//! Poll server: create polls, collect one vote per voter, and report per-option results.
//!
//! Polls and votes live in PostgreSQL behind the [`store::Store`] trait. The [`voting`] module
//! holds the workflows (poll lifecycle, vote validation and recording, result tallying), each
//! taking the caller's resolved identity as an explicit argument. [`web`] exposes them as a JSON
//! API.

pub mod config;
pub mod error;
pub mod store;
pub mod voting;
pub mod web;

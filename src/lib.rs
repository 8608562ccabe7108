//! Leadbox — mailbox sync and lead reconciliation service.
//!
//! Pulls recent threads from a Gmail-style provider, reconciles senders
//! into leads and conversations into threads, keeps contact recency
//! current, and serves a prioritized action queue over a small JSON API.

pub mod config;
pub mod error;
pub mod mail;
pub mod provider;
pub mod server;
pub mod store;
pub mod sync;
pub mod tasks;

pub use error::{Error, Result};

//! # realty-store
//!
//! SQLite storage for the Realty listing site.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for every domain model:
//! users and sessions, property listings with their images and comments,
//! and the direct-messaging core (messages, dialogues, blacklist).

pub mod blacklist;
pub mod comments;
pub mod database;
pub mod dialogues;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod password;
pub mod properties;
pub mod sessions;
pub mod users;

mod error;

#[cfg(test)]
mod test_support;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;

//! SQLite persistence for diary entries and daily summaries.
//!
//! Reads take the pool; the writes that must land together take a
//! `&mut SqliteConnection` so they can run inside one transaction.

pub mod entries;
pub mod summaries;

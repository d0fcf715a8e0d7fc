//! Typed records used across layers.
//!
//! `db_*` types mirror SQLite rows; the others are what the core hands out
//! and what the HTTP layer serializes.

pub mod application;
pub mod channel;
pub mod log;
pub mod response;

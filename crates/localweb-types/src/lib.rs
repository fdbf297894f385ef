//! Foundation types for localweb.
//!
//! Shared by every localweb crate: the error enum and `Result` alias, the
//! serving configuration, and the persisted session preferences.

pub mod config;
pub mod error;
pub mod prefs;

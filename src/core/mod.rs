//! Core modules for Verdict's record keeping.
//!
//! The data model, the workspace store, and the shared primitives every
//! engine subsystem builds on live here.

pub mod config;
pub mod error;
pub mod hashing;
pub mod journal;
pub mod model;
pub mod output;
pub mod store;
pub mod time;

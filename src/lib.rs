//! schedr - A recurring task scheduling and execution daemon
//!
//! A polling tick loop scans persisted tasks, a pure due-ness predicate and
//! priority scorer build an ordered execution plan, and a
//! concurrency-controlled executor drives each due task through its
//! lifecycle, computing the next occurrence for recurring schedules.

pub mod content;
pub mod domain;
pub mod error;
pub mod notify;
pub mod scheduler;
pub mod store;

pub use error::{Result, SchedrError};

//! Task planner persistence core.
//!
//! Audited task mutations, injection-safe filter composition, and the
//! repositories behind the task-ledger CLI.

pub mod cli;
pub mod db;
pub mod error;
pub mod types;

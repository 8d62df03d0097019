//! Tasklingo: call-expression task instructions to robot pose sequences.
//!
//! Parses `pick(...)`, `place(...)` and `pour(...)` instructions, binds their
//! container descriptors to a registry, and synthesizes the pose table and
//! target sequence a motion executor consumes.

pub mod cli;
pub mod core;

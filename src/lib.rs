//! Per-task work timers for a To-Do style task list.
//!
//! A work chip on every task row starts and stops tracking. Stopping adds the elapsed minutes to
//! the task title as `[Xh Ym]`, and every start/stop is recorded in a daily session log that
//! always has exactly one open session (`Idle` when nothing is tracked). The log exports as a
//! fixed-width Markdown table.

pub mod automation;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod filters;
pub mod notifications;
pub mod page;
pub mod persistence;
pub mod report;

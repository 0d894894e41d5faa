//! # CLI Behavior
//!
//! This is **one possible client** of agendapp. It is the only place that knows
//! about terminal I/O, exit codes and output formatting.
//!
//! Every invocation is one short editing session: the week is selected (from
//! `--week`, the command's own date, or today), blackouts are fetched for it,
//! and the command runs against the schedule as currently saved. Staged blocks
//! never outlive the process; `add` stages and commits in one go.
//!
//! Logs go to stderr through `tracing-subscriber` (`RUST_LOG`, or `-v` for
//! debug), so stdout carries only command output.
//!
//! ## Module Structure
//!
//! - `setup`: Argument parsing via clap
//! - `commands`: Context wiring and per-command handlers
//! - `render`: Colored terminal output

mod commands;
mod render;
pub mod setup;

pub use commands::{report_error, run};

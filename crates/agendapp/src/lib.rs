//! # Agenda Architecture
//!
//! Agenda is a **UI-agnostic availability scheduling library** for practitioners.
//! It keeps a weekly template of open time windows plus per-date overrides,
//! projects them into concrete events for a week, and folds edits back into
//! one canonical document. The `agenda` binary is one client of it.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (crates/agenda)                                        │
//! │  - Parses arguments, renders events, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands, parses ids/slots from text    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Loads fresh state, runs one operation, returns CmdResult │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Scheduling Core                                            │
//! │  projector → conflict → staging / reconcile → lifecycle     │
//! │  pure functions over a document snapshot and blackouts      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (store/) and Blackout Source (blackout.rs)         │
//! │  - ScheduleBackend: FsBackend (production), MemBackend      │
//! │  - BlackoutSource: FsBlackouts (read-only), MemBlackouts    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! store ──▶ projector (+ blackouts) ──▶ events ──▶ client
//!   ▲                                                │
//!   └──── staging (new blocks) / reconcile (edits) ◀─┘
//! ```
//!
//! The document in the store is the only source of truth. Events are derived
//! from it and are never written back without going through staging or the
//! reconciler, which re-validate against the latest saved document.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`commands`]: One module per user operation
//! - [`model`]: Times, weeks, block ids, events, blackouts
//! - [`document`]: The canonical template/override document
//! - [`projector`]: Week and day projection with the shadow rule
//! - [`conflict`]: Overlap and blackout checks
//! - [`staging`]: Pending candidates and atomic batch commit
//! - [`reconcile`]: Move/resize/delete of existing blocks, and serialization
//! - [`lifecycle`]: Per-block state machine
//! - [`session`]: Selected week, fetched blackouts and staging for one editor
//! - [`store`]: Schedule persistence with optimistic revisions
//! - [`blackout`]: Read-only blackout source
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod api;
pub mod blackout;
pub mod commands;
pub mod config;
pub mod conflict;
pub mod document;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod projector;
pub mod reconcile;
pub mod session;
pub mod staging;
pub mod store;

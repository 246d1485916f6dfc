//! # Paperstore Architecture
//!
//! Paperstore is a **file-backed document library**: uploaded PDFs, their
//! metadata, and lazily generated cover thumbnails, all kept under one root
//! directory. It is a library first; the `paperstore` binary is one client and
//! an HTTP layer would be another.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs)                                     │
//! │  - Parses arguments, prints results, owns exit codes        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API (api.rs)                                               │
//! │  - Thin facade, one method per operation                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Commands (commands/*.rs)                                   │
//! │  - Business logic, returns CmdResult                        │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                            │
//!                 ▼                            ▼
//! ┌──────────────────────────────┐  ┌───────────────────────────┐
//! │  Store (store/, mirror.rs)   │  │  Covers (cover/)          │
//! │  - index.json, paper dirs    │  │  - bounded renderer pool  │
//! │  - atomic writes, replicas   │  │  - dedup and backoff      │
//! └──────────────────────────────┘  └───────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Everything is async on tokio. Two pieces of shared state need coordination:
//!
//! - The index: every read-modify-write goes through one async lock in
//!   [`store::index::IndexStore`], so concurrent creates and deletes never lose
//!   each other's entries.
//! - Cover jobs: [`cover::CoverCoordinator`] caps renderer processes with a
//!   semaphore, shares one job among all callers asking for the same document,
//!   and remembers recent failures.
//!
//! Nothing below `api.rs` writes to stdout or exits the process.
//!
//! ## Module Overview
//!
//! - [`api`]: The facade; entry point for all operations
//! - [`commands`]: Business logic for each operation
//! - [`store`]: Index, document directories and atomic file writes
//! - [`cover`]: Cover generation and placeholder detection
//! - [`mirror`]: Best-effort replication to a secondary root
//! - [`model`]: Document record and upload types
//! - [`tags`]: Tag parsing
//! - [`config`]: `config.json` handling
//! - [`error`]: Error types

pub mod api;
pub mod commands;
pub mod config;
pub mod cover;
pub mod error;
pub mod mirror;
pub mod model;
pub mod store;
pub mod tags;

#[cfg(test)]
mod test_utils;

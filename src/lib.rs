//! aio - life tracking with a git-versioned single-file database
//!
//! All of aio's state lives in one embedded database file. This crate keeps
//! that file safe: every change is made on a throwaway branch and merged into
//! trunk only when it succeeds, trunk can be mirrored to a remote, and any
//! recorded version can be restored.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Bootstrap, transactions, commit jobs, sync and revert
//! - [`core`] - Domain types, naming, configuration, paths and locking
//! - [`git`] - Single doorway to the git binary, plus memoized probes
//! - [`ui`] - Prompts and output formatting
//! - [`logging`] - File and stderr logging
//!
//! # Correctness Invariants
//!
//! aio maintains the following invariants:
//!
//! 1. A failed change leaves the data file byte-identical to before
//! 2. A successful change is committed and merged before anything is pushed
//! 3. Only one writer changes the data file at a time
//! 4. History is only appended to; reverts are new commits

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod logging;
pub mod ui;

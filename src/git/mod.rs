//! git
//!
//! Single doorway to the git binary.
//!
//! # Architecture
//!
//! The engine shells out to `git` for every repository operation. All
//! invocations flow through [`GitRunner`], which pins the working directory
//! to the application home. No other module spawns git.
//!
//! # Modules
//!
//! - [`runner`] - The [`GitRunner`] trait and the process-backed [`ProcessRunner`]
//! - [`probe`] - [`ProbeCache`], memoized facts about the repository
//!
//! # Invariants
//!
//! - git never runs in the caller's current directory
//! - git never prompts on the terminal
//! - A non-zero exit is always an error carrying git's output
//!
//! # Example
//!
//! ```ignore
//! use aio::git::{GitRunner, ProbeCache, ProcessRunner};
//!
//! let git = ProcessRunner::new("git", home);
//! let probes = ProbeCache::new("origin", trunk, "data.db");
//! if probes.remote_configured(&git)? {
//!     git.run(&["fetch"])?;
//! }
//! ```

pub mod probe;
pub mod runner;

pub use probe::{Probe, ProbeCache};
pub use runner::{GitError, GitOutput, GitRunner, ProcessRunner};

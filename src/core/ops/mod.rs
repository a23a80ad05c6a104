//! core::ops
//!
//! Single-writer enforcement.
//!
//! # Modules
//!
//! - [`lock`] - Exclusive writer lock for the working file
//!
//! # Architecture
//!
//! Every mutating operation (transaction, revert, save):
//! 1. Joins outstanding commit jobs
//! 2. Acquires the exclusive writer lock
//! 3. Mutates the working file and records the change in git
//! 4. Releases the lock (a transaction releases it from its commit job)

pub mod lock;

pub use lock::{DataLock, LockError};

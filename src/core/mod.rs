//! core
//!
//! Core domain types, configuration and on-disk layout.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, CommitRecord, ContentDigest
//! - [`naming`] - Mutation branch, commit subject and backup naming
//! - [`ops`] - Exclusive writer lock
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for the application home
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod naming;
pub mod ops;
pub mod paths;
pub mod types;

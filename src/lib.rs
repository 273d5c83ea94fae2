//! # planecli - a command-line client for Plane.so
//!
//! Resources are addressed the way people remember them: by name, by
//! identifier (`FE-42`), or by UUID. Names are fuzzy-matched against listings
//! that are cached on disk, and every remote call is retried on rate limits
//! and gateway errors with at most ten calls in flight.
//!
//! ## Quick Start
//!
//! ```bash
//! # Store the instance URL, API key, and workspace
//! planecli configure
//!
//! # List work items across every project
//! planecli wi list
//!
//! # Show one by identifier, no project needed
//! planecli wi show FE-42
//!
//! # Names are resolved fuzzily within a project
//! planecli wi update "login redirect" --project frontend --state done
//! ```
//!
//! ## Modules
//!
//! - [`api`]: transport, retry, pagination, typed endpoints
//! - [`cache`]: read-through disk cache with per-resource TTLs
//! - [`resolve`]: UUID / identifier / fuzzy-name resolution
//! - [`session`]: the composition root shared by all commands
//! - [`fuzzy`]: token-sort similarity scoring

/// Remote API access.
pub mod api;

/// Disk cache for API listings.
pub mod cache;

/// Command-line interface definitions using clap.
pub mod cli;

/// Configuration loading and management.
///
/// Handles `config.toml` and the flag/environment overrides.
pub mod config;

/// Error types and result aliases.
///
/// Defines `PlaneError` enum and `Result<T>` type alias.
pub mod error;

pub mod fuzzy;
pub mod logging;

/// Data models: the canonical `Record` shape and resource kinds.
pub mod model;

pub mod resolve;
pub mod session;

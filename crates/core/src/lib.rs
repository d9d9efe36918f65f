//! Core domain types and shared logic for the rsyncit RRDP mirror.
//!
//! This crate defines the data model used across all other crates:
//! - Content hashing and hash verification
//! - Decoded repository objects
//! - Process configuration and the per-cycle settings derived from it

pub mod clock;
pub mod config;
pub mod error;
pub mod hash;
pub mod object;

pub use config::{AppConfig, Config, HostSubstitution};
pub use error::{Error, Result};
pub use hash::ContentHash;
pub use object::RpkiObject;

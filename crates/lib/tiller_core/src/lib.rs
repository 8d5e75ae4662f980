//! # tiller_core
//!
//! Core domain logic for Tiller: the entity store, the role/permission
//! catalog, JWT issuing and verification, and the user manager that ties
//! them together.

pub mod config;
pub mod error;
pub mod manager;
pub mod migrate;
pub mod models;
pub mod password;
pub mod permissions;
pub mod store;
pub mod token;

pub use error::{Error, Result};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

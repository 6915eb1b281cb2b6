//! # quill_core
//!
//! Core domain logic for Quill: user accounts, JWT authentication with
//! single-use refresh tokens, and articles with a read-through cache.
//!
//! Persistence is reached through the [`users::UserStore`],
//! [`articles::ArticleStore`] and [`kv::KeyValueStore`] ports.

pub mod articles;
pub mod auth;
pub mod error;
pub mod kv;
pub mod migrate;
pub mod models;
pub mod policy;
pub mod users;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

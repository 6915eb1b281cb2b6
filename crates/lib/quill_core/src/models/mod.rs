//! Domain models.
//!
//! These are internal domain models, distinct from the API DTOs in
//! `quill_api::models` (which use camelCase on the wire).

pub mod article;
pub mod auth;
pub mod user;

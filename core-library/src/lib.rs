//! # Gallery Library Module
//!
//! Owns the relational gallery store and provides repository patterns for
//! data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite connection pooling and embedded migrations
//! - Album and media domain models with deterministic identities
//! - Repository traits with SQLite implementations
//!
//! Deleting an album cascades to its child albums and their media; the
//! cascade is enforced by foreign keys in the schema, not by callers.

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};

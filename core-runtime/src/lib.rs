//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the gallery core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus for job lifecycle notifications
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the library, metadata and
//! sync crates depend on. It establishes the logging conventions and the event
//! broadcasting mechanism used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};

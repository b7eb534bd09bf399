//! Workspace placeholder crate.
//!
//! Re-exports the gallery service façade so host applications can depend on
//! `gallery-workspace` and enable the `desktop-shims` feature without wiring
//! each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;

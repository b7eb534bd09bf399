//! # Host Bridge Traits
//!
//! Collaborator contracts that the gallery core consumes but does not own.
//!
//! ## Overview
//!
//! The sync pipeline writes original media bytes into a key-addressable byte
//! store and stamps jobs with wall-clock time. Both capabilities are supplied
//! by the host so the core stays testable and platform neutral:
//!
//! - [`BlobStore`](storage::BlobStore) - write/read/delete original media bytes
//! - [`Clock`](time::Clock) - time source for job timestamps
//!
//! Desktop implementations live in `bridge-desktop`.
//!
//! ## Error Handling
//!
//! Every bridge operation returns [`BridgeError`]. Callers in the core map it
//! into their own error enums with `#[from]` conversions.

pub mod error;
pub mod storage;
pub mod time;

pub use error::{BridgeError, Result};
pub use storage::BlobStore;
pub use time::{Clock, LogLevel, SystemClock};

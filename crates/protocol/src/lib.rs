//! Wire types for the offline-signing upload protocol.
//!
//! This crate contains the serde-serializable types exchanged with a storage
//! node while an upload session waits for client-side signatures. These types
//! represent the "protocol layer" - the shapes of data as they appear on the
//! wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond parsing, encoding and classification
//! * Forward-compatible: unknown stage and opcode names are kept, not dropped
//! * Stable: Changes only when the wire protocol changes
//!
//! The session-driving logic that interprets these types lives in `offsign-rs`.

pub mod envelope;
pub mod ids;
pub mod payload;
pub mod stage;

pub use envelope::*;
pub use ids::*;
pub use payload::*;
pub use stage::*;

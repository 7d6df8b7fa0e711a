//! Offsign Runtime - HTTP command client for a storage node
//!
//! This crate provides the request/response plumbing used to talk to a
//! node's command API:
//!
//! - **Shell**: base address, HTTP client and command URL construction
//! - **Requests**: `arg`/option encoding, error envelopes, JSON streams
//! - **Add**: single-file, symlink and directory-tree submission
//! - **Storage**: offline-signed upload sessions and their signing endpoints
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  offsign-rs  │  SessionDriver, signing dispatch
//! └──────┬───────┘
//!        │ RemoteSession wraps a Shell
//! ┌──────▼──────────┐
//! │ offsign-runtime │  This crate
//! │  ┌────────┐     │
//! │  │ Shell  │     │  POST /api/v1/<command>?arg=..
//! │  └────────┘     │
//! │  ┌────────┐     │
//! │  │ Add    │     │  multipart bodies
//! │  └────────┘     │
//! │  ┌─────────┐    │
//! │  │ Storage │    │  upload session endpoints
//! │  └─────────┘    │
//! └─────────────────┘
//! ```
//!
//! Nothing here interprets session stages; that belongs to the driver.

pub mod add;
pub mod error;
pub mod shell;
pub mod storage;

pub use add::{AddOptions, TreeEntry, TreeEntryKind, directory_entries};
pub use error::{Error, Result};
pub use shell::{DEFAULT_API_URL, RequestBuilder, Shell, decode_stream};
pub use storage::UploadOptions;

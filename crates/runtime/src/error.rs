//! Error types for the node command client.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to a storage node.
#[derive(Debug, Error)]
pub enum Error {
	/// The configured API address could not be used as a base URL.
	#[error("Invalid API address '{url}': {reason}")]
	InvalidUrl { url: String, reason: String },

	/// Transport-level failure (connect, TLS, timeout, body read).
	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	/// The node rejected the command and returned an error envelope.
	#[error("Node error: {message}")]
	Remote {
		/// Human-readable message from the node
		message: String,
		/// Numeric code from the envelope (0 when absent)
		code: i64,
	},

	/// Non-success status without a parseable error envelope.
	#[error("Unexpected HTTP status {status}: {body}")]
	Status { status: u16, body: String },

	/// I/O error while reading content to submit.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// Directory traversal failed while building an upload tree.
	#[error("Directory walk failed: {0}")]
	Walk(#[from] walkdir::Error),

	/// Invalid argument provided to a command.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// A streaming command finished without producing a usable object.
	#[error("No results received")]
	NoResults,
}

impl Error {
	/// Returns the node's message if this is a Remote error.
	pub fn remote_message(&self) -> Option<&str> {
		match self {
			Error::Remote { message, .. } => Some(message),
			_ => None,
		}
	}

	/// Returns true if retrying the same command later could succeed.
	///
	/// Connection failures, timeouts and 5xx responses without an envelope
	/// qualify; node-reported errors and local input errors do not.
	pub fn is_transient(&self) -> bool {
		match self {
			Error::Http(e) => e.is_connect() || e.is_timeout() || e.is_request() || e.is_body(),
			Error::Status { status, .. } => *status >= 500 || *status == 429,
			_ => false,
		}
	}
}

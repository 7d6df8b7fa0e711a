//! Error types for driving upload sessions.

use offsign_protocol::{SessionId, Stage};
use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by session collaborators, signers and the driver handle.
#[derive(Debug, Error)]
pub enum Error {
	/// The node call failed.
	#[error(transparent)]
	Runtime(#[from] offsign_runtime::Error),

	/// A payload or contract was not valid base64.
	#[error("Invalid payload encoding: {0}")]
	Encoding(#[from] base64::DecodeError),

	/// The node asked for a signature kind this client does not know.
	#[error("Unrecognized opcode '{opcode}' at stage {stage}")]
	UnrecognizedOpcode { opcode: String, stage: Stage },

	/// The node returned no contracts for a batch-signing stage.
	#[error("No contracts to sign at stage {0}")]
	EmptyBatch(Stage),

	/// The signer refused or failed to sign.
	#[error("Signing failed: {0}")]
	Signing(String),

	/// Key material could not be loaded.
	#[error("Invalid signing key: {0}")]
	InvalidKey(String),

	/// The node moved the session to its `error` stage.
	#[error("Upload session {session} failed")]
	SessionFailed { session: SessionId },

	/// The driver was cancelled before the session finished.
	#[error("Upload session {session} was cancelled")]
	Cancelled { session: SessionId },

	/// The driver gave up after too many consecutive failed cycles.
	#[error("Upload session {session} abandoned after {failures} consecutive failures")]
	Abandoned { session: SessionId, failures: u32 },

	/// The driver task panicked or was aborted.
	#[error("Session driver task failed: {0}")]
	Join(#[from] tokio::task::JoinError),
}

impl Error {
	/// Returns true if the node declared the session failed.
	pub fn is_session_failed(&self) -> bool {
		matches!(self, Error::SessionFailed { .. })
	}

	/// Returns true for failures that a later poll may clear on its own.
	pub fn is_transient(&self) -> bool {
		match self {
			Error::Runtime(err) => err.is_transient(),
			_ => false,
		}
	}
}

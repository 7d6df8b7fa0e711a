use std::path::PathBuf;

use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("cannot read {path}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error(transparent)]
	Node(#[from] offsign_runtime::Error),

	#[error(transparent)]
	Session(#[from] offsign::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::InvalidInput(_) => ErrorCode::InvalidInput,
			CliError::Read { .. } => ErrorCode::IoError,
			CliError::Node(err) => node_code(err),
			CliError::Session(err) => session_code(err),
			CliError::Anyhow(err) => {
				if err.downcast_ref::<std::io::Error>().is_some() {
					ErrorCode::IoError
				} else {
					ErrorCode::InternalError
				}
			}
		}
	}

	pub fn to_command_error(&self) -> CommandError {
		CommandError {
			code: self.code(),
			message: message_chain(self),
		}
	}
}

fn node_code(err: &offsign_runtime::Error) -> ErrorCode {
	use offsign_runtime::Error as E;
	match err {
		E::InvalidUrl { .. } | E::InvalidArgument(_) => ErrorCode::InvalidInput,
		E::Http(_) => ErrorCode::NodeUnreachable,
		E::Remote { .. } | E::Status { .. } | E::NoResults => ErrorCode::NodeError,
		E::Io(_) | E::Walk(_) => ErrorCode::IoError,
		E::Json(_) => ErrorCode::NodeError,
	}
}

fn session_code(err: &offsign::Error) -> ErrorCode {
	use offsign::Error as E;
	match err {
		E::Runtime(err) => node_code(err),
		E::SessionFailed { .. } => ErrorCode::SessionFailed,
		E::Cancelled { .. } => ErrorCode::SessionCancelled,
		E::Abandoned { .. } => ErrorCode::SessionAbandoned,
		E::Signing(_) | E::InvalidKey(_) => ErrorCode::SigningError,
		E::Encoding(_) | E::UnrecognizedOpcode { .. } | E::EmptyBatch(_) => ErrorCode::NodeError,
		E::Join(_) => ErrorCode::InternalError,
	}
}

/// Joins an error and its sources into one line.
fn message_chain(err: &dyn std::error::Error) -> String {
	let mut message = err.to_string();
	let mut source = err.source();
	while let Some(cause) = source {
		let cause_text = cause.to_string();
		if !message.ends_with(&cause_text) {
			message.push_str(": ");
			message.push_str(&cause_text);
		}
		source = cause.source();
	}
	message
}

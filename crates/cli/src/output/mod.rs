//! Structured output for CLI commands.
//!
//! Every command ends with a result envelope on stdout:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "ok": true,
//!   "command": "upload",
//!   "data": { ... },
//!   "timings": { "durationMs": 31042 }
//! }
//! ```
//!
//! While a session is driven, each supervisor event is also emitted: as a
//! text line on stderr, or as one JSON object per line on stdout with
//! `--format ndjson`.


use std::fmt;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use offsign::{Report, SupervisorEvent};
use serde::{Deserialize, Serialize};

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// A single pretty-printed JSON envelope
	Json,
	/// Newline-delimited JSON, one line per event and one for the result
	Ndjson,
}

impl std::str::FromStr for OutputFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"text" => Ok(OutputFormat::Text),
			"json" => Ok(OutputFormat::Json),
			"ndjson" => Ok(OutputFormat::Ndjson),
			_ => Err(format!("unknown format: {s}")),
		}
	}
}

impl fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Ndjson => write!(f, "ndjson"),
		}
	}
}

/// The result envelope printed by every command.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,

	pub ok: bool,

	/// Command name (e.g., "upload", "drive")
	pub command: String,

	/// Command-specific result data (only present on success)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,

	/// Error information (only present on failure)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub timings: Option<Timings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

/// Standardized error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Invalid input provided
	InvalidInput,
	/// File I/O error
	IoError,
	/// The node could not be reached
	NodeUnreachable,
	/// The node rejected a command
	NodeError,
	/// The node moved the session to its error stage
	SessionFailed,
	/// The driver was cancelled
	SessionCancelled,
	/// The driver gave up after repeated failures
	SessionAbandoned,
	/// Local signing failed
	SigningError,
	/// Unknown/internal error
	InternalError,
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::IoError => write!(f, "IO_ERROR"),
			ErrorCode::NodeUnreachable => write!(f, "NODE_UNREACHABLE"),
			ErrorCode::NodeError => write!(f, "NODE_ERROR"),
			ErrorCode::SessionFailed => write!(f, "SESSION_FAILED"),
			ErrorCode::SessionCancelled => write!(f, "SESSION_CANCELLED"),
			ErrorCode::SessionAbandoned => write!(f, "SESSION_ABANDONED"),
			ErrorCode::SigningError => write!(f, "SIGNING_ERROR"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	pub duration_ms: u64,
}

impl From<Duration> for Timings {
	fn from(duration: Duration) -> Self {
		Self {
			duration_ms: duration.as_millis() as u64,
		}
	}
}

/// Builder for [`CommandResult`], timing from creation to [`build`](Self::build).
pub struct ResultBuilder<T: Serialize> {
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			data: None,
			error: None,
			start_time: Instant::now(),
		}
	}

	/// Restarts timing from `start`, for commands that began before the builder.
	pub fn started_at(mut self, start: Instant) -> Self {
		self.start_time = start;
		self
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
		self.error = Some(CommandError {
			code,
			message: message.into(),
		});
		self
	}

	pub fn build(self) -> CommandResult<T> {
		let ok = self.error.is_none() && self.data.is_some();
		CommandResult {
			schema_version: Some(SCHEMA_VERSION),
			ok,
			command: self.command,
			data: self.data,
			error: self.error,
			timings: Some(Timings::from(self.start_time.elapsed())),
		}
	}
}

/// One supervisor event as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EventLine {
	Stage { stage: String, terminal: bool },
	PollFailed { error: String },
	ActionFailed { stage: String, error: String },
	UnrecognizedOpcode { stage: String, opcode: String },
	Silence { waited_secs: u64 },
}

impl EventLine {
	/// Returns `None` for events with nothing to show.
	pub fn from_event(event: &SupervisorEvent) -> Option<Self> {
		let line = match event {
			SupervisorEvent::Report(Report::Stage(stage)) => EventLine::Stage {
				stage: stage.to_string(),
				terminal: stage.is_terminal(),
			},
			SupervisorEvent::Report(Report::PollFailed { error }) => EventLine::PollFailed {
				error: error.clone(),
			},
			SupervisorEvent::Report(Report::ActionFailed { stage, error }) => {
				EventLine::ActionFailed {
					stage: stage.to_string(),
					error: error.clone(),
				}
			}
			SupervisorEvent::Report(Report::UnrecognizedOpcode { stage, opcode }) => {
				EventLine::UnrecognizedOpcode {
					stage: stage.to_string(),
					opcode: opcode.clone(),
				}
			}
			SupervisorEvent::Silence(waited) => EventLine::Silence {
				waited_secs: waited.as_secs(),
			},
			SupervisorEvent::Closed => return None,
		};
		Some(line)
	}
}

impl fmt::Display for EventLine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EventLine::Stage {
				stage,
				terminal: false,
			} => write!(f, "stage {stage}"),
			EventLine::Stage {
				stage,
				terminal: true,
			} => write!(f, "stage {stage} (final)"),
			EventLine::PollFailed { error } => write!(f, "status poll failed: {error}"),
			EventLine::ActionFailed { stage, error } => {
				write!(f, "{stage}: signing failed: {error}")
			}
			EventLine::UnrecognizedOpcode { stage, opcode } => {
				write!(f, "{stage}: unrecognized opcode '{opcode}', nothing signed")
			}
			EventLine::Silence { waited_secs } => {
				write!(f, "no report for {waited_secs}s, still waiting")
			}
		}
	}
}

/// Emits one event in the given format. JSON output keeps stdout to the
/// final envelope, so events are not printed there.
pub fn print_event(event: &EventLine, format: OutputFormat) {
	match format {
		OutputFormat::Text => eprintln!("{event}"),
		OutputFormat::Json => {}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(event) {
				println!("{json}");
			}
		}
	}
}

/// Print a command result to stdout in the specified format
pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_result_text(result),
	}
}

fn print_result_text<T: Serialize>(result: &CommandResult<T>) {
	let mut stdout = io::stdout().lock();

	if result.ok {
		if let Some(ref data) = result.data {
			if let Ok(json) = serde_json::to_string_pretty(data) {
				let _ = writeln!(stdout, "{json}");
			}
		}
	} else if let Some(ref error) = result.error {
		let _ = writeln!(stdout, "Error [{}]: {}", error.code, error.message);
	}

	if let Some(ref timings) = result.timings {
		let _ = writeln!(stdout, "Completed in {}ms", timings.duration_ms);
	}
}

/// Print an error to stderr in human-readable format
pub fn print_error_stderr(error: &CommandError) {
	eprintln!("Error [{}]: {}", error.code, error.message);
}

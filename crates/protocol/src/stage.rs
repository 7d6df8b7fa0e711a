//! Session stages reported by `storage/upload/status`.
//!
//! Stage names are fixed by the node. Any name this crate does not know is
//! preserved in [`Stage::Unrecognized`] so callers can report it instead of
//! silently treating it as a no-op.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of an upload session within the offline-signing protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
	Uninitialized,
	Init,
	InitSignReadyForEscrow,
	InitSignReadyForGuard,
	BalanceSignReady,
	PayChannelSignReady,
	PayRequestSignReady,
	GuardSignReady,
	RetrySignReady,
	RetrySignProcess,
	Complete,
	Error,
	/// A stage name outside the documented set.
	Unrecognized(String),
}

impl Stage {
	/// Every documented stage, in protocol order.
	pub const KNOWN: [Stage; 12] = [
		Stage::Uninitialized,
		Stage::Init,
		Stage::InitSignReadyForEscrow,
		Stage::InitSignReadyForGuard,
		Stage::BalanceSignReady,
		Stage::PayChannelSignReady,
		Stage::PayRequestSignReady,
		Stage::GuardSignReady,
		Stage::RetrySignReady,
		Stage::RetrySignProcess,
		Stage::Complete,
		Stage::Error,
	];

	/// Returns the wire name of this stage.
	pub fn as_str(&self) -> &str {
		match self {
			Stage::Uninitialized => "uninitialized",
			Stage::Init => "init",
			Stage::InitSignReadyForEscrow => "initSignReadyForEscrow",
			Stage::InitSignReadyForGuard => "initSignReadyForGuard",
			Stage::BalanceSignReady => "balanceSignReady",
			Stage::PayChannelSignReady => "payChannelSignReady",
			Stage::PayRequestSignReady => "payRequestSignReady",
			Stage::GuardSignReady => "guardSignReady",
			Stage::RetrySignReady => "retrySignReady",
			Stage::RetrySignProcess => "retrySignProcess",
			Stage::Complete => "complete",
			Stage::Error => "error",
			Stage::Unrecognized(name) => name,
		}
	}

	/// Returns true for `complete` and `error`.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Stage::Complete | Stage::Error)
	}

	pub fn is_recognized(&self) -> bool {
		!matches!(self, Stage::Unrecognized(_))
	}
}

impl From<&str> for Stage {
	fn from(value: &str) -> Self {
		match value {
			"uninitialized" => Stage::Uninitialized,
			"init" => Stage::Init,
			"initSignReadyForEscrow" => Stage::InitSignReadyForEscrow,
			"initSignReadyForGuard" => Stage::InitSignReadyForGuard,
			"balanceSignReady" => Stage::BalanceSignReady,
			"payChannelSignReady" => Stage::PayChannelSignReady,
			"payRequestSignReady" => Stage::PayRequestSignReady,
			"guardSignReady" => Stage::GuardSignReady,
			"retrySignReady" => Stage::RetrySignReady,
			"retrySignProcess" => Stage::RetrySignProcess,
			"complete" => Stage::Complete,
			"error" => Stage::Error,
			other => Stage::Unrecognized(other.to_string()),
		}
	}
}

impl From<String> for Stage {
	fn from(value: String) -> Self {
		match Stage::from(value.as_str()) {
			Stage::Unrecognized(_) => Stage::Unrecognized(value),
			known => known,
		}
	}
}

impl From<Stage> for String {
	fn from(stage: Stage) -> Self {
		match stage {
			Stage::Unrecognized(name) => name,
			known => known.as_str().to_string(),
		}
	}
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

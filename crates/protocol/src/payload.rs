//! Unsigned data fetched from the node and the signed results sent back.
//!
//! Binary fields travel as standard base64 strings. Field names follow the
//! node's Go-style JSON (`Opcode`, `Unsigned`, `Price`, ...).

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize};

/// Selects the local signing routine for an [`UnsignedPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Opcode {
	/// Balance assertion.
	Balance,
	/// Payment-channel open/update, signed together with a price.
	PayChannel,
	/// Payment request acknowledgement.
	PayRequest,
	/// Generic signature over the raw payload.
	Sign,
	/// An opcode outside the documented set.
	Unrecognized(String),
}

impl Opcode {
	pub fn as_str(&self) -> &str {
		match self {
			Opcode::Balance => "balance",
			Opcode::PayChannel => "paychannel",
			Opcode::PayRequest => "payrequest",
			Opcode::Sign => "sign",
			Opcode::Unrecognized(name) => name,
		}
	}

	pub fn is_recognized(&self) -> bool {
		!matches!(self, Opcode::Unrecognized(_))
	}
}

impl From<&str> for Opcode {
	fn from(value: &str) -> Self {
		match value {
			"balance" => Opcode::Balance,
			"paychannel" => Opcode::PayChannel,
			"payrequest" => Opcode::PayRequest,
			"sign" => Opcode::Sign,
			other => Opcode::Unrecognized(other.to_string()),
		}
	}
}

impl From<String> for Opcode {
	fn from(value: String) -> Self {
		match Opcode::from(value.as_str()) {
			Opcode::Unrecognized(_) => Opcode::Unrecognized(value),
			known => known,
		}
	}
}

impl From<Opcode> for String {
	fn from(opcode: Opcode) -> Self {
		match opcode {
			Opcode::Unrecognized(name) => name,
			known => known.as_str().to_string(),
		}
	}
}

impl fmt::Display for Opcode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Data the client must sign before a `*SignReady` stage can advance.
///
/// Only meaningful within the polling cycle that fetched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnsignedPayload {
	pub opcode: Opcode,
	/// Base64-encoded bytes to sign.
	pub unsigned: String,
	/// Price attached to pay-channel payloads.
	#[serde(default)]
	pub price: i64,
}

impl UnsignedPayload {
	/// Decodes the base64 `unsigned` field.
	pub fn unsigned_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
		STANDARD.decode(&self.unsigned)
	}
}

/// One contract in a batch, keyed by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContractItem {
	pub key: String,
	/// Base64-encoded contract bytes (unsigned or signed, depending on direction).
	pub contract: String,
}

impl ContractItem {
	pub fn contract_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
		STANDARD.decode(&self.contract)
	}
}

/// Contracts signed together at the escrow, guard and retry stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchContracts {
	#[serde(default, deserialize_with = "null_as_empty")]
	pub contracts: Vec<ContractItem>,
}

/// Nodes encode an empty batch as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl BatchContracts {
	pub fn len(&self) -> usize {
		self.contracts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.contracts.is_empty()
	}
}

/// Signed batch returned through `storage/upload/signbatch`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignedContracts {
	pub contracts: Vec<ContractItem>,
}

impl SignedContracts {
	/// Pairs a signature with the key of the contract it covers.
	pub fn push(&mut self, key: impl Into<String>, signature: &[u8]) {
		self.contracts.push(ContractItem {
			key: key.into(),
			contract: STANDARD.encode(signature),
		});
	}
}

/// Signed payload returned through `storage/upload/sign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignedPayload {
	pub opcode: Opcode,
	/// Base64-encoded signature.
	pub signed: String,
	/// Echo of the payload price, present for pay-channel signatures only.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub price: Option<i64>,
}

impl SignedPayload {
	pub fn new(opcode: Opcode, signature: &[u8]) -> Self {
		Self {
			opcode,
			signed: STANDARD.encode(signature),
			price: None,
		}
	}

	pub fn with_price(mut self, price: i64) -> Self {
		self.price = Some(price);
		self
	}

	pub fn signature_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
		STANDARD.decode(&self.signed)
	}
}

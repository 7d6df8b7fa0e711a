//! Local signing capability.
//!
//! Every signature is domain separated by its [`SignatureKind`], so a
//! signature produced for one stage can never be replayed as another kind.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::{Error, Result};

const TAG_SEPARATOR: u8 = 0x1f;

/// What a signature attests to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
	/// A storage contract from an escrow, guard or retry batch.
	Contract,
	/// A balance assertion.
	Balance,
	/// A payment-channel update at a given price.
	PayChannel,
	/// A payment-request acknowledgement.
	PayRequest,
	/// A plain signature over the raw payload.
	Generic,
}

impl SignatureKind {
	pub fn tag(self) -> &'static str {
		match self {
			SignatureKind::Contract => "offsign/contract",
			SignatureKind::Balance => "offsign/balance",
			SignatureKind::PayChannel => "offsign/paychannel",
			SignatureKind::PayRequest => "offsign/payrequest",
			SignatureKind::Generic => "offsign/sign",
		}
	}
}

/// Produces signatures over node-provided payloads.
pub trait Signer: Send + Sync {
	/// Signs `message` as `kind` and returns the raw signature bytes.
	fn sign(&self, kind: SignatureKind, message: &[u8]) -> Result<Vec<u8>>;
}

/// Appends the channel price to the unsigned bytes of a pay-channel payload.
pub fn pay_channel_message(unsigned: &[u8], price: i64) -> Vec<u8> {
	let mut message = Vec::with_capacity(unsigned.len() + 8);
	message.extend_from_slice(unsigned);
	message.extend_from_slice(&price.to_le_bytes());
	message
}

fn tagged(kind: SignatureKind, message: &[u8]) -> Vec<u8> {
	let tag = kind.tag().as_bytes();
	let mut buf = Vec::with_capacity(tag.len() + 1 + message.len());
	buf.extend_from_slice(tag);
	buf.push(TAG_SEPARATOR);
	buf.extend_from_slice(message);
	buf
}

/// Ed25519 signer holding a single key pair.
pub struct Ed25519Signer {
	key: SigningKey,
}

impl Ed25519Signer {
	pub fn new(key: SigningKey) -> Self {
		Self { key }
	}

	/// Generates a fresh key from the operating system's RNG.
	pub fn generate() -> Self {
		Self::new(SigningKey::generate(&mut OsRng))
	}

	/// Loads a key from a 32-byte seed written as 64 hex characters.
	pub fn from_hex_seed(seed: &str) -> Result<Self> {
		let bytes = hex::decode(seed.trim()).map_err(|e| Error::InvalidKey(e.to_string()))?;
		let seed: [u8; 32] = bytes
			.as_slice()
			.try_into()
			.map_err(|_| Error::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())))?;
		Ok(Self::new(SigningKey::from_bytes(&seed)))
	}

	pub fn verifying_key(&self) -> VerifyingKey {
		self.key.verifying_key()
	}

	/// Hex form of the public key, as shown to operators.
	pub fn public_key_hex(&self) -> String {
		hex::encode(self.verifying_key().as_bytes())
	}

	/// Checks a signature produced by [`Signer::sign`] with this key.
	pub fn verify(&self, kind: SignatureKind, message: &[u8], signature: &[u8]) -> bool {
		let Ok(signature) = Signature::from_slice(signature) else {
			return false;
		};
		self.verifying_key()
			.verify(&tagged(kind, message), &signature)
			.is_ok()
	}
}

impl std::fmt::Debug for Ed25519Signer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Ed25519Signer")
			.field("public_key", &self.public_key_hex())
			.finish_non_exhaustive()
	}
}

impl Signer for Ed25519Signer {
	fn sign(&self, kind: SignatureKind, message: &[u8]) -> Result<Vec<u8>> {
		Ok(self.key.sign(&tagged(kind, message)).to_bytes().to_vec())
	}
}

//! Storage upload commands, including the offline-signing session endpoints.
//!
//! In offline-sign mode the node never signs on the client's behalf. It
//! parks the session at a `*SignReady` stage until the client fetches the
//! unsigned data for that stage, signs it locally and submits the result.

use offsign_protocol::{
	BatchContracts, ContentId, SessionId, SignedContracts, SignedPayload, Stage, UnsignedPayload,
	UploadStarted, UploadStatus,
};

use crate::error::Result;
use crate::shell::Shell;

/// Options accepted by `storage/upload`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
	/// Have the node wait for client-side signatures at every signing stage.
	pub offline_sign_mode: bool,
	/// Storage period in days.
	pub storage_length: Option<u32>,
	/// Number of host copies.
	pub copies: Option<u32>,
}

impl UploadOptions {
	/// Options for an offline-signed upload with node defaults otherwise.
	pub fn offline() -> Self {
		Self {
			offline_sign_mode: true,
			..Self::default()
		}
	}

	pub fn storage_length(mut self, days: u32) -> Self {
		self.storage_length = Some(days);
		self
	}

	pub fn copies(mut self, copies: u32) -> Self {
		self.copies = Some(copies);
		self
	}
}

impl Shell {
	/// Starts a storage upload for `hash` and returns the new session.
	pub async fn storage_upload(&self, hash: &ContentId, options: &UploadOptions) -> Result<SessionId> {
		let mut rb = self
			.request("storage/upload")
			.argument(hash.as_str())
			.option("offline-sign-mode", options.offline_sign_mode);
		if let Some(days) = options.storage_length {
			rb = rb.option("storage-length", days);
		}
		if let Some(copies) = options.copies {
			rb = rb.option("copies", copies);
		}

		let started: UploadStarted = rb.exec().await?;
		tracing::info!(
			target = "offsign.http",
			session = %started.id,
			hash = %hash,
			offline = options.offline_sign_mode,
			"storage upload started"
		);
		Ok(started.id)
	}

	/// Starts an offline-signed storage upload.
	pub async fn storage_upload_offline(&self, hash: &ContentId) -> Result<SessionId> {
		self.storage_upload(hash, &UploadOptions::offline()).await
	}

	/// Reads the current stage of an upload session.
	pub async fn storage_upload_status(&self, session: &SessionId) -> Result<UploadStatus> {
		self.request("storage/upload/status")
			.argument(session.as_str())
			.exec()
			.await
	}

	/// Fetches the contracts to sign at an escrow, guard or retry stage.
	pub async fn storage_upload_get_contract_batch(
		&self,
		session: &SessionId,
		hash: &ContentId,
		stage: &Stage,
	) -> Result<BatchContracts> {
		self.request("storage/upload/getcontractbatch")
			.arguments([session.as_str(), hash.as_str(), stage.as_str()])
			.exec()
			.await
	}

	/// Submits a signed contract batch for `stage`.
	pub async fn storage_upload_sign_batch(
		&self,
		session: &SessionId,
		hash: &ContentId,
		signed: &SignedContracts,
		stage: &Stage,
	) -> Result<()> {
		let signed = serde_json::to_string(signed)?;
		self.request("storage/upload/signbatch")
			.arguments([session.as_str(), hash.as_str(), stage.as_str()])
			.argument(signed)
			.exec_unit()
			.await
	}

	/// Fetches the single opcoded payload to sign at a `*SignReady` stage.
	pub async fn storage_upload_get_unsigned(
		&self,
		session: &SessionId,
		hash: &ContentId,
		stage: &Stage,
	) -> Result<UnsignedPayload> {
		self.request("storage/upload/getunsigned")
			.arguments([session.as_str(), hash.as_str(), stage.as_str()])
			.exec()
			.await
	}

	/// Submits a signed payload for `stage`.
	pub async fn storage_upload_sign(
		&self,
		session: &SessionId,
		hash: &ContentId,
		signed: &SignedPayload,
		stage: &Stage,
	) -> Result<()> {
		let signed = serde_json::to_string(signed)?;
		self.request("storage/upload/sign")
			.arguments([session.as_str(), hash.as_str()])
			.argument(signed)
			.argument(stage.as_str())
			.exec_unit()
			.await
	}
}

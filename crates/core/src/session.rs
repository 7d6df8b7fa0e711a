//! The remote side of an upload session, as seen by the driver.

use async_trait::async_trait;
use offsign_protocol::{
	BatchContracts, ContentId, Opcode, SessionId, SignedContracts, SignedPayload, Stage,
	UnsignedPayload,
};
use offsign_runtime::Shell;

use crate::error::{Error, Result};
use crate::signing::{SignatureKind, Signer, pay_channel_message};

/// Operations the driver needs from an upload session.
///
/// The `sign_*` methods receive the payload fetched in the same cycle and
/// are responsible for signing it locally and submitting the result tagged
/// with `stage`.
#[async_trait]
pub trait UploadSession: Send + Sync {
	/// Reads the session's current stage.
	async fn status(&self, session: &SessionId) -> Result<Stage>;

	/// Fetches the contracts to sign at a batch stage.
	async fn contract_batch(
		&self,
		session: &SessionId,
		content: &ContentId,
		stage: &Stage,
	) -> Result<BatchContracts>;

	/// Signs every contract in `batch` and submits them together.
	async fn sign_batch(
		&self,
		session: &SessionId,
		content: &ContentId,
		batch: &BatchContracts,
		stage: &Stage,
	) -> Result<()>;

	/// Fetches the opcoded payload for a single-signature stage.
	async fn unsigned_payload(
		&self,
		session: &SessionId,
		content: &ContentId,
		stage: &Stage,
	) -> Result<UnsignedPayload>;

	async fn sign_balance(
		&self,
		session: &SessionId,
		content: &ContentId,
		payload: &UnsignedPayload,
		stage: &Stage,
	) -> Result<()>;

	/// Signs a payment-channel update. The submitted result carries `price`.
	async fn sign_pay_channel(
		&self,
		session: &SessionId,
		content: &ContentId,
		payload: &UnsignedPayload,
		stage: &Stage,
		price: i64,
	) -> Result<()>;

	async fn sign_pay_request(
		&self,
		session: &SessionId,
		content: &ContentId,
		payload: &UnsignedPayload,
		stage: &Stage,
	) -> Result<()>;

	async fn sign_generic(
		&self,
		session: &SessionId,
		content: &ContentId,
		payload: &UnsignedPayload,
		stage: &Stage,
	) -> Result<()>;
}

/// [`UploadSession`] backed by a node's HTTP API and a local signer.
#[derive(Debug, Clone)]
pub struct RemoteSession<S> {
	shell: Shell,
	signer: S,
}

impl<S: Signer> RemoteSession<S> {
	pub fn new(shell: Shell, signer: S) -> Self {
		Self { shell, signer }
	}

	pub fn shell(&self) -> &Shell {
		&self.shell
	}

	pub fn signer(&self) -> &S {
		&self.signer
	}

	async fn submit(
		&self,
		session: &SessionId,
		content: &ContentId,
		stage: &Stage,
		signed: SignedPayload,
	) -> Result<()> {
		self.shell
			.storage_upload_sign(session, content, &signed, stage)
			.await?;
		tracing::debug!(
			target = "offsign.session",
			session = %session,
			stage = %stage,
			opcode = %signed.opcode,
			"signed payload submitted"
		);
		Ok(())
	}

	async fn sign_and_submit(
		&self,
		session: &SessionId,
		content: &ContentId,
		payload: &UnsignedPayload,
		stage: &Stage,
		kind: SignatureKind,
		opcode: Opcode,
	) -> Result<()> {
		let unsigned = payload.unsigned_bytes()?;
		let signature = self.signer.sign(kind, &unsigned)?;
		self.submit(session, content, stage, SignedPayload::new(opcode, &signature))
			.await
	}
}

#[async_trait]
impl<S: Signer> UploadSession for RemoteSession<S> {
	async fn status(&self, session: &SessionId) -> Result<Stage> {
		let status = self.shell.storage_upload_status(session).await?;
		if !status.message.is_empty() {
			tracing::debug!(
				target = "offsign.session",
				session = %session,
				message = %status.message,
				"status message"
			);
		}
		Ok(status.status)
	}

	async fn contract_batch(
		&self,
		session: &SessionId,
		content: &ContentId,
		stage: &Stage,
	) -> Result<BatchContracts> {
		Ok(self
			.shell
			.storage_upload_get_contract_batch(session, content, stage)
			.await?)
	}

	async fn sign_batch(
		&self,
		session: &SessionId,
		content: &ContentId,
		batch: &BatchContracts,
		stage: &Stage,
	) -> Result<()> {
		if batch.is_empty() {
			return Err(Error::EmptyBatch(stage.clone()));
		}

		let mut signed = SignedContracts::default();
		for item in &batch.contracts {
			let contract = item.contract_bytes()?;
			let signature = self.signer.sign(SignatureKind::Contract, &contract)?;
			signed.push(item.key.clone(), &signature);
		}

		self.shell
			.storage_upload_sign_batch(session, content, &signed, stage)
			.await?;
		tracing::debug!(
			target = "offsign.session",
			session = %session,
			stage = %stage,
			contracts = batch.len(),
			"signed batch submitted"
		);
		Ok(())
	}

	async fn unsigned_payload(
		&self,
		session: &SessionId,
		content: &ContentId,
		stage: &Stage,
	) -> Result<UnsignedPayload> {
		Ok(self
			.shell
			.storage_upload_get_unsigned(session, content, stage)
			.await?)
	}

	async fn sign_balance(
		&self,
		session: &SessionId,
		content: &ContentId,
		payload: &UnsignedPayload,
		stage: &Stage,
	) -> Result<()> {
		self.sign_and_submit(
			session,
			content,
			payload,
			stage,
			SignatureKind::Balance,
			Opcode::Balance,
		)
		.await
	}

	async fn sign_pay_channel(
		&self,
		session: &SessionId,
		content: &ContentId,
		payload: &UnsignedPayload,
		stage: &Stage,
		price: i64,
	) -> Result<()> {
		let message = pay_channel_message(&payload.unsigned_bytes()?, price);
		let signature = self.signer.sign(SignatureKind::PayChannel, &message)?;
		let signed = SignedPayload::new(Opcode::PayChannel, &signature).with_price(price);
		self.submit(session, content, stage, signed).await
	}

	async fn sign_pay_request(
		&self,
		session: &SessionId,
		content: &ContentId,
		payload: &UnsignedPayload,
		stage: &Stage,
	) -> Result<()> {
		self.sign_and_submit(
			session,
			content,
			payload,
			stage,
			SignatureKind::PayRequest,
			Opcode::PayRequest,
		)
		.await
	}

	async fn sign_generic(
		&self,
		session: &SessionId,
		content: &ContentId,
		payload: &UnsignedPayload,
		stage: &Stage,
	) -> Result<()> {
		self.sign_and_submit(
			session,
			content,
			payload,
			stage,
			SignatureKind::Generic,
			Opcode::Sign,
		)
		.await
	}
}

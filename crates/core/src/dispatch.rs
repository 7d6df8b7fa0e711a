//! Stage classification and the per-stage signing actions.

use offsign_protocol::{ContentId, Opcode, SessionId, Stage};

use crate::error::{Error, Result};
use crate::session::UploadSession;

/// What the driver must do after observing a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
	/// Nothing to do locally; poll again later.
	Wait,
	/// Fetch the contract batch, sign it and submit it.
	SignBatch,
	/// Fetch the opcoded payload, sign it and submit it.
	SignPayload,
	/// Terminal success.
	Complete,
	/// Terminal failure.
	Fail,
	/// Stage name outside the known protocol.
	Unrecognized,
}

impl StageAction {
	pub fn is_terminal(self) -> bool {
		matches!(self, StageAction::Complete | StageAction::Fail)
	}
}

pub fn classify(stage: &Stage) -> StageAction {
	match stage {
		Stage::Uninitialized | Stage::Init | Stage::RetrySignProcess => StageAction::Wait,
		Stage::InitSignReadyForEscrow | Stage::InitSignReadyForGuard | Stage::RetrySignReady => {
			StageAction::SignBatch
		}
		Stage::BalanceSignReady
		| Stage::PayChannelSignReady
		| Stage::PayRequestSignReady
		| Stage::GuardSignReady => StageAction::SignPayload,
		Stage::Complete => StageAction::Complete,
		Stage::Error => StageAction::Fail,
		Stage::Unrecognized(_) => StageAction::Unrecognized,
	}
}

/// Result of a signing action that reached the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Performed {
	Batch { contracts: usize },
	Payload { opcode: Opcode },
}

/// Runs the signing action for `stage`.
///
/// Returns `Ok(None)` for stages that need no local work.
pub async fn perform(
	remote: &dyn UploadSession,
	session: &SessionId,
	content: &ContentId,
	stage: &Stage,
) -> Result<Option<Performed>> {
	match classify(stage) {
		StageAction::SignBatch => {
			let batch = remote.contract_batch(session, content, stage).await?;
			remote.sign_batch(session, content, &batch, stage).await?;
			Ok(Some(Performed::Batch {
				contracts: batch.len(),
			}))
		}
		StageAction::SignPayload => {
			let opcode = sign_payload(remote, session, content, stage).await?;
			Ok(Some(Performed::Payload { opcode }))
		}
		StageAction::Wait
		| StageAction::Complete
		| StageAction::Fail
		| StageAction::Unrecognized => Ok(None),
	}
}

async fn sign_payload(
	remote: &dyn UploadSession,
	session: &SessionId,
	content: &ContentId,
	stage: &Stage,
) -> Result<Opcode> {
	let payload = remote.unsigned_payload(session, content, stage).await?;
	match &payload.opcode {
		Opcode::Balance => remote.sign_balance(session, content, &payload, stage).await?,
		Opcode::PayChannel => {
			remote
				.sign_pay_channel(session, content, &payload, stage, payload.price)
				.await?
		}
		Opcode::PayRequest => {
			remote
				.sign_pay_request(session, content, &payload, stage)
				.await?
		}
		Opcode::Sign => remote.sign_generic(session, content, &payload, stage).await?,
		Opcode::Unrecognized(name) => {
			return Err(Error::UnrecognizedOpcode {
				opcode: name.clone(),
				stage: stage.clone(),
			});
		}
	}
	Ok(payload.opcode)
}

//! Test doubles for code that drives upload sessions.
//!
//! [`MockUploadSession`] plays back a scripted sequence of stages and
//! records every call for later assertion.
//!
//! # Example
//!
//! ```ignore
//! use offsign::testing::{MockCall, MockUploadSession};
//!
//! let remote = Arc::new(MockUploadSession::with_stages([Stage::Init, Stage::Complete]));
//! let handle = SessionDriver::new(remote.clone()).start(session, content);
//! // ... consume reports
//! assert_eq!(remote.polls(), 2);
//! ```

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use offsign_protocol::{BatchContracts, ContentId, ContractItem, Opcode, SessionId, Stage, UnsignedPayload};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::session::UploadSession;

/// Call recorded by [`MockUploadSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
	Status,
	ContractBatch { stage: Stage },
	SignBatch { stage: Stage, contracts: usize },
	UnsignedPayload { stage: Stage },
	SignBalance { stage: Stage },
	SignPayChannel { stage: Stage, price: i64 },
	SignPayRequest { stage: Stage },
	SignGeneric { stage: Stage },
}

/// Scripted [`UploadSession`].
///
/// Each status poll takes the next scripted step. Once the script runs out
/// every poll fails.
pub struct MockUploadSession {
	steps: Mutex<VecDeque<std::result::Result<Stage, String>>>,
	payloads: Mutex<HashMap<Stage, UnsignedPayload>>,
	batch: Mutex<BatchContracts>,
	failing_actions: Mutex<usize>,
	calls: Mutex<Vec<MockCall>>,
}

impl Default for MockUploadSession {
	fn default() -> Self {
		Self::new()
	}
}

impl MockUploadSession {
	pub fn new() -> Self {
		Self {
			steps: Mutex::new(VecDeque::new()),
			payloads: Mutex::new(HashMap::new()),
			batch: Mutex::new(BatchContracts {
				contracts: vec![ContractItem {
					key: "contract-0".to_string(),
					contract: "Y29udHJhY3Q=".to_string(),
				}],
			}),
			failing_actions: Mutex::new(0),
			calls: Mutex::new(Vec::new()),
		}
	}

	pub fn with_stages(stages: impl IntoIterator<Item = Stage>) -> Self {
		let mock = Self::new();
		for stage in stages {
			mock.push_stage(stage);
		}
		mock
	}

	pub fn push_stage(&self, stage: Stage) {
		self.steps.lock().push_back(Ok(stage));
	}

	/// Makes the next scripted poll fail with `message`.
	pub fn push_poll_error(&self, message: &str) {
		self.steps.lock().push_back(Err(message.to_string()));
	}

	/// Sets the payload returned for `stage`. Unset stages get a generic
	/// `sign` payload.
	pub fn set_payload(&self, stage: Stage, payload: UnsignedPayload) {
		self.payloads.lock().insert(stage, payload);
	}

	pub fn set_batch(&self, batch: BatchContracts) {
		*self.batch.lock() = batch;
	}

	/// Makes the next `count` signing submissions fail.
	pub fn fail_next_actions(&self, count: usize) {
		*self.failing_actions.lock() = count;
	}

	/// Returns all recorded calls.
	pub fn calls(&self) -> Vec<MockCall> {
		self.calls.lock().clone()
	}

	/// Returns the number of status polls made so far.
	pub fn polls(&self) -> usize {
		self.calls
			.lock()
			.iter()
			.filter(|call| **call == MockCall::Status)
			.count()
	}

	fn record(&self, call: MockCall) {
		self.calls.lock().push(call);
	}

	fn submit(&self, call: MockCall) -> Result<()> {
		self.record(call);
		let mut failing = self.failing_actions.lock();
		if *failing > 0 {
			*failing -= 1;
			return Err(remote_error("submission rejected"));
		}
		Ok(())
	}
}

fn remote_error(message: &str) -> Error {
	Error::Runtime(offsign_runtime::Error::Remote {
		message: message.to_string(),
		code: 0,
	})
}

#[async_trait]
impl UploadSession for MockUploadSession {
	async fn status(&self, _session: &SessionId) -> Result<Stage> {
		self.record(MockCall::Status);
		match self.steps.lock().pop_front() {
			Some(Ok(stage)) => Ok(stage),
			Some(Err(message)) => Err(Error::Runtime(offsign_runtime::Error::Status {
				status: 503,
				body: message,
			})),
			None => Err(remote_error("script exhausted")),
		}
	}

	async fn contract_batch(
		&self,
		_session: &SessionId,
		_content: &ContentId,
		stage: &Stage,
	) -> Result<BatchContracts> {
		self.record(MockCall::ContractBatch {
			stage: stage.clone(),
		});
		Ok(self.batch.lock().clone())
	}

	async fn sign_batch(
		&self,
		_session: &SessionId,
		_content: &ContentId,
		batch: &BatchContracts,
		stage: &Stage,
	) -> Result<()> {
		self.submit(MockCall::SignBatch {
			stage: stage.clone(),
			contracts: batch.len(),
		})
	}

	async fn unsigned_payload(
		&self,
		_session: &SessionId,
		_content: &ContentId,
		stage: &Stage,
	) -> Result<UnsignedPayload> {
		self.record(MockCall::UnsignedPayload {
			stage: stage.clone(),
		});
		let payload = self.payloads.lock().get(stage).cloned();
		Ok(payload.unwrap_or_else(|| UnsignedPayload {
			opcode: Opcode::Sign,
			unsigned: String::new(),
			price: 0,
		}))
	}

	async fn sign_balance(
		&self,
		_session: &SessionId,
		_content: &ContentId,
		_payload: &UnsignedPayload,
		stage: &Stage,
	) -> Result<()> {
		self.submit(MockCall::SignBalance {
			stage: stage.clone(),
		})
	}

	async fn sign_pay_channel(
		&self,
		_session: &SessionId,
		_content: &ContentId,
		_payload: &UnsignedPayload,
		stage: &Stage,
		price: i64,
	) -> Result<()> {
		self.submit(MockCall::SignPayChannel {
			stage: stage.clone(),
			price,
		})
	}

	async fn sign_pay_request(
		&self,
		_session: &SessionId,
		_content: &ContentId,
		_payload: &UnsignedPayload,
		stage: &Stage,
	) -> Result<()> {
		self.submit(MockCall::SignPayRequest {
			stage: stage.clone(),
		})
	}

	async fn sign_generic(
		&self,
		_session: &SessionId,
		_content: &ContentId,
		_payload: &UnsignedPayload,
		stage: &Stage,
	) -> Result<()> {
		self.submit(MockCall::SignGeneric {
			stage: stage.clone(),
		})
	}
}

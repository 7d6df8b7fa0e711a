//! The session driver: a fixed-interval polling loop that signs whatever
//! the node is waiting for until the session reaches a terminal stage.
//!
//! # Cycle
//!
//! 1. Check for cancellation, then sleep for the poll interval
//! 2. Poll the session status
//! 3. Report the observed stage
//! 4. Stop on `complete` or `error`, otherwise run the stage's action
//!
//! Failed polls and failed actions are reported as data and the loop keeps
//! going. The next poll is the retry.

use std::sync::Arc;
use std::time::Duration;

use offsign_protocol::{ContentId, SessionId, Stage};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use crate::dispatch::{self, Performed, StageAction};
use crate::error::{Error, Result};
use crate::session::UploadSession;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
	/// Fixed delay before every poll.
	pub poll_interval: Duration,
	/// Give up after this many consecutive failed polls or unrecognized
	/// stages. `None` drives until a terminal stage or cancellation.
	pub max_consecutive_failures: Option<u32>,
}

impl Default for DriverConfig {
	fn default() -> Self {
		Self {
			poll_interval: DEFAULT_POLL_INTERVAL,
			max_consecutive_failures: None,
		}
	}
}

/// One observation pushed to the report channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
	/// A successful poll, sent before the stage's action runs.
	Stage(Stage),
	/// The status poll failed.
	PollFailed { error: String },
	/// The stage's signing action failed. The stage will be polled again.
	ActionFailed { stage: Stage, error: String },
	/// The node asked for a signature kind this client does not know.
	UnrecognizedOpcode { stage: Stage, opcode: String },
}

impl Report {
	pub fn stage(&self) -> Option<&Stage> {
		match self {
			Report::Stage(stage) => Some(stage),
			_ => None,
		}
	}

	/// Returns true for the report of `complete` or `error`.
	pub fn is_terminal(&self) -> bool {
		self.stage().is_some_and(Stage::is_terminal)
	}
}

/// How a driver run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
	Completed,
	/// The node reported the `error` stage.
	Failed,
	Cancelled,
	Abandoned { consecutive_failures: u32 },
}

impl SessionOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, SessionOutcome::Completed)
	}

	pub fn into_result(self, session: &SessionId) -> Result<()> {
		let session = session.clone();
		match self {
			SessionOutcome::Completed => Ok(()),
			SessionOutcome::Failed => Err(Error::SessionFailed { session }),
			SessionOutcome::Cancelled => Err(Error::Cancelled { session }),
			SessionOutcome::Abandoned {
				consecutive_failures,
			} => Err(Error::Abandoned {
				session,
				failures: consecutive_failures,
			}),
		}
	}
}

/// Drives upload sessions against one [`UploadSession`] implementation.
#[derive(Clone)]
pub struct SessionDriver {
	remote: Arc<dyn UploadSession>,
	config: DriverConfig,
}

impl SessionDriver {
	pub fn new(remote: Arc<dyn UploadSession>) -> Self {
		Self {
			remote,
			config: DriverConfig::default(),
		}
	}

	pub fn with_config(mut self, config: DriverConfig) -> Self {
		self.config = config;
		self
	}

	pub fn config(&self) -> &DriverConfig {
		&self.config
	}

	/// Spawns the polling loop for `session` on the current runtime.
	pub fn start(&self, session: SessionId, content: ContentId) -> SessionHandle {
		let (report_tx, report_rx) = mpsc::channel(1);
		let (cancel_tx, cancel_rx) = watch::channel(false);

		let driver = self.clone();
		let task_session = session.clone();
		let task = tokio::spawn(async move {
			driver
				.run(&task_session, &content, report_tx, cancel_rx)
				.await
		});

		SessionHandle {
			reports: report_rx,
			control: SessionControl {
				session,
				cancel: cancel_tx,
				task,
			},
		}
	}

	/// Runs the polling loop on the calling task until the session ends.
	pub async fn run(
		&self,
		session: &SessionId,
		content: &ContentId,
		reports: mpsc::Sender<Report>,
		mut cancel: watch::Receiver<bool>,
	) -> SessionOutcome {
		info!(
			target = "offsign.driver",
			session = %session,
			content = %content,
			interval = ?self.config.poll_interval,
			"driving upload session"
		);

		let mut failures: u32 = 0;
		loop {
			let cancelled = *cancel.borrow();
			if cancelled || !self.pause(&mut cancel).await {
				info!(target = "offsign.driver", session = %session, "session driver cancelled");
				return SessionOutcome::Cancelled;
			}

			let stage = match self.remote.status(session).await {
				Ok(stage) => stage,
				Err(err) => {
					warn!(
						target = "offsign.driver",
						session = %session,
						error = %err,
						"status poll failed"
					);
					emit(&reports, Report::PollFailed {
						error: err.to_string(),
					})
					.await;
					failures = failures.saturating_add(1);
					if let Some(outcome) = self.check_ceiling(session, failures) {
						return outcome;
					}
					continue;
				}
			};

			let action = dispatch::classify(&stage);
			debug!(
				target = "offsign.driver",
				session = %session,
				stage = %stage,
				action = ?action,
				"stage observed"
			);
			emit(&reports, Report::Stage(stage.clone())).await;

			match action {
				StageAction::Complete => {
					info!(target = "offsign.driver", session = %session, "upload session complete");
					return SessionOutcome::Completed;
				}
				StageAction::Fail => {
					error!(target = "offsign.driver", session = %session, "upload session failed");
					return SessionOutcome::Failed;
				}
				StageAction::Unrecognized => {
					warn!(
						target = "offsign.driver",
						session = %session,
						stage = %stage,
						"unrecognized stage"
					);
					failures = failures.saturating_add(1);
					if let Some(outcome) = self.check_ceiling(session, failures) {
						return outcome;
					}
					continue;
				}
				StageAction::Wait => {}
				StageAction::SignBatch | StageAction::SignPayload => {
					self.act(session, content, &stage, &reports).await;
				}
			}
			failures = 0;
		}
	}

	async fn act(
		&self,
		session: &SessionId,
		content: &ContentId,
		stage: &Stage,
		reports: &mpsc::Sender<Report>,
	) {
		match dispatch::perform(self.remote.as_ref(), session, content, stage).await {
			Ok(Some(Performed::Batch { contracts })) => {
				info!(
					target = "offsign.driver",
					session = %session,
					stage = %stage,
					contracts,
					"contract batch signed"
				);
			}
			Ok(Some(Performed::Payload { opcode })) => {
				info!(
					target = "offsign.driver",
					session = %session,
					stage = %stage,
					opcode = %opcode,
					"payload signed"
				);
			}
			Ok(None) => {}
			Err(Error::UnrecognizedOpcode { opcode, stage }) => {
				warn!(
					target = "offsign.driver",
					session = %session,
					stage = %stage,
					opcode = %opcode,
					"unrecognized opcode, nothing signed"
				);
				emit(reports, Report::UnrecognizedOpcode { stage, opcode }).await;
			}
			Err(err) => {
				warn!(
					target = "offsign.driver",
					session = %session,
					stage = %stage,
					error = %err,
					"signing action failed"
				);
				emit(reports, Report::ActionFailed {
					stage: stage.clone(),
					error: err.to_string(),
				})
				.await;
			}
		}
	}

	fn check_ceiling(&self, session: &SessionId, failures: u32) -> Option<SessionOutcome> {
		let limit = self.config.max_consecutive_failures?;
		if failures < limit {
			return None;
		}
		error!(
			target = "offsign.driver",
			session = %session,
			failures,
			"too many consecutive failures, abandoning session"
		);
		Some(SessionOutcome::Abandoned {
			consecutive_failures: failures,
		})
	}

	/// Sleeps for one poll interval. Returns false if cancelled meanwhile.
	async fn pause(&self, cancel: &mut watch::Receiver<bool>) -> bool {
		let sleep = tokio::time::sleep(self.config.poll_interval);
		tokio::pin!(sleep);
		loop {
			tokio::select! {
				_ = &mut sleep => return true,
				changed = cancel.changed() => match changed {
					Ok(()) => {
						if *cancel.borrow() {
							return false;
						}
					}
					Err(_) => {
						// The handle is gone; nothing can cancel any more.
						(&mut sleep).await;
						return true;
					}
				},
			}
		}
	}
}

async fn emit(reports: &mpsc::Sender<Report>, report: Report) {
	if reports.send(report).await.is_err() {
		debug!(target = "offsign.driver", "report receiver dropped");
	}
}

/// Cancel signal and final outcome of a running driver.
pub struct SessionControl {
	session: SessionId,
	cancel: watch::Sender<bool>,
	task: JoinHandle<SessionOutcome>,
}

impl SessionControl {
	pub fn session(&self) -> &SessionId {
		&self.session
	}

	/// Asks the driver to stop. Takes effect before the next poll; an
	/// action already in flight is finished first.
	pub fn cancel(&self) {
		let _ = self.cancel.send(true);
	}

	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}

	/// Waits for the driver to stop and returns how it ended.
	pub async fn outcome(self) -> Result<SessionOutcome> {
		Ok(self.task.await?)
	}
}

/// Handle to a driver started with [`SessionDriver::start`].
pub struct SessionHandle {
	reports: mpsc::Receiver<Report>,
	control: SessionControl,
}

impl SessionHandle {
	pub fn session(&self) -> &SessionId {
		self.control.session()
	}

	/// Receives the next report. Returns `None` once the driver has stopped
	/// and every report has been taken.
	pub async fn next_report(&mut self) -> Option<Report> {
		self.reports.recv().await
	}

	pub fn reports_mut(&mut self) -> &mut mpsc::Receiver<Report> {
		&mut self.reports
	}

	pub fn cancel(&self) {
		self.control.cancel();
	}

	/// Splits the handle into a report stream and its control half.
	pub fn into_stream(self) -> (ReceiverStream<Report>, SessionControl) {
		(ReceiverStream::new(self.reports), self.control)
	}

	/// Stops listening for reports and waits for the driver to stop.
	pub async fn outcome(self) -> Result<SessionOutcome> {
		drop(self.reports);
		self.control.outcome().await
	}
}

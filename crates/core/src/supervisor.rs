//! Consumes driver reports and notices when the driver goes quiet.
//!
//! Silence is only reported. The driver keeps running, and a report that
//! arrives after a silence event is delivered as usual.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::driver::{Report, SessionHandle, SessionOutcome};
use crate::error::Result;

pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
	/// How long to wait for a report before raising [`SupervisorEvent::Silence`].
	pub silence_timeout: Duration,
}

impl Default for SupervisorConfig {
	fn default() -> Self {
		Self {
			silence_timeout: DEFAULT_SILENCE_TIMEOUT,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
	Report(Report),
	/// No report arrived within the silence timeout.
	Silence(Duration),
	/// The driver stopped and every report has been delivered.
	Closed,
}

#[derive(Debug, Clone, Default)]
pub struct Supervisor {
	config: SupervisorConfig,
}

impl Supervisor {
	pub fn new(config: SupervisorConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &SupervisorConfig {
		&self.config
	}

	/// Waits for the next report, at most one silence timeout.
	pub async fn next_event(&self, reports: &mut mpsc::Receiver<Report>) -> SupervisorEvent {
		let timeout = self.config.silence_timeout;
		match tokio::time::timeout(timeout, reports.recv()).await {
			Ok(Some(report)) => SupervisorEvent::Report(report),
			Ok(None) => SupervisorEvent::Closed,
			Err(_) => SupervisorEvent::Silence(timeout),
		}
	}

	/// Follows a driver to the end, passing every event to `observe`.
	pub async fn supervise<F>(&self, mut handle: SessionHandle, mut observe: F) -> Result<SessionOutcome>
	where
		F: FnMut(&SupervisorEvent),
	{
		loop {
			let event = self.next_event(handle.reports_mut()).await;
			match &event {
				SupervisorEvent::Report(report) => {
					debug!(
						target = "offsign.supervisor",
						session = %handle.session(),
						report = ?report,
						"report received"
					);
				}
				SupervisorEvent::Silence(waited) => {
					warn!(
						target = "offsign.supervisor",
						session = %handle.session(),
						waited = ?waited,
						"no report from session driver"
					);
				}
				SupervisorEvent::Closed => {}
			}

			observe(&event);
			if event == SupervisorEvent::Closed {
				break;
			}
		}
		handle.outcome().await
	}
}

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use offsign::{
	ContentId, Ed25519Signer, RemoteSession, Report, SessionDriver, SessionId, Supervisor,
	SupervisorEvent,
};
use offsign_runtime::Shell;
use serde::Serialize;

use crate::cli::{DriveArgs, DriverArgs};
use crate::error::Result;
use crate::output::{EventLine, OutputFormat, print_event};

/// Summary of one driven session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveData {
	pub session: String,
	pub content: String,
	/// Hex public key of the signer used for every signature.
	pub public_key: String,
	/// Stages in the order observed, repeats collapsed.
	pub stages: Vec<String>,
	pub poll_failures: u32,
	pub action_failures: u32,
	pub silences: u32,
}

impl DriveData {
	fn new(session: &SessionId, content: &ContentId, public_key: String) -> Self {
		Self {
			session: session.to_string(),
			content: content.to_string(),
			public_key,
			..Self::default()
		}
	}

	fn record(&mut self, event: &SupervisorEvent) {
		match event {
			SupervisorEvent::Report(Report::Stage(stage)) => {
				let name = stage.to_string();
				if self.stages.last() != Some(&name) {
					self.stages.push(name);
				}
			}
			SupervisorEvent::Report(Report::PollFailed { .. }) => self.poll_failures += 1,
			SupervisorEvent::Report(Report::ActionFailed { .. })
			| SupervisorEvent::Report(Report::UnrecognizedOpcode { .. }) => {
				self.action_failures += 1
			}
			SupervisorEvent::Silence(_) => self.silences += 1,
			SupervisorEvent::Closed => {}
		}
	}
}

fn read_seed(path: &Path) -> anyhow::Result<String> {
	std::fs::read_to_string(path).with_context(|| format!("reading key file {}", path.display()))
}

fn signer(args: &DriverArgs) -> Result<Ed25519Signer> {
	let seed = match (&args.key, &args.key_file) {
		(Some(seed), _) => Some(seed.clone()),
		(None, Some(path)) => Some(read_seed(path)?),
		(None, None) => None,
	};
	match seed {
		Some(seed) => Ok(Ed25519Signer::from_hex_seed(&seed)?),
		None => {
			let signer = Ed25519Signer::generate();
			tracing::warn!(
				target = "offsign",
				public_key = %signer.public_key_hex(),
				"no signing key given, using a one-off key"
			);
			Ok(signer)
		}
	}
}

/// Drives `session` to a terminal stage, printing events as they arrive.
pub async fn drive_session(
	shell: &Shell,
	args: &DriverArgs,
	session: SessionId,
	content: ContentId,
	format: OutputFormat,
) -> Result<DriveData> {
	let signer = signer(args)?;
	let mut data = DriveData::new(&session, &content, signer.public_key_hex());

	let remote = Arc::new(RemoteSession::new(shell.clone(), signer));
	let handle = SessionDriver::new(remote)
		.with_config(args.driver_config())
		.start(session.clone(), content);

	let outcome = Supervisor::new(args.supervisor_config())
		.supervise(handle, |event| {
			data.record(event);
			if let Some(line) = EventLine::from_event(event) {
				print_event(&line, format);
			}
		})
		.await?;
	tracing::info!(target = "offsign", session = %session, outcome = ?outcome, "session finished");

	outcome.into_result(&session)?;
	Ok(data)
}

pub async fn run(shell: &Shell, args: &DriveArgs, format: OutputFormat) -> Result<DriveData> {
	drive_session(
		shell,
		&args.driver,
		SessionId::new(args.session.as_str()),
		ContentId::new(args.hash.as_str()),
		format,
	)
	.await
}

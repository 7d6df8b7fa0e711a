use offsign::SessionId;
use offsign_runtime::Shell;
use serde::Serialize;

use crate::cli::StatusArgs;
use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
	pub session: String,
	pub stage: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub message: String,
	pub terminal: bool,
}

pub async fn run(shell: &Shell, args: &StatusArgs) -> Result<StatusData> {
	let session = SessionId::new(args.session.as_str());
	let status = shell.storage_upload_status(&session).await?;
	Ok(StatusData {
		session: session.to_string(),
		stage: status.status.to_string(),
		message: status.message,
		terminal: status.status.is_terminal(),
	})
}

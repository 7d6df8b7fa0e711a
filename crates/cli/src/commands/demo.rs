//! Uploads a short random string: the smallest end-to-end exercise of an
//! offline-signed session.

use offsign_runtime::{AddOptions, Shell};
use rand::Rng;
use rand::distributions::Alphanumeric;

use super::drive::{DriveData, drive_session};
use crate::cli::DemoArgs;
use crate::error::{CliError, Result};
use crate::output::OutputFormat;

fn random_content(length: usize) -> String {
	rand::thread_rng()
		.sample_iter(&Alphanumeric)
		.take(length)
		.map(char::from)
		.collect()
}

pub async fn run(shell: &Shell, args: &DemoArgs, format: OutputFormat) -> Result<DriveData> {
	if args.length == 0 {
		return Err(CliError::InvalidInput("--length must be at least 1".into()));
	}

	let content = random_content(args.length);
	let hash = shell
		.add(content.into_bytes(), &AddOptions::new().chunker(args.chunker.as_str()))
		.await?;
	let session = shell.storage_upload_offline(&hash).await?;
	tracing::info!(target = "offsign", session = %session, hash = %hash, "demo upload started");

	drive_session(shell, &args.driver, session, hash, format).await
}

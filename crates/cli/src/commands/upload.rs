use std::path::Path;

use offsign::ContentId;
use offsign_runtime::{AddOptions, Shell, UploadOptions};

use super::drive::{DriveData, drive_session};
use crate::cli::UploadArgs;
use crate::error::{CliError, Result};
use crate::output::OutputFormat;

const FILE_CHUNKER: &str = "reed-solomon-1-1-256000";

/// What an upload path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
	File,
	Directory,
}

async fn source_kind(path: &Path) -> Result<Source> {
	let metadata = tokio::fs::metadata(path).await.map_err(|source| CliError::Read {
		path: path.to_path_buf(),
		source,
	})?;
	if metadata.is_dir() {
		Ok(Source::Directory)
	} else if metadata.is_file() {
		Ok(Source::File)
	} else {
		Err(CliError::InvalidInput(format!(
			"{} is neither a file nor a directory",
			path.display()
		)))
	}
}

fn upload_options(args: &UploadArgs) -> UploadOptions {
	let mut options = UploadOptions::offline();
	options.storage_length = args.storage_length;
	options.copies = args.copies;
	options
}

async fn add(shell: &Shell, args: &UploadArgs) -> Result<ContentId> {
	let hash = match source_kind(&args.path).await? {
		Source::Directory => shell.add_serial_file_dir(&args.path, args.reed_solomon).await?,
		Source::File => {
			let bytes = tokio::fs::read(&args.path)
				.await
				.map_err(|source| CliError::Read {
					path: args.path.clone(),
					source,
				})?;
			let mut options = AddOptions::new();
			if args.reed_solomon {
				options = options.chunker(FILE_CHUNKER);
			}
			shell.add(bytes, &options).await?
		}
	};
	tracing::info!(target = "offsign", path = %args.path.display(), hash = %hash, "content added");
	Ok(hash)
}

pub async fn run(shell: &Shell, args: &UploadArgs, format: OutputFormat) -> Result<DriveData> {
	let hash = add(shell, args).await?;
	let session = shell.storage_upload(&hash, &upload_options(args)).await?;
	drive_session(shell, &args.driver, session, hash, format).await
}

mod demo;
mod drive;
mod status;
mod upload;

use std::time::Instant;

use offsign_runtime::Shell;
use serde::Serialize;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use crate::output::{OutputFormat, ResultBuilder, print_result};

pub use drive::DriveData;
pub use status::StatusData;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let format = cli.format;
	let command = cli.command.name();
	let shell = Shell::new(&cli.api)?;
	tracing::debug!(target = "offsign", api = %shell.url(), command, "dispatching");

	let start = Instant::now();
	match cli.command {
		Commands::Demo(args) => {
			let data = demo::run(&shell, &args, format).await?;
			finish(command, start, data, format);
		}
		Commands::Upload(args) => {
			let data = upload::run(&shell, &args, format).await?;
			finish(command, start, data, format);
		}
		Commands::Drive(args) => {
			let data = drive::run(&shell, &args, format).await?;
			finish(command, start, data, format);
		}
		Commands::Status(args) => {
			let data = status::run(&shell, &args).await?;
			finish(command, start, data, format);
		}
	}
	Ok(())
}

fn finish<T: Serialize>(command: &str, start: Instant, data: T, format: OutputFormat) {
	let result = ResultBuilder::new(command)
		.started_at(start)
		.data(data)
		.build();
	print_result(&result, format);
}


use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use offsign::{DriverConfig, SupervisorConfig};
use offsign_runtime::DEFAULT_API_URL;

use crate::output::OutputFormat;
use crate::styles::cli_styles;

/// Root CLI for offsign.
#[derive(Parser, Debug)]
#[command(name = "offsign")]
#[command(about = "Offline-signed storage uploads: add content, then sign every stage locally")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default), json, or ndjson
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Node API address
	#[arg(long, global = true, env = "OFFSIGN_API", default_value = DEFAULT_API_URL)]
	pub api: String,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Upload a short random string and drive it to completion.
	Demo(DemoArgs),
	/// Add a file or directory, start an offline upload and drive it.
	Upload(UploadArgs),
	/// Drive an upload session that was started elsewhere.
	Drive(DriveArgs),
	/// Print the current stage of an upload session.
	Status(StatusArgs),
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Demo(_) => "demo",
			Commands::Upload(_) => "upload",
			Commands::Drive(_) => "drive",
			Commands::Status(_) => "status",
		}
	}
}

/// Signing key and polling settings shared by every driving command.
#[derive(Args, Debug, Clone)]
pub struct DriverArgs {
	/// Ed25519 seed as 64 hex characters. A fresh key is generated if absent.
	#[arg(long, env = "OFFSIGN_KEY", hide_env_values = true, value_name = "HEX")]
	pub key: Option<String>,

	/// File holding the hex seed
	#[arg(long, value_name = "PATH", conflicts_with = "key")]
	pub key_file: Option<PathBuf>,

	/// Seconds between status polls
	#[arg(
		long,
		value_name = "SECS",
		default_value_t = 10,
		value_parser = clap::value_parser!(u64).range(1..)
	)]
	pub poll_interval: u64,

	/// Seconds without a report before warning that the session is quiet
	#[arg(
		long,
		value_name = "SECS",
		default_value_t = 20,
		value_parser = clap::value_parser!(u64).range(1..)
	)]
	pub silence_timeout: u64,

	/// Give up after this many consecutive failed polls
	#[arg(long, value_name = "N")]
	pub max_failures: Option<u32>,
}

impl DriverArgs {
	pub fn driver_config(&self) -> DriverConfig {
		DriverConfig {
			poll_interval: Duration::from_secs(self.poll_interval),
			max_consecutive_failures: self.max_failures,
		}
	}

	pub fn supervisor_config(&self) -> SupervisorConfig {
		SupervisorConfig {
			silence_timeout: Duration::from_secs(self.silence_timeout),
		}
	}
}

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
	/// Length of the random string to upload
	#[arg(long, value_name = "N", default_value_t = 15)]
	pub length: usize,

	/// Chunker used when adding the string
	#[arg(long, value_name = "CHUNKER", default_value = "reed-solomon-1-1-256000")]
	pub chunker: String,

	#[command(flatten)]
	pub driver: DriverArgs,
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
	/// File or directory to upload
	#[arg(value_name = "PATH")]
	pub path: PathBuf,

	/// Use reed-solomon chunking when adding
	#[arg(long)]
	pub reed_solomon: bool,

	/// Storage period in days
	#[arg(long, value_name = "DAYS")]
	pub storage_length: Option<u32>,

	/// Number of host copies
	#[arg(long, value_name = "N")]
	pub copies: Option<u32>,

	#[command(flatten)]
	pub driver: DriverArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DriveArgs {
	/// Upload session id
	#[arg(value_name = "SESSION")]
	pub session: String,

	/// Content hash the session uploads
	#[arg(value_name = "HASH")]
	pub hash: String,

	#[command(flatten)]
	pub driver: DriverArgs,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
	/// Upload session id
	#[arg(value_name = "SESSION")]
	pub session: String,
}

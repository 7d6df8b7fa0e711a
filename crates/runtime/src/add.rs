//! Content submission: `add` for bytes, symlinks and directory trees.
//!
//! Bodies follow the node's multipart file layout: every entry is a part
//! named `file` whose filename is the query-escaped path relative to the
//! upload root, with the entry kind carried in the part content type.

use std::path::{Path, PathBuf};

use offsign_protocol::{AddedObject, ContentId};
use reqwest::multipart::{Form, Part};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::shell::{RequestBuilder, Shell};

const DIRECTORY_MIME: &str = "application/x-directory";
const FILE_MIME: &str = "application/octet-stream";
const SYMLINK_MIME: &str = "application/symlink";

/// Options accepted by the `add` command. Unset options are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOptions {
	pub meta: Option<String>,
	pub chunker: Option<String>,
	pub only_hash: Option<bool>,
	pub pin: Option<bool>,
	pub progress: Option<bool>,
	pub raw_leaves: Option<bool>,
	/// Multihash function name.
	pub hash: Option<String>,
	pub cid_version: Option<u32>,
}

impl AddOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn meta(mut self, meta: impl Into<String>) -> Self {
		self.meta = Some(meta.into());
		self
	}

	/// Chunking strategy, e.g. `reed-solomon-1-1-256000`.
	pub fn chunker(mut self, chunker: impl Into<String>) -> Self {
		self.chunker = Some(chunker.into());
		self
	}

	pub fn only_hash(mut self, enabled: bool) -> Self {
		self.only_hash = Some(enabled);
		self
	}

	pub fn pin(mut self, enabled: bool) -> Self {
		self.pin = Some(enabled);
		self
	}

	pub fn progress(mut self, enabled: bool) -> Self {
		self.progress = Some(enabled);
		self
	}

	pub fn raw_leaves(mut self, enabled: bool) -> Self {
		self.raw_leaves = Some(enabled);
		self
	}

	pub fn hash(mut self, hash: impl Into<String>) -> Self {
		self.hash = Some(hash.into());
		self
	}

	pub fn cid_version(mut self, version: u32) -> Self {
		self.cid_version = Some(version);
		self
	}

	fn apply<'a>(&self, mut rb: RequestBuilder<'a>) -> RequestBuilder<'a> {
		if let Some(meta) = &self.meta {
			rb = rb.option("meta", meta);
		}
		if let Some(chunker) = &self.chunker {
			rb = rb.option("chunker", chunker);
		}
		if let Some(enabled) = self.only_hash {
			rb = rb.option("only-hash", enabled);
		}
		if let Some(enabled) = self.pin {
			rb = rb.option("pin", enabled);
		}
		if let Some(enabled) = self.progress {
			rb = rb.option("progress", enabled);
		}
		if let Some(enabled) = self.raw_leaves {
			rb = rb.option("raw-leaves", enabled);
		}
		if let Some(hash) = &self.hash {
			rb = rb.option("hash", hash);
		}
		if let Some(version) = self.cid_version {
			rb = rb.option("v", version);
		}
		rb
	}
}

/// Kind of an entry in a directory upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntryKind {
	Directory,
	File(PathBuf),
	/// Symlink with its (unresolved) target.
	Symlink(String),
}

/// One multipart entry of a directory upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
	/// Path relative to the parent of the upload root, `/`-separated.
	pub name: String,
	pub kind: TreeEntryKind,
}

/// Lists `dir` and everything below it, parents before children and
/// siblings in file-name order. Symlinks are not followed.
pub fn directory_entries(dir: &Path) -> Result<Vec<TreeEntry>> {
	let root_name = dir
		.file_name()
		.and_then(|n| n.to_str())
		.ok_or_else(|| Error::InvalidArgument(format!("not a named directory: {}", dir.display())))?
		.to_string();

	let mut entries = Vec::new();
	for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
		let entry = entry?;
		let relative = entry
			.path()
			.strip_prefix(dir)
			.map_err(|_| Error::InvalidArgument(format!("entry outside upload root: {}", entry.path().display())))?;

		let mut name = root_name.clone();
		for component in relative.components() {
			name.push('/');
			name.push_str(&component.as_os_str().to_string_lossy());
		}

		let file_type = entry.file_type();
		let kind = if file_type.is_dir() {
			TreeEntryKind::Directory
		} else if file_type.is_symlink() {
			let target = std::fs::read_link(entry.path())?;
			TreeEntryKind::Symlink(target.to_string_lossy().into_owned())
		} else {
			TreeEntryKind::File(entry.path().to_path_buf())
		};
		entries.push(TreeEntry { name, kind });
	}

	Ok(entries)
}

fn escape_name(name: &str) -> String {
	url::form_urlencoded::byte_serialize(name.as_bytes()).collect()
}

fn named_part(bytes: Vec<u8>, name: &str, mime: &str) -> Result<Part> {
	Part::bytes(bytes)
		.file_name(escape_name(name))
		.mime_str(mime)
		.map_err(Error::from)
}

async fn tree_form(entries: Vec<TreeEntry>) -> Result<Form> {
	let mut form = Form::new();
	for entry in entries {
		let part = match entry.kind {
			TreeEntryKind::Directory => named_part(Vec::new(), &entry.name, DIRECTORY_MIME)?,
			TreeEntryKind::File(path) => {
				let bytes = tokio::fs::read(&path).await?;
				named_part(bytes, &entry.name, FILE_MIME)?
			}
			TreeEntryKind::Symlink(target) => {
				named_part(target.into_bytes(), &entry.name, SYMLINK_MIME)?
			}
		};
		form = form.part("file", part);
	}
	Ok(form)
}

/// Picks the content identifier of the last completed object in an add stream.
fn final_content_id(objects: Vec<AddedObject>) -> Result<ContentId> {
	objects
		.iter()
		.rev()
		.find_map(AddedObject::content_id)
		.ok_or(Error::NoResults)
}

impl Shell {
	/// Adds `data` as a single unnamed file and returns its content identifier.
	pub async fn add(&self, data: impl Into<Vec<u8>>, options: &AddOptions) -> Result<ContentId> {
		let form = Form::new().part("file", named_part(data.into(), "", FILE_MIME)?);
		let rb = options.apply(self.request("add")).body(form);
		let objects: Vec<AddedObject> = rb.exec_stream().await?;
		final_content_id(objects)
	}

	/// Adds a file without pinning it.
	pub async fn add_no_pin(&self, data: impl Into<Vec<u8>>) -> Result<ContentId> {
		self.add(data, &AddOptions::new().pin(false)).await
	}

	/// Adds a file with explicit pin and raw-leaves settings.
	pub async fn add_with_opts(
		&self,
		data: impl Into<Vec<u8>>,
		pin: bool,
		raw_leaves: bool,
	) -> Result<ContentId> {
		self.add(data, &AddOptions::new().pin(pin).raw_leaves(raw_leaves))
			.await
	}

	/// Adds a symlink pointing at `target`.
	pub async fn add_link(&self, target: &str) -> Result<ContentId> {
		let part = named_part(target.as_bytes().to_vec(), "", SYMLINK_MIME)?;
		let objects: Vec<AddedObject> = self
			.request("add")
			.body(Form::new().part("file", part))
			.exec_stream()
			.await?;
		final_content_id(objects)
	}

	/// Adds a directory recursively.
	pub async fn add_dir(&self, dir: &Path) -> Result<ContentId> {
		self.add_serial_file_dir(dir, false).await
	}

	/// Adds a directory recursively, optionally with reed-solomon chunking.
	///
	/// The root directory's own identifier is the last object the node reports.
	pub async fn add_serial_file_dir(&self, dir: &Path, reed_solomon: bool) -> Result<ContentId> {
		let metadata = tokio::fs::symlink_metadata(dir).await?;
		if !metadata.is_dir() {
			return Err(Error::InvalidArgument(format!(
				"not a directory: {}",
				dir.display()
			)));
		}

		let entries = directory_entries(dir)?;
		tracing::debug!(
			target = "offsign.http",
			root = %dir.display(),
			entries = entries.len(),
			"adding directory tree"
		);

		let mut rb = self.request("add").option("recursive", true);
		if reed_solomon {
			rb = rb.option("chunker", "reed-solomon");
		}
		let objects: Vec<AddedObject> = rb.body(tree_form(entries).await?).exec_stream().await?;
		final_content_id(objects)
	}
}

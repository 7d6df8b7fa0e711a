//! Response envelopes of the node's HTTP command API.

use serde::{Deserialize, Serialize};

use crate::ids::{ContentId, SessionId};
use crate::stage::Stage;

/// Body of a failed command (`{"Message": .., "Code": .., "Type": "error"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorEnvelope {
	pub message: String,
	#[serde(default)]
	pub code: i64,
	#[serde(default, rename = "Type")]
	pub kind: String,
}

/// One object of the `add` response stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddedObject {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub hash: String,
	/// Present on progress lines; those carry no hash.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bytes: Option<u64>,
}

impl AddedObject {
	pub fn content_id(&self) -> Option<ContentId> {
		(!self.hash.is_empty()).then(|| ContentId::new(self.hash.clone()))
	}
}

/// Response of `storage/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStarted {
	#[serde(rename = "ID")]
	pub id: SessionId,
}

/// Response of `storage/upload/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UploadStatus {
	pub status: Stage,
	#[serde(default)]
	pub message: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_envelope() {
		let status: UploadStatus =
			serde_json::from_str(r#"{"Status":"guardSignReady","Message":""}"#).unwrap();
		assert_eq!(status.status, Stage::GuardSignReady);

		let status: UploadStatus = serde_json::from_str(r#"{"Status":"rebalancing"}"#).unwrap();
		assert_eq!(status.status, Stage::Unrecognized("rebalancing".into()));
	}

	#[test]
	fn error_envelope() {
		let err: ErrorEnvelope = serde_json::from_str(
			r#"{"Message":"session not found","Code":0,"Type":"error"}"#,
		)
		.unwrap();
		assert_eq!(err.message, "session not found");
		assert_eq!(err.kind, "error");
	}

	#[test]
	fn progress_lines_have_no_content_id() {
		let progress: AddedObject = serde_json::from_str(r#"{"Name":"","Bytes":262144}"#).unwrap();
		assert_eq!(progress.content_id(), None);

		let done: AddedObject = serde_json::from_str(r#"{"Name":"a.txt","Hash":"QmA"}"#).unwrap();
		assert_eq!(done.content_id(), Some(ContentId::new("QmA")));
	}

	#[test]
	fn upload_started_reads_id() {
		let started: UploadStarted = serde_json::from_str(r#"{"ID":"sess-1"}"#).unwrap();
		assert_eq!(started.id.as_str(), "sess-1");
	}
}

//! Runtime commands against an in-process fake node.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use offsign_protocol::{ContentId, Opcode, SessionId, SignedContracts, SignedPayload, Stage};
use offsign_runtime::{AddOptions, Error, Shell, UploadOptions};

type Calls = Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>;

#[derive(Clone, Default)]
struct Node {
	calls: Calls,
}

impl Node {
	fn record(&self, command: &str, query: Vec<(String, String)>) {
		self.calls.lock().unwrap().push((command.to_string(), query));
	}

	fn calls(&self) -> Vec<(String, Vec<(String, String)>)> {
		self.calls.lock().unwrap().clone()
	}
}

fn args(query: &[(String, String)]) -> Vec<String> {
	query
		.iter()
		.filter(|(k, _)| k == "arg")
		.map(|(_, v)| v.clone())
		.collect()
}

fn option<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
	query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

async fn status(State(node): State<Node>, Query(q): Query<Vec<(String, String)>>) -> impl IntoResponse {
	node.record("status", q.clone());
	match args(&q).first().map(String::as_str) {
		Some("missing") => (
			StatusCode::INTERNAL_SERVER_ERROR,
			r#"{"Message":"session missing not found","Code":0,"Type":"error"}"#,
		),
		_ => (StatusCode::OK, r#"{"Status":"payChannelSignReady","Message":""}"#),
	}
}

async fn upload(State(node): State<Node>, Query(q): Query<Vec<(String, String)>>) -> &'static str {
	node.record("upload", q);
	r#"{"ID":"sess-42"}"#
}

async fn unsigned(State(node): State<Node>, Query(q): Query<Vec<(String, String)>>) -> &'static str {
	node.record("getunsigned", q);
	r#"{"Opcode":"paychannel","Unsigned":"cGF5","Price":900}"#
}

async fn batch(State(node): State<Node>, Query(q): Query<Vec<(String, String)>>) -> &'static str {
	node.record("getcontractbatch", q);
	r#"{"Contracts":[{"Key":"escrow-1","Contract":"AQID"},{"Key":"escrow-2","Contract":"BAUG"}]}"#
}

async fn sign(State(node): State<Node>, Query(q): Query<Vec<(String, String)>>) -> &'static str {
	node.record("sign", q);
	""
}

async fn sign_batch(State(node): State<Node>, Query(q): Query<Vec<(String, String)>>) -> &'static str {
	node.record("signbatch", q);
	""
}

async fn add(State(node): State<Node>, Query(q): Query<Vec<(String, String)>>) -> &'static str {
	node.record("add", q);
	"{\"Name\":\"\",\"Bytes\":15}\n{\"Name\":\"\",\"Hash\":\"QmContent\"}\n"
}

async fn add_empty(State(node): State<Node>, Query(q): Query<Vec<(String, String)>>) -> &'static str {
	node.record("add", q);
	""
}

async fn spawn_node(node: Node, add_returns_nothing: bool) -> SocketAddr {
	let add_route = if add_returns_nothing {
		post(add_empty)
	} else {
		post(add)
	};
	let app = Router::new()
		.route("/api/v1/storage/upload", post(upload))
		.route("/api/v1/storage/upload/status", post(status))
		.route("/api/v1/storage/upload/getunsigned", post(unsigned))
		.route("/api/v1/storage/upload/getcontractbatch", post(batch))
		.route("/api/v1/storage/upload/sign", post(sign))
		.route("/api/v1/storage/upload/signbatch", post(sign_batch))
		.route("/api/v1/add", add_route)
		.with_state(node);

	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});
	addr
}

#[tokio::test]
async fn status_is_parsed_into_stage() {
	let node = Node::default();
	let addr = spawn_node(node.clone(), false).await;
	let shell = Shell::new(&format!("http://{addr}")).unwrap();

	let status = shell
		.storage_upload_status(&SessionId::new("sess-42"))
		.await
		.unwrap();
	assert_eq!(status.status, Stage::PayChannelSignReady);

	let calls = node.calls();
	assert_eq!(calls[0].0, "status");
	assert_eq!(args(&calls[0].1), vec!["sess-42"]);
	assert_eq!(option(&calls[0].1, "encoding"), Some("json"));
}

#[tokio::test]
async fn node_error_envelope_is_remote_error() {
	let addr = spawn_node(Node::default(), false).await;
	let shell = Shell::new(&format!("http://{addr}")).unwrap();

	let err = shell
		.storage_upload_status(&SessionId::new("missing"))
		.await
		.unwrap_err();
	assert_eq!(err.remote_message(), Some("session missing not found"));
	assert!(!err.is_transient());
}

#[tokio::test]
async fn offline_upload_returns_session() {
	let node = Node::default();
	let addr = spawn_node(node.clone(), false).await;
	let shell = Shell::new(&format!("http://{addr}")).unwrap();

	let session = shell
		.storage_upload(&ContentId::new("QmContent"), &UploadOptions::offline().copies(3))
		.await
		.unwrap();
	assert_eq!(session, SessionId::new("sess-42"));

	let calls = node.calls();
	assert_eq!(args(&calls[0].1), vec!["QmContent"]);
	assert_eq!(option(&calls[0].1, "offline-sign-mode"), Some("true"));
	assert_eq!(option(&calls[0].1, "copies"), Some("3"));
	assert_eq!(option(&calls[0].1, "storage-length"), None);
}

#[tokio::test]
async fn unsigned_and_signed_payload_round_trip_through_node() {
	let node = Node::default();
	let addr = spawn_node(node.clone(), false).await;
	let shell = Shell::new(&format!("http://{addr}")).unwrap();
	let session = SessionId::new("sess-42");
	let hash = ContentId::new("QmContent");

	let payload = shell
		.storage_upload_get_unsigned(&session, &hash, &Stage::PayChannelSignReady)
		.await
		.unwrap();
	assert_eq!(payload.opcode, Opcode::PayChannel);
	assert_eq!(payload.price, 900);
	assert_eq!(payload.unsigned_bytes().unwrap(), b"pay");

	let signed = SignedPayload::new(Opcode::PayChannel, b"sig").with_price(payload.price);
	shell
		.storage_upload_sign(&session, &hash, &signed, &Stage::PayChannelSignReady)
		.await
		.unwrap();

	let calls = node.calls();
	assert_eq!(
		args(&calls[0].1),
		vec!["sess-42", "QmContent", "payChannelSignReady"]
	);
	let sign_args = args(&calls[1].1);
	assert_eq!(sign_args.len(), 4);
	assert_eq!(sign_args[0], "sess-42");
	assert_eq!(sign_args[3], "payChannelSignReady");
	let submitted: SignedPayload = serde_json::from_str(&sign_args[2]).unwrap();
	assert_eq!(submitted, signed);
}

#[tokio::test]
async fn contract_batch_and_signed_batch() {
	let node = Node::default();
	let addr = spawn_node(node.clone(), false).await;
	let shell = Shell::new(&format!("http://{addr}")).unwrap();
	let session = SessionId::new("sess-42");
	let hash = ContentId::new("QmContent");

	let batch = shell
		.storage_upload_get_contract_batch(&session, &hash, &Stage::InitSignReadyForEscrow)
		.await
		.unwrap();
	assert_eq!(batch.len(), 2);
	assert_eq!(batch.contracts[1].key, "escrow-2");

	let mut signed = SignedContracts::default();
	for item in &batch.contracts {
		signed.push(item.key.clone(), b"sig");
	}
	shell
		.storage_upload_sign_batch(&session, &hash, &signed, &Stage::InitSignReadyForEscrow)
		.await
		.unwrap();

	let calls = node.calls();
	let submit = args(&calls[1].1);
	assert_eq!(&submit[..3], &["sess-42", "QmContent", "initSignReadyForEscrow"]);
	let decoded: SignedContracts = serde_json::from_str(&submit[3]).unwrap();
	assert_eq!(decoded, signed);
}

#[tokio::test]
async fn add_takes_the_final_hash() {
	let node = Node::default();
	let addr = spawn_node(node.clone(), false).await;
	let shell = Shell::new(&format!("http://{addr}")).unwrap();

	let options = AddOptions::new().chunker("reed-solomon-1-1-256000").progress(true);
	let hash = shell.add(b"random content!".to_vec(), &options).await.unwrap();
	assert_eq!(hash, ContentId::new("QmContent"));

	let calls = node.calls();
	assert_eq!(option(&calls[0].1, "chunker"), Some("reed-solomon-1-1-256000"));
	assert_eq!(option(&calls[0].1, "progress"), Some("true"));
}

#[tokio::test]
async fn add_dir_sends_recursive_tree() {
	let node = Node::default();
	let addr = spawn_node(node.clone(), false).await;
	let shell = Shell::new(&format!("http://{addr}")).unwrap();

	let tmp = tempfile::tempdir().unwrap();
	let root = tmp.path().join("bundle");
	std::fs::create_dir(&root).unwrap();
	std::fs::write(root.join("a.txt"), b"a").unwrap();

	let hash = shell.add_serial_file_dir(&root, true).await.unwrap();
	assert_eq!(hash, ContentId::new("QmContent"));

	let calls = node.calls();
	assert_eq!(option(&calls[0].1, "recursive"), Some("true"));
	assert_eq!(option(&calls[0].1, "chunker"), Some("reed-solomon"));
}

#[tokio::test]
async fn add_dir_rejects_files() {
	let shell = Shell::new("http://127.0.0.1:9").unwrap();
	let tmp = tempfile::tempdir().unwrap();
	let file = tmp.path().join("plain.txt");
	std::fs::write(&file, b"x").unwrap();

	let err = shell.add_dir(&file).await.unwrap_err();
	assert!(matches!(err, Error::InvalidArgument(_)), "got: {err:?}");
}

#[tokio::test]
async fn empty_add_stream_is_no_results() {
	let addr = spawn_node(Node::default(), true).await;
	let shell = Shell::new(&format!("http://{addr}")).unwrap();

	let err = shell.add_no_pin(b"x".to_vec()).await.unwrap_err();
	assert!(matches!(err, Error::NoResults), "got: {err:?}");
}

#[tokio::test]
async fn unreachable_node_is_transient() {
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	drop(listener);

	let shell = Shell::new(&format!("http://{addr}")).unwrap();
	let err = shell
		.storage_upload_status(&SessionId::new("sess"))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Http(_)), "got: {err:?}");
	assert!(err.is_transient());
}

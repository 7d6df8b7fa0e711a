//! Command transport for the node HTTP API.
//!
//! Every command is a `POST` to `{api}/api/v1/{command}`. Positional
//! arguments are repeated `arg` query parameters, options are plain query
//! parameters, and file content travels as a multipart body.
//!
//! # Message Flow
//!
//! 1. Caller builds a [`RequestBuilder`] with [`Shell::request`]
//! 2. Arguments, options and an optional body are attached
//! 3. [`RequestBuilder::send`] posts the command and checks the status
//! 4. Failures are decoded from the node's error envelope
//! 5. [`RequestBuilder::exec`] or [`RequestBuilder::exec_stream`] decode the body

use offsign_protocol::ErrorEnvelope;
use reqwest::multipart::Form;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};

/// Address of a node running on the local machine.
pub const DEFAULT_API_URL: &str = "http://localhost:5001";

const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Client handle for one node.
#[derive(Debug, Clone)]
pub struct Shell {
	url: Url,
	client: reqwest::Client,
}

impl Shell {
	/// Creates a shell for the node at `api`.
	///
	/// Addresses without a scheme (`localhost:5001`) are treated as `http://`.
	pub fn new(api: &str) -> Result<Self> {
		Self::with_client(api, reqwest::Client::new())
	}

	/// Creates a shell that sends through a preconfigured client.
	pub fn with_client(api: &str, client: reqwest::Client) -> Result<Self> {
		let url = parse_api_url(api)?;
		Ok(Self { url, client })
	}

	/// Returns the base API address.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Starts building a command request.
	pub fn request(&self, command: &str) -> RequestBuilder<'_> {
		RequestBuilder {
			shell: self,
			command: command.trim_matches('/').to_string(),
			args: Vec::new(),
			options: Vec::new(),
			body: None,
		}
	}
}

fn parse_api_url(api: &str) -> Result<Url> {
	let candidate = if api.contains("://") {
		api.to_string()
	} else {
		format!("http://{api}")
	};

	let url = Url::parse(&candidate).map_err(|e| Error::InvalidUrl {
		url: api.to_string(),
		reason: e.to_string(),
	})?;

	if url.cannot_be_a_base() {
		return Err(Error::InvalidUrl {
			url: api.to_string(),
			reason: "address cannot be used as a base URL".to_string(),
		});
	}

	Ok(url)
}

/// A single command invocation under construction.
pub struct RequestBuilder<'a> {
	shell: &'a Shell,
	command: String,
	args: Vec<String>,
	options: Vec<(String, String)>,
	body: Option<Form>,
}

impl<'a> RequestBuilder<'a> {
	/// Appends one positional argument.
	pub fn argument(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}

	/// Appends positional arguments in order.
	pub fn arguments<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	/// Sets a named option. Later values for the same key are also sent.
	pub fn option(mut self, key: &str, value: impl ToString) -> Self {
		self.options.push((key.to_string(), value.to_string()));
		self
	}

	/// Attaches a multipart body.
	pub fn body(mut self, form: Form) -> Self {
		self.body = Some(form);
		self
	}

	/// Returns the full command URL, including query parameters.
	pub fn url(&self) -> Result<Url> {
		let mut url = self.shell.url.clone();
		{
			let mut segments = url.path_segments_mut().map_err(|_| Error::InvalidUrl {
				url: self.shell.url.to_string(),
				reason: "address cannot be used as a base URL".to_string(),
			})?;
			segments.pop_if_empty();
			segments.extend(API_PREFIX);
			segments.extend(self.command.split('/').filter(|s| !s.is_empty()));
		}
		{
			let mut query = url.query_pairs_mut();
			for arg in &self.args {
				query.append_pair("arg", arg);
			}
			for (key, value) in &self.options {
				query.append_pair(key, value);
			}
			query.append_pair("encoding", "json");
			query.append_pair("stream-channels", "true");
		}
		Ok(url)
	}

	/// Sends the command and returns the successful response.
	///
	/// Non-success statuses are turned into [`Error::Remote`] when the body is
	/// an error envelope, and [`Error::Status`] otherwise.
	pub async fn send(self) -> Result<reqwest::Response> {
		let url = self.url()?;
		tracing::debug!(
			target = "offsign.http",
			command = %self.command,
			args = self.args.len(),
			"sending command"
		);

		let mut request = self.shell.client.post(url);
		if let Some(form) = self.body {
			request = request.multipart(form);
		}

		let response = request.send().await?;
		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();
		tracing::debug!(
			target = "offsign.http",
			command = %self.command,
			status = status.as_u16(),
			"command failed"
		);
		Err(error_from_body(status.as_u16(), body))
	}

	/// Sends the command and decodes a single JSON object.
	pub async fn exec<T: DeserializeOwned>(self) -> Result<T> {
		let bytes = self.send().await?.bytes().await?;
		serde_json::from_slice(&bytes).map_err(Into::into)
	}

	/// Sends the command and discards the response body.
	pub async fn exec_unit(self) -> Result<()> {
		let _ = self.send().await?.bytes().await?;
		Ok(())
	}

	/// Sends the command and decodes a stream of concatenated JSON objects.
	pub async fn exec_stream<T: DeserializeOwned>(self) -> Result<Vec<T>> {
		let bytes = self.send().await?.bytes().await?;
		decode_stream(&bytes)
	}
}

/// Decodes whitespace-separated JSON objects, as produced by streaming commands.
pub fn decode_stream<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
	serde_json::Deserializer::from_slice(bytes)
		.into_iter::<T>()
		.map(|item| item.map_err(Error::from))
		.collect()
}

fn error_from_body(status: u16, body: String) -> Error {
	match serde_json::from_str::<ErrorEnvelope>(&body) {
		Ok(envelope) => Error::Remote {
			message: envelope.message,
			code: envelope.code,
		},
		Err(_) => Error::Status { status, body },
	}
}

//! Transport primitives for templated step requests.
//!
//! The module exposes [`FlowTransport`] alongside the wire-level value types so
//! downstream crates can integrate custom HTTP clients. The trait is the crate's
//! only dependency on an HTTP stack: the executor hands an already-encoded
//! [`WireRequest`] to the transport and receives back the raw status line and
//! body text, leaving response decoding to the executor.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};

/// Fixed per-request timeout applied by every transport implementation.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Boxed future returned by [`FlowTransport`] implementations.
pub type TransportFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, TransportError>> + 'a + Send>>;

/// HTTP methods the conductor is willing to dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireMethod {
	/// `GET` request; any declared body is ignored.
	Get,
	/// `POST` request with an encoded payload.
	Post,
}
impl WireMethod {
	/// Returns the canonical verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			WireMethod::Get => "GET",
			WireMethod::Post => "POST",
		}
	}
}
impl Display for WireMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Basic-auth credential pair carried by a parsed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicAuth {
	/// Username component.
	pub username: String,
	/// Password component.
	pub password: String,
}

/// Request body after the executor's encoding decision.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
	/// No body.
	None,
	/// Percent-encoded form pairs (`application/x-www-form-urlencoded`).
	Form(Vec<(String, String)>),
	/// JSON document.
	Json(Value),
	/// Verbatim text body.
	Raw(String),
}

/// Fully resolved and encoded request handed to the transport.
#[derive(Clone, Debug, PartialEq)]
pub struct WireRequest {
	/// HTTP method.
	pub method: WireMethod,
	/// Absolute request URL.
	pub url: String,
	/// Header name/value pairs.
	pub headers: HashMap<String, String>,
	/// Encoded body.
	pub payload: Payload,
	/// Optional basic-auth credentials.
	pub auth: Option<BasicAuth>,
}
impl WireRequest {
	/// Builds a bare `GET` request for the given URL.
	pub fn get(url: impl Into<String>) -> Self {
		Self {
			method: WireMethod::Get,
			url: url.into(),
			headers: HashMap::new(),
			payload: Payload::None,
			auth: None,
		}
	}
}

/// Raw transport response before executor-side normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireReply {
	/// HTTP status code.
	pub status: u16,
	/// Status reason phrase.
	pub reason: String,
	/// Raw body text.
	pub body: String,
}

/// Abstraction over HTTP transports capable of executing templated step requests.
///
/// Implementations must be `Send + Sync` so a conductor can be shared across
/// tasks; the returned futures must be `Send` for the same reason. Timeouts and
/// connection failures surface as [`TransportError`], which the executor turns
/// into a failed step outcome rather than a crash.
pub trait FlowTransport
where
	Self: Send + Sync,
{
	/// Dispatches one request and resolves with the raw reply.
	fn send(&self, request: WireRequest) -> TransportFuture<'_, WireReply>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token-exchange steps should not follow redirects blindly, but the templates in
/// the shipped flows only target endpoints that answer directly, so the default
/// client configuration is sufficient. Supply a custom [`ReqwestClient`] through
/// [`ReqwestTransport::with_client`] when TLS or proxy settings need adjusting.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl FlowTransport for ReqwestTransport {
	fn send(&self, request: WireRequest) -> TransportFuture<'_, WireReply> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = match request.method {
				WireMethod::Get => client.get(&request.url),
				WireMethod::Post => client.post(&request.url),
			}
			.timeout(REQUEST_TIMEOUT);

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}
			if let Some(auth) = &request.auth {
				builder = builder.basic_auth(&auth.username, Some(&auth.password));
			}

			builder = match request.payload {
				Payload::None => builder,
				Payload::Form(pairs) => builder.form(&pairs),
				Payload::Json(value) => builder.json(&value),
				Payload::Raw(text) => builder.body(text),
			};

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status();
			let reason = status.canonical_reason().unwrap_or("Unknown").to_owned();
			let body = response.text().await.map_err(TransportError::from)?;

			Ok(WireReply { status: status.as_u16(), reason, body })
		})
	}
}

//! Transport primitives the gateway delegates every network exchange to.
//!
//! The module exposes [`Transport`] alongside the [`TransportRequest`] and
//! [`TransportResponse`] descriptors so downstream crates can plug in custom HTTP stacks (or
//! in-process fakes) without touching the gateway's refresh logic. The default
//! [`ReqwestTransport`] lives behind the `reqwest` feature.

// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing one request.
///
/// The trait is the gateway's only dependency on a network stack. Implementations must be
/// `Send + Sync + 'static` so a single transport can be shared across gateway clones, and the
/// returned future must be `Send` so gateway futures can hop executors.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Performs the request, resolving to the remote's status and payload.
	///
	/// Non-success statuses are not errors at this layer; return them as a
	/// [`TransportResponse`] and let the gateway classify them.
	fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// HTTP verbs supported by the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical upper-case verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";
/// Header describing the request body encoding.
pub const CONTENT_TYPE: &str = "Content-Type";
/// Header advertising the accepted response encoding.
pub const ACCEPT: &str = "Accept";
/// Media type used for every body the gateway produces or expects.
pub const APPLICATION_JSON: &str = "application/json";

/// Fully-built request descriptor handed to a [`Transport`].
#[derive(Clone)]
pub struct TransportRequest {
	/// HTTP verb.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Header map; names keep the casing the gateway wrote them with.
	pub headers: BTreeMap<String, String>,
	/// Serialized body, if any.
	pub body: Option<Vec<u8>>,
}
impl TransportRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: BTreeMap::new(), body: None }
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Attaches a JSON body and the matching content type.
	pub fn with_json_body(mut self, body: Vec<u8>) -> Self {
		self.headers.insert(CONTENT_TYPE.into(), APPLICATION_JSON.into());
		self.body = Some(body);

		self
	}

	/// Looks up a header value, ignoring ASCII case.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Returns the bearer token carried by the request, if any.
	pub fn bearer_token(&self) -> Option<&str> {
		self.header(AUTHORIZATION)?.strip_prefix("Bearer ")
	}
}
impl Debug for TransportRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| {
				let value = if name.eq_ignore_ascii_case(AUTHORIZATION) {
					"<redacted>"
				} else {
					value.as_str()
				};

				(name.as_str(), value)
			})
			.collect::<BTreeMap<_, _>>();

		f.debug_struct("TransportRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &headers)
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.finish()
	}
}

/// Status, headers, and raw payload returned by a [`Transport`].
#[derive(Clone, Debug, Default)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: BTreeMap<String, String>,
	/// Raw response payload.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Creates a response with the given status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into() }
	}

	/// Creates a response whose body is the serialized JSON value.
	pub fn json(status: u16, value: &Value) -> Self {
		Self::new(status, value.to_string()).with_header(CONTENT_TYPE, APPLICATION_JSON)
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Renders the body for error reporting.
	pub fn body_lossy(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	fn method(method: Method) -> reqwest::Method {
		match method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		}
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(execute_reqwest(self.0.clone(), request))
	}
}

#[cfg(feature = "reqwest")]
async fn execute_reqwest(
	client: ReqwestClient,
	request: TransportRequest,
) -> Result<TransportResponse, TransportError> {
	let TransportRequest { method, url, headers, body } = request;
	let mut builder = client.request(ReqwestTransport::method(method), url);

	for (name, value) in &headers {
		builder = builder.header(name.as_str(), value.as_str());
	}
	if let Some(body) = body {
		builder = builder.body(body);
	}

	let response = builder.send().await?;
	let status = response.status().as_u16();
	let headers = response
		.headers()
		.iter()
		.filter_map(|(name, value)| {
			value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
		})
		.collect();
	let body = response.bytes().await?.to_vec();

	Ok(TransportResponse { status, headers, body })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn header_lookup_ignores_case_and_debug_redacts_bearer() {
		let request = TransportRequest::new(
			Method::Post,
			Url::parse("https://api.example.com/data").expect("Failed to parse test URL."),
		)
		.with_header(AUTHORIZATION, "Bearer top-secret")
		.with_json_body(b"{}".to_vec());

		assert_eq!(request.header("authorization"), Some("Bearer top-secret"));
		assert_eq!(request.bearer_token(), Some("top-secret"));
		assert_eq!(request.header("content-type"), Some(APPLICATION_JSON));

		let rendered = format!("{request:?}");

		assert!(!rendered.contains("top-secret"));
		assert!(rendered.contains("<redacted>"));
	}

	#[test]
	fn success_covers_the_2xx_range() {
		assert!(TransportResponse::new(200, "").is_success());
		assert!(TransportResponse::new(204, "").is_success());
		assert!(!TransportResponse::new(302, "").is_success());
		assert!(!TransportResponse::new(401, "nope").is_success());
		assert_eq!(TransportResponse::new(500, "boom").body_lossy(), "boom");
	}
}

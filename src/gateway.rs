//! Token-aware request gateway that refreshes its credential before delegating to a transport.

pub mod refresh;

pub use refresh::*;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret},
	config::GatewayConfig,
	error::{ConfigError, RefreshError},
	http::{
		ACCEPT, APPLICATION_JSON, AUTHORIZATION, Method, Transport, TransportRequest,
		TransportResponse,
	},
	obs::{self, GatewayOp, OpOutcome, OpSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport.
pub type ReqwestGateway = Gateway<ReqwestTransport>;

/// Mediates outbound requests for a single credential.
///
/// The gateway owns the credential, the refresh singleflight guard, and refresh metrics. Every
/// delegated request first makes sure the credential is usable, refreshing it through
/// [`GatewayConfig::refresh_endpoint`] when it is missing or expired, and then hands a fully
/// built [`TransportRequest`] to the transport. Clones share all state, so a clone is the same
/// logical gateway rather than a second credential holder.
pub struct Gateway<T>
where
	T: ?Sized + Transport,
{
	/// Transport used for every outbound request, including refreshes.
	pub transport: Arc<T>,
	/// Validated configuration (endpoints, window, default headers).
	pub config: Arc<GatewayConfig>,
	/// Shared metrics recorder for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	state: Arc<Mutex<CredentialState>>,
	refresh_guard: Arc<AsyncMutex<()>>,
}
impl<T> Gateway<T>
where
	T: ?Sized + Transport,
{
	/// Creates a gateway that delegates to the caller-provided transport.
	pub fn with_transport(config: GatewayConfig, transport: impl Into<Arc<T>>) -> Self {
		Self {
			transport: transport.into(),
			config: Arc::new(config),
			refresh_metrics: Default::default(),
			state: Default::default(),
			refresh_guard: Default::default(),
		}
	}

	/// Seeds the gateway with an initial credential.
	pub fn with_credential(self, credential: Credential) -> Self {
		self.replace_credential(credential);

		self
	}

	/// Replaces the held credential, expiring it `expires_in` from now.
	///
	/// Always succeeds; a non-positive `expires_in` installs an already-expired credential.
	pub fn set_credential(
		&self,
		access_token: impl Into<String>,
		refresh_token: impl Into<String>,
		expires_in: Duration,
	) {
		let credential = Credential::issued_at(
			OffsetDateTime::now_utc(),
			access_token,
			Some(refresh_token.into()),
			expires_in,
		);

		self.replace_credential(credential);
	}

	/// Installs a prebuilt credential.
	pub fn replace_credential(&self, credential: Credential) {
		self.state.lock().credential = Some(credential);
	}

	/// Drops the held credential; the next request triggers a refresh.
	pub fn clear_credential(&self) {
		self.state.lock().credential = None;
	}

	/// Returns a snapshot of the held credential.
	pub fn credential(&self) -> Option<Credential> {
		self.state.lock().credential.clone()
	}

	/// Sends a JSON request and returns the parsed payload.
	///
	/// Relative `url`s resolve against [`GatewayConfig::base_url`]. An empty success body yields
	/// [`Value::Null`].
	pub async fn request(&self, method: Method, url: &str, body: Option<Value>) -> Result<Value> {
		self.request_as(method, url, body).await
	}

	/// Sends a JSON request and decodes the payload into `R`.
	pub async fn request_as<R>(&self, method: Method, url: &str, body: Option<Value>) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.send_json(method, url, body.as_ref()).await
	}

	/// Issues a `GET`.
	pub async fn get(&self, url: &str) -> Result<Value> {
		self.send_json::<(), _>(Method::Get, url, None).await
	}

	/// Issues a `DELETE`.
	pub async fn delete(&self, url: &str) -> Result<Value> {
		self.send_json::<(), _>(Method::Delete, url, None).await
	}

	/// Issues a `POST` with a JSON body.
	pub async fn post<B>(&self, url: &str, body: &B) -> Result<Value>
	where
		B: ?Sized + Serialize,
	{
		self.send_json(Method::Post, url, Some(body)).await
	}

	/// Issues a `PUT` with a JSON body.
	pub async fn put<B>(&self, url: &str, body: &B) -> Result<Value>
	where
		B: ?Sized + Serialize,
	{
		self.send_json(Method::Put, url, Some(body)).await
	}

	/// Issues a `PATCH` with a JSON body.
	pub async fn patch<B>(&self, url: &str, body: &B) -> Result<Value>
	where
		B: ?Sized + Serialize,
	{
		self.send_json(Method::Patch, url, Some(body)).await
	}

	async fn send_json<B, R>(&self, method: Method, url: &str, body: Option<&B>) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		let body = body
			.map(serde_json::to_vec)
			.transpose()
			.map_err(|e| Error::from(ConfigError::SerializeBody(e)))?;
		let response = self.execute(method, url, body).await?;

		decode_payload(&response)
	}

	async fn execute(
		&self,
		method: Method,
		target: &str,
		body: Option<Vec<u8>>,
	) -> Result<TransportResponse> {
		const OP: GatewayOp = GatewayOp::Request;

		let span = OpSpan::new(OP, "execute");

		obs::record_outcome(OP, OpOutcome::Attempt);

		let result: Result<TransportResponse> = span
			.instrument(async move {
				let url = self.config.resolve(target)?;
				let access_token = self.ensure_access_token().await?;
				let request = self.build_request(method, url, access_token.as_ref(), body);
				let response = self.transport.send(request).await?;

				if !response.is_success() {
					return Err(Error::Request {
						status: response.status,
						body: response.body_lossy(),
					});
				}

				Ok(response)
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(OP, OpOutcome::Success),
			Err(e) => obs::record_failure(OP, e),
		}

		result
	}

	fn build_request(
		&self,
		method: Method,
		url: Url,
		access_token: Option<&TokenSecret>,
		body: Option<Vec<u8>>,
	) -> TransportRequest {
		let mut request = TransportRequest::new(method, url);

		for (name, value) in &self.config.default_headers {
			request = request.with_header(name.as_str(), value.as_str());
		}
		if request.header(ACCEPT).is_none() {
			request = request.with_header(ACCEPT, APPLICATION_JSON);
		}
		if let Some(token) = access_token {
			request = request.with_header(AUTHORIZATION, token.bearer());
		}
		if let Some(body) = body {
			request = request.with_json_body(body);
		}

		request
	}
}
#[cfg(feature = "reqwest")]
impl Gateway<ReqwestTransport> {
	/// Creates a new gateway backed by a default reqwest client.
	pub fn new(config: GatewayConfig) -> Self {
		Self::with_transport(config, ReqwestTransport::default())
	}
}
impl<T> Clone for Gateway<T>
where
	T: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			config: Arc::clone(&self.config),
			refresh_metrics: Arc::clone(&self.refresh_metrics),
			state: Arc::clone(&self.state),
			refresh_guard: Arc::clone(&self.refresh_guard),
		}
	}
}
impl<T> Debug for Gateway<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("config", &self.config)
			.field("credential", &self.state.lock().credential)
			.finish()
	}
}

/// Credential plus the bookkeeping refresh waiters use to adopt a finished refresh.
#[derive(Debug, Default)]
struct CredentialState {
	credential: Option<Credential>,
	/// Bumped whenever a refresh completes, successfully or not.
	refresh_epoch: u64,
	last_refresh_failure: Option<Arc<RefreshError>>,
}

fn decode_payload<R>(response: &TransportResponse) -> Result<R>
where
	R: DeserializeOwned,
{
	let body: &[u8] =
		if response.body.iter().all(u8::is_ascii_whitespace) { b"null" } else { &response.body };
	let de = &mut serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(de)
		.map_err(|source| Error::Decode { source, status: response.status })
}

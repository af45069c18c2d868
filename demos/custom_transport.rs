//! Demonstrates plugging an in-process transport into the gateway.
//!
//! 1. Implement [`Transport`] so it answers both the refresh endpoint and ordinary API calls.
//! 2. Seed the gateway with a credential that only carries a refresh token.
//! 3. Issue a few concurrent requests and watch a single refresh serve all of them.
//! 4. Swap in a failing transport to see how each error class surfaces.

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::atomic::{AtomicU64, Ordering},
};
// crates.io
use color_eyre::Result;
use serde_json::json;
use url::Url;
// self
use token_gateway::{
	auth::Credential,
	config::GatewayConfig,
	error::{Error, TransportError},
	gateway::Gateway,
	http::{Transport, TransportFuture, TransportRequest, TransportResponse},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let base = Url::parse("https://api.example.com/")?;
	let config = GatewayConfig::builder(base.join("/auth/refresh")?).base_url(base).build()?;
	let gateway = Gateway::<MockTransport>::with_transport(config.clone(), MockTransport::default())
		.with_credential(Credential::refresh_only("demo-refresh"));
	let invoice = json!({ "amount": 42 });
	let (profile, orders, invoices) = tokio::join!(
		gateway.get("/profile"),
		gateway.get("/orders"),
		gateway.post("/invoices", &invoice),
	);

	println!("Profile: {}.", profile?);
	println!("Orders: {}.", orders?);
	println!("Invoice: {}.", invoices?);
	println!(
		"Refresh endpoint was called {} time(s) for three concurrent requests.",
		gateway.transport.refreshes.load(Ordering::Relaxed)
	);

	let failing = Gateway::<MockTransport>::with_transport(config, MockTransport::offline())
		.with_credential(Credential::refresh_only("demo-refresh"));

	match failing.get("/profile").await {
		Ok(_) => println!("Offline transport unexpectedly succeeded."),
		Err(Error::CredentialRefresh(e)) => println!("Refresh failed before the request: {e}."),
		Err(e) => println!("Request failed: {e}."),
	}

	Ok(())
}

#[derive(Clone, Debug)]
struct DnsFailure {
	host: String,
}
impl Display for DnsFailure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "DNS lookup failed for {}", self.host)
	}
}
impl StdError for DnsFailure {}

#[derive(Default)]
struct MockTransport {
	offline: bool,
	refreshes: AtomicU64,
}
impl MockTransport {
	fn offline() -> Self {
		Self { offline: true, ..Default::default() }
	}

	fn answer(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
		if self.offline {
			let host = request.url.host_str().unwrap_or_default().to_owned();

			return Err(TransportError::network(DnsFailure { host }));
		}
		if request.url.path() == "/auth/refresh" {
			let issued = self.refreshes.fetch_add(1, Ordering::Relaxed) + 1;

			return Ok(TransportResponse::json(
				200,
				&json!({
					"accessToken": format!("demo-access-{issued}"),
					"refreshToken": format!("demo-refresh-{issued}"),
					"expiresIn": 900
				}),
			));
		}

		Ok(TransportResponse::json(
			200,
			&json!({
				"method": request.method.as_str(),
				"path": request.url.path(),
				"authorized_as": request.bearer_token(),
			}),
		))
	}
}
impl Transport for MockTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		let outcome = self.answer(&request);

		Box::pin(async move {
			// Yield once so concurrent callers actually overlap with the refresh.
			tokio::task::yield_now().await;

			outcome
		})
	}
}

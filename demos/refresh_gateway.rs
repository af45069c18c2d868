//! Demonstrates the reqwest-backed gateway refreshing an expired credential against a mock
//! server before issuing the actual request.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use token_gateway::{auth::Credential, config::GatewayConfig, gateway::Gateway};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").json_body(json!({ "refreshToken": "r1" }));
			then.status(200).json_body(json!({
				"accessToken": "a2",
				"refreshToken": "r2",
				"expiresIn": 1800
			}));
		})
		.await;
	let data_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/data").header("authorization", "Bearer a2");
			then.status(200).json_body(json!({ "message": "hello from the API" }));
		})
		.await;
	let base = Url::parse(&server.base_url())?;
	let config = GatewayConfig::builder(base.join("/auth/refresh")?)
		.base_url(base)
		.preemptive_window(Duration::seconds(30))
		.build()?;
	let expired = Credential::builder()
		.access_token("a1")
		.refresh_token("r1")
		.expires_at(OffsetDateTime::now_utc() - Duration::minutes(5))
		.build()?;
	let gateway = Gateway::new(config).with_credential(expired);
	let payload = gateway.get("/data").await?;

	println!("Payload: {payload}.");
	println!("Credential after refresh: {:?}.", gateway.credential());

	refresh_mock.assert_async().await;
	data_mock.assert_async().await;

	Ok(())
}

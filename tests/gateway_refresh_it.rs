#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use token_gateway::{
	auth::{Credential, TokenSecret},
	config::GatewayConfig,
	error::{Error, RefreshError},
	gateway::ReqwestGateway,
	http::{Method, ReqwestTransport},
	reqwest::Client,
};

fn build_reqwest_test_gateway(base: &str) -> ReqwestGateway {
	let base = Url::parse(base).expect("Mock server base URL should parse.");
	let refresh = base.join("/auth/refresh").expect("Refresh endpoint should join onto base.");
	let config = GatewayConfig::builder(refresh)
		.base_url(base)
		.build()
		.expect("Gateway config should build for the mock server.");
	let client = Client::builder().build().expect("Reqwest client should build for tests.");

	ReqwestGateway::with_transport(config, ReqwestTransport::with_client(client))
}

fn expired_credential(access: &str, refresh: &str) -> Credential {
	Credential::builder()
		.access_token(access)
		.refresh_token(refresh)
		.expires_at(OffsetDateTime::now_utc() - Duration::minutes(1))
		.build()
		.expect("Expired credential fixture should build successfully.")
}

fn exposed(secret: Option<&TokenSecret>) -> Option<&str> {
	secret.map(TokenSecret::expose)
}

#[tokio::test]
async fn expired_credential_refreshes_before_delegating() {
	let server = MockServer::start_async().await;
	let gateway = build_reqwest_test_gateway(&server.base_url())
		.with_credential(expired_credential("a1", "r1"));
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh")
				.header("content-type", "application/json")
				.json_body(json!({ "refreshToken": "r1" }));
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
			then.status(200).json_body(json!({ "items": [1, 2, 3] }));
		})
		.await;
	let payload = gateway.get("/data").await.expect("Request after refresh should succeed.");

	refresh_mock.assert_async().await;
	data_mock.assert_async().await;

	assert_eq!(payload, json!({ "items": [1, 2, 3] }));

	let credential = gateway.credential().expect("Refreshed credential should be installed.");

	assert_eq!(exposed(credential.access_token.as_ref()), Some("a2"));
	assert_eq!(exposed(credential.refresh_token.as_ref()), Some("r2"));
	assert!(!credential.is_expired());
	assert_eq!(gateway.refresh_metrics.attempts(), 1);
	assert_eq!(gateway.refresh_metrics.successes(), 1);
}

#[tokio::test]
async fn fresh_credential_skips_refresh() {
	let server = MockServer::start_async().await;
	let gateway = build_reqwest_test_gateway(&server.base_url());

	gateway.set_credential("a", "r", Duration::seconds(3600));

	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(500);
		})
		.await;
	let data_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/data").header("authorization", "Bearer a");
			then.status(200).json_body(json!({ "ok": true }));
		})
		.await;
	let payload = gateway.get("/data").await.expect("Request with a fresh token should succeed.");

	assert_eq!(payload, json!({ "ok": true }));

	data_mock.assert_async().await;
	refresh_mock.assert_calls_async(0).await;

	assert_eq!(gateway.refresh_metrics.attempts(), 0);
}

#[tokio::test]
async fn refresh_failure_blocks_request_and_keeps_credential() {
	let server = MockServer::start_async().await;
	let seeded = expired_credential("a1", "r1");
	let gateway = build_reqwest_test_gateway(&server.base_url()).with_credential(seeded.clone());
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(401).json_body(json!({ "error": "invalid_grant" }));
		})
		.await;
	let data_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/data");
			then.status(200).json_body(json!({ "ok": true }));
		})
		.await;
	let err = gateway.get("/data").await.expect_err("Refresh failures must surface to the caller.");

	match &err {
		Error::CredentialRefresh(inner) =>
			assert!(matches!(inner.as_ref(), RefreshError::Rejected { status: 401 })),
		other => panic!("Unexpected error variant: {other:?}."),
	}

	refresh_mock.assert_async().await;
	data_mock.assert_calls_async(0).await;

	assert_eq!(gateway.credential(), Some(seeded));
	assert_eq!(gateway.refresh_metrics.failures(), 1);
}

#[tokio::test]
async fn bodies_are_sent_as_json_and_failures_carry_status() {
	let server = MockServer::start_async().await;
	let gateway = build_reqwest_test_gateway(&server.base_url());

	gateway.set_credential("a", "r", Duration::hours(1));

	let create_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/items")
				.header("authorization", "Bearer a")
				.header("content-type", "application/json")
				.json_body(json!({ "name": "widget" }));
			then.status(201).json_body(json!({ "id": 7 }));
		})
		.await;
	let missing_mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/items/8");
			then.status(404).body("missing");
		})
		.await;
	let created = gateway
		.post("/items", &json!({ "name": "widget" }))
		.await
		.expect("POST with a JSON body should succeed.");

	assert_eq!(created, json!({ "id": 7 }));

	let err = gateway.delete("/items/8").await.expect_err("404 responses should fail.");

	assert!(matches!(&err, Error::Request { status: 404, body } if body == "missing"));

	create_mock.assert_async().await;
	missing_mock.assert_async().await;
}

#[tokio::test]
async fn refresh_only_credential_bootstraps_on_first_request() {
	let server = MockServer::start_async().await;
	let gateway = build_reqwest_test_gateway(&server.base_url())
		.with_credential(Credential::refresh_only("bootstrap"));
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh")
				.json_body(json!({ "refreshToken": "bootstrap" }));
			then.status(200).json_body(json!({ "accessToken": "a1", "expiresIn": 60 }));
		})
		.await;
	let data_mock = server
		.mock_async(|when, then| {
			when.method(PUT).path("/profile").header("authorization", "Bearer a1");
			then.status(204);
		})
		.await;
	let payload = gateway
		.request(Method::Put, "/profile", Some(json!({ "theme": "dark" })))
		.await
		.expect("Bootstrap request should succeed.");

	assert_eq!(payload, Value::Null);

	refresh_mock.assert_async().await;
	data_mock.assert_async().await;

	let credential = gateway.credential().expect("Bootstrapped credential should be installed.");

	// The endpoint did not rotate the refresh token, so the old one is kept.
	assert_eq!(exposed(credential.refresh_token.as_ref()), Some("bootstrap"));
}

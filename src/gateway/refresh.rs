//! Credential refresh with a singleflight guard so concurrent callers share one rotation.
//!
//! Callers snapshot the credential and the refresh epoch under the state lock. A stale snapshot
//! sends them to the per-gateway guard; whoever acquires it first calls the refresh endpoint,
//! while callers that were already queued see the epoch move and adopt that outcome (success or
//! the shared failure) instead of spending the freshly rotated refresh token a second time.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret},
	error::RefreshError,
	gateway::Gateway,
	http::{ACCEPT, APPLICATION_JSON, Method, Transport, TransportRequest},
	obs::{self, GatewayOp, OpOutcome, OpSpan},
};

/// JSON body posted to the refresh endpoint.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequestBody<'a> {
	refresh_token: Option<&'a str>,
}

/// JSON body returned by the refresh endpoint.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponseBody {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	/// Lifetime in seconds; integral and fractional JSON numbers are both accepted.
	expires_in: f64,
}

impl<T> Gateway<T>
where
	T: ?Sized + Transport,
{
	/// Forces a refresh regardless of the current expiry, still coalesced with concurrent ones.
	pub async fn refresh(&self) -> Result<()> {
		let observed_epoch = self.state.lock().refresh_epoch;
		let _singleflight = self.refresh_guard.lock().await;

		if let Some(outcome) = self.adopt_finished_refresh(observed_epoch) {
			return outcome.map(|_| ());
		}

		self.refresh_credential().await.map(|_| ())
	}

	/// Returns a usable access token, refreshing the credential first when it is stale.
	pub(crate) async fn ensure_access_token(&self) -> Result<Option<TokenSecret>> {
		let observed_epoch = match self.snapshot(OffsetDateTime::now_utc()) {
			Ok(access_token) => return Ok(access_token),
			Err(epoch) => epoch,
		};
		let _singleflight = self.refresh_guard.lock().await;

		if let Some(outcome) = self.adopt_finished_refresh(observed_epoch) {
			return outcome;
		}
		if let Ok(access_token) = self.snapshot(OffsetDateTime::now_utc()) {
			return Ok(access_token);
		}

		self.refresh_credential().await
	}

	/// Returns the fresh access token, or the current refresh epoch when a refresh is needed.
	fn snapshot(&self, now: OffsetDateTime) -> Result<Option<TokenSecret>, u64> {
		let state = self.state.lock();

		match state.credential.as_ref() {
			Some(credential)
				if !credential.needs_refresh_at(now, self.config.preemptive_window) =>
				Ok(credential.access_token.clone()),
			_ => Err(state.refresh_epoch),
		}
	}

	/// Adopts the outcome of a refresh that completed after `observed_epoch` was read.
	fn adopt_finished_refresh(&self, observed_epoch: u64) -> Option<Result<Option<TokenSecret>>> {
		let state = self.state.lock();

		if state.refresh_epoch == observed_epoch {
			return None;
		}

		self.refresh_metrics.record_coalesced();
		obs::record_outcome(GatewayOp::Refresh, OpOutcome::Coalesced);

		let outcome = match state.last_refresh_failure.as_ref() {
			Some(err) => Err(Error::CredentialRefresh(Arc::clone(err))),
			None => Ok(state.credential.as_ref().and_then(|c| c.access_token.clone())),
		};

		Some(outcome)
	}

	/// Calls the refresh endpoint and commits the outcome. Callers must hold the guard.
	async fn refresh_credential(&self) -> Result<Option<TokenSecret>> {
		const OP: GatewayOp = GatewayOp::Refresh;

		let span = OpSpan::new(OP, "refresh_credential");

		obs::record_outcome(OP, OpOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let exchanged = span.instrument(self.exchange_refresh_token()).await;

		match self.commit_refresh(exchanged) {
			Ok(access_token) => {
				self.refresh_metrics.record_success();
				obs::record_outcome(OP, OpOutcome::Success);

				Ok(access_token)
			},
			Err(err) => {
				self.refresh_metrics.record_failure();
				obs::record_failure(OP, err.as_ref());

				Err(Error::CredentialRefresh(err))
			},
		}
	}

	/// Publishes a finished refresh. The previous credential survives a failure untouched.
	fn commit_refresh(
		&self,
		exchanged: Result<Credential, RefreshError>,
	) -> Result<Option<TokenSecret>, Arc<RefreshError>> {
		let mut state = self.state.lock();

		state.refresh_epoch = state.refresh_epoch.wrapping_add(1);

		match exchanged {
			Ok(credential) => {
				let access_token = credential.access_token.clone();

				state.credential = Some(credential);
				state.last_refresh_failure = None;

				Ok(access_token)
			},
			Err(err) => {
				let err = Arc::new(err);

				state.last_refresh_failure = Some(Arc::clone(&err));

				Err(err)
			},
		}
	}

	async fn exchange_refresh_token(&self) -> Result<Credential, RefreshError> {
		let (had_access_token, previous_refresh) = {
			let state = self.state.lock();
			let credential = state.credential.as_ref();

			(
				credential.is_some_and(|c| c.access_token.is_some()),
				credential.and_then(|c| c.refresh_token.clone()),
			)
		};

		obs::trace_refresh_started(had_access_token);

		let body = serde_json::to_vec(&RefreshRequestBody {
			refresh_token: previous_refresh.as_ref().map(TokenSecret::expose),
		})
		.map_err(RefreshError::Encode)?;
		let request = TransportRequest::new(Method::Post, self.config.refresh_endpoint.clone())
			.with_header(ACCEPT, APPLICATION_JSON)
			.with_json_body(body);
		let response = self.transport.send(request).await.map_err(RefreshError::Transport)?;
		let status = response.status;

		if !response.is_success() {
			return Err(RefreshError::Rejected { status });
		}

		let de = &mut serde_json::Deserializer::from_slice(&response.body);
		let payload: RefreshResponseBody = serde_path_to_error::deserialize(de)
			.map_err(|source| RefreshError::MalformedResponse { source, status })?;

		if payload.expires_in.is_nan() || payload.expires_in <= 0. {
			return Err(RefreshError::NonPositiveExpiresIn);
		}

		let expires_at = Duration::checked_seconds_f64(payload.expires_in)
			.and_then(|lifetime| OffsetDateTime::now_utc().checked_add(lifetime))
			.ok_or(RefreshError::ExpiresInOutOfRange)?;

		Ok(Credential {
			access_token: Some(TokenSecret::new(payload.access_token)),
			refresh_token: payload.refresh_token.map(TokenSecret::new).or(previous_refresh),
			expires_at: Some(expires_at),
		})
	}
}

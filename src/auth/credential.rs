//! Credential state held by a gateway, its lifecycle helpers, and builder.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Current lifecycle status for a credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// Access token is present and has not passed its expiry instant.
	Active,
	/// Access token passed its expiry instant.
	Expired,
	/// No access token (or no expiry) is known; the credential must be refreshed before use.
	Unknown,
}

/// Errors produced by [`CredentialBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialBuilderError {
	/// Issued when an access token was provided without an expiry.
	#[error("Expiry must be supplied via expires_at or expires_in when an access token is set.")]
	MissingExpiry,
}

/// Authorization state tracked by a gateway.
///
/// When `access_token` is present, `expires_at` describes when that specific token stops being
/// valid. Construct values through [`Credential::builder`] or [`Credential::refresh_only`] so the
/// invariant holds.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Access token secret; callers must avoid logging it.
	pub access_token: Option<TokenSecret>,
	/// Refresh token secret used to mint the next access token.
	pub refresh_token: Option<TokenSecret>,
	/// Absolute expiry of `access_token`; `None` means unknown.
	pub expires_at: Option<OffsetDateTime>,
}
impl Credential {
	/// Returns a builder for constructing credentials.
	pub fn builder() -> CredentialBuilder {
		CredentialBuilder::default()
	}

	/// Creates a credential that only carries a refresh token.
	///
	/// The first request issued with it triggers a refresh.
	pub fn refresh_only(refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: None,
			refresh_token: Some(TokenSecret::new(refresh_token)),
			expires_at: None,
		}
	}

	/// Creates a credential expiring `expires_in` after `now`.
	pub fn issued_at(
		now: OffsetDateTime,
		access_token: impl Into<String>,
		refresh_token: Option<String>,
		expires_in: Duration,
	) -> Self {
		Self {
			access_token: Some(TokenSecret::new(access_token)),
			refresh_token: refresh_token.map(TokenSecret::new),
			expires_at: Some(expiry_after(now, expires_in)),
		}
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> CredentialStatus {
		match (&self.access_token, self.expires_at) {
			(Some(_), Some(expires_at)) if instant > expires_at => CredentialStatus::Expired,
			(Some(_), Some(_)) => CredentialStatus::Active,
			_ => CredentialStatus::Unknown,
		}
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> CredentialStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` unless the credential is active at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		!matches!(self.status_at(instant), CredentialStatus::Active)
	}

	/// Returns `true` if the credential is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Determines whether the credential should be refreshed before use.
	///
	/// `window` brings the refresh forward; a zero window refreshes only once expired. A window
	/// reaching past the representable clock always asks for a refresh.
	pub fn needs_refresh_at(&self, instant: OffsetDateTime, window: Duration) -> bool {
		if self.is_expired_at(instant) {
			return true;
		}
		if !window.is_positive() {
			return false;
		}

		match self.expires_at {
			Some(expires_at) => instant.checked_add(window).is_none_or(|edge| edge > expires_at),
			None => true,
		}
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`Credential`].
#[derive(Clone, Debug, Default)]
pub struct CredentialBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl CredentialBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the instant relative expiries are measured from (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`Credential`].
	pub fn build(self) -> Result<Credential, CredentialBuilderError> {
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => Some(instant),
			(None, Some(delta)) =>
				Some(expiry_after(self.issued_at.unwrap_or_else(OffsetDateTime::now_utc), delta)),
			(None, None) => None,
		};

		if self.access_token.is_some() && expires_at.is_none() {
			return Err(CredentialBuilderError::MissingExpiry);
		}

		Ok(Credential {
			access_token: self.access_token,
			refresh_token: self.refresh_token,
			expires_at,
		})
	}
}

/// Adds `delta` to `issued_at`, saturating at the representable bounds.
fn expiry_after(issued_at: OffsetDateTime, delta: Duration) -> OffsetDateTime {
	issued_at.checked_add(delta).unwrap_or_else(|| {
		if delta.is_negative() {
			PrimitiveDateTime::MIN.assume_utc()
		} else {
			PrimitiveDateTime::MAX.assume_utc()
		}
	})
}

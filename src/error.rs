//! Gateway-level error types shared across the request and refresh paths.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential refresh failed; the delegated request was never sent.
	///
	/// The inner error is shared so every caller coalesced onto the same refresh observes the
	/// same failure.
	#[error("Credential refresh failed.")]
	CredentialRefresh(#[source] Arc<RefreshError>),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Remote completed the call but answered with a non-success status.
	#[error("Request failed with HTTP status {status}.")]
	Request {
		/// HTTP status code returned by the remote.
		status: u16,
		/// Lossy UTF-8 rendering of the response body.
		body: String,
	},
	/// Success payload could not be decoded.
	#[error("Response payload could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},
}
impl Error {
	/// Returns the HTTP status attached to the error, when one is known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Request { status, .. } | Self::Decode { status, .. } => Some(*status),
			Self::CredentialRefresh(e) => e.status(),
			_ => None,
		}
	}
}
impl From<RefreshError> for Error {
	fn from(e: RefreshError) -> Self {
		Self::CredentialRefresh(Arc::new(e))
	}
}

/// Configuration and validation failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Target URL cannot be parsed or resolved against the base URL.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// Raw URL supplied by the caller.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	SerializeBody(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised while refreshing the held credential.
#[derive(Debug, ThisError)]
pub enum RefreshError {
	/// Refresh endpoint could not be reached.
	#[error("Refresh endpoint could not be reached.")]
	Transport(#[source] TransportError),
	/// Refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the refresh token with HTTP status {status}.")]
	Rejected {
		/// HTTP status code returned by the refresh endpoint.
		status: u16,
	},
	/// Refresh endpoint responded with malformed JSON.
	#[error("Refresh endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Refresh endpoint returned a non-positive `expiresIn`.
	#[error("The expiresIn value must be positive.")]
	NonPositiveExpiresIn,
	/// Refresh endpoint returned an excessively large `expiresIn`.
	#[error("The expiresIn value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Refresh request body could not be encoded.
	#[error("Refresh request could not be encoded.")]
	Encode(#[source] serde_json::Error),
}
impl RefreshError {
	/// Returns the HTTP status attached to the failure, when one is known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status } | Self::MalformedResponse { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the remote endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the remote endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

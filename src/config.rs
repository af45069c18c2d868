//! Gateway configuration and its validating builder.

// self
use crate::_prelude::*;

/// Errors raised while constructing or validating gateway configuration.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum GatewayConfigError {
	/// Endpoints must speak HTTP(S).
	#[error("The {endpoint} endpoint must use http or https: {url}.")]
	UnsupportedScheme {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Base URLs must be able to anchor relative request paths.
	#[error("The base URL cannot be used to resolve relative paths: {url}.")]
	CannotBeABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// The gateway owns the `Authorization` header.
	#[error("Default headers must not set the `{name}` header.")]
	ReservedHeader {
		/// Offending header name.
		name: String,
	},
}

/// Immutable configuration consumed by a [`Gateway`](crate::gateway::Gateway).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
	/// Fixed endpoint that exchanges a refresh token for a new credential.
	pub refresh_endpoint: Url,
	/// Optional base URL relative request paths are joined onto.
	pub base_url: Option<Url>,
	/// Refreshes credentials this long before they expire (zero disables).
	pub preemptive_window: Duration,
	/// Headers added to every delegated request.
	pub default_headers: BTreeMap<String, String>,
}
impl GatewayConfig {
	/// Creates a new builder for the provided refresh endpoint.
	pub fn builder(refresh_endpoint: Url) -> GatewayConfigBuilder {
		GatewayConfigBuilder::new(refresh_endpoint)
	}

	/// Resolves a caller-supplied target against [`GatewayConfig::base_url`].
	pub fn resolve(&self, target: &str) -> Result<Url> {
		let resolved = match &self.base_url {
			Some(base) => base.join(target),
			None => Url::parse(target),
		};

		resolved.map_err(|source| {
			crate::error::ConfigError::InvalidUrl { url: target.to_owned(), source }.into()
		})
	}

	fn validate(&self) -> Result<(), GatewayConfigError> {
		validate_endpoint("refresh", &self.refresh_endpoint)?;

		if let Some(base) = self.base_url.as_ref() {
			validate_endpoint("base", base)?;

			if base.cannot_be_a_base() {
				return Err(GatewayConfigError::CannotBeABase { url: base.to_string() });
			}
		}
		if let Some(name) =
			self.default_headers.keys().find(|name| name.eq_ignore_ascii_case("authorization"))
		{
			return Err(GatewayConfigError::ReservedHeader { name: name.clone() });
		}

		Ok(())
	}
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	/// Refresh endpoint for the config being constructed.
	pub refresh_endpoint: Url,
	/// Optional base URL.
	pub base_url: Option<Url>,
	/// Preemptive refresh window.
	pub preemptive_window: Duration,
	/// Headers added to every delegated request.
	pub default_headers: BTreeMap<String, String>,
}
impl GatewayConfigBuilder {
	/// Creates a new builder seeded with the provided refresh endpoint.
	pub fn new(refresh_endpoint: Url) -> Self {
		Self {
			refresh_endpoint,
			base_url: None,
			preemptive_window: Duration::ZERO,
			default_headers: BTreeMap::new(),
		}
	}

	/// Sets the base URL relative request paths resolve against.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Overrides the preemptive refresh window (defaults to zero).
	pub fn preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Adds a header sent with every delegated request.
	pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.default_headers.insert(name.into(), value.into());

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<GatewayConfig, GatewayConfigError> {
		let config = GatewayConfig {
			refresh_endpoint: self.refresh_endpoint,
			base_url: self.base_url,
			preemptive_window: self.preemptive_window,
			default_headers: self.default_headers,
		};

		config.validate()?;

		Ok(config)
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), GatewayConfigError> {
	match url.scheme() {
		"http" | "https" => Ok(()),
		_ => Err(GatewayConfigError::UnsupportedScheme { endpoint: name, url: url.to_string() }),
	}
}

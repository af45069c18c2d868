// self
use crate::{
	_prelude::*,
	obs::{GatewayOp, OpOutcome},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by gateway operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(op: GatewayOp, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("token_gateway.op", op = op.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (op, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event for an operation outcome.
pub fn trace_outcome(op: GatewayOp, outcome: OpOutcome) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(op = op.as_str(), outcome = outcome.as_str(), "gateway operation");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, outcome);
	}
}

/// Emits a warning event carrying the rendered error chain head.
pub fn trace_failure(op: GatewayOp, error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		match error.source() {
			Some(source) => tracing::warn!(
				op = op.as_str(),
				outcome = OpOutcome::Failure.as_str(),
				error = %error,
				source = %source,
				"gateway operation failed"
			),
			None => tracing::warn!(
				op = op.as_str(),
				outcome = OpOutcome::Failure.as_str(),
				error = %error,
				"gateway operation failed"
			),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (op, error);
	}
}

/// Emits a debug event noting that an expired credential triggered a refresh.
pub fn trace_refresh_started(had_access_token: bool) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(had_access_token, "access token expired, refreshing");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = had_access_token;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn op_helpers_noop_without_tracing() {
		let _span = OpSpan::new(GatewayOp::Request, "test");

		trace_outcome(GatewayOp::Request, OpOutcome::Success);
		trace_failure(GatewayOp::Refresh, &std::fmt::Error);
		trace_refresh_started(false);
	}

	#[cfg(feature = "tracing")]
	#[test]
	fn failure_events_carry_op_outcome_and_source() {
		// crates.io
		use tracing::{
			Event, Metadata, Subscriber,
			field::{Field, Visit},
			span,
		};

		#[derive(Default)]
		struct Fields(BTreeMap<String, String>);
		impl Visit for Fields {
			fn record_str(&mut self, field: &Field, value: &str) {
				self.0.insert(field.name().into(), value.into());
			}

			fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
				self.0.insert(field.name().into(), format!("{value:?}"));
			}
		}

		#[derive(Clone, Default)]
		struct CapturingSubscriber {
			events: Arc<Mutex<Vec<BTreeMap<String, String>>>>,
		}
		impl Subscriber for CapturingSubscriber {
			fn enabled(&self, _: &Metadata<'_>) -> bool {
				true
			}

			fn new_span(&self, _: &span::Attributes<'_>) -> span::Id {
				span::Id::from_u64(1)
			}

			fn record(&self, _: &span::Id, _: &span::Record<'_>) {}

			fn record_follows_from(&self, _: &span::Id, _: &span::Id) {}

			fn event(&self, event: &Event<'_>) {
				let mut fields = Fields::default();

				event.record(&mut fields);
				self.events.lock().push(fields.0);
			}

			fn enter(&self, _: &span::Id) {}

			fn exit(&self, _: &span::Id) {}
		}

		let subscriber = CapturingSubscriber::default();
		let err = crate::error::Error::from(crate::error::RefreshError::Rejected { status: 401 });

		tracing::subscriber::with_default(subscriber.clone(), || {
			trace_failure(GatewayOp::Refresh, &err);
		});

		let events = subscriber.events.lock();
		let event = events.first().expect("A failure event should be emitted.");

		assert_eq!(event.get("op").map(String::as_str), Some("refresh"));
		assert_eq!(event.get("outcome").map(String::as_str), Some("failure"));
		assert_eq!(event.get("error").map(String::as_str), Some("Credential refresh failed."));
		assert_eq!(
			event.get("source").map(String::as_str),
			Some("Refresh endpoint rejected the refresh token with HTTP status 401.")
		);
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = OpSpan::new(GatewayOp::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}

//! Optional observability helpers for gateway operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `token_gateway.op` with the `op` and `stage`
//!   fields, plus outcome events inside them.
//! - Enable `metrics` to increment the `token_gateway_op_total` counter for every
//!   attempt/success/failure/coalesced outcome, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Gateway operations observed by the instrumentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GatewayOp {
	/// Delegated request issued on behalf of a caller.
	Request,
	/// Credential refresh against the refresh endpoint.
	Refresh,
}
impl GatewayOp {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GatewayOp::Request => "request",
			GatewayOp::Refresh => "refresh",
		}
	}
}
impl Display for GatewayOp {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a gateway operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Caller reused the outcome of a refresh already in flight.
	Coalesced,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
			OpOutcome::Coalesced => "coalesced",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records an outcome as a metric and, when tracing is enabled, as an event.
pub fn record_outcome(op: GatewayOp, outcome: OpOutcome) {
	record_op_outcome(op, outcome);
	trace_outcome(op, outcome);
}

/// Records a failure together with the error that caused it.
pub fn record_failure(op: GatewayOp, error: &dyn StdError) {
	record_op_outcome(op, OpOutcome::Failure);
	trace_failure(op, error);
}

// self
use crate::obs::{GatewayOp, OpOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(op: GatewayOp, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"token_gateway_op_total",
			"op" => op.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (op, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_op_outcome_noop_without_metrics() {
		record_op_outcome(GatewayOp::Refresh, OpOutcome::Coalesced);
	}

	#[cfg(feature = "metrics")]
	#[test]
	fn record_op_outcome_increments_labeled_counter() {
		// std
		use std::sync::atomic::{AtomicU64, Ordering};
		// crates.io
		use metrics::{
			Counter, CounterFn, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString,
			Unit,
		};
		// self
		use crate::_prelude::*;

		#[derive(Default)]
		struct Hits(AtomicU64);
		impl CounterFn for Hits {
			fn increment(&self, value: u64) {
				self.0.fetch_add(value, Ordering::Relaxed);
			}

			fn absolute(&self, value: u64) {
				self.0.store(value, Ordering::Relaxed);
			}
		}

		#[derive(Default)]
		struct CapturingRecorder {
			keys: Mutex<Vec<Key>>,
			hits: Arc<Hits>,
		}
		impl Recorder for CapturingRecorder {
			fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

			fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

			fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

			fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
				self.keys.lock().push(key.clone());

				Counter::from_arc(Arc::clone(&self.hits))
			}

			fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
				Gauge::noop()
			}

			fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
				Histogram::noop()
			}
		}

		let recorder = CapturingRecorder::default();

		metrics::with_local_recorder(&recorder, || {
			record_op_outcome(GatewayOp::Refresh, OpOutcome::Coalesced);
		});

		let keys = recorder.keys.lock();
		let key = keys.first().expect("Counter should be registered once.");
		let labels = key.labels().map(|l| (l.key(), l.value())).collect::<Vec<_>>();

		assert_eq!(key.name(), "token_gateway_op_total");
		assert!(labels.contains(&("op", "refresh")));
		assert!(labels.contains(&("outcome", "coalesced")));
		assert_eq!(recorder.hits.0.load(Ordering::Relaxed), 1);
	}
}

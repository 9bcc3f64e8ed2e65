//! A [`HostTracer`] that reports through `tracing`.
use tracing::Span;

use crate::plugin::HostTracer;
use crate::segments::SegmentNode;

pub const TRANSACTION_NAME: &str = "transaction.name";

/// Reports transaction names and segment trees as `tracing` events.
///
/// The transaction name is also recorded on the current span when that span declares a
/// `transaction.name` field, e.g. `info_span!("request", "transaction.name" = Empty)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl HostTracer for TracingReporter {
    fn set_transaction_name(&self, name: &str) {
        Span::current().record(TRANSACTION_NAME, name);
        tracing::info!(transaction.name = name, "transaction named");
    }

    fn attach_segments(&self, operation: &str, segments: SegmentNode) {
        match serde_json::to_string(&segments) {
            Ok(segments) => {
                tracing::info!(operation.name = operation, %segments, "operation segments")
            }
            Err(error) => tracing::warn!(
                operation.name = operation,
                %error,
                "could not serialize operation segments"
            ),
        }
    }
}

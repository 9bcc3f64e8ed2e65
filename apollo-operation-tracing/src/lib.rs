//! Operation naming and resolver segment trees for GraphQL tracing.
//!
//! Two pieces of telemetry are derived from a GraphQL request, including requests that fail to
//! parse or validate:
//!
//! * a bounded-cardinality name for the request, computed from the shape of its operations (see
//!   [`naming`]),
//! * a tree of segments mirroring field resolution during execution (see [`segments`]).
//!
//! [`OperationTracing`] ties both to the lifecycle of a request and reports them to a
//! [`HostTracer`].

#![warn(unreachable_pub)]

mod configuration;
mod error;
pub mod naming;
mod plugin;
mod request;
pub mod segments;
mod tracer;

pub use crate::configuration::Config;
pub use crate::error::ConfigurationError;
pub use crate::plugin::HostTracer;
pub use crate::plugin::OperationTrace;
pub use crate::plugin::OperationTracing;
pub use crate::plugin::RequestTrace;
pub use crate::request::Object;
pub use crate::request::Request;
pub use crate::request::RequestBody;
pub use crate::tracer::TracingReporter;
pub use crate::tracer::TRANSACTION_NAME;

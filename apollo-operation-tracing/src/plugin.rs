//! Bridges the lifecycle of a GraphQL request to operation naming and segment trees.
//!
//! The host creates one [`OperationTracing`] per mounted endpoint. For every HTTP request it
//! calls [`OperationTracing::request_received`] with the raw body, forwards the execution
//! engine's hooks to the [`OperationTrace`] of each operation, and calls
//! [`RequestTrace::finish`] once the response is sent.
use std::sync::Arc;

use apollo_compiler::ast::Document;
use apollo_compiler::ast::OperationDefinition;
use derivative::Derivative;
use parking_lot::Mutex;

use crate::configuration::Config;
use crate::error::ConfigurationError;
use crate::error::DocumentUnavailable;
use crate::naming::transaction_name;
use crate::naming::BatchNames;
use crate::naming::OperationIdentifier;
use crate::naming::OperationNamer;
use crate::naming::ReservedFields;
use crate::naming::WILDCARD;
use crate::request::Request;
use crate::request::RequestBody;
use crate::segments::SegmentNode;
use crate::segments::SegmentTree;

/// Where names and segment trees are reported.
#[cfg_attr(test, mockall::automock)]
pub trait HostTracer: Send + Sync + 'static {
    /// Names the unit of work the current request is reported under.
    ///
    /// Called when the request is received, and again when it finishes if the name improved in
    /// between.
    fn set_transaction_name(&self, name: &str);

    /// Attaches the finished segments of one operation, labelled by its identifier.
    fn attach_segments(&self, operation: &str, segments: SegmentNode);
}

/// Operation tracing for one endpoint.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct OperationTracing {
    config: Arc<Config>,
    reserved: Arc<ReservedFields>,
    #[derivative(Debug = "ignore")]
    tracer: Arc<dyn HostTracer>,
}

impl OperationTracing {
    pub fn new(config: Config, tracer: Arc<dyn HostTracer>) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            reserved: Arc::new(config.reserved_fields()),
            config: Arc::new(config),
            tracer,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Starts tracing an HTTP request.
    ///
    /// Every operation of the body is named right away from its query text, and the resulting
    /// transaction name is handed to the tracer. A body that cannot be read is named `*`.
    pub fn request_received(&self, route_prefix: impl Into<String>, body: &[u8]) -> RequestTrace {
        let requests = match RequestBody::from_bytes(body) {
            Ok(body) => body.into_requests(),
            Err(error) => {
                tracing::debug!(%error, "could not read GraphQL requests from the body");
                Vec::new()
            }
        };

        let operations = requests
            .into_iter()
            .map(|request| {
                Arc::new(OperationTrace::new(
                    request,
                    self.reserved.clone(),
                    self.tracer.clone(),
                    self.config.capture_scalars,
                ))
            })
            .collect();

        let trace = RequestTrace {
            route_prefix: route_prefix.into(),
            operations,
            tracer: self.tracer.clone(),
            reported_name: Mutex::new(String::new()),
        };
        trace.report_name();
        trace
    }
}

/// The tracing state of one HTTP request, possibly a batch.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct RequestTrace {
    route_prefix: String,
    operations: Vec<Arc<OperationTrace>>,
    #[derivative(Debug = "ignore")]
    tracer: Arc<dyn HostTracer>,
    reported_name: Mutex<String>,
}

impl RequestTrace {
    pub fn route_prefix(&self) -> &str {
        &self.route_prefix
    }

    /// The operations of the request, in request order. Empty when the body could not be read.
    pub fn operations(&self) -> &[Arc<OperationTrace>] {
        &self.operations
    }

    pub fn operation(&self, index: usize) -> Option<&Arc<OperationTrace>> {
        self.operations.get(index)
    }

    /// The identifier of each operation, `*` for those that could not be named.
    pub fn batch_names(&self) -> BatchNames {
        BatchNames::new(
            self.operations
                .iter()
                .map(|operation| {
                    operation
                        .identifier()
                        .unwrap_or_else(OperationIdentifier::unavailable)
                })
                .collect(),
        )
    }

    /// The transaction name as of now.
    pub fn transaction_name(&self) -> String {
        let names = self.batch_names();
        let parsed = self
            .operations
            .iter()
            .any(|operation| operation.identifier().is_some());
        transaction_name(&self.route_prefix, names.individual(), parsed)
    }

    /// Ends the request: reports the final transaction name and the segments of every
    /// operation that did not report them yet. Returns the transaction name.
    pub fn finish(self) -> String {
        let name = self.report_name();
        for operation in &self.operations {
            operation.report_segments();
        }
        name
    }

    fn report_name(&self) -> String {
        let name = self.transaction_name();
        let mut reported = self.reported_name.lock();
        if *reported != name {
            tracing::debug!(transaction.name = %name, "naming transaction");
            self.tracer.set_transaction_name(&name);
            *reported = name.clone();
        }
        name
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Naming {
    Unavailable,
    /// Named from the document alone, before the engine resolved the operation.
    Parsed(OperationIdentifier),
    /// Named from the operation the engine resolved. Takes precedence.
    Resolved(OperationIdentifier),
}

impl Naming {
    fn identifier(&self) -> Option<&OperationIdentifier> {
        match self {
            Naming::Unavailable => None,
            Naming::Parsed(identifier) | Naming::Resolved(identifier) => Some(identifier),
        }
    }
}

/// The tracing state of one operation of a request.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct OperationTrace {
    request: Request,
    reserved: Arc<ReservedFields>,
    naming: Mutex<Naming>,
    segments: SegmentTree,
    #[derivative(Debug = "ignore")]
    tracer: Arc<dyn HostTracer>,
}

impl OperationTrace {
    fn new(
        request: Request,
        reserved: Arc<ReservedFields>,
        tracer: Arc<dyn HostTracer>,
        capture_scalars: bool,
    ) -> Self {
        let naming = match parse(&request) {
            Ok(document) => OperationNamer::new(&document, &reserved)
                .name_selected(request.operation_name.as_deref())
                .map_or(Naming::Unavailable, Naming::Parsed),
            Err(reason) => {
                tracing::debug!(%reason, "operation cannot be named yet");
                Naming::Unavailable
            }
        };

        Self {
            request,
            reserved,
            naming: Mutex::new(naming),
            segments: SegmentTree::new(capture_scalars),
            tracer,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The best identifier known so far.
    pub fn identifier(&self) -> Option<OperationIdentifier> {
        self.naming.lock().identifier().cloned()
    }

    /// The segments of this operation's execution; feed them with resolution events.
    pub fn segments(&self) -> &SegmentTree {
        &self.segments
    }

    /// The host parsed the request's document itself, e.g. after looking up a persisted query.
    ///
    /// Only names an operation that could not be named from the request body.
    pub fn did_parse(&self, document: &Document) {
        let mut naming = self.naming.lock();
        if *naming != Naming::Unavailable {
            return;
        }
        if let Some(identifier) = OperationNamer::new(document, &self.reserved)
            .name_selected(self.request.operation_name.as_deref())
        {
            *naming = Naming::Parsed(identifier);
        }
    }

    /// The engine resolved the operation it is about to execute. This name wins over the one
    /// computed from the request body.
    ///
    /// Engines only resolve operations of valid documents: when validation fails this is never
    /// called and the name computed from the document's syntax stays.
    pub fn did_resolve_operation(&self, document: &Document, operation: &OperationDefinition) {
        let identifier = OperationNamer::new(document, &self.reserved).name(operation);
        *self.naming.lock() = Naming::Resolved(identifier);
    }

    /// Execution of the operation completed; its segments are attached right away.
    pub fn execution_did_end(&self) {
        self.report_segments();
    }

    fn report_segments(&self) {
        let label = self
            .identifier()
            .map_or_else(|| WILDCARD.to_string(), |identifier| identifier.to_string());
        if let Some(segments) = self.segments.finish(label.clone()) {
            self.tracer.attach_segments(&label, segments);
        }
    }
}

fn parse(request: &Request) -> Result<Document, DocumentUnavailable> {
    let query = request
        .query
        .as_deref()
        .ok_or(DocumentUnavailable::MissingQuery)?;
    Document::parse(query, "request.graphql")
        .map_err(|invalid| DocumentUnavailable::Syntax(invalid.errors))
}

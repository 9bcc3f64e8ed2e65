use std::fmt;

use apollo_compiler::ast::Definition;
use apollo_compiler::ast::Document;
use apollo_compiler::ast::OperationDefinition;
use apollo_compiler::ast::OperationType;
use itertools::Itertools;
use serde::Serialize;

use super::fragments::FragmentIndex;
use super::path::PathResolver;
use super::reserved::ReservedFields;
use super::selection::SelectionWalker;
use super::transaction::BATCH_MARKER;
use super::transaction::WILDCARD;

/// Stands in for the name of an operation that has none.
pub const ANONYMOUS_OPERATION: &str = "<anonymous>";

/// The kind of a GraphQL operation, rendered the way it is written in a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

impl From<OperationType> for OperationKind {
    fn from(operation_type: OperationType) -> Self {
        match operation_type {
            OperationType::Query => OperationKind::Query,
            OperationType::Mutation => OperationKind::Mutation,
            OperationType::Subscription => OperationKind::Subscription,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<kind>/<name or <anonymous>>/<deepest unique path>`.
///
/// The identifier only depends on the shape of the operation, so it is safe to use as a
/// grouping key: aliases, argument values and fragment declaration order do not change it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OperationIdentifier(String);

impl OperationIdentifier {
    pub fn new(kind: OperationKind, name: Option<&str>, path: &str) -> Self {
        Self(format!(
            "{kind}/{}/{path}",
            name.unwrap_or(ANONYMOUS_OPERATION)
        ))
    }

    /// Position holder for a batch member that could not be named.
    pub(crate) fn unavailable() -> Self {
        Self(WILDCARD.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OperationIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Names the operations of one document.
///
/// Fragment definitions are indexed when the namer is created, before any operation is named.
/// Naming only looks at the syntax of the document: it works the same for documents that fail
/// validation.
#[derive(Clone, Debug)]
pub struct OperationNamer<'doc, 'a> {
    document: &'doc Document,
    resolver: PathResolver<'doc, 'a>,
}

impl<'doc, 'a> OperationNamer<'doc, 'a> {
    pub fn new(document: &'doc Document, reserved: &'a ReservedFields) -> Self {
        Self {
            document,
            resolver: PathResolver::new(
                SelectionWalker::new(reserved),
                FragmentIndex::new(document),
            ),
        }
    }

    pub fn name(&self, operation: &OperationDefinition) -> OperationIdentifier {
        OperationIdentifier::new(
            operation.operation_type.into(),
            operation.name.as_ref().map(|name| name.as_str()),
            &self.resolver.resolve_path(&operation.selection_set),
        )
    }

    /// Names the operation a request selects.
    ///
    /// With an operation name, the operation declaring that name; without one, the first
    /// operation of the document. `None` when nothing matches.
    pub fn name_selected(&self, operation_name: Option<&str>) -> Option<OperationIdentifier> {
        select_operation(self.document, operation_name).map(|operation| self.name(operation))
    }
}

fn select_operation<'doc>(
    document: &'doc Document,
    operation_name: Option<&str>,
) -> Option<&'doc OperationDefinition> {
    let mut operations = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::OperationDefinition(operation) => Some(&**operation),
            _ => None,
        });

    match operation_name {
        Some(wanted) => operations.find(|operation| {
            operation
                .name
                .as_ref()
                .is_some_and(|name| name.as_str() == wanted)
        }),
        None => operations.next(),
    }
}

/// The names of a batched request: one per operation, in request order, plus their combination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchNames {
    individual: Vec<OperationIdentifier>,
}

impl BatchNames {
    pub fn new(individual: Vec<OperationIdentifier>) -> Self {
        Self { individual }
    }

    pub fn individual(&self) -> &[OperationIdentifier] {
        &self.individual
    }

    /// `batch/<id1>/<id2>/...`
    pub fn combined(&self) -> String {
        std::iter::once(BATCH_MARKER)
            .chain(self.individual.iter().map(OperationIdentifier::as_str))
            .join("/")
    }
}

//! Low-cardinality names for GraphQL operations.
//!
//! Raw query text cannot be used to group requests: every distinct argument value would create a
//! new group. Instead an operation is named after its kind, its name, and the deepest path of its
//! selections that is unique, e.g. `query/GetBooks/library.books.title`.

mod fragments;
mod operation;
mod path;
mod reserved;
mod selection;
mod transaction;

pub use fragments::FragmentIndex;
pub use operation::BatchNames;
pub use operation::OperationIdentifier;
pub use operation::OperationKind;
pub use operation::OperationNamer;
pub use operation::ANONYMOUS_OPERATION;
pub use path::PathResolver;
pub use reserved::ReservedFields;
pub use reserved::TYPENAME;
pub use selection::SelectionSetShape;
pub use selection::SelectionWalker;
pub use transaction::transaction_name;
pub use transaction::BATCH_MARKER;
pub use transaction::WILDCARD;

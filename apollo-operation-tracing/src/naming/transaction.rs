use super::operation::BatchNames;
use super::operation::OperationIdentifier;

/// Prefix of the combined name of a batched request.
pub const BATCH_MARKER: &str = "batch";
/// Names a request for which no operation could be read.
pub const WILDCARD: &str = "*";

/// Builds the name of the unit of work a request is reported under.
///
/// * `<prefix>//*` when the request had no usable document,
/// * `<prefix>//<identifier>` for a single operation,
/// * `<prefix>//batch/<identifier>/<identifier>...` for a batch.
pub fn transaction_name(
    route_prefix: &str,
    identifiers: &[OperationIdentifier],
    parsed: bool,
) -> String {
    match identifiers {
        _ if !parsed => format!("{route_prefix}//{WILDCARD}"),
        [] => format!("{route_prefix}//{WILDCARD}"),
        [single] => format!("{route_prefix}//{single}"),
        several => format!(
            "{route_prefix}//{}",
            BatchNames::new(several.to_vec()).combined()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::OperationKind;

    fn hello() -> OperationIdentifier {
        OperationIdentifier::new(OperationKind::Query, None, "hello")
    }

    #[test]
    fn unparsed_request_is_a_wildcard() {
        assert_eq!(transaction_name("POST /graphql", &[], false), "POST /graphql//*");
        assert_eq!(transaction_name("", &[hello()], false), "//*");
    }

    #[test]
    fn single_operation() {
        assert_eq!(
            transaction_name("POST /graphql", &[hello()], true),
            "POST /graphql//query/<anonymous>/hello"
        );
    }

    #[test]
    fn batch_joins_identifiers_in_order() {
        let second = OperationIdentifier::new(OperationKind::Mutation, Some("Add"), "addBook");
        assert_eq!(
            transaction_name("/graphql", &[hello(), second], true),
            "/graphql//batch/query/<anonymous>/hello/mutation/Add/addBook"
        );
    }

    #[test]
    fn no_identifiers_is_a_wildcard() {
        assert_eq!(transaction_name("/graphql", &[], true), "/graphql//*");
    }
}

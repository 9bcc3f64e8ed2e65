//! Operation tracing errors.
//!
//! Only [`ConfigurationError`] is ever returned to callers. The other errors describe why a
//! request was named less precisely than it could have been; they are logged and the request
//! falls back to a degraded name.
use apollo_compiler::validation::DiagnosticList;
use displaydoc::Display;
use thiserror::Error;

/// Errors while setting up operation tracing.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not deserialize configuration: {0}
    DeserializeConfigError(#[from] serde_yaml::Error),

    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// The raw request body could not be read as one or more GraphQL requests.
#[derive(Error, Display, Debug)]
pub(crate) enum RequestError {
    /// request body was malformed: {0}
    MalformedBody(#[from] serde_json::Error),

    /// batch request did not contain any request
    EmptyBatch,
}

/// The request did not carry a document that could be parsed.
#[derive(Error, Display, Debug)]
pub(crate) enum DocumentUnavailable {
    /// request has no query text
    MissingQuery,

    /// query could not be parsed: {0}
    Syntax(DiagnosticList),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_come_from_doc_comments() {
        let error = ConfigurationError::InvalidConfiguration {
            message: "reserved field names must be valid GraphQL names",
            error: "`1d` is not a GraphQL name".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "reserved field names must be valid GraphQL names: `1d` is not a GraphQL name"
        );
        assert_eq!(
            RequestError::EmptyBatch.to_string(),
            "batch request did not contain any request"
        );
    }
}

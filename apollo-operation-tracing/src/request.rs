use serde::de::Unexpected;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::RequestError;

/// A json object
pub type Object = Map<String, Value>;

/// One GraphQL request as found in an HTTP body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// The GraphQL document. Absent for persisted queries that are sent by hash only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub query: Option<String>,

    /// Selects the operation to execute when the document declares several.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub operation_name: Option<String>,

    #[serde(
        skip_serializing_if = "Object::is_empty",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub variables: Object,

    #[serde(
        skip_serializing_if = "Object::is_empty",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub extensions: Object,
}

impl Request {
    pub fn new(query: impl Into<String>, operation_name: Option<&str>) -> Self {
        Self {
            query: Some(query.into()),
            operation_name: operation_name.map(str::to_string),
            ..Default::default()
        }
    }
}

// NOTE: this deserialize helper is used to transform `null` to Default::default()
fn deserialize_null_default<'de, D, T: Default + Deserialize<'de>>(
    deserializer: D,
) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
{
    <Option<T>>::deserialize(deserializer).map(|x| x.unwrap_or_default())
}

/// The body of a GraphQL HTTP request: a single request or a batch of them.
///
/// Read with [`RequestBody::from_bytes`] rather than a derived `Deserialize`: a derived struct
/// also accepts a JSON sequence, which would read `["{ hello }"]` as a request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestBody {
    Single(Request),
    Batch(Vec<Request>),
}

impl RequestBody {
    /// Reads a body: a JSON object is one request, a JSON array of objects is a batch.
    pub fn from_bytes(body: &[u8]) -> Result<Self, RequestError> {
        match serde_json::from_slice::<Value>(body)? {
            Value::Array(requests) if requests.is_empty() => Err(RequestError::EmptyBatch),
            Value::Array(requests) => requests
                .into_iter()
                .map(request_from_value)
                .collect::<Result<_, _>>()
                .map(RequestBody::Batch),
            value => request_from_value(value).map(RequestBody::Single),
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, RequestBody::Batch(_))
    }

    pub fn into_requests(self) -> Vec<Request> {
        match self {
            RequestBody::Single(request) => vec![request],
            RequestBody::Batch(requests) => requests,
        }
    }
}

fn request_from_value(value: Value) -> Result<Request, RequestError> {
    if !value.is_object() {
        let error = <serde_json::Error as serde::de::Error>::invalid_type(
            unexpected(&value),
            &"a GraphQL request object",
        );
        return Err(RequestError::MalformedBody(error));
    }
    Ok(serde_json::from_value(value)?)
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s.as_str()),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

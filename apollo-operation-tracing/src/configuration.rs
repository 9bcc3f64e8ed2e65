//! Operation tracing configuration.
use apollo_compiler::Name;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigurationError;
use crate::naming::ReservedFields;

/// Operation tracing configuration.
///
/// Can be created through `serde::Deserialize` from various formats, or with
/// [`Config::from_yaml`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Record a segment for the resolvers of leaf (scalar and enum) fields. Off by default, as
    /// leaf resolvers usually dominate the number of segments.
    pub capture_scalars: bool,

    /// Field names that never deepen an operation's name, in addition to `id`.
    pub reserved_fields: Vec<String>,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigurationError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Config)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        for field in &self.reserved_fields {
            Name::new(field).map_err(|_| ConfigurationError::InvalidConfiguration {
                message: "reserved field names must be valid GraphQL names",
                error: format!("`{field}` is not a GraphQL name"),
            })?;
        }
        Ok(())
    }

    pub(crate) fn reserved_fields(&self) -> ReservedFields {
        ReservedFields::with_additional(self.reserved_fields.iter().cloned())
    }
}

use std::collections::HashSet;

use apollo_compiler::ast::Selection;

/// The introspection field every object type carries. It never counts as a branch.
pub const TYPENAME: &str = "__typename";

/// Field names that are present on nearly every payload.
const DEFAULT_RESERVED_FIELDS: &[&str] = &["id"];

/// Field names that never deepen an operation's name.
///
/// A reserved field is still a selection: when it is the only thing selected the path simply
/// stops before it. The set always contains the built-in `id` and may be extended through
/// [`Config::reserved_fields`](crate::Config::reserved_fields).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservedFields {
    names: HashSet<String>,
}

impl Default for ReservedFields {
    fn default() -> Self {
        Self {
            names: DEFAULT_RESERVED_FIELDS
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

impl ReservedFields {
    /// The built-in set extended with `additional` names.
    pub fn with_additional<I, S>(additional: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut reserved = Self::default();
        reserved.names.extend(additional.into_iter().map(Into::into));
        reserved
    }

    pub fn contains(&self, field_name: &str) -> bool {
        self.names.contains(field_name)
    }

    /// Whether `selection` is a field whose name is reserved. Aliases are ignored.
    pub(crate) fn is_reserved(&self, selection: &Selection) -> bool {
        matches!(selection, Selection::Field(field) if self.contains(field.name.as_str()))
    }
}

/// Whether `selection` is the `__typename` meta-field, under any alias.
pub(crate) fn is_typename(selection: &Selection) -> bool {
    matches!(selection, Selection::Field(field) if field.name.as_str() == TYPENAME)
}

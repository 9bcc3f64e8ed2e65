use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// One component of an execution path: a response key or a list index.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// A list index.
    Index(usize),

    /// A response key.
    Key(String),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Index(index) => write!(f, "{index}"),
            PathElement::Key(key) => f.write_str(key),
        }
    }
}

impl From<usize> for PathElement {
    fn from(index: usize) -> Self {
        PathElement::Index(index)
    }
}

impl From<&str> for PathElement {
    fn from(key: &str) -> Self {
        PathElement::Key(key.to_string())
    }
}

impl From<String> for PathElement {
    fn from(key: String) -> Self {
        PathElement::Key(key)
    }
}

/// The position of a resolved field in the response, e.g. `library.books.0.title`.
///
/// Serialized the way GraphQL error paths are: `["library", "books", 0, "title"]`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponsePath(Vec<PathElement>);

impl ResponsePath {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.0
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.0.last()
    }

    /// A path one element deeper.
    pub fn join(&self, element: impl Into<PathElement>) -> Self {
        let mut elements = self.0.clone();
        elements.push(element.into());
        Self(elements)
    }

    pub fn parent(&self) -> Option<ResponsePath> {
        match self.0.split_last() {
            Some((_, parent)) => Some(Self(parent.to_vec())),
            None => None,
        }
    }

    /// Dotted renderings of every non-empty prefix, shortest first:
    /// `a`, `a.b`, `a.b.0`.
    pub(crate) fn dotted_prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = Vec::with_capacity(self.0.len());
        for element in &self.0 {
            let dotted = match prefixes.last() {
                Some(parent) => format!("{parent}.{element}"),
                None => element.to_string(),
            };
            prefixes.push(dotted);
        }
        prefixes
    }
}

impl fmt::Display for ResponsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

impl<E: Into<PathElement>> FromIterator<E> for ResponsePath {
    fn from_iter<T: IntoIterator<Item = E>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<PathElement>> for ResponsePath {
    fn from(elements: Vec<PathElement>) -> Self {
        Self(elements)
    }
}

/// Builds a [`ResponsePath`] from keys and indices: `path!["library", "books", 0, "title"]`.
#[macro_export]
macro_rules! path {
    () => {
        $crate::segments::ResponsePath::empty()
    };
    ($($element:expr),+ $(,)?) => {
        $crate::segments::ResponsePath::from(vec![
            $($crate::segments::PathElement::from($element)),+
        ])
    };
}

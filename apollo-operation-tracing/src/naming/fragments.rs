use std::collections::HashMap;

use apollo_compiler::ast::Definition;
use apollo_compiler::ast::Document;
use apollo_compiler::ast::FragmentDefinition;
use apollo_compiler::Node;

/// Named fragment definitions of one document, by name.
///
/// The index is built over the whole document before any operation is named, so a fragment
/// declared after the operation that spreads it resolves the same as one declared before.
#[derive(Clone, Debug, Default)]
pub struct FragmentIndex<'doc> {
    fragments: HashMap<&'doc str, &'doc Node<FragmentDefinition>>,
}

impl<'doc> FragmentIndex<'doc> {
    pub fn new(document: &'doc Document) -> Self {
        let fragments = document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                Definition::FragmentDefinition(fragment) => {
                    Some((fragment.name.as_str(), fragment))
                }
                _ => None,
            })
            .collect();
        Self { fragments }
    }

    /// The definition named `name`, or `None` for a spread of an undeclared fragment.
    pub fn resolve(&self, name: &str) -> Option<&'doc Node<FragmentDefinition>> {
        self.fragments.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Document {
        Document::parse(source, "query.graphql").expect("test document should parse")
    }

    #[test]
    fn resolves_fragments_declared_before_and_after_operations() {
        let document = parse(
            r#"
            fragment Before on Book { title }
            query { library { books { ...Before ...After } } }
            fragment After on Book { author { name } }
            "#,
        );
        let index = FragmentIndex::new(&document);

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.resolve("Before").map(|f| f.type_condition.as_str()),
            Some("Book")
        );
        assert!(index.resolve("After").is_some());
    }

    #[test]
    fn unknown_fragment_is_not_found() {
        let document = parse("{ library { ...Missing } }");
        let index = FragmentIndex::new(&document);

        assert!(index.is_empty());
        assert!(index.resolve("Missing").is_none());
    }
}

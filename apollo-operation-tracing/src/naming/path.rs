use apollo_compiler::ast::Selection;

use super::fragments::FragmentIndex;
use super::selection::SelectionSetShape;
use super::selection::SelectionWalker;

/// Computes the deepest unique path below a selection set.
///
/// Starting at the given selection set, the resolver follows single selections downwards and
/// stops at the first set that is empty or branches. Field names are joined with `.`, type
/// conditions are appended to the last segment as `<Type>`, and a named fragment spread ends the
/// path with the fragment's name.
#[derive(Clone, Debug)]
pub struct PathResolver<'doc, 'a> {
    walker: SelectionWalker<'a>,
    fragments: FragmentIndex<'doc>,
}

impl<'doc, 'a> PathResolver<'doc, 'a> {
    pub fn new(walker: SelectionWalker<'a>, fragments: FragmentIndex<'doc>) -> Self {
        Self { walker, fragments }
    }

    pub fn fragments(&self) -> &FragmentIndex<'doc> {
        &self.fragments
    }

    pub fn resolve_path(&self, selection_set: &[Selection]) -> String {
        let mut path = String::new();
        let mut current = selection_set;

        loop {
            let selection = match self.walker.classify(current) {
                SelectionSetShape::Empty | SelectionSetShape::Branching => return path,
                SelectionSetShape::Single(selection) => selection,
            };

            match selection {
                Selection::Field(field) => {
                    if self.walker.reserved().contains(field.name.as_str()) {
                        return path;
                    }
                    push_segment(&mut path, field.name.as_str());
                    if field.selection_set.is_empty() {
                        return path;
                    }
                    current = field.selection_set.as_slice();
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.fragment_name.as_str();
                    if self.fragments.resolve(name).is_none() {
                        tracing::debug!(
                            fragment.name = name,
                            "spread of an undeclared fragment, path stops before it"
                        );
                    } else {
                        push_segment(&mut path, name);
                    }
                    return path;
                }
                Selection::InlineFragment(fragment) => {
                    // Untyped inline fragments are flattened by the walker.
                    if let Some(type_condition) = &fragment.type_condition {
                        path.push('<');
                        path.push_str(type_condition.as_str());
                        path.push('>');
                    }
                    current = fragment.selection_set.as_slice();
                }
            }
        }
    }
}

fn push_segment(path: &mut String, segment: &str) {
    if !path.is_empty() {
        path.push('.');
    }
    path.push_str(segment);
}

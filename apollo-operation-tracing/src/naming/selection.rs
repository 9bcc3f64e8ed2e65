use apollo_compiler::ast::Selection;

use super::reserved::is_typename;
use super::reserved::ReservedFields;

/// How a selection set constrains the name of the operation it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionSetShape<'doc> {
    /// Nothing that can deepen the path: no selections, only `__typename`, or two or more
    /// selections that are all reserved fields. A lone reserved field is [`Single`](Self::Single).
    Empty,
    /// Exactly one selection besides `__typename`.
    Single(&'doc Selection),
    /// Two or more selections besides `__typename`. The path cannot be disambiguated further.
    Branching,
}

/// Classifies selection sets for path resolution.
///
/// Untyped inline fragments (`... { a b }` or `... @include(if: $x) { a }`) are transparent:
/// their selections count as if they were written directly in the enclosing set.
#[derive(Clone, Copy, Debug)]
pub struct SelectionWalker<'a> {
    reserved: &'a ReservedFields,
}

impl<'a> SelectionWalker<'a> {
    pub fn new(reserved: &'a ReservedFields) -> Self {
        Self { reserved }
    }

    pub fn reserved(&self) -> &'a ReservedFields {
        self.reserved
    }

    pub fn classify<'doc>(&self, selection_set: &'doc [Selection]) -> SelectionSetShape<'doc> {
        let mut candidates = Vec::new();
        collect_candidates(selection_set, &mut candidates);

        match candidates.as_slice() {
            [] => SelectionSetShape::Empty,
            [single] => SelectionSetShape::Single(*single),
            several
                if several
                    .iter()
                    .all(|selection| self.reserved.is_reserved(selection)) =>
            {
                SelectionSetShape::Empty
            }
            _ => SelectionSetShape::Branching,
        }
    }
}

fn collect_candidates<'doc>(
    selection_set: &'doc [Selection],
    candidates: &mut Vec<&'doc Selection>,
) {
    for selection in selection_set {
        match selection {
            Selection::Field(_) if is_typename(selection) => {}
            Selection::InlineFragment(fragment) if fragment.type_condition.is_none() => {
                collect_candidates(&fragment.selection_set, candidates)
            }
            _ => candidates.push(selection),
        }
    }
}

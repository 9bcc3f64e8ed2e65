use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

use super::path::ResponsePath;

const ROOT: usize = 0;

static NEXT_TREE: AtomicU64 = AtomicU64::new(0);

/// Handle on a segment of a [`SegmentTree`].
///
/// A handle only refers to a segment of the tree that returned it. Other trees ignore it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentId {
    tree: u64,
    index: usize,
}

/// What a segment measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// The root: from the first resolution or nested work of one operation until the tree is
    /// finished.
    Operation,
    /// The resolver of one field.
    Resolver,
    /// A level of the response for which no resolution was reported (list items, or ancestors
    /// of a resolution that was reported out of order).
    Synthetic,
    /// Work started by a resolver, e.g. a fetch or a timer.
    Nested,
}

/// One field resolution whose start and end are both already known.
#[derive(Clone, Debug)]
pub struct ResolutionEvent {
    pub path: ResponsePath,
    pub start: Instant,
    pub end: Instant,
    /// The field is a scalar or enum: nothing below it is resolved.
    pub leaf: bool,
}

/// A finished segment and its children.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SegmentNode {
    pub label: String,
    pub kind: SegmentKind,
    /// `None` when the segment never ended, e.g. because execution was aborted.
    #[serde(with = "humantime_serde")]
    pub duration: Option<Duration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SegmentNode>,
}

impl SegmentNode {
    /// Depth-first search for the segment labelled `label`.
    pub fn find(&self, label: &str) -> Option<&SegmentNode> {
        if self.label == label {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(label))
    }

    /// Number of segments in this subtree, this one included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(SegmentNode::count).sum::<usize>()
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.label, indent = depth * 2)?;
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for SegmentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[derive(Debug)]
struct Slot {
    label: String,
    kind: SegmentKind,
    started: Option<Instant>,
    duration: Option<Duration>,
    children: Vec<usize>,
}

impl Slot {
    fn new(label: String, kind: SegmentKind, started: Option<Instant>) -> Self {
        Self {
            label,
            kind,
            started,
            duration: None,
            children: Vec::new(),
        }
    }

    fn end(&mut self, at: Instant) {
        if let Some(started) = self.started {
            self.duration = Some(at.saturating_duration_since(started));
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Open,
    Closed,
}

#[derive(Debug)]
struct Arena {
    state: State,
    slots: Vec<Slot>,
    by_path: HashMap<String, usize>,
}

impl Arena {
    fn push(&mut self, parent: usize, slot: Slot) -> usize {
        if let Some(started) = slot.started {
            self.start_root(started);
        }
        let index = self.slots.len();
        self.slots.push(slot);
        self.slots[parent].children.push(index);
        index
    }

    /// The root starts with the earliest work recorded below it.
    fn start_root(&mut self, at: Instant) {
        let root = &mut self.slots[ROOT];
        if root.started.is_none_or(|started| at < started) {
            root.started = Some(at);
        }
    }

    /// The segment for `dotted`, created below `parent` as a synthetic level if missing.
    fn ensure(&mut self, dotted: &str, parent: usize) -> usize {
        if let Some(index) = self.by_path.get(dotted) {
            return *index;
        }
        let index = self.push(
            parent,
            Slot::new(dotted.to_string(), SegmentKind::Synthetic, None),
        );
        self.by_path.insert(dotted.to_string(), index);
        index
    }

    fn open_resolver(&mut self, path: &ResponsePath, started: Instant) -> usize {
        let prefixes = path.dotted_prefixes();
        let Some((own, ancestors)) = prefixes.split_last() else {
            return ROOT;
        };

        let parent = ancestors
            .iter()
            .fold(ROOT, |parent, dotted| self.ensure(dotted, parent));
        let index = self.ensure(own, parent);

        self.start_root(started);
        let slot = &mut self.slots[index];
        slot.kind = SegmentKind::Resolver;
        slot.started = Some(started);
        index
    }

    /// The resolver segment for `path`, or the closest segment above it.
    fn closest(&self, path: &ResponsePath) -> usize {
        path.dotted_prefixes()
            .iter()
            .rev()
            .find_map(|dotted| self.by_path.get(dotted).copied())
            .unwrap_or(ROOT)
    }

    fn snapshot(&self, index: usize) -> SegmentNode {
        let slot = &self.slots[index];
        SegmentNode {
            label: slot.label.clone(),
            kind: slot.kind,
            duration: slot.duration,
            children: slot
                .children
                .iter()
                .map(|child| self.snapshot(*child))
                .collect(),
        }
    }
}

/// The segments of one operation's execution, built from field resolution events.
///
/// Resolution events may arrive concurrently and in any order: a resolution whose ancestors
/// were not reported yet creates them. Each field resolution becomes a segment labelled with its
/// dotted response path, below the segment of its parent path. Resolutions of leaf fields are
/// only recorded when scalar capture is enabled.
///
/// The root segment starts timing with the first resolution or nested work, not when the tree is
/// created. A tree that recorded nothing reports no root duration.
///
/// The tree is open until [`finish`](Self::finish) is called. After that, events are ignored.
#[derive(Debug)]
pub struct SegmentTree {
    id: u64,
    capture_scalars: bool,
    arena: Mutex<Arena>,
}

impl SegmentTree {
    pub fn new(capture_scalars: bool) -> Self {
        Self {
            id: NEXT_TREE.fetch_add(1, Ordering::Relaxed),
            capture_scalars,
            arena: Mutex::new(Arena {
                state: State::Open,
                slots: vec![Slot::new(String::new(), SegmentKind::Operation, None)],
                by_path: HashMap::new(),
            }),
        }
    }

    pub fn captures_scalars(&self) -> bool {
        self.capture_scalars
    }

    pub fn is_closed(&self) -> bool {
        self.arena.lock().state == State::Closed
    }

    /// A field at `path` started resolving.
    ///
    /// Returns `None` when no segment is recorded: leaf resolution without scalar capture, an
    /// empty path, or a closed tree.
    pub fn resolution_started(&self, path: &ResponsePath, leaf: bool) -> Option<SegmentId> {
        self.open(path, leaf, Instant::now())
    }

    /// The field at `path` finished resolving.
    pub fn resolution_ended(&self, path: &ResponsePath) {
        let mut arena = self.arena.lock();
        if arena.state == State::Closed {
            tracing::debug!(graphql.path = %path, "resolution ended after the operation finished");
            return;
        }
        let index = arena.by_path.get(&path.to_string()).copied();
        match index {
            Some(index) => arena.slots[index].end(Instant::now()),
            None => tracing::trace!(graphql.path = %path, "no segment recorded for resolution"),
        }
    }

    /// Records a resolution whose timing is already known.
    pub fn record(&self, event: ResolutionEvent) -> Option<SegmentId> {
        let id = self.open(&event.path, event.leaf, event.start)?;
        self.end_at(id, event.end);
        Some(id)
    }

    /// Work started inside the resolver of the field at `owner`.
    ///
    /// The segment becomes a child of the owner's segment. When the owner has no segment (e.g.
    /// an uncaptured leaf), the closest segment above it is used instead.
    pub fn nested_started(
        &self,
        owner: &ResponsePath,
        label: impl Into<String>,
    ) -> Option<SegmentId> {
        let mut arena = self.arena.lock();
        if arena.state == State::Closed {
            tracing::debug!(
                graphql.path = %owner,
                "nested work started after the operation finished"
            );
            return None;
        }
        let parent = arena.closest(owner);
        let index = arena.push(
            parent,
            Slot::new(label.into(), SegmentKind::Nested, Some(Instant::now())),
        );
        Some(self.segment_id(index))
    }

    /// Work started inside another segment of this tree, e.g. a retry inside a fetch.
    ///
    /// Returns `None` for a closed tree or a handle returned by another tree.
    pub fn nested_started_in(
        &self,
        parent: SegmentId,
        label: impl Into<String>,
    ) -> Option<SegmentId> {
        let parent = self.own_index(parent)?;
        let mut arena = self.arena.lock();
        if arena.state == State::Closed || parent >= arena.slots.len() {
            return None;
        }
        let index = arena.push(
            parent,
            Slot::new(label.into(), SegmentKind::Nested, Some(Instant::now())),
        );
        Some(self.segment_id(index))
    }

    pub fn segment_ended(&self, id: SegmentId) {
        self.end_at(id, Instant::now())
    }

    /// Closes the tree and returns it, labelling the root with `root_label`.
    ///
    /// Only the first call returns the tree. Segments that did not end keep no duration.
    pub fn finish(&self, root_label: impl Into<String>) -> Option<SegmentNode> {
        let mut arena = self.arena.lock();
        if arena.state == State::Closed {
            return None;
        }
        arena.state = State::Closed;
        let root = &mut arena.slots[ROOT];
        root.label = root_label.into();
        root.end(Instant::now());
        Some(arena.snapshot(ROOT))
    }

    fn open(&self, path: &ResponsePath, leaf: bool, started: Instant) -> Option<SegmentId> {
        if leaf && !self.capture_scalars {
            return None;
        }
        if path.is_empty() {
            tracing::debug!("ignoring resolution without a path");
            return None;
        }
        let mut arena = self.arena.lock();
        if arena.state == State::Closed {
            tracing::debug!(
                graphql.path = %path,
                "resolution started after the operation finished"
            );
            return None;
        }
        let index = arena.open_resolver(path, started);
        tracing::trace!(graphql.path = %path, "resolution started");
        Some(self.segment_id(index))
    }

    fn end_at(&self, id: SegmentId, at: Instant) {
        let Some(index) = self.own_index(id) else {
            tracing::debug!("ignoring a segment handle of another operation");
            return;
        };
        let mut arena = self.arena.lock();
        if arena.state == State::Closed {
            return;
        }
        if let Some(slot) = arena.slots.get_mut(index) {
            slot.end(at);
        }
    }

    fn segment_id(&self, index: usize) -> SegmentId {
        SegmentId {
            tree: self.id,
            index,
        }
    }

    fn own_index(&self, id: SegmentId) -> Option<usize> {
        (id.tree == self.id).then_some(id.index)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::path;

    fn labels(node: &SegmentNode) -> Vec<&str> {
        node.children.iter().map(|child| child.label.as_str()).collect()
    }

    #[test]
    fn leaf_resolutions_need_scalar_capture() {
        let tree = SegmentTree::new(false);
        assert!(tree.resolution_started(&path!["library"], false).is_some());
        assert!(tree.resolution_started(&path!["library", "name"], true).is_none());
        tree.resolution_ended(&path!["library", "name"]);
        tree.resolution_ended(&path!["library"]);

        let root = tree.finish("query/<anonymous>/library").unwrap();
        assert_eq!(root.count(), 2);
        assert!(root.find("library.name").is_none());
        assert!(root.find("library").unwrap().duration.is_some());
    }

    #[test]
    fn every_resolution_is_one_segment_with_scalar_capture() {
        let tree = SegmentTree::new(true);
        for (path, leaf) in [
            (path!["library"], false),
            (path!["library", "name"], true),
            (path!["library", "books"], false),
            (path!["library", "books", 0usize, "title"], true),
            (path!["library", "books", 1usize, "title"], true),
        ] {
            tree.resolution_started(&path, leaf);
            tree.resolution_ended(&path);
        }

        let root = tree.finish("operation").unwrap();
        insta::assert_snapshot!(root.to_string(), @r###"
        operation
          library
            library.name
            library.books
              library.books.0
                library.books.0.title
              library.books.1
                library.books.1.title
        "###);
        assert_eq!(
            root.find("library.books.0").map(|node| node.kind),
            Some(SegmentKind::Synthetic)
        );
        assert_eq!(
            root.find("library.books.1.title").map(|node| node.kind),
            Some(SegmentKind::Resolver)
        );
    }

    #[test]
    fn nested_work_belongs_to_its_resolver() {
        let tree = SegmentTree::new(false);
        tree.resolution_started(&path!["library"], false);
        tree.resolution_started(&path!["library", "books"], false);
        let fetch = tree
            .nested_started(&path!["library", "books"], "fetch books")
            .unwrap();
        let timer = tree.nested_started_in(fetch, "retry backoff").unwrap();
        tree.segment_ended(timer);
        tree.segment_ended(fetch);

        let root = tree.finish("operation").unwrap();
        let library = root.find("library").unwrap();
        assert_eq!(labels(library), vec!["library.books"]);
        let books = root.find("library.books").unwrap();
        assert_eq!(labels(books), vec!["fetch books"]);
        assert_eq!(labels(&books.children[0]), vec!["retry backoff"]);
        assert_eq!(books.children[0].kind, SegmentKind::Nested);
    }

    #[test]
    fn nested_work_of_an_uncaptured_leaf_goes_to_the_closest_segment() {
        let tree = SegmentTree::new(false);
        tree.resolution_started(&path!["library"], false);
        tree.resolution_started(&path!["library", "name"], true);
        tree.nested_started(&path!["library", "name"], "lookup");

        let root = tree.finish("operation").unwrap();
        assert_eq!(labels(root.find("library").unwrap()), vec!["lookup"]);
    }

    #[test]
    fn out_of_order_resolution_creates_ancestry() {
        let tree = SegmentTree::new(true);
        tree.resolution_started(&path!["library", "books"], false);
        tree.resolution_started(&path!["library"], false);

        let root = tree.finish("operation").unwrap();
        assert_eq!(labels(&root), vec!["library"]);
        let library = root.find("library").unwrap();
        assert_eq!(library.kind, SegmentKind::Resolver);
        assert_eq!(labels(library), vec!["library.books"]);
    }

    #[test]
    fn recorded_events_keep_their_timing() {
        let tree = SegmentTree::new(false);
        let start = Instant::now();
        tree.record(ResolutionEvent {
            path: path!["hello"],
            start,
            end: start + Duration::from_millis(15),
            leaf: false,
        });

        let root = tree.finish("operation").unwrap();
        assert_eq!(
            root.find("hello").unwrap().duration,
            Some(Duration::from_millis(15))
        );
    }

    #[test]
    fn root_starts_with_the_first_resolution() {
        let tree = SegmentTree::new(false);
        std::thread::sleep(Duration::from_millis(50));
        tree.resolution_started(&path!["hello"], false);
        tree.resolution_ended(&path!["hello"]);

        let root = tree.finish("operation").unwrap();
        let duration = root.duration.expect("root should have ended");
        assert!(duration < Duration::from_millis(50), "root took {duration:?}");
    }

    #[test]
    fn root_of_recorded_events_starts_with_the_earliest() {
        let tree = SegmentTree::new(false);
        let start = Instant::now();
        tree.record(ResolutionEvent {
            path: path!["second"],
            start: start + Duration::from_millis(10),
            end: start + Duration::from_millis(20),
            leaf: false,
        });
        tree.record(ResolutionEvent {
            path: path!["first"],
            start,
            end: start + Duration::from_millis(5),
            leaf: false,
        });
        std::thread::sleep(Duration::from_millis(20));

        let root = tree.finish("operation").unwrap();
        assert!(root.duration.unwrap() >= Duration::from_millis(20));
    }

    #[test]
    fn empty_tree_has_no_root_duration() {
        let tree = SegmentTree::new(false);
        assert!(tree.resolution_started(&path!["hello"], true).is_none());

        let root = tree.finish("operation").unwrap();
        assert_eq!(root.duration, None);
        assert_eq!(root.count(), 1);
    }

    #[test]
    fn handles_of_another_tree_are_ignored() {
        let first = SegmentTree::new(false);
        let second = SegmentTree::new(false);
        let fetch = first.nested_started(&path!["library"], "fetch").unwrap();
        second.resolution_started(&path!["library"], false);

        assert!(second.nested_started_in(fetch, "retry").is_none());
        second.segment_ended(fetch);

        let root = second.finish("operation").unwrap();
        assert_eq!(root.count(), 2);
        assert_eq!(root.find("library").unwrap().duration, None);
        assert!(first.nested_started_in(fetch, "retry").is_some());
    }

    #[test]
    fn closed_tree_ignores_events() {
        let tree = SegmentTree::new(true);
        tree.resolution_started(&path!["hello"], true);
        let root = tree.finish("operation").unwrap();
        assert!(tree.is_closed());

        assert!(tree.resolution_started(&path!["late"], false).is_none());
        assert!(tree.nested_started(&path!["hello"], "late").is_none());
        tree.resolution_ended(&path!["hello"]);
        assert!(tree.finish("operation").is_none());

        assert_eq!(root.count(), 2);
        assert_eq!(root.find("hello").unwrap().duration, None);
    }

    #[test]
    fn serializes_for_reporting() {
        let tree = SegmentTree::new(false);
        let start = Instant::now();
        tree.record(ResolutionEvent {
            path: path!["hello"],
            start,
            end: start + Duration::from_millis(2),
            leaf: false,
        });
        let mut root = tree.finish("query/<anonymous>/hello").unwrap();
        root.duration = Some(Duration::from_millis(3));

        assert_eq!(
            serde_json::to_value(&root).unwrap(),
            serde_json::json!({
                "label": "query/<anonymous>/hello",
                "kind": "operation",
                "duration": "3ms",
                "children": [
                    { "label": "hello", "kind": "resolver", "duration": "2ms" }
                ]
            })
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_siblings_share_one_tree() {
        let tree = Arc::new(SegmentTree::new(true));
        tree.resolution_started(&path!["library"], false);
        tree.resolution_started(&path!["library", "books"], false);

        let tasks: Vec<_> = (0..32usize)
            .map(|index| {
                let tree = tree.clone();
                tokio::spawn(async move {
                    let title = path!["library", "books", index, "title"];
                    tree.resolution_started(&title, true);
                    tokio::task::yield_now().await;
                    tree.nested_started(&title, "format");
                    tree.resolution_ended(&title);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let root = tree.finish("operation").unwrap();
        let books = root.find("library.books").unwrap();
        assert_eq!(books.children.len(), 32);
        for item in &books.children {
            assert_eq!(item.children.len(), 1);
            let title = &item.children[0];
            assert_eq!(title.kind, SegmentKind::Resolver);
            assert_eq!(labels(title), vec!["format"]);
        }
        // operation, library, books, 32 items, 32 titles, 32 nested
        assert_eq!(root.count(), 3 + 32 * 3);
    }
}

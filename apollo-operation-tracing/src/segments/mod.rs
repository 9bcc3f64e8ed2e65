//! Segment trees mirroring field resolution.

mod path;
mod tree;

pub use path::PathElement;
pub use path::ResponsePath;
pub use tree::ResolutionEvent;
pub use tree::SegmentId;
pub use tree::SegmentKind;
pub use tree::SegmentNode;
pub use tree::SegmentTree;

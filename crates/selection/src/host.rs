//! Host selection environment
//!
//! The synchronizer never touches host nodes directly. It sees opaque
//! handles and asks the host to test and mutate them through
//! [`SelectionHost`].

/// Page text container handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub u64);

/// End-of-content marker handle, one per container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub u64);

/// Host text node handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// One end of a selection range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl BoundaryPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A host selection range in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: BoundaryPoint,
    pub end: BoundaryPoint,
}

impl SelectionRange {
    pub fn new(start: BoundaryPoint, end: BoundaryPoint) -> Self {
        Self { start, end }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Which side of its anchor node a marker is inserted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerSide {
    Before,
    After,
}

pub trait SelectionHost {
    /// True if `range` intersects any node of `container`.
    fn intersects(&self, range: &SelectionRange, container: ContainerId) -> bool;

    /// Toggle the "selecting" state of a container.
    fn set_selecting(&mut self, container: ContainerId, selecting: bool);

    /// Return `marker` to the end of `container` with zero size.
    fn reset_marker(&mut self, container: ContainerId, marker: MarkerId);

    /// Size `marker` to `container` and insert it next to `anchor`.
    fn place_marker(&mut self, marker: MarkerId, container: ContainerId, anchor: NodeId, side: MarkerSide);

    /// Container holding `node`, if it belongs to a registered page.
    fn container_of(&self, node: NodeId) -> Option<ContainerId>;

    /// Nearest node before `node` in document order that has content.
    fn previous_content_node(&self, node: NodeId) -> Option<NodeId>;

    /// True if the host's native selection already extends over trailing
    /// whitespace at the end of a page.
    fn native_trailing_selection(&self) -> bool;
}

use super::document::NodeId;

/// One structural change observed under the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

impl MutationRecord {
    pub fn added(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            added_nodes: nodes.into_iter().collect(),
            removed_nodes: Vec::new(),
        }
    }

    pub fn removed(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            added_nodes: Vec::new(),
            removed_nodes: nodes.into_iter().collect(),
        }
    }
}

/// Event delivered to the attachment engine by the host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// A batch of subtree insertions and removals, in the order they happened.
    Mutations(Vec<MutationRecord>),
    /// An image finished decoding; its natural size is now known.
    ContentReady(NodeId),
    PointerEnter(NodeId),
    PointerLeave(NodeId),
    /// The user activated an overlay control.
    Activate(NodeId),
}

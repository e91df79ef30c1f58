//! Arena nodes and generational handles
//!
//! Nodes of a `SequenceView` live in a slot vector owned by the view. Links
//! are slot indices. Slot 0 is the head sentinel and slot 1 the tail
//! sentinel; neither ever holds a record.

/// Slot index of the head sentinel
pub(crate) const HEAD: u32 = 0;
/// Slot index of the tail sentinel
pub(crate) const TAIL: u32 = 1;

/// A generational reference to a node of one view.
///
/// Unlike a raw index, a handle carries the generation of its slot. The
/// generation is bumped when the node is extracted, so a handle to an
/// extracted node never resolves again, even after its slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub(crate) view_id: u64,
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeHandle {
    /// Id of the view that issued this handle
    pub fn view_id(&self) -> u64 {
        self.view_id
    }

    /// Returns `true` if this handle designates a sentinel
    pub fn is_sentinel(&self) -> bool {
        self.index == HEAD || self.index == TAIL
    }
}

/// A linked node; `record` is `None` only for sentinels
pub(crate) struct Node<R> {
    pub record: Option<R>,
    pub prev: u32,
    pub next: u32,
}

/// One arena slot
pub(crate) struct Slot<R> {
    /// Incremented each time the slot's node is extracted
    pub generation: u32,
    /// `None` while the slot is on the free list
    pub node: Option<Node<R>>,
}

impl<R> Slot<R> {
    pub fn sentinel(prev: u32, next: u32) -> Self {
        Self {
            generation: 0,
            node: Some(Node {
                record: None,
                prev,
                next,
            }),
        }
    }
}

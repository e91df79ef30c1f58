//! Sequence view: an ephemeral doubly linked projection of the registry
//!
//! A view is built from one ordered registry read and owns every node it
//! creates. Mutations write through to the registry first and only touch
//! the linked list after the write committed, so a failed call leaves the
//! view exactly as it was.
//!
//! Each insert re-derives the rank of its reference node inside the write
//! transaction. If another writer moved or removed the reference since the
//! view was loaded, the insert fails with Conflict and writes nothing.
//!
//! Extract needs no such check: the registry removes by key and renumbers
//! from the key's current position, so a stale rank in the view cannot
//! misplace anything. A key another writer already removed is NotFound.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::observability::{log_event_with_fields, Event, Logger};

use super::errors::{SequenceError, SequenceResult};
use super::node::{Node, NodeHandle, Slot, HEAD, TAIL};
use super::record::{RecordStore, SequenceRecord};
use super::registry::OrderRegistry;

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Linked view over the registry's order
pub struct SequenceView<'a, S: RecordStore> {
    registry: OrderRegistry<'a>,
    store: &'a S,
    view_id: u64,
    slots: Vec<Slot<S::Record>>,
    free: Vec<u32>,
    len: usize,
}

impl<'a, S: RecordStore> SequenceView<'a, S> {
    /// Build a view from the registry's current order.
    ///
    /// Fails with RecordMissing, and returns no view, if any ordered key has
    /// no record in `store`.
    pub fn load(registry: OrderRegistry<'a>, store: &'a S) -> SequenceResult<Self> {
        let mut view = Self {
            registry,
            store,
            view_id: NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed),
            slots: vec![Slot::sentinel(HEAD, TAIL), Slot::sentinel(HEAD, TAIL)],
            free: Vec::new(),
            len: 0,
        };

        for entry in registry.load_ordered() {
            let record = store
                .get(&entry.record_key)
                .ok_or_else(|| SequenceError::RecordMissing(entry.record_key.clone()))?;
            view.link_before(TAIL, record);
        }

        log_event_with_fields(
            Event::SequenceLoaded,
            &[
                ("length", &view.len.to_string()),
                ("view_id", &view.view_id.to_string()),
            ],
        );
        Ok(view)
    }

    /// Id of this view; handles from other views are rejected
    pub fn view_id(&self) -> u64 {
        self.view_id
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Record of the first node, if any
    pub fn first(&self) -> Option<&S::Record> {
        self.first_node().and_then(|h| self.record(h).ok())
    }

    /// Record of the last node, if any
    pub fn last(&self) -> Option<&S::Record> {
        self.last_node().and_then(|h| self.record(h).ok())
    }

    /// Handle of the first node, if any
    pub fn first_node(&self) -> Option<NodeHandle> {
        self.data_handle(self.node(HEAD).next)
    }

    /// Handle of the last node, if any
    pub fn last_node(&self) -> Option<NodeHandle> {
        self.data_handle(self.node(TAIL).prev)
    }

    /// Handle of the tail sentinel, the reference for appending
    pub fn tail(&self) -> NodeHandle {
        self.handle(TAIL)
    }

    /// Handle of the head sentinel
    pub fn head(&self) -> NodeHandle {
        self.handle(HEAD)
    }

    /// Node at 0-based `index`, scanning from the head
    pub fn node_at(&self, index: usize) -> SequenceResult<NodeHandle> {
        if index >= self.len {
            return Err(SequenceError::OutOfRange {
                index,
                len: self.len,
            });
        }
        let mut current = self.node(HEAD).next;
        for _ in 0..index {
            current = self.node(current).next;
        }
        Ok(self.handle(current))
    }

    /// First node whose record has `key`
    pub fn find(&self, key: &str) -> Option<NodeHandle> {
        let mut current = self.node(HEAD).next;
        while current != TAIL {
            let node = self.node(current);
            if node.record.as_ref().map(|r| r.key()) == Some(key) {
                return Some(self.handle(current));
            }
            current = node.next;
        }
        None
    }

    /// Record held by a data node
    pub fn record(&self, handle: NodeHandle) -> SequenceResult<&S::Record> {
        let index = self.resolve_data(handle)?;
        self.node(index)
            .record
            .as_ref()
            .ok_or_else(|| SequenceError::InvalidArgument("node holds no record".to_string()))
    }

    /// Node after `handle`, `None` at the end
    pub fn next(&self, handle: NodeHandle) -> SequenceResult<Option<NodeHandle>> {
        let index = self.resolve(handle)?;
        if index == TAIL {
            return Ok(None);
        }
        Ok(self.data_handle(self.node(index).next))
    }

    /// Node before `handle`, `None` at the start
    pub fn prev(&self, handle: NodeHandle) -> SequenceResult<Option<NodeHandle>> {
        let index = self.resolve(handle)?;
        if index == HEAD {
            return Ok(None);
        }
        Ok(self.data_handle(self.node(index).prev))
    }

    /// Records from first to last
    pub fn iter(&self) -> Iter<'_, 'a, S> {
        Iter {
            view: self,
            current: self.node(HEAD).next,
        }
    }

    /// Record keys from first to last
    pub fn keys(&self) -> Vec<String> {
        self.iter().map(|r| r.key().to_string()).collect()
    }

    /// Insert `record` immediately before `reference` (the tail sentinel
    /// appends). Returns the new node.
    pub fn insert_before(
        &mut self,
        record: S::Record,
        reference: NodeHandle,
    ) -> SequenceResult<NodeHandle> {
        let reference = self.resolve(reference)?;
        if reference == HEAD {
            return Err(SequenceError::InvalidArgument(
                "cannot insert before the head sentinel".to_string(),
            ));
        }

        if !self.store.exists(record.key()) {
            return Err(SequenceError::NotFound(format!(
                "No record '{}' to order",
                record.key()
            )));
        }

        let view_rank = self.rank_of(reference);
        let reference_key = self.node(reference).record.as_ref().map(|r| r.key().to_string());
        let key = record.key().to_string();

        let entry = self.registry.database().write(|txn| {
            let fresh_rank = match reference_key {
                Some(ref k) => txn.order().position_of(k),
                None => Some(txn.order().len() as u32 + 1),
            };
            if fresh_rank != Some(view_rank) {
                return Err(SequenceError::Conflict(format!(
                    "sequence changed since view was loaded: expected rank {} for {}, found {:?}",
                    view_rank,
                    reference_key.as_deref().unwrap_or("END"),
                    fresh_rank
                )));
            }
            OrderRegistry::insert_at_in(txn, view_rank, &key)
        });

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if matches!(e, SequenceError::Conflict(_)) {
                    Logger::warn(
                        Event::SequenceConflict.as_str(),
                        &[
                            ("reason", &e.to_string()),
                            ("record_key", &key),
                            ("view_id", &self.view_id.to_string()),
                        ],
                    );
                }
                return Err(e);
            }
        };

        let index = self.link_before(reference, record);

        log_event_with_fields(
            Event::NodeInserted,
            &[
                ("position", &entry.position.to_string()),
                ("record_key", &key),
                ("view_id", &self.view_id.to_string()),
            ],
        );
        Ok(self.handle(index))
    }

    /// Insert `record` before the current first node
    pub fn insert_front(&mut self, record: S::Record) -> SequenceResult<NodeHandle> {
        let reference = self.handle(self.node(HEAD).next);
        self.insert_before(record, reference)
    }

    /// Insert `record` after the current last node
    pub fn insert_end(&mut self, record: S::Record) -> SequenceResult<NodeHandle> {
        self.insert_before(record, self.tail())
    }

    /// Remove a data node from the registry and the list, returning its
    /// record. The handle, and any copy of it, is dead afterwards.
    pub fn extract(&mut self, handle: NodeHandle) -> SequenceResult<S::Record> {
        let index = self.resolve_data(handle)?;
        let key = self
            .node(index)
            .record
            .as_ref()
            .map(|r| r.key().to_string())
            .ok_or_else(|| SequenceError::InvalidArgument("node holds no record".to_string()))?;

        let entry = self.registry.remove(&key)?;

        let record = self.unlink(index)?;

        log_event_with_fields(
            Event::NodeExtracted,
            &[
                ("position", &entry.position.to_string()),
                ("record_key", &key),
                ("view_id", &self.view_id.to_string()),
            ],
        );
        Ok(record)
    }

    fn handle(&self, index: u32) -> NodeHandle {
        NodeHandle {
            view_id: self.view_id,
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    fn data_handle(&self, index: u32) -> Option<NodeHandle> {
        if index == HEAD || index == TAIL {
            None
        } else {
            Some(self.handle(index))
        }
    }

    /// Linked node at `index`. Only called with indices reached through
    /// links or `resolve`, which always point at occupied slots.
    fn node(&self, index: u32) -> &Node<S::Record> {
        match self.slots[index as usize].node {
            Some(ref node) => node,
            None => unreachable!("link points at free slot {}", index),
        }
    }

    fn node_mut(&mut self, index: u32) -> &mut Node<S::Record> {
        match self.slots[index as usize].node {
            Some(ref mut node) => node,
            None => unreachable!("link points at free slot {}", index),
        }
    }

    fn resolve(&self, handle: NodeHandle) -> SequenceResult<u32> {
        if handle.view_id != self.view_id {
            return Err(SequenceError::InvalidArgument(format!(
                "handle belongs to view {}, not view {}",
                handle.view_id, self.view_id
            )));
        }
        let slot = self.slots.get(handle.index as usize).ok_or_else(|| {
            SequenceError::InvalidArgument(format!("no node at slot {}", handle.index))
        })?;
        if slot.generation != handle.generation || slot.node.is_none() {
            return Err(SequenceError::InvalidArgument(
                "node was extracted from this view".to_string(),
            ));
        }
        Ok(handle.index)
    }

    fn resolve_data(&self, handle: NodeHandle) -> SequenceResult<u32> {
        let index = self.resolve(handle)?;
        if index == HEAD || index == TAIL {
            return Err(SequenceError::InvalidArgument(
                "sentinel nodes hold no record".to_string(),
            ));
        }
        Ok(index)
    }

    /// 1-based rank of a linked node in this view; the tail ranks `len + 1`
    fn rank_of(&self, index: u32) -> u32 {
        let mut rank = 1;
        let mut current = self.node(HEAD).next;
        while current != index && current != TAIL {
            current = self.node(current).next;
            rank += 1;
        }
        rank
    }

    fn link_before(&mut self, reference: u32, record: S::Record) -> u32 {
        let prev = self.node(reference).prev;
        let node = Node {
            record: Some(record),
            prev,
            next: reference,
        };

        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                (self.slots.len() - 1) as u32
            }
        };

        self.node_mut(prev).next = index;
        self.node_mut(reference).prev = index;
        self.len += 1;
        index
    }

    fn unlink(&mut self, index: u32) -> SequenceResult<S::Record> {
        let slot = &mut self.slots[index as usize];
        let node = slot.node.take().ok_or_else(|| {
            SequenceError::InvalidArgument("node was extracted from this view".to_string())
        })?;
        slot.generation = slot.generation.wrapping_add(1);

        self.node_mut(node.prev).next = node.next;
        self.node_mut(node.next).prev = node.prev;
        self.free.push(index);
        self.len -= 1;

        node.record
            .ok_or_else(|| SequenceError::InvalidArgument("node holds no record".to_string()))
    }
}

/// Iterator over the records of a view, first to last
pub struct Iter<'v, 'a, S: RecordStore> {
    view: &'v SequenceView<'a, S>,
    current: u32,
}

impl<'v, 'a, S: RecordStore> Iterator for Iter<'v, 'a, S> {
    type Item = &'v S::Record;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == TAIL {
            return None;
        }
        let node = self.view.node(self.current);
        self.current = node.next;
        node.record.as_ref()
    }
}

/// `START <-> k1 <-> k2 <-> END`; for diagnostics only
impl<S: RecordStore> fmt::Display for SequenceView<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("START")?;
        for record in self.iter() {
            write!(f, " <-> {}", record.key())?;
        }
        f.write_str(" <-> END")
    }
}

impl<S: RecordStore> fmt::Debug for SequenceView<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceView")
            .field("view_id", &self.view_id)
            .field("keys", &self.keys())
            .finish()
    }
}

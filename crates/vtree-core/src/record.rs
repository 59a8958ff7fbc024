//! Per-node state records and the visible order sequence.
//!
//! The store is an arena: records live in a map keyed by [`NodeId`] and the
//! order sequence holds identifiers only. Nothing in a record points back at
//! its position, so splicing the order never touches records.

use std::collections::HashMap;

use crate::config::{ItemSize, OpennessState};
use crate::id::NodeId;
use crate::renderer::ItemExtents;
use crate::walker::NodeDescriptor;

/// The reconciler's state for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord<T> {
    pub(crate) id: NodeId,
    pub(crate) data: T,
    pub(crate) is_open: bool,
    pub(crate) is_open_by_default: bool,
    pub(crate) nesting_level: usize,
    pub(crate) height: u32,
    pub(crate) default_height: u32,
    pub(crate) is_resizing: bool,
}

impl<T> NodeRecord<T> {
    /// Build a record from a descriptor with the given initial openness.
    pub(crate) fn from_descriptor(descriptor: NodeDescriptor<T>, is_open: bool, sizing: ItemSize) -> Self {
        let default_height = resolve_default_height(sizing, descriptor.default_height);
        Self {
            id: descriptor.id,
            data: descriptor.data,
            is_open,
            is_open_by_default: descriptor.is_open_by_default,
            nesting_level: descriptor.nesting_level,
            height: default_height,
            default_height,
            is_resizing: false,
        }
    }

    /// Overwrite attributes from a fresh descriptor. Openness and the live
    /// extent are left alone.
    pub(crate) fn refresh(&mut self, descriptor: NodeDescriptor<T>, sizing: ItemSize) {
        self.data = descriptor.data;
        self.is_open_by_default = descriptor.is_open_by_default;
        self.nesting_level = descriptor.nesting_level;
        self.default_height = resolve_default_height(sizing, descriptor.default_height);
        if !sizing.is_variable() {
            self.height = self.default_height;
        }
    }

    /// Identifier of the node.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Attributes from the last descriptor received for this node.
    #[must_use]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Current openness.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Default openness from the last descriptor.
    #[must_use]
    pub fn is_open_by_default(&self) -> bool {
        self.is_open_by_default
    }

    /// Depth assigned by the traversal (0 for roots).
    #[must_use]
    pub fn nesting_level(&self) -> usize {
        self.nesting_level
    }

    /// Live extent of the row.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Extent the row resets to on a default-height rebuild.
    #[must_use]
    pub fn default_height(&self) -> u32 {
        self.default_height
    }

    /// Whether a resize of this row is being propagated to the renderer.
    #[must_use]
    pub fn is_resizing(&self) -> bool {
        self.is_resizing
    }
}

fn resolve_default_height(sizing: ItemSize, declared: Option<u32>) -> u32 {
    match sizing {
        ItemSize::Fixed(size) => size,
        ItemSize::Variable { estimated } => declared.unwrap_or(estimated),
    }
}

/// Records keyed by identifier plus the visible order sequence.
#[derive(Debug, Clone)]
pub struct RecordStore<T> {
    records: HashMap<NodeId, NodeRecord<T>>,
    order: Vec<NodeId>,
}

impl<T> Default for RecordStore<T> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T> RecordStore<T> {
    /// Look up a record.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&NodeRecord<T>> {
        self.records.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut NodeRecord<T>> {
        self.records.get_mut(id)
    }

    pub(crate) fn insert(&mut self, record: NodeRecord<T>) {
        self.records.insert(record.id.clone(), record);
    }

    /// Whether a record exists for `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Number of records (visible or not).
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// The visible order sequence.
    #[must_use]
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// All records.
    #[must_use]
    pub fn records(&self) -> &HashMap<NodeId, NodeRecord<T>> {
        &self.records
    }

    /// Position of `id` in the order sequence, if visible.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|candidate| candidate.as_str() == id)
    }

    /// End (exclusive) of the contiguous run of rows after `pos` that are
    /// nested deeper than the row at `pos`.
    #[must_use]
    pub fn subtree_end(&self, pos: usize) -> usize {
        let Some(level) = self
            .order
            .get(pos)
            .and_then(|id| self.records.get(id))
            .map(|r| r.nesting_level)
        else {
            return pos;
        };
        let mut end = pos + 1;
        while let Some(record) = self.order.get(end).and_then(|id| self.records.get(id)) {
            if record.nesting_level <= level {
                break;
            }
            end += 1;
        }
        end
    }

    /// Remove the visible descendants of the row at `pos`. Their records are
    /// kept. Returns how many rows were removed.
    pub(crate) fn collapse_at(&mut self, pos: usize) -> usize {
        let end = self.subtree_end(pos);
        self.order.drain(pos + 1..end).count()
    }

    /// Insert `ids` right after the row at `pos`.
    pub(crate) fn splice_after(&mut self, pos: usize, ids: Vec<NodeId>) {
        let at = pos + 1;
        self.order.splice(at..at, ids);
    }

    /// Swap in a freshly built order and drop every record not in `keep`.
    /// Returns how many records were dropped.
    pub(crate) fn commit(&mut self, order: Vec<NodeId>, keep: impl Fn(&NodeId) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|id, _| keep(id));
        self.order = order;
        before - self.records.len()
    }

    /// Current openness of every record.
    #[must_use]
    pub fn openness_snapshot(&self) -> OpennessState {
        self.records
            .iter()
            .map(|(id, record)| (id.clone(), record.is_open))
            .collect()
    }

    /// Read-only view for renderers.
    #[must_use]
    pub fn view(&self, sizing: ItemSize) -> TreeView<'_, T> {
        TreeView {
            order: &self.order,
            records: &self.records,
            sizing,
        }
    }
}

/// Read-only hand-off of the order sequence and records to a renderer.
#[derive(Debug)]
pub struct TreeView<'a, T> {
    order: &'a [NodeId],
    records: &'a HashMap<NodeId, NodeRecord<T>>,
    sizing: ItemSize,
}

impl<T> Clone for TreeView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TreeView<'_, T> {}

impl<'a, T> TreeView<'a, T> {
    /// Number of visible rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no row is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The visible order sequence.
    #[must_use]
    pub fn order(&self) -> &'a [NodeId] {
        self.order
    }

    /// Record of the row at `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&'a NodeRecord<T>> {
        self.order.get(index).and_then(|id| self.records.get(id))
    }

    /// Record for `id`, visible or not.
    #[must_use]
    pub fn record(&self, id: &str) -> Option<&'a NodeRecord<T>> {
        self.records.get(id)
    }

    /// Visible rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &'a NodeRecord<T>> + 'a {
        let records = self.records;
        self.order.iter().filter_map(move |id| records.get(id))
    }

    /// Row extent strategy.
    #[must_use]
    pub fn sizing(&self) -> ItemSize {
        self.sizing
    }
}

impl<T> ItemExtents for TreeView<'_, T> {
    fn item_count(&self) -> usize {
        self.order.len()
    }

    fn item_size(&self, index: usize) -> u32 {
        match self.sizing {
            ItemSize::Fixed(size) => size,
            ItemSize::Variable { estimated } => self.row(index).map_or(estimated, |r| r.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(rows: &[(&str, usize)]) -> RecordStore<()> {
        let mut store = RecordStore::default();
        let mut order = Vec::new();
        for &(id, level) in rows {
            store.insert(NodeRecord::from_descriptor(
                NodeDescriptor::new(id, level, ()),
                true,
                ItemSize::Fixed(1),
            ));
            order.push(NodeId::from(id));
        }
        store.commit(order, |_| true);
        store
    }

    fn order(store: &RecordStore<()>) -> Vec<&str> {
        store.order().iter().map(NodeId::as_str).collect()
    }

    #[test]
    fn subtree_end_stops_at_sibling() {
        let s = store(&[("a", 0), ("b", 1), ("d", 2), ("c", 1)]);
        assert_eq!(s.subtree_end(0), 4);
        assert_eq!(s.subtree_end(1), 3);
        assert_eq!(s.subtree_end(2), 3);
        assert_eq!(s.subtree_end(3), 4);
        assert_eq!(s.subtree_end(9), 9);
    }

    #[test]
    fn collapse_keeps_records() {
        let mut s = store(&[("a", 0), ("b", 1), ("d", 2), ("c", 1)]);
        assert_eq!(s.collapse_at(1), 1);
        assert_eq!(order(&s), ["a", "b", "c"]);
        assert!(s.contains("d"));
    }

    #[test]
    fn splice_after_inserts_in_place() {
        let mut s = store(&[("a", 0), ("b", 1), ("c", 1)]);
        s.splice_after(1, vec![NodeId::from("x"), NodeId::from("y")]);
        assert_eq!(order(&s), ["a", "b", "x", "y", "c"]);
    }

    #[test]
    fn commit_drops_unkept_records() {
        let mut s = store(&[("a", 0), ("b", 1)]);
        let dropped = s.commit(vec![NodeId::from("a")], |id| id.as_str() == "a");
        assert_eq!(dropped, 1);
        assert!(!s.contains("b"));
        assert_eq!(s.position("a"), Some(0));
        assert_eq!(s.position("b"), None);
    }

    #[test]
    fn view_item_sizes() {
        let mut s = store(&[("a", 0), ("b", 1)]);
        if let Some(r) = s.get_mut("b") {
            r.height = 40;
        }
        let fixed = s.view(ItemSize::Fixed(3));
        assert_eq!(fixed.item_size(1), 3);
        let variable = s.view(ItemSize::Variable { estimated: 10 });
        assert_eq!(variable.item_size(1), 40);
        assert_eq!(variable.item_size(7), 10);
        assert_eq!(variable.rows().count(), 2);
    }

    #[test]
    fn refresh_keeps_openness() {
        let sizing = ItemSize::Variable { estimated: 20 };
        let mut record = NodeRecord::from_descriptor(NodeDescriptor::new("n", 0, 1u8), false, sizing);
        assert_eq!(record.height(), 20);
        record.height = 55;
        record.refresh(
            NodeDescriptor::new("n", 1, 2u8).with_default_height(30),
            sizing,
        );
        assert_eq!(*record.data(), 2);
        assert!(!record.is_open());
        assert!(record.is_open_by_default());
        assert_eq!(record.nesting_level(), 1);
        assert_eq!(record.height(), 55);
        assert_eq!(record.default_height(), 30);
    }
}

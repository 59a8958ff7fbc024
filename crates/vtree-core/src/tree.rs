#![forbid(unsafe_code)]

//! The reconciler.
//!
//! [`VirtualTree`] drives a [`TreeSource`] to build and maintain the record
//! store and the visible order sequence.
//!
//! # Reconciliation passes
//!
//! | Pass | Trigger | Traversal | Order update |
//! |------|---------|-----------|--------------|
//! | Full rebuild | mount, new source, [`VirtualTree::recompute`] | whole tree | rebuilt, swapped at the end |
//! | Open | [`VirtualTree::toggle`] / [`VirtualTree::set_open`] | one subtree, discovery mode | spliced after the node |
//! | Close | [`VirtualTree::toggle`] / [`VirtualTree::set_open`] | none | contiguous run drained |
//! | Resize | [`VirtualTree::resize`] | none | unchanged, renderer reset from the row |
//!
//! # Invariants
//!
//! 1. The order sequence never holds an identifier twice.
//! 2. A row is in the order iff every ancestor is open.
//! 3. Every identifier in the order has a record.
//! 4. After a full rebuild, records exist exactly for the visited nodes.
//! 5. Closing a node keeps the records of its descendants, so reopening
//!    restores the subtree without re-reading their attributes.
//!
//! Every pass takes `&mut self` and completes before returning, so readers
//! only ever observe the state before or after a pass.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{ConfigError, ItemSize, OpennessState, RecomputeOptions, TreeConfig};
use crate::id::NodeId;
use crate::record::{NodeRecord, RecordStore, TreeView};
use crate::renderer::{Align, NoRenderer, WindowedRenderer};
use crate::walker::{Resume, Step, TreeSource};

/// Shared handle to a traversal source.
///
/// Sources are compared by pointer identity: handing the same `Arc` to
/// [`VirtualTree::set_source`] again does not trigger a rebuild.
pub type SharedSource<T> = Arc<dyn TreeSource<T>>;

/// Which pass produced a [`Reconciliation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileKind {
    /// Full rebuild of the order sequence.
    Rebuild,
    /// A node was opened and its subtree spliced in.
    Open,
    /// A node was closed and its subtree drained.
    Close,
}

/// Summary of a completed reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// Which pass ran.
    pub kind: ReconcileKind,
    /// Nodes the traversal visited and kept.
    pub visited: usize,
    /// Records created during the pass.
    pub created: usize,
    /// Records dropped during the pass.
    pub dropped: usize,
    /// Rows added to the order sequence.
    pub rows_inserted: usize,
    /// Rows removed from the order sequence.
    pub rows_removed: usize,
    /// Length of the order sequence after the pass.
    pub order_len: usize,
}

impl Reconciliation {
    fn new(kind: ReconcileKind) -> Self {
        Self {
            kind,
            visited: 0,
            created: 0,
            dropped: 0,
            rows_inserted: 0,
            rows_removed: 0,
            order_len: 0,
        }
    }
}

/// Openness policy for one rebuild.
struct OpennessPolicy<'a> {
    use_default: bool,
    overrides: Option<&'a OpennessState>,
}

impl OpennessPolicy<'_> {
    /// Openness for a record that already exists.
    fn existing<T>(&self, record: &NodeRecord<T>) -> bool {
        if self.use_default {
            return record.is_open_by_default;
        }
        self.overrides
            .and_then(|o| o.get(record.id.as_str()).copied())
            .unwrap_or(record.is_open)
    }

    /// Apply the policy to an existing record and return its openness.
    fn settle<T>(&self, record: &mut NodeRecord<T>, reset_height: bool) -> bool {
        record.is_open = self.existing(record);
        if reset_height {
            record.height = record.default_height;
        }
        record.is_open
    }

    /// Openness override for a record about to be created.
    fn created(&self, id: &str) -> Option<bool> {
        if self.use_default {
            return None;
        }
        self.overrides.and_then(|o| o.get(id).copied())
    }
}

/// Result of one complete traversal.
struct Pass {
    order: Vec<NodeId>,
    visited: HashSet<NodeId>,
    created: usize,
}

/// Flattened, openness-aware view of a lazily walked tree.
///
/// `T` is the caller's attribute payload; `R` is the windowed renderer the
/// tree hands its order sequence to.
pub struct VirtualTree<T, R = NoRenderer> {
    source: SharedSource<T>,
    store: RecordStore<T>,
    config: TreeConfig,
    renderer: R,
    /// Openness overrides whose nodes were not reached by the rebuild that
    /// supplied them; applied when those nodes are first created.
    pending_openness: OpennessState,
}

impl<T> VirtualTree<T> {
    /// Build a headless tree and run the initial full rebuild.
    pub fn new(source: SharedSource<T>, config: TreeConfig) -> Result<Self, ConfigError> {
        Self::with_renderer(source, config, NoRenderer)
    }
}

impl<T, R: WindowedRenderer> VirtualTree<T, R> {
    /// Build a tree that drives `renderer` and run the initial full rebuild.
    pub fn with_renderer(
        source: SharedSource<T>,
        config: TreeConfig,
        renderer: R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut tree = Self {
            source,
            store: RecordStore::default(),
            config,
            renderer,
            pending_openness: OpennessState::new(),
        };
        tree.rebuild(true, &RecomputeOptions::default());
        Ok(tree)
    }

    /// The configuration this tree was built with.
    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The current traversal source.
    #[must_use]
    pub fn source(&self) -> &SharedSource<T> {
        &self.source
    }

    /// The renderer.
    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Mutable access to the renderer (viewport changes, scrolling by hand).
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// The record store.
    #[must_use]
    pub fn store(&self) -> &RecordStore<T> {
        &self.store
    }

    /// The visible order sequence.
    #[must_use]
    pub fn order(&self) -> &[NodeId] {
        self.store.order()
    }

    /// Record for `id`, visible or not.
    #[must_use]
    pub fn record(&self, id: &str) -> Option<&NodeRecord<T>> {
        self.store.get(id)
    }

    /// Read-only hand-off for renderers.
    #[must_use]
    pub fn view(&self) -> TreeView<'_, T> {
        self.store.view(self.config.item_size)
    }

    /// Extent of the row for `id`.
    #[must_use]
    pub fn extent(&self, id: &str) -> Option<u32> {
        let record = self.store.get(id)?;
        Some(match self.config.item_size {
            ItemSize::Fixed(size) => size,
            ItemSize::Variable { .. } => record.height,
        })
    }

    /// Current openness of every record.
    #[must_use]
    pub fn openness_snapshot(&self) -> OpennessState {
        self.store.openness_snapshot()
    }

    /// Replace the traversal source.
    ///
    /// A different source forces a full rebuild in discovery mode. The same
    /// `Arc` is a no-op and returns `None`.
    pub fn set_source(&mut self, source: SharedSource<T>) -> Option<Reconciliation> {
        if std::ptr::addr_eq(Arc::as_ptr(&self.source), Arc::as_ptr(&source)) {
            return None;
        }
        self.source = source;
        Some(self.rebuild(true, &RecomputeOptions::default()))
    }

    /// Run a full rebuild.
    ///
    /// Discovery mode is used when `options.refresh_nodes` is set, otherwise
    /// the traversal runs in identifier-only mode.
    pub fn recompute(&mut self, options: RecomputeOptions) -> Reconciliation {
        self.rebuild(options.refresh_nodes, &options)
    }

    /// Flip the openness of `id`. Unknown identifiers are a no-op.
    pub fn toggle(&mut self, id: &str) -> Option<Reconciliation> {
        let open = !self.store.get(id)?.is_open;
        Some(self.apply_openness(id, open))
    }

    /// Open or close `id`. Unknown identifiers are a no-op; setting the
    /// current state changes nothing.
    pub fn set_open(&mut self, id: &str, open: bool) -> Option<Reconciliation> {
        let record = self.store.get(id)?;
        if record.is_open == open {
            let mut report = Reconciliation::new(if open {
                ReconcileKind::Open
            } else {
                ReconcileKind::Close
            });
            report.order_len = self.store.order().len();
            return Some(report);
        }
        Some(self.apply_openness(id, open))
    }

    /// Change the extent of `id` in variable-size mode.
    ///
    /// The record is flagged as resizing while the renderer drops cached
    /// offsets from the row onward. Returns `false` for unknown identifiers
    /// and in fixed-size mode.
    pub fn resize(&mut self, id: &str, height: u32, force_update: bool) -> bool {
        if !self.config.item_size.is_variable() {
            crate::debug!(id, "resize ignored in fixed-size mode");
            return false;
        }
        let Some(record) = self.store.get_mut(id) else {
            return false;
        };
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("vtree_reconcile", kind = "resize", id, height).entered();

        record.height = height;
        record.is_resizing = true;
        if let Some(pos) = self.store.position(id) {
            let view = self.store.view(self.config.item_size);
            self.renderer.reset_after_index(pos, &view, force_update);
        }
        if let Some(record) = self.store.get_mut(id) {
            record.is_resizing = false;
        }
        true
    }

    /// Scroll the renderer to an absolute offset.
    pub fn scroll_to(&mut self, offset: u64) {
        self.renderer.scroll_to(offset);
    }

    /// Scroll the row for `id` into view. Returns `false` without scrolling
    /// when the node is not visible.
    pub fn scroll_to_item(&mut self, id: &str, align: Align) -> bool {
        let Some(pos) = self.store.position(id) else {
            return false;
        };
        self.renderer.scroll_to_item(pos, align);
        true
    }

    // ------------------------------------------------------------------------
    // Full rebuild
    // ------------------------------------------------------------------------

    fn rebuild(&mut self, refresh: bool, options: &RecomputeOptions) -> Reconciliation {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "vtree_reconcile",
            kind = "rebuild",
            refresh,
            use_default_openness = options.use_default_openness,
            use_default_height = options.use_default_height
        )
        .entered();

        let policy = OpennessPolicy {
            use_default: options.use_default_openness,
            overrides: options.openness_state.as_ref(),
        };
        if options.use_default_openness {
            self.pending_openness.clear();
        }

        let source = Arc::clone(&self.source);
        let mut discover = refresh;
        let pass = loop {
            match self.walk_all(&*source, discover, refresh, &policy, options) {
                Ok(pass) => break pass,
                Err(id) => {
                    // Opening a node whose descendants were never discovered
                    // (or were dropped) needs their descriptors.
                    crate::debug!(%id, "unknown identifier, rediscovering");
                    discover = true;
                }
            }
        };
        let Pass {
            order,
            visited,
            created,
        } = pass;

        // Overrides live until the next rebuild.
        self.pending_openness = match policy.overrides.filter(|_| !policy.use_default) {
            Some(overrides) => overrides
                .iter()
                .filter(|(id, _)| !visited.contains(*id))
                .map(|(id, open)| (id.clone(), *open))
                .collect(),
            None => OpennessState::new(),
        };

        let mut report = Reconciliation::new(ReconcileKind::Rebuild);
        report.created = created;
        report.visited = visited.len();
        report.rows_inserted = order.len();
        report.rows_removed = self.store.order().len();
        report.dropped = self.store.commit(order, |id| visited.contains(id));
        report.order_len = self.store.order().len();

        crate::debug!(
            visited = report.visited,
            created = report.created,
            dropped = report.dropped,
            rows = report.order_len,
            discover,
            "full rebuild committed"
        );

        self.sync_renderer();
        report
    }

    /// Walk the whole tree once and collect the new order.
    ///
    /// In identifier-only mode the walk stops at the first identifier without
    /// a record and returns it; records touched so far keep the openness the
    /// policy gave them, so rerunning the pass is idempotent.
    fn walk_all(
        &mut self,
        source: &dyn TreeSource<T>,
        discover: bool,
        refresh: bool,
        policy: &OpennessPolicy<'_>,
        options: &RecomputeOptions,
    ) -> Result<Pass, NodeId> {
        let sizing = self.config.item_size;
        let reset_height = options.use_default_height && sizing.is_variable();

        let mut pass = Pass {
            order: Vec::with_capacity(self.store.order().len()),
            visited: HashSet::with_capacity(self.store.record_count()),
            created: 0,
        };
        let mut closed_at: Option<usize> = None;
        let mut resume = Resume::Start;
        let mut walker = source.walk(discover);

        while let Some(step) = walker.next(resume) {
            let level = match &step {
                Step::Node(descriptor) => descriptor.nesting_level,
                Step::Id(id) => match self.store.get(id.as_str()) {
                    Some(record) => record.nesting_level,
                    None => return Err(id.clone()),
                },
            };

            if let Some(limit) = closed_at {
                if level > limit {
                    resume = Resume::Closed;
                    continue;
                }
                closed_at = None;
            }

            if pass.visited.contains(step.id()) {
                crate::warn!(id = %step.id(), "identifier yielded twice in one traversal");
                resume = Resume::Closed;
                continue;
            }

            let id = step.id().clone();
            let is_open = match step {
                Step::Node(descriptor) => match self.store.get_mut(descriptor.id.as_str()) {
                    Some(record) => {
                        if refresh {
                            record.refresh(descriptor, sizing);
                        } else {
                            record.nesting_level = descriptor.nesting_level;
                        }
                        policy.settle(record, reset_height)
                    }
                    None => {
                        let is_open = policy
                            .created(descriptor.id.as_str())
                            .or_else(|| self.pending_openness.remove(descriptor.id.as_str()))
                            .unwrap_or(descriptor.is_open_by_default);
                        self.store
                            .insert(NodeRecord::from_descriptor(descriptor, is_open, sizing));
                        pass.created += 1;
                        is_open
                    }
                },
                Step::Id(id) => match self.store.get_mut(id.as_str()) {
                    Some(record) => policy.settle(record, reset_height),
                    None => return Err(id),
                },
            };

            if !is_open {
                closed_at = Some(level);
            }
            resume = Resume::from_open(is_open);
            pass.visited.insert(id.clone());
            pass.order.push(id);
        }
        Ok(pass)
    }

    // ------------------------------------------------------------------------
    // Single-node passes
    // ------------------------------------------------------------------------

    fn apply_openness(&mut self, id: &str, open: bool) -> Reconciliation {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "vtree_reconcile",
            kind = if open { "open" } else { "close" },
            id
        )
        .entered();

        let mut report = Reconciliation::new(if open {
            ReconcileKind::Open
        } else {
            ReconcileKind::Close
        });
        if let Some(record) = self.store.get_mut(id) {
            record.is_open = open;
        }

        match self.store.position(id) {
            Some(pos) if open => self.expand(pos, &mut report),
            Some(pos) => report.rows_removed = self.store.collapse_at(pos),
            // Hidden behind a closed ancestor: only the record changes.
            None => {}
        }

        report.order_len = self.store.order().len();
        if report.rows_inserted > 0 || report.rows_removed > 0 {
            self.sync_renderer();
        }
        report
    }

    /// Discover the subtree of the row at `pos` and splice it in after it.
    fn expand(&mut self, pos: usize, report: &mut Reconciliation) {
        let Some(root) = self.store.order().get(pos).cloned() else {
            return;
        };
        let Some(root_level) = self.store.get(root.as_str()).map(|r| r.nesting_level) else {
            return;
        };
        let sizing = self.config.item_size;

        let source = Arc::clone(&self.source);
        let mut walker = source
            .walk_subtree(&root, true)
            .unwrap_or_else(|| source.walk(true));

        let mut inside = false;
        let mut discovered: Vec<NodeId> = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut closed_at: Option<usize> = None;
        let mut resume = Resume::Start;

        while let Some(step) = walker.next(resume) {
            if !inside {
                // Walk the prefix of the tree as it is currently displayed
                // until the node being opened comes up.
                if *step.id() == root {
                    inside = true;
                    resume = Resume::Open;
                } else {
                    let open = self.store.get(step.id().as_str()).is_some_and(|r| r.is_open);
                    resume = Resume::from_open(open);
                }
                continue;
            }

            let level = match &step {
                Step::Node(descriptor) => descriptor.nesting_level,
                Step::Id(id) => match self.store.get(id.as_str()) {
                    Some(record) => record.nesting_level,
                    None => {
                        resume = Resume::Closed;
                        continue;
                    }
                },
            };
            if level <= root_level {
                break;
            }
            if let Some(limit) = closed_at {
                if level > limit {
                    resume = Resume::Closed;
                    continue;
                }
                closed_at = None;
            }
            if seen.contains(step.id()) {
                crate::warn!(id = %step.id(), "identifier yielded twice in one subtree");
                resume = Resume::Closed;
                continue;
            }

            let id = step.id().clone();
            let is_open = match step {
                Step::Node(descriptor) => match self.store.get_mut(descriptor.id.as_str()) {
                    Some(record) => {
                        record.nesting_level = descriptor.nesting_level;
                        record.is_open
                    }
                    None => {
                        let is_open = self
                            .pending_openness
                            .remove(descriptor.id.as_str())
                            .unwrap_or(descriptor.is_open_by_default);
                        self.store
                            .insert(NodeRecord::from_descriptor(descriptor, is_open, sizing));
                        report.created += 1;
                        is_open
                    }
                },
                Step::Id(id) => self.store.get(id.as_str()).is_some_and(|r| r.is_open),
            };

            crate::trace!(%id, is_open, "discovered");
            if !is_open {
                closed_at = Some(level);
            }
            resume = Resume::from_open(is_open);
            seen.insert(id.clone());
            discovered.push(id);
        }
        drop(walker);

        if !inside {
            crate::warn!(%root, "opened node was not reached by the traversal");
        }
        report.visited = discovered.len();
        report.rows_inserted = discovered.len();
        self.store.splice_after(pos, discovered);
    }

    fn sync_renderer(&mut self) {
        let view = self.store.view(self.config.item_size);
        self.renderer.sync(&view);
    }
}

impl<T: std::fmt::Debug, R: std::fmt::Debug> std::fmt::Debug for VirtualTree<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualTree")
            .field("config", &self.config)
            .field("order", &self.store.order())
            .field("records", &self.store.record_count())
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

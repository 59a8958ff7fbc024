#![forbid(unsafe_code)]

//! Headless windowed list.
//!
//! [`VirtualList`] is a [`WindowedRenderer`] that keeps the extents of every
//! row in a [`FenwickTree`], tracks a scroll offset, and computes which rows
//! intersect the viewport. It paints nothing: hosts ask for
//! [`VirtualList::render_range`] or hand a row callback to
//! [`VirtualList::render_rows`].
//!
//! # Example
//!
//! ```
//! use vtree_core::{Align, WindowedRenderer};
//! use vtree_window::{VirtualList, WindowConfig};
//!
//! let mut list = VirtualList::new(WindowConfig::new(50).with_overscan(0)).unwrap();
//! list.sync(&vec![20u32; 10]);
//! assert_eq!(list.visible_range(), 0..3);
//!
//! list.scroll_to_item(9, Align::End);
//! assert_eq!(list.scroll_offset(), 150);
//! assert_eq!(list.visible_range(), 7..10);
//! ```

use std::ops::Range;

use vtree_core::{Align, ConfigError, ItemExtents, NodeRecord, TreeView, WindowedRenderer};

use crate::fenwick::FenwickTree;

/// Viewport configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Extent of the viewport along the scroll axis.
    pub viewport: u32,
    /// Rows rendered beyond each edge of the viewport.
    pub overscan: usize,
}

impl WindowConfig {
    /// Viewport of the given extent with the default overscan of 2 rows.
    pub fn new(viewport: u32) -> Self {
        Self {
            viewport,
            overscan: 2,
        }
    }

    /// Set the overscan row count.
    #[must_use]
    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    /// Reject an empty viewport.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport == 0 {
            return Err(ConfigError::ZeroViewport);
        }
        Ok(())
    }
}

/// Placement of one row inside the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSlot {
    /// Position in the order sequence.
    pub index: usize,
    /// Offset of the row's leading edge from the top of the list.
    pub offset: u64,
    /// Extent of the row.
    pub extent: u32,
}

/// Scroll state plus an offset index over row extents.
#[derive(Debug, Clone)]
pub struct VirtualList {
    config: WindowConfig,
    offsets: FenwickTree,
    scroll_offset: u64,
    repaint: bool,
}

impl VirtualList {
    /// Create an empty list.
    pub fn new(config: WindowConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            offsets: FenwickTree::default(),
            scroll_offset: 0,
            repaint: true,
        })
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Change the viewport extent, keeping the scroll offset in range.
    pub fn set_viewport(&mut self, viewport: u32) -> Result<(), ConfigError> {
        let config = WindowConfig {
            viewport,
            ..self.config
        };
        config.validate()?;
        self.config = config;
        self.clamp_scroll();
        self.repaint = true;
        Ok(())
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the list has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Sum of all row extents.
    #[must_use]
    pub fn total_extent(&self) -> u64 {
        self.offsets.total()
    }

    /// Current scroll offset.
    #[must_use]
    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    /// Largest offset that still fills the viewport.
    #[must_use]
    pub fn max_scroll_offset(&self) -> u64 {
        self.offsets
            .total()
            .saturating_sub(u64::from(self.config.viewport))
    }

    /// Placement of row `index`, if it exists.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<RowSlot> {
        let extent = self.offsets.get(index)?;
        Some(RowSlot {
            index,
            offset: self.offsets.start_of(index),
            extent,
        })
    }

    /// Scroll by a signed delta, clamped to the valid range.
    pub fn scroll_by(&mut self, delta: i64) {
        let target = if delta < 0 {
            self.scroll_offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.scroll_offset.saturating_add(delta.unsigned_abs())
        };
        self.scroll_to(target);
    }

    /// Rows intersecting the viewport.
    #[must_use]
    pub fn visible_range(&self) -> Range<usize> {
        if self.is_empty() {
            return 0..0;
        }
        let len = self.len();
        let start = self.offsets.row_at(self.scroll_offset).min(len);
        let last = self.scroll_offset + u64::from(self.config.viewport) - 1;
        let end = (self.offsets.row_at(last) + 1).min(len);
        start..end.max(start)
    }

    /// Visible rows widened by the overscan on each side.
    #[must_use]
    pub fn render_range(&self) -> Range<usize> {
        let visible = self.visible_range();
        let start = visible.start.saturating_sub(self.config.overscan);
        let end = (visible.end + self.config.overscan).min(self.len());
        start..end
    }

    /// Call `render` for every row in the render range with its placement
    /// and record. Rows the view does not know are skipped.
    pub fn render_rows<T, F>(&self, view: &TreeView<'_, T>, mut render: F)
    where
        F: FnMut(RowSlot, &NodeRecord<T>),
    {
        for index in self.render_range() {
            if let (Some(slot), Some(record)) = (self.slot(index), view.row(index)) {
                render(slot, record);
            }
        }
    }

    /// Whether something changed since the last call, clearing the flag.
    pub fn take_repaint(&mut self) -> bool {
        std::mem::take(&mut self.repaint)
    }

    /// Scroll offset that brings row `index` into view with `align`.
    ///
    /// Indices past the end are clamped to the last row.
    #[must_use]
    pub fn offset_for_item(&self, index: usize, align: Align) -> u64 {
        let Some(index) = self.len().checked_sub(1).map(|last| index.min(last)) else {
            return 0;
        };
        let viewport = u64::from(self.config.viewport);
        let start = self.offsets.start_of(index);
        let end = self.offsets.end_of(index);
        let max_scroll = self.max_scroll_offset();

        // Item flush with the leading edge, and flush with the trailing edge.
        let leading = start.min(max_scroll);
        let trailing = end.saturating_sub(viewport);
        let current = self.scroll_offset;

        let align = match align {
            Align::Smart if current + viewport >= trailing && current <= leading + viewport => {
                Align::Auto
            }
            Align::Smart => Align::Center,
            other => other,
        };

        match align {
            Align::Start => leading,
            Align::End => trailing,
            Align::Center => (leading + trailing).div_ceil(2).min(max_scroll),
            _ if (trailing..=leading).contains(&current) => current,
            _ if current < trailing => trailing,
            _ => leading,
        }
    }

    fn clamp_scroll(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.max_scroll_offset());
    }
}

fn collect_extents(items: &dyn ItemExtents) -> Vec<u32> {
    (0..items.item_count()).map(|i| items.item_size(i)).collect()
}

impl WindowedRenderer for VirtualList {
    fn sync(&mut self, items: &dyn ItemExtents) {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("vtree_window_sync", rows = items.item_count()).entered();

        self.offsets = FenwickTree::from_extents(&collect_extents(items));
        self.clamp_scroll();
        self.repaint = true;
        vtree_core::debug!(
            rows = self.len(),
            total = self.total_extent(),
            "window synced"
        );
    }

    fn scroll_to(&mut self, offset: u64) {
        let offset = offset.min(self.max_scroll_offset());
        if offset != self.scroll_offset {
            self.scroll_offset = offset;
            self.repaint = true;
        }
    }

    fn scroll_to_item(&mut self, index: usize, align: Align) {
        let offset = self.offset_for_item(index, align);
        self.scroll_to(offset);
    }

    fn reset_after_index(&mut self, index: usize, items: &dyn ItemExtents, force_update: bool) {
        if items.item_count() != self.len() {
            self.sync(items);
            return;
        }
        for i in index..self.len() {
            self.offsets.set(i, items.item_size(i));
        }
        self.clamp_scroll();
        vtree_core::trace!(index, force_update, "offsets reset");
        if force_update {
            self.repaint = true;
        }
    }
}

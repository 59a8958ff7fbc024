//! Seams to the windowed renderer and its size provider.
//!
//! The reconciler owns the order sequence and records; a renderer only reads
//! them. After every committed reconciliation the reconciler calls
//! [`WindowedRenderer::sync`] with the new extents. When a single row is
//! resized in variable-size mode it calls
//! [`WindowedRenderer::reset_after_index`] instead, so cached offsets are
//! re-measured from that row onward.

/// Alignment for [`WindowedRenderer::scroll_to_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    /// Scroll the minimum distance that brings the item into view.
    #[default]
    Auto,
    /// Like `Auto` when the item is close, `Center` when it is far away.
    Smart,
    /// Center the item in the viewport.
    Center,
    /// Align the item's end with the viewport end.
    End,
    /// Align the item's start with the viewport start.
    Start,
}

/// Row count and per-row extents of a flattened tree.
pub trait ItemExtents {
    /// Number of rows.
    fn item_count(&self) -> usize;

    /// Extent of the row at `index`.
    fn item_size(&self, index: usize) -> u32;
}

impl ItemExtents for Vec<u32> {
    fn item_count(&self) -> usize {
        self.len()
    }

    fn item_size(&self, index: usize) -> u32 {
        self.get(index).copied().unwrap_or(0)
    }
}

impl<const N: usize> ItemExtents for [u32; N] {
    fn item_count(&self) -> usize {
        N
    }

    fn item_size(&self, index: usize) -> u32 {
        self.get(index).copied().unwrap_or(0)
    }
}

/// A component that paints only the visible rows of a long list.
pub trait WindowedRenderer {
    /// Take the row count and extents of a freshly committed order sequence.
    fn sync(&mut self, items: &dyn ItemExtents);

    /// Scroll to an absolute offset.
    fn scroll_to(&mut self, offset: u64);

    /// Scroll the row at `index` into view.
    fn scroll_to_item(&mut self, index: usize, align: Align);

    /// Drop cached offsets from `index` onward and re-read extents from
    /// `items` when they are next needed. `force_update` asks for an
    /// immediate re-layout instead of a lazy one.
    fn reset_after_index(&mut self, index: usize, items: &dyn ItemExtents, force_update: bool) {
        let _ = (index, items, force_update);
    }
}

/// Renderer that ignores every call, for headless reconciliation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRenderer;

impl WindowedRenderer for NoRenderer {
    fn sync(&mut self, _items: &dyn ItemExtents) {}

    fn scroll_to(&mut self, _offset: u64) {}

    fn scroll_to_item(&mut self, _index: usize, _align: Align) {}
}

#![forbid(unsafe_code)]

//! Headless windowed renderer for `vtree-core`.
//!
//! - [`VirtualList`]: scroll state, visible-range math and row placement.
//! - [`FenwickTree`]: the prefix-sum offset index behind it.

pub mod fenwick;
pub mod virtual_list;

pub use fenwick::FenwickTree;
pub use virtual_list::{RowSlot, VirtualList, WindowConfig};

#![forbid(unsafe_code)]

//! Reconciliation core for virtualized trees.
//!
//! A caller describes its hierarchy through a resumable traversal
//! ([`TreeSource`] / [`TreeWalker`]). [`VirtualTree`] walks it, keeps one
//! [`NodeRecord`] per discovered node, and maintains the flat order sequence
//! of visible rows that a [`WindowedRenderer`] draws from.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vtree_core::{NodeId, SharedSource, StackSource, TreeConfig, VirtualTree, WalkNode};
//!
//! struct Dir {
//!     name: &'static str,
//!     children: Vec<Dir>,
//! }
//!
//! impl WalkNode for Dir {
//!     type Data = &'static str;
//!     fn id(&self) -> NodeId {
//!         NodeId::from(self.name)
//!     }
//!     fn children(&self) -> &[Self] {
//!         &self.children
//!     }
//!     fn data(&self, _nesting_level: usize) -> &'static str {
//!         self.name
//!     }
//! }
//!
//! let root = Dir {
//!     name: "src",
//!     children: vec![Dir { name: "lib.rs", children: vec![] }],
//! };
//! let source: SharedSource<&'static str> = Arc::new(StackSource::new(vec![root]));
//! let mut tree = VirtualTree::new(source, TreeConfig::fixed(1)).unwrap();
//! assert_eq!(tree.order().len(), 2);
//!
//! tree.toggle("src");
//! assert_eq!(tree.order().len(), 1);
//! ```

pub mod config;
pub mod id;
pub mod logging;
pub mod record;
pub mod renderer;
pub mod tree;
pub mod walker;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, trace, warn};

pub use config::{ConfigError, ItemSize, OpennessState, RecomputeOptions, TreeConfig};
pub use id::NodeId;
pub use record::{NodeRecord, RecordStore, TreeView};
pub use renderer::{Align, ItemExtents, NoRenderer, WindowedRenderer};
pub use tree::{ReconcileKind, Reconciliation, SharedSource, VirtualTree};
pub use walker::{
    NodeDescriptor, Resume, StackSource, StackWalker, Step, TreeSource, TreeWalker, WalkNode,
};

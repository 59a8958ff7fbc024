//! Tree configuration and rebuild options.

use std::collections::HashMap;
use std::fmt;

use crate::id::NodeId;

/// Mapping from identifier to desired openness.
pub type OpennessState = HashMap<NodeId, bool>;

/// Extent strategy for rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSize {
    /// Every row has the same extent.
    Fixed(u32),
    /// Rows carry their own extent, starting from the descriptor's default
    /// height or `estimated` when the descriptor has none.
    Variable {
        /// Extent used for nodes without a default height.
        estimated: u32,
    },
}

impl ItemSize {
    /// Whether rows carry per-node extents.
    #[must_use]
    pub const fn is_variable(&self) -> bool {
        matches!(self, Self::Variable { .. })
    }
}

impl Default for ItemSize {
    fn default() -> Self {
        Self::Fixed(1)
    }
}

/// Configuration for a [`VirtualTree`](crate::VirtualTree).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeConfig {
    /// Row extent strategy.
    pub item_size: ItemSize,
}

impl TreeConfig {
    /// Fixed-size rows of `size` units.
    #[must_use]
    pub fn fixed(size: u32) -> Self {
        Self {
            item_size: ItemSize::Fixed(size),
        }
    }

    /// Variable-size rows with an estimated extent for unmeasured nodes.
    #[must_use]
    pub fn variable(estimated: u32) -> Self {
        Self {
            item_size: ItemSize::Variable { estimated },
        }
    }

    /// Set the row extent strategy.
    #[must_use]
    pub fn with_item_size(mut self, item_size: ItemSize) -> Self {
        self.item_size = item_size;
        self
    }

    /// Check the configuration for values the renderer cannot lay out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.item_size {
            ItemSize::Fixed(0) => Err(ConfigError::ZeroItemSize),
            ItemSize::Variable { estimated: 0 } => Err(ConfigError::ZeroEstimatedSize),
            _ => Ok(()),
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Fixed item size of zero.
    ZeroItemSize,
    /// Variable-size estimate of zero.
    ZeroEstimatedSize,
    /// Viewport with zero extent.
    ZeroViewport,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroItemSize => write!(f, "fixed item size must be greater than zero"),
            Self::ZeroEstimatedSize => {
                write!(f, "estimated item size must be greater than zero")
            }
            Self::ZeroViewport => write!(f, "viewport extent must be greater than zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Options for a full rebuild.
///
/// `Default` gives a plain order recompute: identifier-only traversal that
/// keeps every record's attributes and openness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecomputeOptions {
    /// Re-read node attributes (discovery-mode traversal).
    pub refresh_nodes: bool,
    /// Reset every node's openness to its default.
    ///
    /// Takes precedence over [`RecomputeOptions::openness_state`].
    pub use_default_openness: bool,
    /// Reset every node's extent to its default (variable-size only).
    pub use_default_height: bool,
    /// Explicit openness per identifier.
    ///
    /// Entries for nodes this rebuild does not reach are held until the next
    /// rebuild and applied if one of those nodes is created by a toggle in
    /// between. Entries that never match a node are ignored.
    pub openness_state: Option<OpennessState>,
}

impl RecomputeOptions {
    /// Options that re-read node attributes.
    #[must_use]
    pub fn refresh() -> Self {
        Self {
            refresh_nodes: true,
            ..Self::default()
        }
    }

    /// Set whether node attributes are re-read.
    #[must_use]
    pub fn with_refresh_nodes(mut self, refresh: bool) -> Self {
        self.refresh_nodes = refresh;
        self
    }

    /// Set whether openness resets to node defaults.
    #[must_use]
    pub fn with_default_openness(mut self, reset: bool) -> Self {
        self.use_default_openness = reset;
        self
    }

    /// Set whether extents reset to node defaults.
    #[must_use]
    pub fn with_default_height(mut self, reset: bool) -> Self {
        self.use_default_height = reset;
        self
    }

    /// Set explicit openness for the given identifiers.
    #[must_use]
    pub fn with_openness<I, K>(mut self, state: I) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<NodeId>,
    {
        self.openness_state = Some(state.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }
}

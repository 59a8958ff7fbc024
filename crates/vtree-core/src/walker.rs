//! Traversal protocol between the reconciler and a caller-supplied tree.
//!
//! A traversal is a resumable, two-way cursor. The reconciler calls
//! [`TreeWalker::next`] repeatedly; each call passes in the openness of the
//! node returned by the previous call and receives the next node in
//! depth-first pre-order, or `None` once the traversal is exhausted.
//!
//! ```text
//!   reconciler                       walker
//!   ──────────                       ──────
//!   next(Resume::Start)      ──▶     Step::Node(root)
//!   next(Resume::Open)       ──▶     Step::Node(root/child-a)    descend
//!   next(Resume::Closed)     ──▶     Step::Node(root/child-b)    skip a's children
//!   next(Resume::Open)       ──▶     None                        done
//! ```
//!
//! Walkers run in one of two modes, chosen by the `refresh` flag handed to
//! [`TreeSource::walk`]:
//!
//! - **Discovery** (`refresh == true`): every step is a full
//!   [`NodeDescriptor`], so the reconciler can create or refresh records.
//! - **Identifier-only** (`refresh == false`): every step is just the
//!   [`NodeId`]; attributes come from records the reconciler already holds.
//!
//! A walker must only yield a node's descendants when the resume value that
//! follows the node is open. [`Resume::Start`] is the "not yet known"
//! sentinel; walkers treat it as the node's own default.
//!
//! [`StackWalker`] is a ready-made cursor for in-memory hierarchies. It keeps
//! an explicit work stack of sibling slices and child cursors instead of
//! recursion.

use crate::id::NodeId;

/// Value passed into a walker when it is resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resume {
    /// No decision is known yet (first call of a traversal).
    #[default]
    Start,
    /// The node returned by the previous step is open.
    Open,
    /// The node returned by the previous step is closed.
    Closed,
}

impl Resume {
    /// Convert a boolean openness into a resume value.
    #[must_use]
    pub const fn from_open(open: bool) -> Self {
        if open { Self::Open } else { Self::Closed }
    }

    /// Openness carried by this value, falling back to `default` for
    /// [`Resume::Start`].
    #[must_use]
    pub const fn is_open_or(self, default: bool) -> bool {
        match self {
            Self::Start => default,
            Self::Open => true,
            Self::Closed => false,
        }
    }
}

/// Caller-supplied payload for a node, produced in discovery mode.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDescriptor<T> {
    /// Unique identifier of the node.
    pub id: NodeId,
    /// Depth of the node (0 for roots).
    pub nesting_level: usize,
    /// Whether the node starts out open.
    pub is_open_by_default: bool,
    /// Default extent for variable-size trees.
    pub default_height: Option<u32>,
    /// Caller-defined attributes.
    pub data: T,
}

impl<T> NodeDescriptor<T> {
    /// Create a descriptor that is open by default and has no default height.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, nesting_level: usize, data: T) -> Self {
        Self {
            id: id.into(),
            nesting_level,
            is_open_by_default: true,
            default_height: None,
            data,
        }
    }

    /// Set whether the node starts out open.
    #[must_use]
    pub fn with_open_by_default(mut self, open: bool) -> Self {
        self.is_open_by_default = open;
        self
    }

    /// Set the default extent used in variable-size mode.
    #[must_use]
    pub fn with_default_height(mut self, height: u32) -> Self {
        self.default_height = Some(height);
        self
    }
}

/// One step of a traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    /// Discovery mode: a full descriptor.
    Node(NodeDescriptor<T>),
    /// Identifier-only mode: the engine already holds the attributes.
    Id(NodeId),
}

impl<T> Step<T> {
    /// Identifier of the yielded node.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        match self {
            Self::Node(descriptor) => &descriptor.id,
            Self::Id(id) => id,
        }
    }
}

/// A resumable traversal cursor.
pub trait TreeWalker<T> {
    /// Resume the traversal with the openness of the previously returned
    /// node and return the next node, or `None` when the traversal is done.
    fn next(&mut self, resume: Resume) -> Option<Step<T>>;
}

impl<T, F> TreeWalker<T> for F
where
    F: FnMut(Resume) -> Option<Step<T>>,
{
    fn next(&mut self, resume: Resume) -> Option<Step<T>> {
        self(resume)
    }
}

/// Factory for traversals over a caller-defined tree.
pub trait TreeSource<T> {
    /// Start a traversal of the whole tree.
    ///
    /// `refresh == true` requests discovery mode, otherwise identifier-only
    /// mode.
    fn walk(&self, refresh: bool) -> Box<dyn TreeWalker<T> + '_>;

    /// Start a traversal restricted to the subtree rooted at `root`.
    ///
    /// The walker yields `root` itself first (at its own nesting level) and
    /// then its descendants. Sources that cannot locate a node cheaply return
    /// `None`, and the reconciler falls back to [`TreeSource::walk`].
    fn walk_subtree(&self, root: &NodeId, refresh: bool) -> Option<Box<dyn TreeWalker<T> + '_>> {
        let _ = (root, refresh);
        None
    }
}

impl<T, F, W> TreeSource<T> for F
where
    F: Fn(bool) -> W,
    W: TreeWalker<T> + 'static,
{
    fn walk(&self, refresh: bool) -> Box<dyn TreeWalker<T> + '_> {
        Box::new(self(refresh))
    }
}

// ============================================================================
// Stack-based walker for in-memory hierarchies
// ============================================================================

/// A node of an in-memory hierarchy that [`StackWalker`] can traverse.
pub trait WalkNode: Sized {
    /// Attribute payload placed into descriptors.
    type Data;

    /// Unique identifier of this node.
    fn id(&self) -> NodeId;

    /// Direct children, in display order.
    fn children(&self) -> &[Self];

    /// Build the attribute payload for this node at `nesting_level`.
    fn data(&self, nesting_level: usize) -> Self::Data;

    /// Whether this node starts out open.
    fn is_open_by_default(&self) -> bool {
        true
    }

    /// Default extent in variable-size mode.
    fn default_height(&self) -> Option<u32> {
        None
    }
}

#[derive(Debug)]
struct Frame<'a, N> {
    siblings: &'a [N],
    cursor: usize,
    level: usize,
}

/// Explicit-stack depth-first cursor over a slice of root nodes.
///
/// Each frame holds a sibling slice, the index of the next sibling to yield
/// and the nesting level of that slice. A node's children are pushed as a new
/// frame only when the walker is resumed with an open decision for it.
#[derive(Debug)]
pub struct StackWalker<'a, N> {
    frames: Vec<Frame<'a, N>>,
    last: Option<(&'a N, usize)>,
    refresh: bool,
}

impl<'a, N: WalkNode> StackWalker<'a, N> {
    /// Walk `roots` (all at nesting level 0).
    #[must_use]
    pub fn new(roots: &'a [N], refresh: bool) -> Self {
        Self::at_level(roots, 0, refresh)
    }

    /// Walk `nodes` starting at `nesting_level`.
    #[must_use]
    pub fn at_level(nodes: &'a [N], nesting_level: usize, refresh: bool) -> Self {
        Self {
            frames: vec![Frame {
                siblings: nodes,
                cursor: 0,
                level: nesting_level,
            }],
            last: None,
            refresh,
        }
    }

    fn step(&self, node: &N, level: usize) -> Step<N::Data> {
        if !self.refresh {
            return Step::Id(node.id());
        }
        Step::Node(NodeDescriptor {
            id: node.id(),
            nesting_level: level,
            is_open_by_default: node.is_open_by_default(),
            default_height: node.default_height(),
            data: node.data(level),
        })
    }
}

impl<N: WalkNode> TreeWalker<N::Data> for StackWalker<'_, N> {
    fn next(&mut self, resume: Resume) -> Option<Step<N::Data>> {
        if let Some((node, level)) = self.last.take()
            && resume.is_open_or(node.is_open_by_default())
            && !node.children().is_empty()
        {
            self.frames.push(Frame {
                siblings: node.children(),
                cursor: 0,
                level: level + 1,
            });
        }

        while let Some(frame) = self.frames.last_mut() {
            let siblings = frame.siblings;
            if let Some(node) = siblings.get(frame.cursor) {
                frame.cursor += 1;
                let level = frame.level;
                self.last = Some((node, level));
                return Some(self.step(node, level));
            }
            self.frames.pop();
        }
        None
    }
}

/// [`TreeSource`] over an owned forest of [`WalkNode`]s.
#[derive(Debug, Clone)]
pub struct StackSource<N> {
    roots: Vec<N>,
}

impl<N: WalkNode> StackSource<N> {
    /// Create a source over `roots`.
    #[must_use]
    pub fn new(roots: Vec<N>) -> Self {
        Self { roots }
    }

    /// The root nodes.
    #[must_use]
    pub fn roots(&self) -> &[N] {
        &self.roots
    }
}

impl<N: WalkNode> TreeSource<N::Data> for StackSource<N> {
    fn walk(&self, refresh: bool) -> Box<dyn TreeWalker<N::Data> + '_> {
        Box::new(StackWalker::new(&self.roots, refresh))
    }
}

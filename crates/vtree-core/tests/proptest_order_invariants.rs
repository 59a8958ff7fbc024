//! Property-based invariant tests for the reconciler.
//!
//! Random trees are driven through random sequences of toggles and rebuilds.
//! After every step:
//!
//! 1. The order sequence holds no identifier twice.
//! 2. Every identifier in the order has a record.
//! 3. The order equals a reference pre-order walk that descends exactly into
//!    open records.
//! 4. After a full rebuild, records exist exactly for the visible rows.
//! 5. Closing then reopening a node restores the previous order.
//! 6. Rebuilding with default openness reproduces the freshly mounted tree,
//!    in either traversal mode, even after rebuilds pruned hidden records.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use vtree_core::{
    NodeId, RecomputeOptions, SharedSource, StackSource, TreeConfig, VirtualTree, WalkNode,
};

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Node {
    id: String,
    open: bool,
    children: Vec<Node>,
}

impl WalkNode for Node {
    type Data = usize;

    fn id(&self) -> NodeId {
        NodeId::from(self.id.as_str())
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn data(&self, nesting_level: usize) -> usize {
        nesting_level
    }

    fn is_open_by_default(&self) -> bool {
        self.open
    }
}

/// Build a forest from a parent list: entry `i` is the parent of node
/// `i + 1`, or `None` for a new root. Node 0 is always a root.
fn build(parents: &[Option<usize>], open: &[bool]) -> Vec<Node> {
    fn attach(index: usize, parents: &[Option<usize>], open: &[bool]) -> Node {
        let children = parents
            .iter()
            .enumerate()
            .filter(|(_, p)| **p == Some(index))
            .map(|(i, _)| attach(i + 1, parents, open))
            .collect();
        Node {
            id: format!("n{index}"),
            open: open.get(index).copied().unwrap_or(true),
            children,
        }
    }

    std::iter::once(0)
        .chain(
            parents
                .iter()
                .enumerate()
                .filter(|(_, p)| p.is_none())
                .map(|(i, _)| i + 1),
        )
        .map(|root| attach(root, parents, open))
        .collect()
}

fn forest_strategy() -> impl Strategy<Value = Vec<Node>> {
    (1usize..24)
        .prop_flat_map(|n| {
            let parents = (1..n)
                .map(|i| prop::option::weighted(0.85, 0..i))
                .collect::<Vec<_>>();
            (parents, prop::collection::vec(any::<bool>(), n))
        })
        .prop_map(|(parents, open)| build(&parents, &open))
}

fn all_ids(nodes: &[Node], out: &mut Vec<String>) {
    for node in nodes {
        out.push(node.id.clone());
        all_ids(&node.children, out);
    }
}

/// Pre-order walk that descends into nodes whose record is open.
fn expected_order<R: vtree_core::WindowedRenderer>(
    nodes: &[Node],
    tree: &VirtualTree<usize, R>,
    out: &mut Vec<String>,
) {
    for node in nodes {
        out.push(node.id.clone());
        if tree.record(&node.id).is_some_and(|r| r.is_open()) {
            expected_order(&node.children, tree, out);
        }
    }
}

fn order_strings(tree: &VirtualTree<usize>) -> Vec<String> {
    tree.order().iter().map(|id| id.as_str().to_owned()).collect()
}

fn check_invariants(roots: &[Node], tree: &VirtualTree<usize>) -> Result<(), TestCaseError> {
    let order = order_strings(tree);
    let unique: HashSet<&String> = order.iter().collect();
    prop_assert_eq!(unique.len(), order.len(), "duplicate rows in {:?}", order);

    for id in &order {
        prop_assert!(tree.store().contains(id), "row {} has no record", id);
    }

    let mut expected = Vec::new();
    expected_order(roots, tree, &mut expected);
    prop_assert_eq!(order, expected);
    Ok(())
}

#[derive(Debug, Clone)]
enum Op {
    Toggle(usize),
    Rebuild,
    Refresh,
    ResetOpenness,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0usize..24).prop_map(Op::Toggle),
        1 => Just(Op::Rebuild),
        1 => Just(Op::Refresh),
        1 => Just(Op::ResetOpenness),
    ]
}

fn mount(roots: &[Node]) -> VirtualTree<usize> {
    let source: SharedSource<usize> = Arc::new(StackSource::new(roots.to_vec()));
    VirtualTree::new(source, TreeConfig::fixed(1)).unwrap()
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Order invariants hold after any sequence of operations
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn order_invariants_hold(roots in forest_strategy(), ops in prop::collection::vec(op_strategy(), 0..32)) {
        let mut ids = Vec::new();
        all_ids(&roots, &mut ids);
        let mut tree = mount(&roots);
        check_invariants(&roots, &tree)?;

        for op in ops {
            match op {
                Op::Toggle(i) => {
                    tree.toggle(&ids[i % ids.len()]);
                }
                Op::Rebuild => {
                    tree.recompute(RecomputeOptions::default());
                }
                Op::Refresh => {
                    tree.recompute(RecomputeOptions::refresh());
                }
                Op::ResetOpenness => {
                    tree.recompute(RecomputeOptions::default().with_default_openness(true));
                }
            }
            check_invariants(&roots, &tree)?;
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. A full rebuild keeps records for visible rows only
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn rebuild_prunes_hidden_records(roots in forest_strategy(), toggles in prop::collection::vec(0usize..24, 0..16)) {
        let mut ids = Vec::new();
        all_ids(&roots, &mut ids);
        let mut tree = mount(&roots);
        for i in toggles {
            tree.toggle(&ids[i % ids.len()]);
        }

        tree.recompute(RecomputeOptions::default());
        let visible: HashSet<&str> = tree.order().iter().map(NodeId::as_str).collect();
        let recorded: HashSet<&str> = tree.store().records().keys().map(NodeId::as_str).collect();
        prop_assert_eq!(visible, recorded);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Close then reopen is the identity on the order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn close_reopen_roundtrip(roots in forest_strategy(), pick in 0usize..24) {
        let mut tree = mount(&roots);
        let visible = order_strings(&tree);
        let target = visible[pick % visible.len()].clone();
        if !tree.record(&target).is_some_and(|r| r.is_open()) {
            tree.toggle(&target);
        }
        let before = order_strings(&tree);

        tree.toggle(&target);
        prop_assert!(!tree.record(&target).is_some_and(|r| r.is_open()));
        tree.toggle(&target);
        prop_assert_eq!(order_strings(&tree), before);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Default-openness rebuild equals a fresh mount
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn default_openness_matches_mount(
        roots in forest_strategy(),
        ops in prop::collection::vec(
            prop_oneof![3 => (0usize..24).prop_map(Op::Toggle), 1 => Just(Op::Rebuild)],
            0..16,
        ),
        refresh in any::<bool>(),
    ) {
        let fresh = mount(&roots);
        let mut ids = Vec::new();
        all_ids(&roots, &mut ids);

        let mut tree = mount(&roots);
        for op in ops {
            match op {
                Op::Toggle(i) => {
                    tree.toggle(&ids[i % ids.len()]);
                }
                _ => {
                    tree.recompute(RecomputeOptions::default());
                }
            }
        }
        tree.recompute(
            RecomputeOptions::default()
                .with_refresh_nodes(refresh)
                .with_default_openness(true),
        );

        prop_assert_eq!(order_strings(&tree), order_strings(&fresh));
        for id in fresh.order() {
            prop_assert_eq!(
                tree.record(id.as_str()).map(|r| r.is_open()),
                fresh.record(id.as_str()).map(|r| r.is_open())
            );
        }
        check_invariants(&roots, &tree)?;
    }
}

// ═════════════════════════════════════════════════════════════════════════
// Nesting levels match depth
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn nesting_levels_match_depth(roots in forest_strategy()) {
        let tree = mount(&roots);
        for id in tree.order() {
            let record = tree.record(id.as_str()).unwrap();
            prop_assert_eq!(record.nesting_level(), *record.data());
        }
    }
}

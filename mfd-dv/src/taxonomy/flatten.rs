//! Pre-order projection of the tree into display rows
//!
//! Row order is load-bearing: the tree view and the heatmap both assume a
//! parent is immediately followed by its whole subtree, and connector lines
//! are only drawn between consecutive rows forming an exact parent/child pair.

use mfd_common::Rank;
use serde::Serialize;

use super::tree::{NodeId, TaxonTree, ROOT};

/// One display row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlattenedTaxon {
    /// Back-reference into the tree this row was flattened from
    pub node: NodeId,
    pub name: String,
    pub raw_name: String,
    pub rank: Rank,
    pub indent_level: u8,
    /// Ancestor display names, coarsest first, root excluded
    pub ancestors: Vec<String>,
    pub is_csv_entry: bool,
    pub species_count: usize,
}

/// Flatten the tree in pre-order, root excluded
pub fn flatten(tree: &TaxonTree) -> Vec<FlattenedTaxon> {
    let mut rows = Vec::with_capacity(tree.len());
    // (node, ancestor path of that node)
    let mut stack: Vec<(NodeId, Vec<String>)> = tree
        .root()
        .children
        .iter()
        .rev()
        .map(|&c| (c, Vec::new()))
        .collect();

    while let Some((id, ancestors)) = stack.pop() {
        let Some(node) = tree.node(id) else {
            continue;
        };
        debug_assert_ne!(id, ROOT);

        let mut child_path = ancestors.clone();
        child_path.push(node.name.clone());
        for &child in node.children.iter().rev() {
            stack.push((child, child_path.clone()));
        }

        rows.push(FlattenedTaxon {
            node: id,
            name: node.name.clone(),
            raw_name: node.raw_name.clone(),
            rank: node.rank,
            indent_level: node.indent_level,
            ancestors,
            is_csv_entry: node.is_csv_entry,
            species_count: node.species_count,
        });
    }
    rows
}

/// True when `child` sits exactly one level below `parent`
///
/// Decided from the ancestor paths rather than indent arithmetic, which gives
/// false positives when rows skip ranks or siblings differ in depth.
pub fn is_direct_child(parent: &FlattenedTaxon, child: &FlattenedTaxon) -> bool {
    let depth = parent.ancestors.len();
    child.ancestors.len() == depth + 1
        && child.ancestors[..depth] == parent.ancestors[..]
        && child.ancestors[depth] == parent.name
}

/// For every row, whether a connector joins it to the row directly above
pub fn connectors(rows: &[FlattenedTaxon]) -> Vec<bool> {
    let mut result = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let linked = i > 0 && is_direct_child(&rows[i - 1], row);
        result.push(linked);
    }
    result
}

//! Taxonomic data reduction
//!
//! Pipeline: occurrence records → [`build_tree`] → [`flatten`] →
//! [`reorganize`] (filtered display rows) → [`series_order`] (heatmap rows).
//! Each stage is a pure function of its inputs.

pub mod flatten;
pub mod rank;
pub mod reorganize;
pub mod tree;

pub use flatten::{connectors, flatten, is_direct_child, FlattenedTaxon};
pub use rank::{parse_rank_suffix, strip_rank_suffix, RankStyle, RankTable, MAX_INDENT_LEVEL};
pub use reorganize::{reorganize, series_order, TaxonFilter};
pub use tree::{build_tree, NodeId, TaxonNode, TaxonTree, TreeBuilder, ROOT};

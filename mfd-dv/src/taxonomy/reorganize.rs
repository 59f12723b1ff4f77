//! Filtering and final row ordering
//!
//! Filters only ever remove rows. Survivors keep their pre-order position,
//! so every taxon stays inside the contiguous span of its ancestors'
//! subtrees. An ancestor row survives only while at least one visible taxon
//! sits beneath it.

use std::collections::HashSet;

use mfd_common::Rank;
use serde::Deserialize;

use super::flatten::FlattenedTaxon;
use super::rank::strip_rank_suffix;
use super::tree::{NodeId, TaxonTree, ROOT};

/// User-selected filter over the record-backed taxa
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonFilter {
    /// Only keep taxa at these ranks
    #[serde(default)]
    pub ranks: Option<HashSet<Rank>>,
    /// Only keep taxa observed at one of these sites
    #[serde(default)]
    pub sites: Option<HashSet<String>>,
    /// Case-insensitive substring over display and raw names
    #[serde(default)]
    pub search: Option<String>,
}

impl TaxonFilter {
    /// CSV-entry nodes passing the filter
    ///
    /// Nodes are identified by id, so a taxon name shared across ranks is
    /// filtered per (name, rank) node.
    pub fn visible_taxa(&self, tree: &TaxonTree) -> HashSet<NodeId> {
        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        tree.nodes()
            .iter()
            .skip(1)
            .filter(|n| n.is_csv_entry)
            .filter(|n| self.ranks.as_ref().map_or(true, |r| r.contains(&n.rank)))
            .filter(|n| {
                self.sites.as_ref().map_or(true, |sites| {
                    n.site_counts
                        .iter()
                        .any(|(site, count)| *count > 0 && sites.contains(site))
                })
            })
            .filter(|n| {
                needle.as_ref().map_or(true, |q| {
                    n.name.to_lowercase().contains(q) || n.raw_name.to_lowercase().contains(q)
                })
            })
            .map(|n| n.id)
            .collect()
    }
}

/// Drop rows not needed to show the visible taxa, preserving order
///
/// A row is kept when its node is visible or when any of its descendants is.
pub fn reorganize(
    tree: &TaxonTree,
    rows: &[FlattenedTaxon],
    visible: &HashSet<NodeId>,
) -> Vec<FlattenedTaxon> {
    let mut keep = vec![false; tree.nodes().len()];

    for row in rows {
        if !visible.contains(&row.node) {
            continue;
        }
        let mut current: Option<NodeId> = Some(row.node);
        while let Some(id) = current {
            if id == ROOT || keep[id] {
                break;
            }
            keep[id] = true;
            current = tree.node(id).and_then(|n| n.parent);
        }
    }

    rows.iter()
        .filter(|row| keep.get(row.node).copied().unwrap_or(false))
        .cloned()
        .collect()
}

/// Heatmap row order
///
/// Series matching a displayed taxon (by display or raw name) come first, in
/// display order; series without a matching row follow in their given order.
pub fn series_order(rows: &[FlattenedTaxon], series: &[String]) -> Vec<String> {
    let mut placed: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::with_capacity(series.len());

    for row in rows {
        for s in series {
            let name = s.as_str();
            if placed.contains(name) {
                continue;
            }
            let stripped = strip_rank_suffix(name);
            if name == row.name || name == row.raw_name || stripped == row.name {
                placed.insert(name);
                ordered.push(s.clone());
            }
        }
    }

    for s in series {
        if placed.insert(s.as_str()) {
            ordered.push(s.clone());
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{build_tree, flatten, RankTable};
    use mfd_common::{Confidence, LineageEntry, OccurrenceRecord, TaxonomyResolution, TaxonomySource};

    fn record(taxon: &str, site: &str, lineage: &[(Rank, &str)]) -> OccurrenceRecord {
        OccurrenceRecord::new(taxon, site).with_taxonomy(TaxonomyResolution {
            source: TaxonomySource::Worms,
            confidence: Confidence::High,
            reference_id: None,
            rank: None,
            lineage: lineage
                .iter()
                .map(|(r, n)| LineageEntry {
                    rank: *r,
                    name: n.to_string(),
                })
                .collect(),
        })
    }

    fn sample_tree() -> TaxonTree {
        let fish = [(Rank::Phylum, "Chordata"), (Rank::Family, "Gadidae")];
        let records = vec![
            record("Gadus morhua (sp.)", "Pin A", &fish),
            record("Merlangius merlangus (sp.)", "Pin B", &fish),
            record("Mytilus edulis (sp.)", "Pin B", &[(Rank::Phylum, "Mollusca")]),
            record("Gadidae (fam.)", "Pin C", &fish[..1]),
        ];
        build_tree(&records, &RankTable::default())
    }

    fn names(rows: &[FlattenedTaxon]) -> Vec<&str> {
        rows.iter().map(|r| r.name.as_str()).collect()
    }

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Ids of every node carrying one of `names`
    fn ids(tree: &TaxonTree, names: &[&str]) -> HashSet<NodeId> {
        tree.nodes()
            .iter()
            .skip(1)
            .filter(|n| names.contains(&n.name.as_str()))
            .map(|n| n.id)
            .collect()
    }

    fn visible_names(tree: &TaxonTree, filter: &TaxonFilter) -> HashSet<String> {
        filter
            .visible_taxa(tree)
            .into_iter()
            .filter_map(|id| tree.node(id))
            .map(|n| n.name.clone())
            .collect()
    }

    #[test]
    fn test_everything_visible_keeps_all_rows() {
        let tree = sample_tree();
        let rows = flatten(&tree);
        let visible = TaxonFilter::default().visible_taxa(&tree);
        assert_eq!(reorganize(&tree, &rows, &visible), rows);
    }

    #[test]
    fn test_hidden_subtree_drops_empty_ancestors() {
        let tree = sample_tree();
        let rows = flatten(&tree);
        let kept = reorganize(&tree, &rows, &ids(&tree, &["Mytilus edulis"]));
        assert_eq!(names(&kept), vec!["Mollusca", "Mytilus edulis"]);
    }

    #[test]
    fn test_survivors_keep_relative_order() {
        let tree = sample_tree();
        let rows = flatten(&tree);
        let visible = ids(&tree, &["Mytilus edulis", "Merlangius merlangus"]);
        let kept = reorganize(&tree, &rows, &visible);
        assert_eq!(
            names(&kept),
            vec!["Chordata", "Gadidae", "Merlangius merlangus", "Mollusca", "Mytilus edulis"]
        );
        let positions: Vec<usize> = kept
            .iter()
            .map(|k| rows.iter().position(|r| r.node == k.node).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_search_matches_raw_name() {
        let tree = sample_tree();
        let rows = flatten(&tree);
        let filter = TaxonFilter {
            search: Some("morhua (sp".to_string()),
            ..Default::default()
        };
        let kept = reorganize(&tree, &rows, &filter.visible_taxa(&tree));
        assert_eq!(names(&kept), vec!["Chordata", "Gadidae", "Gadus morhua"]);
    }

    #[test]
    fn test_same_name_at_two_ranks_is_filtered_per_node() {
        let records = vec![
            OccurrenceRecord::new("Bivalvia (class)", "P1"),
            OccurrenceRecord::new("Bivalvia (ord.)", "P2"),
        ];
        let tree = build_tree(&records, &RankTable::default());
        let rows = flatten(&tree);
        assert_eq!(rows.len(), 2);

        let by_rank = TaxonFilter {
            ranks: Some([Rank::Class].into_iter().collect()),
            ..Default::default()
        };
        let kept = reorganize(&tree, &rows, &by_rank.visible_taxa(&tree));
        assert_eq!(kept.len(), 1);
        assert_eq!((kept[0].name.as_str(), kept[0].rank), ("Bivalvia", Rank::Class));

        let by_site = TaxonFilter {
            sites: Some(set(&["P2"])),
            ..Default::default()
        };
        let kept = reorganize(&tree, &rows, &by_site.visible_taxa(&tree));
        assert_eq!(kept.len(), 1);
        assert_eq!((kept[0].name.as_str(), kept[0].rank), ("Bivalvia", Rank::Order));
    }

    #[test]
    fn test_filter_by_site_and_rank() {
        let tree = sample_tree();
        let by_site = TaxonFilter {
            sites: Some(set(&["Pin B"])),
            ..Default::default()
        };
        assert_eq!(
            visible_names(&tree, &by_site),
            set(&["Merlangius merlangus", "Mytilus edulis"])
        );

        let by_rank = TaxonFilter {
            ranks: Some([Rank::Family].into_iter().collect()),
            ..Default::default()
        };
        assert_eq!(visible_names(&tree, &by_rank), set(&["Gadidae"]));
    }

    #[test]
    fn test_filter_by_search() {
        let tree = sample_tree();
        let filter = TaxonFilter {
            search: Some("  GADUS ".to_string()),
            ..Default::default()
        };
        assert_eq!(visible_names(&tree, &filter), set(&["Gadus morhua"]));
    }

    #[test]
    fn test_series_order_follows_rows_then_leftovers() {
        let tree = sample_tree();
        let rows = flatten(&tree);
        let series = vec![
            "Temperature".to_string(),
            "Mytilus edulis (sp.)".to_string(),
            "Gadus morhua".to_string(),
        ];
        assert_eq!(
            series_order(&rows, &series),
            vec!["Gadus morhua", "Mytilus edulis (sp.)", "Temperature"]
        );
    }
}

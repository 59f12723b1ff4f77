//! Tree/heatmap view coupling
//!
//! The two views share nothing but taxon names. A heatmap label resolves to
//! a tree row by exact display name, falling back to the exact raw name;
//! there is no fuzzy matching. Clicking a tree row yields an action menu,
//! performing the action is up to the caller.

use chrono::{DateTime, Utc};
use mfd_common::time::parse_timestamp;
use mfd_common::{DataPoint, TaxonomySource};
use serde::{Deserialize, Serialize};

use crate::taxonomy::{FlattenedTaxon, NodeId, TaxonTree};

/// How long the tree keeps a "show in tree" highlight
pub const HIGHLIGHT_DURATION_MS: u64 = 2000;

const WORMS_RECORD_URL: &str = "https://www.marinespecies.org/aphia.php?p=taxdetails&id=";
const WORMS_SEARCH_URL: &str = "https://www.marinespecies.org/aphia.php?p=taxlist&tName=";
const GBIF_RECORD_URL: &str = "https://www.gbif.org/species/";
const GBIF_SEARCH_URL: &str = "https://www.gbif.org/species/search?q=";
const WEB_SEARCH_URL: &str = "https://www.google.com/search?q=";

/// Row index of the tree row a taxon label refers to
pub fn locate(rows: &[FlattenedTaxon], name: &str) -> Option<usize> {
    rows.iter()
        .position(|r| r.name == name)
        .or_else(|| rows.iter().position(|r| r.raw_name == name))
}

/// Where the tree view should scroll and what to highlight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrollTarget {
    pub row_index: usize,
    pub node: NodeId,
    pub name: String,
    pub highlight_ms: u64,
}

/// Resolve a heatmap label for "show in tree"
pub fn show_in_tree(rows: &[FlattenedTaxon], name: &str) -> Option<ScrollTarget> {
    let row_index = locate(rows, name)?;
    let row = &rows[row_index];
    Some(ScrollTarget {
        row_index,
        node: row.node,
        name: row.name.clone(),
        highlight_ms: HIGHLIGHT_DURATION_MS,
    })
}

/// One entry of the tree click menu
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TaxonAction {
    /// Open the raw data editor on the record's source row
    EditSourceRow { raw_name: String },
    /// Open the taxon in an external reference
    ReferenceLookup { source: TaxonomySource, url: String },
    WebSearch { url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionMenu {
    pub node: NodeId,
    pub taxon: String,
    pub actions: Vec<TaxonAction>,
}

/// Menu for a clicked tree node, `None` for the root or an unknown id
pub fn tree_click(tree: &TaxonTree, node: NodeId) -> Option<ActionMenu> {
    let taxon = tree.node(node).filter(|n| n.parent.is_some())?;
    let mut actions = Vec::with_capacity(3);

    if taxon.is_csv_entry {
        actions.push(TaxonAction::EditSourceRow {
            raw_name: taxon.raw_name.clone(),
        });
    }

    let (source, url) = reference_url(taxon.source, taxon.reference_id.as_deref(), &taxon.name);
    actions.push(TaxonAction::ReferenceLookup { source, url });
    actions.push(TaxonAction::WebSearch {
        url: web_search_url(&taxon.name),
    });

    Some(ActionMenu {
        node,
        taxon: taxon.name.clone(),
        actions,
    })
}

/// Reference page for a taxon
///
/// Resolved taxa link to their record; otherwise a name search. Taxa with
/// no known source are searched on GBIF.
pub fn reference_url(
    source: TaxonomySource,
    reference_id: Option<&str>,
    name: &str,
) -> (TaxonomySource, String) {
    let (source, base, query) = match (source, reference_id) {
        (TaxonomySource::Worms, Some(id)) => (source, WORMS_RECORD_URL, id),
        (TaxonomySource::Worms, None) => (source, WORMS_SEARCH_URL, name),
        (TaxonomySource::Gbif, Some(id)) => (source, GBIF_RECORD_URL, id),
        (_, _) => (TaxonomySource::Gbif, GBIF_SEARCH_URL, name),
    };
    (source, format!("{}{}", base, urlencoding::encode(query)))
}

pub fn web_search_url(name: &str) -> String {
    format!("{}{}", WEB_SEARCH_URL, urlencoding::encode(name))
}

/// Inclusive point-index window shared by the heatmap and its time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrushWindow {
    pub start: i64,
    pub end: i64,
}

impl BrushWindow {
    /// Ordered window; reversed bounds are swapped
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Window over every point
    pub fn full(len: usize) -> Self {
        Self::new(0, len as i64 - 1)
    }

    /// Window selecting no point
    pub fn empty() -> Self {
        Self { start: 0, end: -1 }
    }

    /// Narrowest window covering the points timed within `[from, to]`
    ///
    /// Points with unparseable times are ignored; `None` when no point falls
    /// inside.
    pub fn from_time_range(
        points: &[DataPoint],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Option<Self> {
        let (from, to) = (from.min(to), from.max(to));
        let inside = |p: &DataPoint| parse_timestamp(&p.time).is_some_and(|t| t >= from && t <= to);
        let first = points.iter().position(inside)?;
        let last = points.iter().rposition(inside)?;
        Some(Self::new(first as i64, last as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{build_tree, flatten, RankTable};
    use mfd_common::{Confidence, LineageEntry, OccurrenceRecord, Rank, SampleValue, TaxonomyResolution};

    fn tree() -> TaxonTree {
        let cod = OccurrenceRecord::new("Gadus morhua (sp.)", "Pin A").with_taxonomy(TaxonomyResolution {
            source: TaxonomySource::Worms,
            confidence: Confidence::High,
            reference_id: Some("126436".to_string()),
            rank: Some(Rank::Species),
            lineage: vec![LineageEntry {
                rank: Rank::Family,
                name: "Gadidae".to_string(),
            }],
        });
        let mussel = OccurrenceRecord::new("Mytilus edulis", "Pin B").with_rank(Rank::Species);
        build_tree(&[cod, mussel], &RankTable::default())
    }

    #[test]
    fn test_locate_prefers_display_name() {
        let rows = flatten(&tree());
        let by_display = locate(&rows, "Gadus morhua").unwrap();
        let by_raw = locate(&rows, "Gadus morhua (sp.)").unwrap();
        assert_eq!(by_display, by_raw);
        assert_eq!(rows[by_display].name, "Gadus morhua");
    }

    #[test]
    fn test_locate_is_exact() {
        let rows = flatten(&tree());
        assert!(locate(&rows, "gadus morhua").is_none());
        assert!(locate(&rows, "Gadus").is_none());
        assert!(locate(&rows, " Gadus morhua").is_none());
    }

    #[test]
    fn test_show_in_tree() {
        let rows = flatten(&tree());
        let target = show_in_tree(&rows, "Mytilus edulis").unwrap();
        assert_eq!(rows[target.row_index].node, target.node);
        assert_eq!(target.highlight_ms, HIGHLIGHT_DURATION_MS);
        assert!(show_in_tree(&rows, "Temperature").is_none());
    }

    #[test]
    fn test_tree_click_menu_for_resolved_taxon() {
        let tree = tree();
        let node = tree.find("Gadus morhua", Rank::Species).unwrap().id;
        let menu = tree_click(&tree, node).unwrap();
        assert_eq!(
            menu.actions,
            vec![
                TaxonAction::EditSourceRow {
                    raw_name: "Gadus morhua (sp.)".to_string()
                },
                TaxonAction::ReferenceLookup {
                    source: TaxonomySource::Worms,
                    url: "https://www.marinespecies.org/aphia.php?p=taxdetails&id=126436".to_string(),
                },
                TaxonAction::WebSearch {
                    url: "https://www.google.com/search?q=Gadus%20morhua".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_tree_click_on_synthesized_ancestor() {
        let tree = tree();
        let family = tree.find("Gadidae", Rank::Family).unwrap().id;
        let menu = tree_click(&tree, family).unwrap();
        assert_eq!(menu.actions.len(), 2);
        assert!(matches!(
            &menu.actions[0],
            TaxonAction::ReferenceLookup { source: TaxonomySource::Gbif, url }
                if url == "https://www.gbif.org/species/search?q=Gadidae"
        ));
        assert!(tree_click(&tree, crate::taxonomy::ROOT).is_none());
        assert!(tree_click(&tree, 999).is_none());
    }

    #[test]
    fn test_brush_window() {
        assert_eq!(BrushWindow::new(9, 3), BrushWindow { start: 3, end: 9 });
        assert_eq!(BrushWindow::full(5), BrushWindow { start: 0, end: 4 });

        let points: Vec<DataPoint> = ["2024-01-01", "bad", "2024-01-02", "2024-01-03", "2024-01-04"]
            .iter()
            .map(|t| DataPoint::new(t).with("Cod", SampleValue::Number(1.0)))
            .collect();
        let from = parse_timestamp("2024-01-02").unwrap();
        let to = parse_timestamp("2024-01-03T12:00:00Z").unwrap();
        assert_eq!(
            BrushWindow::from_time_range(&points, to, from),
            Some(BrushWindow { start: 2, end: 3 })
        );
        let later = parse_timestamp("2025-01-01").unwrap();
        assert!(BrushWindow::from_time_range(&points, later, later).is_none());
    }
}

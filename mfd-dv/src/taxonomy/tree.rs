//! Taxonomic tree construction
//!
//! The tree is built arena-style: every node lives in one indexed store
//! keyed by `(rank, name)`, children are linked by index, and the tree is
//! only exposed (as an immutable [`TaxonTree`]) once the whole record set
//! has been consumed.
//!
//! **Algorithm (per record):**
//! 1. Strip the rank annotation from the taxon name to get the display name
//! 2. Resolve the rank: annotation → declared rank → resolution rank → unknown
//! 3. Walk the resolved lineage from the coarsest ancestor, creating each
//!    `(rank, name)` node at most once
//! 4. Attach the record's own node below the last ancestor, mark it as a
//!    CSV entry and add the record's weight to its per-site counts
//!
//! After the input pass, children are sorted and `species_count` is filled
//! in by a single post-order pass.

use std::collections::{BTreeMap, HashMap};

use mfd_common::{Confidence, OccurrenceRecord, Rank, TaxonomySource};
use serde::Serialize;
use tracing::debug;

use super::rank::{parse_rank_suffix, strip_rank_suffix, RankTable};

/// Index of a node inside its tree
pub type NodeId = usize;

/// Index of the synthetic root node
pub const ROOT: NodeId = 0;

const ROOT_NAME: &str = "root";

/// One taxon at one rank
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxonNode {
    pub id: NodeId,
    /// Display name (rank annotation stripped)
    pub name: String,
    /// Name as it appeared in the first source row, or the display name for
    /// synthesized ancestors
    pub raw_name: String,
    pub rank: Rank,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Backed by at least one input record (as opposed to a synthesized ancestor)
    pub is_csv_entry: bool,
    /// Cumulative occurrence count per site label
    pub site_counts: BTreeMap<String, u64>,
    pub source: TaxonomySource,
    pub confidence: Option<Confidence>,
    pub reference_id: Option<String>,
    /// Number of distinct species-rank descendants
    pub species_count: usize,
    pub color: String,
    pub abbreviation: String,
    pub indent_level: u8,
}

impl TaxonNode {
    fn new(id: NodeId, name: &str, rank: Rank, parent: Option<NodeId>) -> Self {
        Self {
            id,
            name: name.to_string(),
            raw_name: name.to_string(),
            rank,
            parent,
            children: Vec::new(),
            is_csv_entry: false,
            site_counts: BTreeMap::new(),
            source: TaxonomySource::Unknown,
            confidence: None,
            reference_id: None,
            species_count: 0,
            color: String::new(),
            abbreviation: String::new(),
            indent_level: 0,
        }
    }

    /// Sum of the per-site counts
    pub fn total_count(&self) -> u64 {
        self.site_counts.values().sum()
    }
}

/// Immutable taxonomic tree rooted at a synthetic node
#[derive(Debug, Clone, Serialize)]
pub struct TaxonTree {
    nodes: Vec<TaxonNode>,
}

impl TaxonTree {
    pub fn root(&self) -> &TaxonNode {
        &self.nodes[ROOT]
    }

    pub fn node(&self, id: NodeId) -> Option<&TaxonNode> {
        self.nodes.get(id)
    }

    /// All nodes, root included, in arena order
    pub fn nodes(&self) -> &[TaxonNode] {
        &self.nodes
    }

    /// Number of taxa, root excluded
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &TaxonNode> + '_ {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|n| n.children.iter())
            .map(move |&c| &self.nodes[c])
    }

    /// Node with this exact display name and rank
    pub fn find(&self, name: &str, rank: Rank) -> Option<&TaxonNode> {
        self.nodes
            .iter()
            .skip(1)
            .find(|n| n.rank == rank && n.name == name)
    }

    /// Ancestor ids from the coarsest down to the direct parent, root excluded
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        while let Some(p) = current {
            if p == ROOT {
                break;
            }
            path.push(p);
            current = self.nodes[p].parent;
        }
        path.reverse();
        path
    }

    /// Verify the structural invariants
    ///
    /// - every non-root parent is strictly coarser than its child
    /// - species-rank and unknown-rank nodes have no children
    /// - every node is reachable from the root exactly once
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            if seen[id] {
                return Err(format!("node {} reached twice", id));
            }
            seen[id] = true;
            let node = &self.nodes[id];
            if id != ROOT
                && !node.children.is_empty()
                && matches!(node.rank, Rank::Species | Rank::Unknown)
            {
                return Err(format!("{} ({}) has children", node.name, node.rank));
            }
            for &child in &node.children {
                let c = &self.nodes[child];
                if c.parent != Some(id) {
                    return Err(format!("{} has a stale parent link", c.name));
                }
                if id != ROOT && !node.rank.is_coarser_than(c.rank) {
                    return Err(format!(
                        "{} ({}) is not coarser than child {} ({})",
                        node.name, node.rank, c.name, c.rank
                    ));
                }
                stack.push(child);
            }
        }
        match seen.iter().position(|s| !s) {
            Some(orphan) => Err(format!("node {} is unreachable", orphan)),
            None => Ok(()),
        }
    }
}

/// Arena builder for [`TaxonTree`]
pub struct TreeBuilder<'a> {
    table: &'a RankTable,
    nodes: Vec<TaxonNode>,
    index: HashMap<(Rank, String), NodeId>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(table: &'a RankTable) -> Self {
        Self {
            table,
            nodes: vec![TaxonNode::new(ROOT, ROOT_NAME, Rank::Unknown, None)],
            index: HashMap::new(),
        }
    }

    /// Fold one occurrence record into the arena
    pub fn add_record(&mut self, record: &OccurrenceRecord) {
        let name = strip_rank_suffix(&record.taxon);
        if name.is_empty() {
            debug!(taxon = %record.taxon, "Skipping record without a taxon name");
            return;
        }

        let rank = resolve_rank(record);

        let mut parent = ROOT;
        for (ancestor_rank, ancestor_name) in lineage_for(record, rank) {
            parent = self.get_or_create(&ancestor_name, ancestor_rank, parent);
        }
        let id = self.get_or_create(name, rank, parent);

        let node = &mut self.nodes[id];
        if !node.is_csv_entry {
            node.is_csv_entry = true;
            node.raw_name = record.taxon.trim().to_string();
        }
        if let Some(resolution) = &record.taxonomy {
            if node.confidence.is_none() {
                node.source = resolution.source;
                node.confidence = Some(resolution.confidence);
                node.reference_id = resolution.reference_id.clone();
            }
        }
        if !record.site.trim().is_empty() {
            *node
                .site_counts
                .entry(record.site.trim().to_string())
                .or_insert(0) += occurrence_weight(record);
        }
    }

    /// Look up `(rank, name)` or create it below `parent`
    ///
    /// A node first seen directly under the root is moved below `parent`
    /// when a later record supplies a real ancestor for it.
    fn get_or_create(&mut self, name: &str, rank: Rank, parent: NodeId) -> NodeId {
        let key = (rank, name.to_string());
        if let Some(&id) = self.index.get(&key) {
            if parent != ROOT && self.nodes[id].parent == Some(ROOT) {
                self.relink(id, parent);
            }
            return id;
        }

        let id = self.nodes.len();
        self.nodes.push(TaxonNode::new(id, name, rank, Some(parent)));
        self.link(parent, id);
        self.index.insert(key, id);
        id
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            parent == ROOT || self.nodes[parent].rank.is_coarser_than(self.nodes[child].rank),
            "rank order violated linking {} under {}",
            self.nodes[child].name,
            self.nodes[parent].name
        );
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
    }

    fn relink(&mut self, id: NodeId, new_parent: NodeId) {
        if let Some(old) = self.nodes[id].parent {
            self.nodes[old].children.retain(|&c| c != id);
        }
        self.link(new_parent, id);
    }

    /// Freeze the arena: sort children, compute styles and species counts
    pub fn finish(mut self) -> TaxonTree {
        let keys: Vec<(u8, String)> = self
            .nodes
            .iter()
            .map(|n| (n.rank.order().unwrap_or(u8::MAX), n.name.to_lowercase()))
            .collect();
        for node in self.nodes.iter_mut() {
            node.children.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
        }

        for node in self.nodes.iter_mut().skip(1) {
            let style = self.table.style(node.rank);
            node.color = style.color.clone();
            node.abbreviation = style.abbreviation.clone();
            node.indent_level = self.table.indent_level(node.rank);
        }

        // Post-order: every child is finished before its parent
        for id in post_order(&self.nodes) {
            let count: usize = self.nodes[id]
                .children
                .iter()
                .map(|&c| {
                    let child = &self.nodes[c];
                    child.species_count + usize::from(child.rank == Rank::Species)
                })
                .sum();
            self.nodes[id].species_count = count;
        }

        TaxonTree { nodes: self.nodes }
    }
}

/// Build a tree from a full record set
pub fn build_tree(records: &[OccurrenceRecord], table: &RankTable) -> TaxonTree {
    let mut builder = TreeBuilder::new(table);
    for record in records {
        builder.add_record(record);
    }
    let tree = builder.finish();
    debug!(
        records = records.len(),
        taxa = tree.len(),
        species = tree.root().species_count,
        "Built taxonomic tree"
    );
    tree
}

/// Rank of a record: annotation, then declared rank, then resolved rank
fn resolve_rank(record: &OccurrenceRecord) -> Rank {
    parse_rank_suffix(&record.taxon)
        .or(record.rank.filter(|r| *r != Rank::Unknown))
        .or(record
            .taxonomy
            .as_ref()
            .and_then(|t| t.rank)
            .filter(|r| *r != Rank::Unknown))
        .unwrap_or(Rank::Unknown)
}

/// Usable ancestors for a record: known ranks, strictly increasing, all
/// strictly coarser than the record's own rank
fn lineage_for(record: &OccurrenceRecord, rank: Rank) -> Vec<(Rank, String)> {
    let Some(resolution) = &record.taxonomy else {
        return Vec::new();
    };
    if rank == Rank::Unknown {
        return Vec::new();
    }

    let mut lineage: Vec<(Rank, String)> = Vec::new();
    for entry in &resolution.lineage {
        let name = strip_rank_suffix(&entry.name);
        let coarser_than_last = lineage
            .last()
            .map_or(true, |(last, _)| last.is_coarser_than(entry.rank));
        if name.is_empty() || !entry.rank.is_coarser_than(rank) || !coarser_than_last {
            debug!(
                taxon = %record.taxon,
                ancestor = %entry.name,
                ancestor_rank = %entry.rank,
                "Dropping out-of-order lineage entry"
            );
            continue;
        }
        lineage.push((entry.rank, name.to_string()));
    }
    lineage
}

/// Contribution of one record to its node's site count
fn occurrence_weight(record: &OccurrenceRecord) -> u64 {
    match record.value {
        None => 1,
        Some(v) if v.is_finite() && v >= 0.0 => v.round() as u64,
        Some(v) => {
            debug!(taxon = %record.taxon, value = v, "Ignoring non-count value");
            0
        }
    }
}

fn post_order(nodes: &[TaxonNode]) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(nodes.len());
    let mut stack = vec![(ROOT, false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            order.push(id);
            continue;
        }
        stack.push((id, true));
        for &child in nodes[id].children.iter().rev() {
            stack.push((child, false));
        }
    }
    order
}

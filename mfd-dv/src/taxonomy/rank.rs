//! Rank annotations and rank styling
//!
//! Taxon names exported by the eDNA pipeline carry their rank as a
//! trailing parenthetical (`"Gadus morhua (sp.)"`, `"Gadidae (fam.)"`).
//! The styling table maps every rank to its colour, badge and indent.

use mfd_common::Rank;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

/// Indent level of the finest rank; no row is indented further
pub const MAX_INDENT_LEVEL: u8 = 6;

static RANK_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(\s*([A-Za-z]+\.?)\s*\)\s*$").expect("static regex"));

/// Split a trailing rank annotation off a name
///
/// Returns the remaining name and the annotated rank, or `None` when the
/// name has no recognised annotation (an arbitrary parenthetical such as
/// an author citation is not a rank annotation).
fn split_rank_suffix(name: &str) -> Option<(&str, Rank)> {
    let caps = RANK_SUFFIX.captures(name)?;
    let rank = caps[1].parse::<Rank>().ok()?;
    if rank == Rank::Unknown {
        return None;
    }
    let start = caps.get(0)?.start();
    Some((&name[..start], rank))
}

/// Rank declared by the name's trailing annotation, if any
pub fn parse_rank_suffix(name: &str) -> Option<Rank> {
    split_rank_suffix(name.trim_end()).map(|(_, rank)| rank)
}

/// Display name with every trailing rank annotation removed
///
/// Idempotent: stripping an already stripped name returns it unchanged.
pub fn strip_rank_suffix(name: &str) -> &str {
    let mut current = name.trim();
    while let Some((rest, _)) = split_rank_suffix(current) {
        current = rest.trim();
    }
    current
}

/// Display attributes for one rank
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankStyle {
    pub color: String,
    pub abbreviation: String,
    pub indent: u8,
}

impl RankStyle {
    pub fn new(color: &str, abbreviation: &str, indent: u8) -> Self {
        Self {
            color: color.to_string(),
            abbreviation: abbreviation.to_string(),
            indent: indent.min(MAX_INDENT_LEVEL),
        }
    }
}

/// Immutable rank → style lookup handed to the tree builder and renderers
#[derive(Debug, Clone)]
pub struct RankTable {
    styles: HashMap<Rank, RankStyle>,
    fallback: RankStyle,
}

impl Default for RankTable {
    fn default() -> Self {
        let styles = HashMap::from([
            (Rank::Kingdom, RankStyle::new("#6b7280", "K", 0)),
            (Rank::Phylum, RankStyle::new("#dc2626", "P", 0)),
            (Rank::Infraclass, RankStyle::new("#ea580c", "IC", 1)),
            (Rank::Class, RankStyle::new("#ca8a04", "C", 2)),
            (Rank::Order, RankStyle::new("#16a34a", "O", 3)),
            (Rank::Family, RankStyle::new("#0d9488", "F", 4)),
            (Rank::Genus, RankStyle::new("#2563eb", "G", 5)),
            (Rank::Species, RankStyle::new("#7c3aed", "S", 6)),
        ]);
        Self {
            styles,
            fallback: RankStyle::new("#9ca3af", "?", MAX_INDENT_LEVEL),
        }
    }
}

impl RankTable {
    /// Replace the style for one rank
    pub fn with_style(mut self, rank: Rank, style: RankStyle) -> Self {
        if rank == Rank::Unknown {
            self.fallback = style;
        } else {
            self.styles.insert(rank, style);
        }
        self
    }

    pub fn style(&self, rank: Rank) -> &RankStyle {
        self.styles.get(&rank).unwrap_or(&self.fallback)
    }

    pub fn color(&self, rank: Rank) -> &str {
        &self.style(rank).color
    }

    pub fn abbreviation(&self, rank: Rank) -> &str {
        &self.style(rank).abbreviation
    }

    /// Fixed indent for a rank, independent of how deep the node actually sits
    pub fn indent_level(&self, rank: Rank) -> u8 {
        self.style(rank).indent.min(MAX_INDENT_LEVEL)
    }
}

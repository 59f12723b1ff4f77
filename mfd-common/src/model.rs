//! Shared data model
//!
//! Rows arriving from survey exports are represented as closed record
//! types: the fields the pipeline relies on are typed, and anything else
//! a source file carries lives in an explicit extension map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Taxonomic rank
///
/// Known ranks follow the fixed order
/// kingdom < phylum < infraclass < class < order < family < genus < species.
/// `Unknown` sits outside that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Kingdom,
    Phylum,
    Infraclass,
    Class,
    Order,
    Family,
    Genus,
    Species,
    Unknown,
}

impl Rank {
    /// All known ranks, coarsest first
    pub const ORDERED: [Rank; 8] = [
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Infraclass,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];

    /// Position in the fixed rank order (`None` for `Unknown`)
    pub fn order(&self) -> Option<u8> {
        match self {
            Rank::Kingdom => Some(0),
            Rank::Phylum => Some(1),
            Rank::Infraclass => Some(2),
            Rank::Class => Some(3),
            Rank::Order => Some(4),
            Rank::Family => Some(5),
            Rank::Genus => Some(6),
            Rank::Species => Some(7),
            Rank::Unknown => None,
        }
    }

    /// True when both ranks are known and `self` is strictly coarser than `other`
    pub fn is_coarser_than(&self, other: Rank) -> bool {
        match (self.order(), other.order()) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Kingdom => "kingdom",
            Rank::Phylum => "phylum",
            Rank::Infraclass => "infraclass",
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Genus => "genus",
            Rank::Species => "species",
            Rank::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = String;

    /// Accepts full rank names and the abbreviations used in taxon annotations
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().trim_end_matches('.').to_ascii_lowercase();
        match tag.as_str() {
            "kingdom" | "king" | "kgd" => Ok(Rank::Kingdom),
            "phylum" | "phyl" => Ok(Rank::Phylum),
            "infraclass" | "infracl" => Ok(Rank::Infraclass),
            "class" | "cl" => Ok(Rank::Class),
            "order" | "ord" => Ok(Rank::Order),
            "family" | "fam" => Ok(Rank::Family),
            "genus" | "gen" => Ok(Rank::Genus),
            "species" | "sp" | "spp" => Ok(Rank::Species),
            "unknown" => Ok(Rank::Unknown),
            other => Err(format!("Unrecognised rank: {}", other)),
        }
    }
}

/// Reference database a taxonomy resolution came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomySource {
    Worms,
    Gbif,
    #[default]
    Unknown,
}

/// Confidence of a taxonomy resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// One ancestor in a resolved lineage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageEntry {
    pub rank: Rank,
    pub name: String,
}

/// Result of looking a taxon name up in an external reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyResolution {
    pub source: TaxonomySource,
    pub confidence: Confidence,
    #[serde(default)]
    pub reference_id: Option<String>,
    /// Rank the reference assigns to the taxon itself
    #[serde(default)]
    pub rank: Option<Rank>,
    /// Ancestors, coarsest first
    #[serde(default)]
    pub lineage: Vec<LineageEntry>,
}

/// One row of occurrence data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccurrenceRecord {
    /// Taxon name, possibly carrying a rank annotation such as `(sp.)`
    pub taxon: String,
    /// Rank declared by the source row
    #[serde(default)]
    pub rank: Option<Rank>,
    /// Sampling site or pin label
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Count, haplotype count or other numeric observation
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub taxonomy: Option<TaxonomyResolution>,
    /// Source columns without a dedicated field
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl OccurrenceRecord {
    pub fn new(taxon: &str, site: &str) -> Self {
        Self {
            taxon: taxon.to_string(),
            rank: None,
            site: site.to_string(),
            timestamp: None,
            value: None,
            taxonomy: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = Some(rank);
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = Some(timestamp.to_string());
        self
    }

    pub fn with_taxonomy(mut self, taxonomy: TaxonomyResolution) -> Self {
        self.taxonomy = Some(taxonomy);
        self
    }
}

/// A single series value inside a sample point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Number(f64),
    Text(String),
    Null,
}

impl SampleValue {
    /// Finite numeric value, `None` for null, text and NaN/inf
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SampleValue::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

/// One timestamped sample carrying a value per series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub time: String,
    #[serde(default)]
    pub values: BTreeMap<String, SampleValue>,
}

impl DataPoint {
    pub fn new(time: &str) -> Self {
        Self {
            time: time.to_string(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, series: &str, value: SampleValue) -> Self {
        self.values.insert(series.to_string(), value);
        self
    }
}

/// Metadata row for one stored upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: Uuid,
    pub project_id: String,
    pub file_name: String,
    pub storage_path: String,
    /// Cached start of the file's sampling span
    pub start_date: Option<DateTime<Utc>>,
    /// Cached end of the file's sampling span
    pub end_date: Option<DateTime<Utc>>,
    pub uploaded_at: DateTime<Utc>,
}

impl FileMetadata {
    pub fn new(project_id: &str, file_name: &str, storage_path: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            file_name: file_name.to_string(),
            storage_path: storage_path.to_string(),
            start_date: None,
            end_date: None,
            uploaded_at: Utc::now(),
        }
    }
}

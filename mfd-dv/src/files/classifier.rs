//! File name classification
//!
//! Two independent classifiers:
//! - [`classify`] collects every display tile/category whose rule matches
//!   the name. Rules are not exclusive; a name can land in several tiles.
//! - [`device_type`] resolves a single device code, first match wins in a
//!   fixed priority order.
//!
//! Both are case-insensitive and pure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A (tile, category) tag for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTag {
    pub tile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl FileTag {
    fn from_rule(rule: &Rule) -> Self {
        Self {
            tile: rule.tile.to_string(),
            category: rule.category.map(str::to_string),
        }
    }
}

/// One row of the tile rule table
///
/// Matches when the lowercased name contains at least one `any_of` needle
/// (or `any_of` is empty), every `all_of` needle and no `none_of` needle.
struct Rule {
    tile: &'static str,
    category: Option<&'static str>,
    any_of: &'static [&'static str],
    all_of: &'static [&'static str],
    none_of: &'static [&'static str],
}

impl Rule {
    fn matches(&self, lower: &str) -> bool {
        (self.any_of.is_empty() || self.any_of.iter().any(|n| lower.contains(n)))
            && self.all_of.iter().all(|n| lower.contains(n))
            && !self.none_of.iter().any(|n| lower.contains(n))
    }
}

const WATER_AND_CROP: &str = "Water and Crop Samples";

const RULES: &[Rule] = &[
    Rule {
        tile: "FPOD",
        category: Some("Standard"),
        any_of: &[],
        all_of: &["fpod", "_std"],
        none_of: &[],
    },
    Rule {
        tile: "FPOD",
        category: Some("Avg 24hrs"),
        any_of: &[],
        all_of: &["fpod", "24hr"],
        none_of: &[],
    },
    Rule {
        tile: "FPOD",
        category: Some("Raw"),
        any_of: &[],
        all_of: &["fpod"],
        none_of: &["_std", "24hr"],
    },
    Rule {
        tile: "SubCam",
        category: None,
        any_of: &["subcam"],
        all_of: &[],
        none_of: &[],
    },
    Rule {
        tile: "GrowProbe",
        category: None,
        any_of: &["growprobe", "gp_"],
        all_of: &[],
        none_of: &[],
    },
    Rule {
        tile: WATER_AND_CROP,
        category: Some("Crop Chem"),
        any_of: &["crop", "alga"],
        all_of: &["chem"],
        none_of: &[],
    },
    Rule {
        tile: WATER_AND_CROP,
        category: Some("Crop"),
        any_of: &["crop", "alga"],
        all_of: &[],
        none_of: &["chem"],
    },
    Rule {
        tile: WATER_AND_CROP,
        category: Some("Seawater Chem"),
        any_of: &["chemsw"],
        all_of: &[],
        none_of: &["crop", "alga"],
    },
    Rule {
        tile: WATER_AND_CROP,
        category: Some("Water Quality Chem"),
        any_of: &["chemwq"],
        all_of: &[],
        none_of: &["crop", "alga"],
    },
    Rule {
        tile: WATER_AND_CROP,
        category: Some("Chemistry"),
        any_of: &["chem"],
        all_of: &[],
        none_of: &["chemsw", "chemwq", "crop", "alga"],
    },
    Rule {
        tile: WATER_AND_CROP,
        category: Some("Water Quality"),
        any_of: &["wq"],
        all_of: &[],
        none_of: &["chemwq"],
    },
    Rule {
        tile: "eDNA",
        category: None,
        any_of: &["edna"],
        all_of: &[],
        none_of: &[],
    },
    Rule {
        tile: "eDNA",
        category: Some("Haplotypes"),
        any_of: &["hapl"],
        all_of: &["edna"],
        none_of: &[],
    },
];

/// Every tile/category tag whose rule matches `file_name`
pub fn classify(file_name: &str) -> Vec<FileTag> {
    let lower = file_name.to_lowercase();
    RULES
        .iter()
        .filter(|rule| rule.matches(&lower))
        .map(FileTag::from_rule)
        .collect()
}

/// Sensor/sample device encoded in a file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "GP")]
    Gp,
    #[serde(rename = "FPOD")]
    Fpod,
    #[serde(rename = "Subcam")]
    Subcam,
    #[serde(rename = "CROP")]
    Crop,
    #[serde(rename = "CHEM")]
    Chem,
    #[serde(rename = "CHEMSW")]
    ChemSw,
    #[serde(rename = "CHEMWQ")]
    ChemWq,
    #[serde(rename = "WQ")]
    Wq,
    #[serde(rename = "EDNA")]
    Edna,
}

impl DeviceType {
    /// Resolution order; more specific codes precede codes they contain
    pub const PRIORITY: [DeviceType; 9] = [
        DeviceType::Crop,
        DeviceType::ChemSw,
        DeviceType::ChemWq,
        DeviceType::Chem,
        DeviceType::Wq,
        DeviceType::Edna,
        DeviceType::Fpod,
        DeviceType::Subcam,
        DeviceType::Gp,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            DeviceType::Gp => "GP",
            DeviceType::Fpod => "FPOD",
            DeviceType::Subcam => "Subcam",
            DeviceType::Crop => "CROP",
            DeviceType::Chem => "CHEM",
            DeviceType::ChemSw => "CHEMSW",
            DeviceType::ChemWq => "CHEMWQ",
            DeviceType::Wq => "WQ",
            DeviceType::Edna => "EDNA",
        }
    }

    /// Loggers with a fixed export layout
    pub fn is_fixed_format_logger(&self) -> bool {
        matches!(self, DeviceType::Gp | DeviceType::Fpod)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Resolve the device type of a file
///
/// **Algorithm:**
/// 1. Drop the extension and split on `_`
/// 2. Compare the first two tokens against each code in priority order
/// 3. Otherwise test the whole name for each code as a substring, same order
pub fn device_type(file_name: &str) -> Option<DeviceType> {
    let lower = file_name.to_lowercase();
    let stem = match lower.rfind('.') {
        Some(idx) if idx > 0 => &lower[..idx],
        _ => lower.as_str(),
    };
    let leading: Vec<&str> = stem.split('_').take(2).collect();

    let by_token = DeviceType::PRIORITY.iter().find(|device| {
        let code = device.code().to_lowercase();
        leading.iter().any(|token| *token == code)
    });
    if let Some(device) = by_token {
        return Some(*device);
    }

    DeviceType::PRIORITY
        .iter()
        .find(|device| lower.contains(&device.code().to_lowercase()))
        .copied()
}

/// Full classification of one file name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub file_name: String,
    pub tags: Vec<FileTag>,
    pub device_type: Option<DeviceType>,
}

pub fn classify_file(file_name: &str) -> Classification {
    Classification {
        file_name: file_name.to_string(),
        tags: classify(file_name),
        device_type: device_type(file_name),
    }
}

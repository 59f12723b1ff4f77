//! FPOD export pairing
//!
//! An FPOD deployment is exported as two CSVs sharing a base name: the
//! standard detections (`X_std.csv`) and the 24 hour averages
//! (`X_24hr.csv`). The file listing shows such a pair as one entry.

use std::collections::HashMap;

use mfd_common::FileMetadata;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static FPOD_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.*)_(std|24hr)(\.[^.]+)?$").expect("static regex"));

/// Anything with a file name
pub trait NamedFile {
    fn file_name(&self) -> &str;
}

impl NamedFile for String {
    fn file_name(&self) -> &str {
        self
    }
}

impl NamedFile for &str {
    fn file_name(&self) -> &str {
        self
    }
}

impl NamedFile for FileMetadata {
    fn file_name(&self) -> &str {
        &self.file_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FpodSide {
    Std,
    Hr24,
}

fn split_fpod_name(name: &str) -> Option<(&str, FpodSide)> {
    let caps = FPOD_SUFFIX.captures(name)?;
    let base = caps.get(1)?.as_str();
    let side = if caps[2].eq_ignore_ascii_case("std") {
        FpodSide::Std
    } else {
        FpodSide::Hr24
    };
    Some((base, side))
}

/// Base name before a trailing `_std`/`_24hr`, `None` without either suffix
pub fn get_fpod_base_name(name: &str) -> Option<&str> {
    split_fpod_name(name).map(|(base, _)| base)
}

/// A matched standard/24 hour pair
///
/// Only complete groups are emitted as pairs; one-sided or ambiguous groups
/// go to [`FpodPairing::unpaired`], so `is_paired` is always `true` here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FpodFilePair<T> {
    pub base_name: String,
    pub std_file: T,
    pub hr24_file: T,
    pub is_paired: bool,
}

/// Result of pairing a file list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FpodPairing<T> {
    pub pairs: Vec<FpodFilePair<T>>,
    /// Every file not in a pair, in input order
    pub unpaired: Vec<T>,
}

/// Input positions of (std, 24hr) for every complete pair, keyed by base name
fn complete_pairs<T: NamedFile>(files: &[T]) -> Vec<(String, usize, usize)> {
    let mut groups: HashMap<&str, (Vec<usize>, Vec<usize>)> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for (idx, file) in files.iter().enumerate() {
        let Some((base, side)) = split_fpod_name(file.file_name()) else {
            continue;
        };
        let group = groups.entry(base).or_insert_with(|| {
            order.push(base);
            (Vec::new(), Vec::new())
        });
        match side {
            FpodSide::Std => group.0.push(idx),
            FpodSide::Hr24 => group.1.push(idx),
        }
    }

    order
        .into_iter()
        .filter_map(|base| {
            let (std, hr24) = groups.get(base)?;
            match (std.as_slice(), hr24.as_slice()) {
                ([s], [h]) => Some((base.to_string(), *s, *h)),
                _ => None,
            }
        })
        .collect()
}

/// Group files into FPOD pairs
///
/// A group is paired only with exactly one `_std` and one `_24hr` file.
/// Files of incomplete or ambiguous groups are returned as unpaired.
pub fn pair_fpod_files<T: NamedFile + Clone>(files: &[T]) -> FpodPairing<T> {
    let matched = complete_pairs(files);
    let mut in_pair = vec![false; files.len()];

    let pairs = matched
        .into_iter()
        .map(|(base_name, s, h)| {
            in_pair[s] = true;
            in_pair[h] = true;
            FpodFilePair {
                base_name,
                std_file: files[s].clone(),
                hr24_file: files[h].clone(),
                is_paired: true,
            }
        })
        .collect();

    let unpaired = files
        .iter()
        .zip(&in_pair)
        .filter(|(_, paired)| !**paired)
        .map(|(f, _)| f.clone())
        .collect();

    FpodPairing { pairs, unpaired }
}

/// One row of the file timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TimelineEntry<T> {
    Single {
        file: T,
    },
    Paired {
        base_name: String,
        primary: T,
        secondary: T,
    },
}

/// Replace every FPOD pair with a single entry
///
/// The pair entry takes the position of whichever member comes first; the
/// `_std` file is the primary. Other files stay as singletons in place.
pub fn create_paired_timeline_entries<T: NamedFile + Clone>(files: &[T]) -> Vec<TimelineEntry<T>> {
    // position -> Some(pair) for the first member, None for the second
    let mut at: HashMap<usize, Option<(String, usize, usize)>> = HashMap::new();
    for (base, s, h) in complete_pairs(files) {
        let (first, second) = if s < h { (s, h) } else { (h, s) };
        at.insert(first, Some((base, s, h)));
        at.insert(second, None);
    }

    let mut entries = Vec::with_capacity(files.len());
    for (idx, file) in files.iter().enumerate() {
        match at.remove(&idx) {
            Some(Some((base_name, s, h))) => entries.push(TimelineEntry::Paired {
                base_name,
                primary: files[s].clone(),
                secondary: files[h].clone(),
            }),
            Some(None) => {}
            None => entries.push(TimelineEntry::Single { file: file.clone() }),
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_base_name() {
        assert_eq!(get_fpod_base_name("X_std.csv"), Some("X"));
        assert_eq!(get_fpod_base_name("North_Bay_24HR.CSV"), Some("North_Bay"));
        assert_eq!(get_fpod_base_name("North_Bay_std"), Some("North_Bay"));
        assert_eq!(get_fpod_base_name("North_std_Bay.csv"), None);
        assert_eq!(get_fpod_base_name("SITE1_SUBCAM.csv"), None);
    }

    #[test]
    fn test_complete_pair() {
        let result = pair_fpod_files(&names(&["X_std.csv", "X_24hr.csv"]));
        assert_eq!(result.pairs.len(), 1);
        let pair = &result.pairs[0];
        assert!(pair.is_paired);
        assert_eq!(pair.base_name, "X");
        assert_eq!(pair.std_file, "X_std.csv");
        assert_eq!(pair.hr24_file, "X_24hr.csv");
        assert!(result.unpaired.is_empty());
    }

    #[test]
    fn test_single_side_is_unpaired() {
        let result = pair_fpod_files(&names(&["X_std.csv"]));
        assert!(result.pairs.is_empty());
        assert_eq!(result.unpaired, names(&["X_std.csv"]));
    }

    #[test]
    fn test_ambiguous_group_is_unpaired() {
        let files = names(&["X_std.csv", "X_std.txt", "X_24hr.csv", "Y.csv"]);
        let result = pair_fpod_files(&files);
        assert!(result.pairs.is_empty());
        assert_eq!(result.unpaired, files);
    }

    #[test]
    fn test_mixed_list_keeps_input_order() {
        let files = names(&["a.csv", "X_24hr.csv", "Y_std.csv", "X_std.csv"]);
        let result = pair_fpod_files(&files);
        assert_eq!(result.pairs.len(), 1);
        assert!(result.pairs.iter().all(|p| p.is_paired));
        assert_eq!(result.unpaired, names(&["a.csv", "Y_std.csv"]));
    }

    #[test]
    fn test_timeline_collapses_pairs() {
        let files = names(&["a.csv", "X_24hr.csv", "Y_std.csv", "X_std.csv"]);
        let entries = create_paired_timeline_entries(&files);
        assert_eq!(
            entries,
            vec![
                TimelineEntry::Single {
                    file: "a.csv".to_string()
                },
                TimelineEntry::Paired {
                    base_name: "X".to_string(),
                    primary: "X_std.csv".to_string(),
                    secondary: "X_24hr.csv".to_string(),
                },
                TimelineEntry::Single {
                    file: "Y_std.csv".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_pairs_file_metadata() {
        let files = vec![
            FileMetadata::new("p1", "Bay_std.csv", "p1/Bay_std.csv"),
            FileMetadata::new("p1", "Bay_24hr.csv", "p1/Bay_24hr.csv"),
        ];
        let result = pair_fpod_files(&files);
        assert_eq!(result.pairs[0].std_file.id, files[0].id);
    }
}

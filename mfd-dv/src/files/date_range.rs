//! Sampling date range of an uploaded file
//!
//! Discrete sampling files (crop, chemistry, water quality, eDNA) count
//! distinct sampling days. Continuous logger files count the inclusive
//! span between first and last timestamp.
//!
//! Failures never propagate as `Err`: the result carries an `error` string
//! and empty date fields, which callers treat as "range unknown".

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use futures::future::join_all;
use mfd_common::time::{display_date, parse_timestamp_list};
use mfd_common::FileMetadata;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use super::classifier::device_type;
use super::tabular::Table;
use crate::store::ObjectStore;

const SECONDS_PER_DAY: f64 = 86_400.0;

const DISCRETE_MARKERS: &[&str] = &["crop", "chem", "wq", "edna"];

/// `YYMM-YYMM` / `YYMM_YYMM` not embedded in a longer digit run
static DECLARED_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^0-9])(\d{2})(\d{2})[-_](\d{2})(\d{2})(?:[^0-9]|$)").expect("static regex")
});

/// Outcome of analysing one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRangeResult {
    pub total_days: Option<i64>,
    /// `DD/MM/YYYY`
    pub start_date: Option<String>,
    /// `DD/MM/YYYY`
    pub end_date: Option<String>,
    /// Distinct sampling days (`DD/MM/YYYY`), discrete files only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_dates: Option<Vec<String>>,
    pub is_discrete: bool,
    /// Dates outside the range declared in the file name
    pub out_of_range: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// First and last parsed timestamps, for caching on the file record
    #[serde(skip)]
    pub span: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl DateRangeResult {
    fn failed(is_discrete: bool, message: impl Into<String>) -> Self {
        Self {
            total_days: None,
            start_date: None,
            end_date: None,
            unique_dates: None,
            is_discrete,
            out_of_range: 0,
            error: Some(message.into()),
            span: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// File name marks a discrete sampling file
pub fn is_discrete_file(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    DISCRETE_MARKERS.iter().any(|m| lower.contains(m))
}

/// Month window declared by a `YYMM-YYMM` token in the file name
///
/// Returns `[first day of start month, first day after end month)`.
pub fn declared_month_range(file_name: &str) -> Option<(NaiveDate, NaiveDate)> {
    let caps = DECLARED_RANGE.captures(file_name)?;
    let num = |i: usize| caps[i].parse::<u32>().ok();
    let start = month_start(num(1)?, num(2)?)?;
    let end_month = month_start(num(3)?, num(4)?)?;
    if end_month < start {
        return None;
    }
    let end = if end_month.month() == 12 {
        NaiveDate::from_ymd_opt(end_month.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(end_month.year(), end_month.month() + 1, 1)?
    };
    Some((start, end))
}

fn month_start(yy: u32, mm: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2000 + yy as i32, mm, 1)
}

/// Continuous span in days, counting both endpoints
pub fn inclusive_span_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let seconds = (end - start).num_seconds().max(0) as f64;
    (seconds / SECONDS_PER_DAY).ceil() as i64 + 1
}

/// Analyse already-parsed file content
///
/// **Algorithm:**
/// 1. Locate the date column
/// 2. Parse every cell; a cell may hold a comma-separated list of dates
/// 3. Discrete files: total = number of distinct days
/// 4. Continuous files: total = ceil(span in days) + 1
/// 5. Check dates against a `YYMM-YYMM` window in the name (discrete files
///    and fixed-format loggers only); mismatches are counted and logged,
///    never dropped
pub fn analyze_table(file_name: &str, table: &Table) -> DateRangeResult {
    let discrete = is_discrete_file(file_name);

    let Some(col) = table.detect_date_column() else {
        return DateRangeResult::failed(discrete, "No date column found");
    };

    let mut dates: Vec<DateTime<Utc>> = Vec::new();
    let mut unparsed = 0usize;
    for row in 0..table.rows.len() {
        let Some(cell) = table.cell(row, col) else {
            continue;
        };
        let parsed = parse_timestamp_list(cell);
        if parsed.is_empty() {
            unparsed += 1;
        }
        dates.extend(parsed);
    }
    if unparsed > 0 {
        debug!(file = %file_name, unparsed, "Skipped unparseable date cells");
    }

    let (Some(first), Some(last)) = (dates.iter().min().copied(), dates.iter().max().copied())
    else {
        return DateRangeResult::failed(discrete, "No valid dates found");
    };

    let out_of_range = check_declared_range(file_name, discrete, &dates);

    if discrete {
        let days: BTreeSet<NaiveDate> = dates.iter().map(|d| d.date_naive()).collect();
        DateRangeResult {
            total_days: Some(days.len() as i64),
            start_date: Some(display_date(first.date_naive())),
            end_date: Some(display_date(last.date_naive())),
            unique_dates: Some(days.iter().map(|d| display_date(*d)).collect()),
            is_discrete: true,
            out_of_range,
            error: None,
            span: Some((first, last)),
        }
    } else {
        DateRangeResult {
            total_days: Some(inclusive_span_days(first, last)),
            start_date: Some(display_date(first.date_naive())),
            end_date: Some(display_date(last.date_naive())),
            unique_dates: None,
            is_discrete: false,
            out_of_range,
            error: None,
            span: Some((first, last)),
        }
    }
}

fn check_declared_range(file_name: &str, discrete: bool, dates: &[DateTime<Utc>]) -> usize {
    let fixed_format = device_type(file_name).is_some_and(|d| d.is_fixed_format_logger());
    if !(discrete || fixed_format) {
        return 0;
    }
    let Some((start, end)) = declared_month_range(file_name) else {
        return 0;
    };

    let outside = dates
        .iter()
        .filter(|d| {
            let day = d.date_naive();
            day < start || day >= end
        })
        .count();
    if outside > 0 {
        warn!(
            file = %file_name,
            outside,
            declared_start = %start,
            declared_end = %end,
            "Dates fall outside the range declared in the file name"
        );
    }
    outside
}

/// Range from dates cached on the file record
///
/// Only continuous files qualify; a discrete total needs the distinct days,
/// which the record does not hold.
pub fn from_metadata(file: &FileMetadata) -> Option<DateRangeResult> {
    if is_discrete_file(&file.file_name) {
        return None;
    }
    let (start, end) = (file.start_date?, file.end_date?);
    Some(DateRangeResult {
        total_days: Some(inclusive_span_days(start, end)),
        start_date: Some(display_date(start.date_naive())),
        end_date: Some(display_date(end.date_naive())),
        unique_dates: None,
        is_discrete: false,
        out_of_range: 0,
        error: None,
        span: Some((start, end)),
    })
}

/// Date range analysis over stored files
#[derive(Clone)]
pub struct DateRangeAnalyzer {
    store: Arc<dyn ObjectStore>,
}

impl DateRangeAnalyzer {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Analyse one file, using cached dates when the record has them
    pub async fn analyze(&self, file: &FileMetadata) -> DateRangeResult {
        if let Some(cached) = from_metadata(file) {
            debug!(file = %file.file_name, "Date range served from file record");
            return cached;
        }

        let discrete = is_discrete_file(&file.file_name);
        let bytes = match self.store.get(&file.storage_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %file.file_name, error = %e, "Download for date analysis failed");
                return DateRangeResult::failed(discrete, e.to_string());
            }
        };

        match Table::from_bytes(&bytes) {
            Ok(table) => analyze_table(&file.file_name, &table),
            Err(e) => DateRangeResult::failed(discrete, e.to_string()),
        }
    }

    /// Analyse several files concurrently; each result stands alone
    pub async fn analyze_many(&self, files: &[FileMetadata]) -> Vec<DateRangeResult> {
        join_all(files.iter().map(|f| self.analyze(f))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalObjectStore;
    use chrono::TimeZone;

    fn table(csv: &str) -> Table {
        Table::from_bytes(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_discrete_counts_unique_days() {
        let t = table(
            "Date,Sample\n\
             2024-03-05T09:00:00Z,a\n\
             2024-03-05T10:00:00Z,b\n\
             2024-03-05T11:00:00Z,c\n\
             2024-03-09T09:00:00Z,d\n",
        );
        let result = analyze_table("BAY_CROP_2403.csv", &t);
        assert!(result.is_discrete);
        assert_eq!(result.total_days, Some(2));
        assert_eq!(
            result.unique_dates,
            Some(vec!["05/03/2024".to_string(), "09/03/2024".to_string()])
        );
        assert_eq!(result.start_date.as_deref(), Some("05/03/2024"));
        assert_eq!(result.end_date.as_deref(), Some("09/03/2024"));
    }

    #[test]
    fn test_continuous_inclusive_span() {
        let t = table("Time,Temp\n2024-01-01,1\n2024-01-05,2\n2024-01-10,3\n");
        let result = analyze_table("GP_Bay.csv", &t);
        assert!(!result.is_discrete);
        assert_eq!(result.total_days, Some(10));
        assert!(result.unique_dates.is_none());
    }

    #[test]
    fn test_partial_day_rounds_up() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 6, 0, 0).unwrap();
        assert_eq!(inclusive_span_days(start, end), 3);
        assert_eq!(inclusive_span_days(start, start), 1);
    }

    #[test]
    fn test_multi_date_cells() {
        let t = table(
            "Sample,Dates\n\
             s1,\"2024-04-01T10:00:00Z, 2024-04-03T10:00:00Z\"\n\
             s2,2024-04-03T12:00:00Z\n",
        );
        let result = analyze_table("SITE_EDNA.csv", &t);
        assert_eq!(result.total_days, Some(2));
    }

    #[test]
    fn test_missing_date_column_is_reported() {
        let result = analyze_table("GP_Bay.csv", &table("Site,Temp\nA,1\n"));
        assert_eq!(result.error.as_deref(), Some("No date column found"));
        assert!(result.total_days.is_none());
        assert!(result.start_date.is_none());
    }

    #[test]
    fn test_no_valid_dates_is_reported() {
        let result = analyze_table("GP_Bay.csv", &table("Date,Temp\nsoon,1\n,2\n"));
        assert_eq!(result.error.as_deref(), Some("No valid dates found"));
    }

    #[test]
    fn test_declared_range_parsing() {
        let (start, end) = declared_month_range("ALGA_CHEMSW_2503-2506.csv").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());

        let (_, end) = declared_month_range("GP_2411_2412.csv").unwrap();
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());

        assert!(declared_month_range("GP_202503-2506.csv").is_none());
        assert!(declared_month_range("GP_2513-2514.csv").is_none());
        assert!(declared_month_range("GP_2506-2503.csv").is_none());
    }

    #[test]
    fn test_out_of_range_dates_are_flagged_not_dropped() {
        let t = table("Date,Value\n2025-03-10,1\n2025-08-01,2\n");
        let result = analyze_table("BAY_CHEM_2503-2506.csv", &t);
        assert_eq!(result.out_of_range, 1);
        assert_eq!(result.total_days, Some(2));
        assert_eq!(result.end_date.as_deref(), Some("01/08/2025"));
    }

    #[test]
    fn test_range_check_skipped_for_other_files() {
        let t = table("Date,Value\n2025-03-10,1\n2025-08-01,2\n");
        let result = analyze_table("SUBCAM_2503-2506.csv", &t);
        assert_eq!(result.out_of_range, 0);
    }

    #[test]
    fn test_metadata_fast_path() {
        let mut file = FileMetadata::new("p1", "GP_Bay.csv", "p1/GP_Bay.csv");
        assert!(from_metadata(&file).is_none());
        file.start_date = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        file.end_date = Some(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap());
        assert_eq!(from_metadata(&file).unwrap().total_days, Some(10));

        file.file_name = "BAY_CROP.csv".to_string();
        assert!(from_metadata(&file).is_none());
    }

    #[tokio::test]
    async fn test_analyzer_reads_from_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalObjectStore::new(dir.path()));
        store
            .put("p1/GP_Bay.csv", b"Date,Temp\n2024-01-01,1\n2024-01-10,2\n".to_vec())
            .await
            .unwrap();
        let analyzer = DateRangeAnalyzer::new(store);

        let ok = FileMetadata::new("p1", "GP_Bay.csv", "p1/GP_Bay.csv");
        let missing = FileMetadata::new("p1", "GP_Gone.csv", "p1/GP_Gone.csv");
        let results = analyzer.analyze_many(&[ok, missing]).await;

        assert_eq!(results[0].total_days, Some(10));
        assert!(results[0].span.is_some());
        assert!(results[1].error.is_some());
        assert!(results[1].total_days.is_none());
    }
}

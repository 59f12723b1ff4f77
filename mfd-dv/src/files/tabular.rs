//! Tabular file adapter
//!
//! Sensor and sample exports are CSV with a header row. Layouts vary per
//! device, so columns are located by name rather than by position.

use std::collections::BTreeMap;

use csv::{ReaderBuilder, Trim};
use mfd_common::{DataPoint, Error, OccurrenceRecord, Rank, Result, SampleValue};
use serde::Serialize;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Header names recognised as the sampling time column, in preference order
pub const DATE_COLUMN_NAMES: &[&str] = &[
    "date",
    "datetime",
    "date_time",
    "timestamp",
    "time",
    "sample_date",
    "sampling_date",
    "collection_date",
];

const TAXON_COLUMNS: &[&str] = &[
    "taxon",
    "taxa",
    "species",
    "scientific_name",
    "scientificname",
    "organism",
];
const RANK_COLUMNS: &[&str] = &["rank", "taxon_rank", "taxonrank"];
const SITE_COLUMNS: &[&str] = &["site", "pin", "station", "location", "sample_site"];
const VALUE_COLUMNS: &[&str] = &[
    "count",
    "value",
    "haplotype_count",
    "haplotypes",
    "reads",
    "abundance",
];

/// A parsed CSV file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Parse CSV bytes; rows may be shorter or longer than the header row
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| Error::Parse(format!("Unreadable header row: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| Error::Parse(format!("Row {}: {}", line + 2, e)))?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text, `None` when the row is too short or the cell is blank
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Index of the first header equal (case-insensitive) to any candidate,
    /// trying candidates in order
    pub fn find_column(&self, candidates: &[&str]) -> Option<usize> {
        candidates.iter().find_map(|candidate| {
            self.headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(candidate))
        })
    }

    /// Sampling time column
    ///
    /// Exact well-known names first, then any header mentioning a date or
    /// time.
    pub fn detect_date_column(&self) -> Option<usize> {
        self.find_column(DATE_COLUMN_NAMES).or_else(|| {
            self.headers.iter().position(|h| {
                let lower = h.to_lowercase();
                lower.contains("date") || lower.contains("time")
            })
        })
    }

    /// Union of several tables
    ///
    /// Headers keep first-seen order; each row is re-laid onto the union
    /// header with blanks where its source had no such column.
    pub fn merge(tables: &[Table]) -> Table {
        let mut headers: Vec<String> = Vec::new();
        for table in tables {
            for h in &table.headers {
                if !headers.contains(h) {
                    headers.push(h.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for table in tables {
            let mapping: Vec<usize> = table
                .headers
                .iter()
                .filter_map(|h| headers.iter().position(|u| u == h))
                .collect();
            for row in &table.rows {
                let mut merged = vec![String::new(); headers.len()];
                for (src, dst) in mapping.iter().enumerate() {
                    if let Some(value) = row.get(src) {
                        merged[*dst] = value.clone();
                    }
                }
                rows.push(merged);
            }
        }

        Table { headers, rows }
    }

    /// Occurrence records from a taxon table
    ///
    /// Long layout: one row per (taxon, site) with an optional count column.
    /// Wide layout (no site column): every numeric non-taxon column is a
    /// site, and each non-empty numeric cell becomes one record.
    pub fn to_occurrence_records(&self) -> Result<Vec<OccurrenceRecord>> {
        let taxon_col = self
            .find_column(TAXON_COLUMNS)
            .ok_or_else(|| Error::Parse("No taxon column found".to_string()))?;
        let rank_col = self.find_column(RANK_COLUMNS);
        let site_col = self.find_column(SITE_COLUMNS);
        let date_col = self.detect_date_column();
        let value_col = self.find_column(VALUE_COLUMNS);

        let mut records = Vec::new();
        for (idx, row) in self.rows.iter().enumerate() {
            let Some(taxon) = self.cell(idx, taxon_col) else {
                continue;
            };
            let rank = rank_col
                .and_then(|c| self.cell(idx, c))
                .and_then(|r| r.parse::<Rank>().ok())
                .filter(|r| *r != Rank::Unknown);
            let timestamp = date_col.and_then(|c| self.cell(idx, c));

            let base = |site: &str| {
                let mut record = OccurrenceRecord::new(taxon, site);
                record.rank = rank;
                record.timestamp = timestamp.map(str::to_string);
                record
            };

            match site_col {
                Some(site_col) => {
                    let mut record = base(self.cell(idx, site_col).unwrap_or(""));
                    record.value = value_col
                        .and_then(|c| self.cell(idx, c))
                        .and_then(|v| v.parse::<f64>().ok());
                    let dedicated =
                        [Some(taxon_col), rank_col, Some(site_col), date_col, value_col];
                    record.extra = self.extras(row, &dedicated);
                    records.push(record);
                }
                None => {
                    for (col, header) in self.headers.iter().enumerate() {
                        if col == taxon_col || Some(col) == rank_col || Some(col) == date_col {
                            continue;
                        }
                        let Some(value) = self.cell(idx, col).and_then(|v| v.parse::<f64>().ok())
                        else {
                            continue;
                        };
                        let mut record = base(header);
                        record.value = Some(value);
                        records.push(record);
                    }
                }
            }
        }
        Ok(records)
    }

    fn extras(&self, row: &[String], dedicated: &[Option<usize>]) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(col, _)| !dedicated.contains(&Some(*col)))
            .filter_map(|(col, header)| {
                row.get(col)
                    .filter(|v| !v.is_empty())
                    .map(|v| (header.clone(), v.clone()))
            })
            .collect()
    }

    /// Time-series points: the time column plus one series per other column
    pub fn to_data_points(&self) -> Result<Vec<DataPoint>> {
        let time_col = self
            .detect_date_column()
            .ok_or_else(|| Error::Parse("No date/time column found".to_string()))?;

        let points = (0..self.rows.len())
            .map(|idx| {
                let time = self.cell(idx, time_col).unwrap_or("");
                self.headers
                    .iter()
                    .enumerate()
                    .filter(|(col, _)| *col != time_col)
                    .fold(DataPoint::new(time), |point, (col, header)| {
                        point.with(header, sample_value(self.cell(idx, col)))
                    })
            })
            .collect();
        Ok(points)
    }

    /// Series names `to_data_points` would produce
    pub fn series_names(&self) -> Vec<String> {
        let time_col = self.detect_date_column();
        self.headers
            .iter()
            .enumerate()
            .filter(|(col, _)| Some(*col) != time_col)
            .map(|(_, h)| h.clone())
            .collect()
    }
}

fn sample_value(cell: Option<&str>) -> SampleValue {
    match cell {
        None => SampleValue::Null,
        Some(text) => match text.parse::<f64>() {
            Ok(v) if v.is_finite() => SampleValue::Number(v),
            _ => SampleValue::Text(text.to_string()),
        },
    }
}

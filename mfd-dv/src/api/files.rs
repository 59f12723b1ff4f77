//! File classification, FPOD pairing and date range endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use mfd_common::{DataPoint, FileMetadata};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::files::{
    classify_file, create_paired_timeline_entries, pair_fpod_files, Classification,
    DateRangeResult, FpodPairing, Table, TimelineEntry,
};
use crate::store::fetch_pair;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FileNamesRequest {
    pub file_names: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub files: Vec<Classification>,
}

/// POST /api/files/classify
pub async fn classify_files(Json(req): Json<FileNamesRequest>) -> Json<ClassifyResponse> {
    Json(ClassifyResponse {
        files: req.file_names.iter().map(|n| classify_file(n)).collect(),
    })
}

#[derive(Debug, Serialize)]
pub struct FpodPairsResponse {
    #[serde(flatten)]
    pub pairing: FpodPairing<String>,
    pub timeline: Vec<TimelineEntry<String>>,
}

/// POST /api/files/fpod-pairs
pub async fn fpod_pairs(Json(req): Json<FileNamesRequest>) -> Json<FpodPairsResponse> {
    Json(FpodPairsResponse {
        pairing: pair_fpod_files(&req.file_names),
        timeline: create_paired_timeline_entries(&req.file_names),
    })
}

#[derive(Debug, Deserialize)]
pub struct OpenPairRequest {
    pub std_id: Uuid,
    pub hr24_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PairedSeries {
    pub file_id: Uuid,
    pub file_name: String,
    pub series: Vec<String>,
    pub points: Vec<DataPoint>,
}

#[derive(Debug, Serialize)]
pub struct OpenPairResponse {
    pub base_name: String,
    pub primary: PairedSeries,
    pub secondary: PairedSeries,
}

fn paired_series(file: FileMetadata, bytes: &[u8]) -> ApiResult<PairedSeries> {
    let table = Table::from_bytes(bytes)?;
    Ok(PairedSeries {
        file_id: file.id,
        series: table.series_names(),
        points: table.to_data_points()?,
        file_name: file.file_name,
    })
}

/// POST /api/files/fpod-pairs/open
///
/// Both halves are downloaded together; if either fails nothing is
/// returned.
pub async fn open_fpod_pair(
    State(state): State<AppState>,
    Json(req): Json<OpenPairRequest>,
) -> ApiResult<Json<OpenPairResponse>> {
    let std_file = state.catalog.get(req.std_id).await?;
    let hr24_file = state.catalog.get(req.hr24_id).await?;

    let pairing = pair_fpod_files(&[std_file.clone(), hr24_file.clone()]);
    let pair = pairing
        .pairs
        .into_iter()
        .next()
        .filter(|p| p.std_file.id == std_file.id)
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "{} and {} are not a standard/24hr FPOD pair",
                std_file.file_name, hr24_file.file_name
            ))
        })?;

    let (std_bytes, hr24_bytes) =
        fetch_pair(state.store.as_ref(), &std_file.storage_path, &hr24_file.storage_path).await?;

    Ok(Json(OpenPairResponse {
        base_name: pair.base_name,
        primary: paired_series(std_file, &std_bytes)?,
        secondary: paired_series(hr24_file, &hr24_bytes)?,
    }))
}

/// GET /api/files/:id/date-range
///
/// A successful slow-path analysis is cached on the file record so later
/// calls for continuous files take the fast path.
pub async fn file_date_range(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DateRangeResult>> {
    let file = state.catalog.get(id).await?;
    let result = state.analyzer().analyze(&file).await;

    if file.start_date.is_none() {
        if let Some((start, end)) = result.span {
            match state.catalog.update_date_range(id, start, end).await {
                Ok(()) => info!(file = %file.file_name, "Cached sampling span"),
                Err(e) => {
                    warn!(file = %file.file_name, error = %e, "Failed to cache sampling span")
                }
            }
        }
    }

    Ok(Json(result))
}

//! Evidence API endpoints.

use axum::{
    body::Bytes,
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::db::LoadStatus;
use crate::errors::AppError;
use crate::models::{CategoryInfo, EvidenceRecord, EvidenceSubmission, GpCategory};
use crate::sync::{SubmissionOutcome, UploadedFile};
use crate::AppState;

/// Filters for listing evidence.
#[derive(Debug, Default, Deserialize)]
pub struct EvidenceQuery {
    pub category: Option<String>,
    pub standard: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceList {
    pub records: Vec<EvidenceRecord>,
    /// Only reported for unfiltered listings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_status: Option<LoadStatus>,
}

/// GET /api/evidence - List evidence, optionally by category and/or standard.
pub async fn list_evidence(
    State(state): State<AppState>,
    Query(query): Query<EvidenceQuery>,
) -> ApiResult<EvidenceList> {
    let list = match (query.category, query.standard) {
        (Some(category), standard) => {
            let mut records = state.store.filter_by_category(&category).await;
            if let Some(standard) = standard {
                records.retain(|r| r.standard_id.as_deref() == Some(standard.as_str()));
            }
            EvidenceList {
                records,
                load_status: None,
            }
        }
        (None, Some(standard)) => EvidenceList {
            records: state.store.filter_by_standard(&standard).await,
            load_status: None,
        },
        (None, None) => {
            let outcome = state.store.load().await;
            EvidenceList {
                load_status: Some(outcome.status()),
                records: outcome.into_records(),
            }
        }
    };

    success(list)
}

/// GET /api/evidence/:id - Get a single evidence record.
pub async fn get_evidence(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<EvidenceRecord> {
    match state.store.get(&id).await {
        Some(record) => success(record),
        None => Err(AppError::NotFound(format!("Evidence {} not found", id))),
    }
}

/// POST /api/evidence - Record evidence that references a file by URL or path.
pub async fn create_evidence(
    State(state): State<AppState>,
    axum::Json(submission): axum::Json<EvidenceSubmission>,
) -> ApiResult<EvidenceRecord> {
    let category = submission.validate()?;
    let record = submission.into_record(category);

    state.store.append(record.clone()).await?;

    if let Err(e) = state.search.index_evidence(&record).await {
        tracing::warn!("Failed to index evidence: {}", e);
    }

    success(record)
}

/// POST /api/evidence/upload - Upload a file to Drive and record it.
pub async fn upload_evidence(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<SubmissionOutcome> {
    let (file, submission) = read_upload_form(multipart).await?;

    let outcome = state.sync.submit(file, submission).await?;

    if let Err(e) = state.search.index_evidence(&outcome.record).await {
        tracing::warn!("Failed to index evidence: {}", e);
    }

    success(outcome)
}

/// DELETE /api/evidence - Remove every evidence record.
pub async fn clear_evidence(State(state): State<AppState>) -> ApiResult<()> {
    state.store.clear().await?;

    if let Err(e) = state.search.rebuild(&[]).await {
        tracing::warn!("Failed to clear search index: {}", e);
    }

    success(())
}

/// GET /api/evidence/count
pub async fn count_evidence(State(state): State<AppState>) -> ApiResult<usize> {
    success(state.store.count().await)
}

/// GET /api/evidence/types - Evidence types already in use.
pub async fn list_evidence_types(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    success(state.store.list_types().await)
}

/// GET /api/evidence/export - Download the collection as a JSON file.
pub async fn export_evidence(State(state): State<AppState>) -> Result<Response, AppError> {
    let export = state.store.export_as_file().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.bytes,
    )
        .into_response())
}

/// POST /api/evidence/import - Replace the collection with an exported file.
pub async fn import_evidence(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Vec<EvidenceRecord>> {
    let records = state.store.import_from_file(&body).await?;

    if let Err(e) = state.search.rebuild(&records).await {
        tracing::warn!("Failed to rebuild search index after import: {}", e);
    }

    success(records)
}

/// GET /api/categories - The six GP categories with badge colours.
pub async fn list_categories() -> ApiResult<Vec<CategoryInfo>> {
    success(GpCategory::ALL.into_iter().map(CategoryInfo::from).collect())
}

async fn read_upload_form(
    mut multipart: Multipart,
) -> Result<(UploadedFile, EvidenceSubmission), AppError> {
    let mut file = None;
    let mut submission = EvidenceSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(bad_form)?.to_vec();
                file = Some(UploadedFile {
                    filename,
                    mime_type,
                    bytes,
                });
            }
            "title" => submission.title = text(field).await?,
            "description" => submission.description = text(field).await?,
            "category" => submission.category = text(field).await?,
            "type" => submission.evidence_type = text(field).await?,
            "standardId" => submission.standard_id = Some(text(field).await?),
            "date" => {
                let raw = text(field).await?;
                let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                    AppError::Validation(format!("Date must be YYYY-MM-DD, got '{}'", raw))
                })?;
                submission.date = Some(date);
            }
            "tags" => submission
                .tags
                .extend(text(field).await?.split(',').map(str::to_string)),
            other => tracing::debug!("Ignoring upload field {:?}", other),
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("A file is required".to_string()))?;
    Ok((file, submission))
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(bad_form)
}

fn bad_form(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid upload form: {}", err))
}

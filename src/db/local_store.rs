//! Local store for evidence records and the teacher profile.
//!
//! Every mutating call reads the whole document, modifies it, and writes it back
//! before returning. Reads never fail: a missing, corrupt, or unreadable document
//! degrades to an empty collection, and the outcome says which case occurred.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::models::{EvidenceRecord, GpCategory, ProfileRecord};

/// Key holding the evidence collection.
pub const EVIDENCE_KEY: &str = "localEvidenceStore";
/// Key holding the profile singleton.
pub const PROFILE_KEY: &str = "teacherProfile";
/// Filename offered for evidence exports.
pub const EXPORT_FILENAME: &str = "localEvidenceStore.json";

/// Result of reading the evidence collection.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Nothing has been stored yet
    Empty,
    Records(Vec<EvidenceRecord>),
    /// A payload exists but is not a list of records; treated as empty
    Corrupt { reason: String },
    /// The backend could not be read; treated as empty
    Unavailable { reason: String },
}

/// Serializable summary of a [`LoadOutcome`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Empty,
    Ok,
    Corrupt,
    Unavailable,
}

impl LoadOutcome {
    pub fn records(&self) -> &[EvidenceRecord] {
        match self {
            LoadOutcome::Records(records) => records,
            _ => &[],
        }
    }

    pub fn into_records(self) -> Vec<EvidenceRecord> {
        match self {
            LoadOutcome::Records(records) => records,
            _ => Vec::new(),
        }
    }

    /// True when stored data exists but could not be used.
    pub fn is_data_loss(&self) -> bool {
        matches!(
            self,
            LoadOutcome::Corrupt { .. } | LoadOutcome::Unavailable { .. }
        )
    }

    pub fn status(&self) -> LoadStatus {
        match self {
            LoadOutcome::Empty => LoadStatus::Empty,
            LoadOutcome::Records(_) => LoadStatus::Ok,
            LoadOutcome::Corrupt { .. } => LoadStatus::Corrupt,
            LoadOutcome::Unavailable { .. } => LoadStatus::Unavailable,
        }
    }
}

/// A serialized export ready to be offered as a download.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: &'static str,
    pub bytes: Vec<u8>,
}

/// Owns the persisted evidence collection and profile. Callers only get snapshots.
pub struct LocalStore {
    pool: SqlitePool,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    // ==================== EVIDENCE OPERATIONS ====================

    /// Load the full collection in insertion order.
    pub async fn load(&self) -> LoadOutcome {
        let raw = match self.read_key(EVIDENCE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return LoadOutcome::Empty,
            Err(e) => {
                tracing::error!("Failed to read evidence store: {}", e);
                return LoadOutcome::Unavailable {
                    reason: e.to_string(),
                };
            }
        };

        match serde_json::from_str::<Vec<EvidenceRecord>>(&raw) {
            Ok(records) => LoadOutcome::Records(records),
            Err(e) => {
                tracing::warn!("Stored evidence is not a valid record list, using empty: {}", e);
                LoadOutcome::Corrupt {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Append a record to the end of the collection and persist it.
    ///
    /// A corrupt collection is replaced; an unreadable one is left alone and
    /// the append fails.
    pub async fn append(&self, mut record: EvidenceRecord) -> Result<Vec<EvidenceRecord>, AppError> {
        let _guard = self.write_lock.lock().await;

        let mut records = match self.load().await {
            LoadOutcome::Unavailable { reason } => {
                return Err(AppError::Persistence(format!(
                    "Evidence store could not be read, not appending {}: {}",
                    record.id, reason
                )));
            }
            LoadOutcome::Corrupt { reason } => {
                tracing::warn!(
                    "Replacing corrupt evidence store while appending {}: {}",
                    record.id,
                    reason
                );
                Vec::new()
            }
            outcome => outcome.into_records(),
        };

        if records.iter().any(|r| r.id == record.id) {
            return Err(AppError::Validation(format!(
                "Evidence {} already exists",
                record.id
            )));
        }

        record.normalize_tags();
        records.push(record);
        self.write_records(&records).await?;

        Ok(records)
    }

    /// Records filed under `category`, in insertion order.
    pub async fn filter_by_category(&self, category: &str) -> Vec<EvidenceRecord> {
        let Some(category) = GpCategory::parse(category) else {
            tracing::warn!("Unrecognized category filter: {:?}", category);
            return Vec::new();
        };

        self.load()
            .await
            .into_records()
            .into_iter()
            .filter(|r| r.gp_category() == Some(category))
            .collect()
    }

    /// Records tagged with exactly `standard_id`, in insertion order.
    pub async fn filter_by_standard(&self, standard_id: &str) -> Vec<EvidenceRecord> {
        self.load()
            .await
            .into_records()
            .into_iter()
            .filter(|r| r.standard_id.as_deref() == Some(standard_id))
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<EvidenceRecord> {
        self.load().await.into_records().into_iter().find(|r| r.id == id)
    }

    /// Distinct evidence types already in use, in first-seen order.
    pub async fn list_types(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.load()
            .await
            .into_records()
            .into_iter()
            .map(|r| r.evidence_type)
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect()
    }

    /// Serialize the collection as pretty-printed JSON.
    pub async fn export_as_file(&self) -> Result<ExportFile, AppError> {
        let records = self.load().await.into_records();
        let bytes = serde_json::to_vec_pretty(&records)
            .map_err(|e| AppError::Internal(format!("Failed to serialize export: {}", e)))?;

        Ok(ExportFile {
            filename: EXPORT_FILENAME,
            bytes,
        })
    }

    /// Replace the whole collection with the records in `bytes`.
    ///
    /// Nothing is written unless the payload is a list of valid records with unique ids.
    pub async fn import_from_file(&self, bytes: &[u8]) -> Result<Vec<EvidenceRecord>, AppError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| AppError::Validation(format!("Import file is not valid JSON: {}", e)))?;

        if !value.is_array() {
            return Err(AppError::Validation(
                "Import file must contain a list of evidence records".to_string(),
            ));
        }

        let mut records: Vec<EvidenceRecord> = serde_json::from_value(value)
            .map_err(|e| AppError::Validation(format!("Invalid evidence record: {}", e)))?;

        let mut ids = HashSet::new();
        for record in &mut records {
            if !ids.insert(record.id.clone()) {
                return Err(AppError::Validation(format!(
                    "Duplicate evidence id {} in import",
                    record.id
                )));
            }
            record.normalize_tags();
        }

        let _guard = self.write_lock.lock().await;
        self.write_records(&records).await?;
        tracing::info!("Imported {} evidence records", records.len());

        Ok(records)
    }

    /// Remove the persisted collection entirely.
    pub async fn clear(&self) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        self.delete_key(EVIDENCE_KEY).await
    }

    pub async fn count(&self) -> usize {
        self.load().await.records().len()
    }

    // ==================== PROFILE OPERATIONS ====================

    /// The saved profile, or `None` when nothing usable is stored.
    pub async fn load_profile(&self) -> Option<ProfileRecord> {
        let raw = match self.read_key(PROFILE_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::error!("Failed to read profile: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!("Stored profile is malformed, ignoring it: {}", e);
                None
            }
        }
    }

    /// Overwrite the stored profile.
    pub async fn save_profile(&self, profile: &ProfileRecord) -> Result<(), AppError> {
        let raw = serde_json::to_string(profile)
            .map_err(|e| AppError::Persistence(format!("Failed to serialize profile: {}", e)))?;

        let _guard = self.write_lock.lock().await;
        self.write_key(PROFILE_KEY, &raw).await
    }

    pub async fn clear_profile(&self) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        self.delete_key(PROFILE_KEY).await
    }

    // ==================== KEY-VALUE PRIMITIVES ====================

    async fn write_records(&self, records: &[EvidenceRecord]) -> Result<(), AppError> {
        let raw = serde_json::to_string(records)
            .map_err(|e| AppError::Persistence(format!("Failed to serialize evidence: {}", e)))?;
        self.write_key(EVIDENCE_KEY, &raw).await
    }

    async fn read_key(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT value FROM local_storage WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row.try_get("value")).transpose()
    }

    async fn write_key(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_key(&self, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM local_storage WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

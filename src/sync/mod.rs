//! Evidence submission workflow.
//!
//! Uploads the file to Drive, then records the evidence locally. Folder and
//! upload failures abort before anything is written; sharing and link lookup
//! failures are downgraded to warnings because the file is already stored.

use std::sync::Arc;

use serde::Serialize;

use crate::config::DriveConfig;
use crate::db::LocalStore;
use crate::drive::{DriveClient, DriveSession, SessionStatus, ShareLinks, SignInGrant, TokenExchange};
use crate::errors::AppError;
use crate::models::{EvidenceRecord, EvidenceSubmission};

/// File content received from the dashboard.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub record: EvidenceRecord,
    /// False when the file was stored but anyone-with-link access could not be granted
    pub shared: bool,
}

pub struct EvidenceSync {
    session: DriveSession,
    exchange: TokenExchange,
    drive: DriveClient,
    store: Arc<LocalStore>,
    folder_name: String,
    refresh_token: Option<String>,
}

impl EvidenceSync {
    pub fn new(config: &DriveConfig, store: Arc<LocalStore>) -> Self {
        Self::with_session(config, store, DriveSession::new())
    }

    pub fn with_session(config: &DriveConfig, store: Arc<LocalStore>, session: DriveSession) -> Self {
        Self {
            session,
            exchange: TokenExchange::new(config),
            drive: DriveClient::new(config),
            store,
            folder_name: config.folder_name.clone(),
            refresh_token: config.refresh_token.clone(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Sign in with `grant`, or with the configured refresh token when none is given.
    pub async fn sign_in(&self, grant: Option<SignInGrant>) -> Result<SessionStatus, AppError> {
        let grant = match (grant, &self.refresh_token) {
            (Some(grant), _) => grant,
            (None, Some(refresh_token)) => SignInGrant::RefreshToken {
                refresh_token: refresh_token.clone(),
            },
            (None, None) => {
                return Err(AppError::Validation(
                    "No sign-in grant given and DRIVE_REFRESH_TOKEN is not set".to_string(),
                ))
            }
        };

        self.session.sign_in(&self.exchange, &grant).await?;
        Ok(self.session.status())
    }

    pub fn sign_out(&self) -> SessionStatus {
        self.session.sign_out();
        self.session.status()
    }

    /// Upload `file` and append an evidence record pointing at it.
    pub async fn submit(
        &self,
        file: UploadedFile,
        submission: EvidenceSubmission,
    ) -> Result<SubmissionOutcome, AppError> {
        let category = submission.validate()?;
        if file.bytes.is_empty() {
            return Err(AppError::Validation("Evidence file is empty".to_string()));
        }
        let filename = if file.filename.trim().is_empty() {
            "evidence".to_string()
        } else {
            file.filename.trim().to_string()
        };

        let token = self.session.credential()?;

        let folder_id = self.drive.ensure_folder(&token, &self.folder_name).await?;
        let file_id = self
            .drive
            .upload(&token, &file.bytes, &filename, &file.mime_type, &folder_id)
            .await?;

        let shared = match self.drive.make_public(&token, &file_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Uploaded {} but could not share it: {}", file_id, e);
                false
            }
        };

        let links = match self.drive.get_share_links(&token, &file_id).await {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!("Could not resolve links for {}, using defaults: {}", file_id, e);
                ShareLinks::fallback(&file_id)
            }
        };

        let mut record = submission.into_record(category);
        record.drive_link = Some(links.view_link);
        record.download_link = Some(links.download_link);
        record.drive_file_id = Some(file_id.clone());

        if let Err(e) = self.store.append(record.clone()).await {
            // The uploaded file is not rolled back.
            tracing::error!("Saving evidence failed, Drive file {} is orphaned: {}", file_id, e);
            return Err(e);
        }

        tracing::info!("Saved evidence {} ({})", record.id, record.category);
        Ok(SubmissionOutcome { record, shared })
    }
}

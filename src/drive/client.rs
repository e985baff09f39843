//! HTTP client for the Drive v3 REST API.
//!
//! Each operation is a single request authorized with the session's bearer
//! token. Non-success responses become `AppError::Remote`; nothing is retried
//! and no client-side timeout is applied.

use base64::Engine;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::types::{
    AccessToken, DriveFile, FileList, GoogleErrorResponse, ShareLinks, FOLDER_MIME_TYPE,
};
use crate::config::DriveConfig;
use crate::errors::AppError;

pub struct DriveClient {
    http: Client,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    pub fn new(config: &DriveConfig) -> Self {
        Self {
            http: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
        }
    }

    // ==================== Folders ====================

    /// Find a non-trashed folder named `name`, creating it when absent.
    ///
    /// Not atomic: two concurrent calls that both miss will create two folders.
    pub async fn ensure_folder(&self, token: &AccessToken, name: &str) -> Result<String, AppError> {
        if let Some(id) = self.find_folder(token, name).await? {
            tracing::debug!("Found Drive folder {:?} ({})", name, id);
            return Ok(id);
        }

        let id = self.create_folder(token, name).await?;
        tracing::info!("Created Drive folder {:?} ({})", name, id);
        Ok(id)
    }

    async fn find_folder(&self, token: &AccessToken, name: &str) -> Result<Option<String>, AppError> {
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            escape_query_literal(name),
            FOLDER_MIME_TYPE
        );

        let response = self
            .http
            .get(format!("{}/files", self.api_base))
            .bearer_auth(token.secret())
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("spaces", "drive"),
            ])
            .send()
            .await?;

        let list: FileList = handle_response(response).await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(&self, token: &AccessToken, name: &str) -> Result<String, AppError> {
        let response = self
            .http
            .post(format!("{}/files", self.api_base))
            .bearer_auth(token.secret())
            .query(&[("fields", "id")])
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME_TYPE }))
            .send()
            .await?;

        let file: DriveFile = handle_response(response).await?;
        Ok(file.id)
    }

    // ==================== Files ====================

    /// Upload `bytes` into `folder_id` as one multipart request and return the file id.
    pub async fn upload(
        &self,
        token: &AccessToken,
        bytes: &[u8],
        filename: &str,
        mime_type: &str,
        folder_id: &str,
    ) -> Result<String, AppError> {
        let boundary = format!("portfolio-{}", uuid::Uuid::new_v4().simple());
        let metadata = json!({
            "name": filename,
            "mimeType": mime_type,
            "parents": [folder_id],
        });
        let body = multipart_related_body(&metadata, bytes, mime_type, &boundary);

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(token.secret())
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;

        let file: DriveFile = handle_response(response).await?;
        tracing::info!("Uploaded {:?} to Drive as {}", filename, file.id);
        Ok(file.id)
    }

    /// Grant anyone-with-the-link read access.
    pub async fn make_public(&self, token: &AccessToken, file_id: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(format!("{}/files/{}/permissions", self.api_base, file_id))
            .bearer_auth(token.secret())
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    /// View and download links for an uploaded file.
    pub async fn get_share_links(
        &self,
        token: &AccessToken,
        file_id: &str,
    ) -> Result<ShareLinks, AppError> {
        let response = self
            .http
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(token.secret())
            .query(&[("fields", "id,webViewLink,webContentLink")])
            .send()
            .await?;

        let file: DriveFile = handle_response(response).await?;
        let fallback = ShareLinks::fallback(&file.id);

        Ok(ShareLinks {
            view_link: file.web_view_link.unwrap_or(fallback.view_link),
            download_link: file.web_content_link.unwrap_or(fallback.download_link),
        })
    }
}

/// Escape a value for use inside a single-quoted Drive query literal.
fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Build a `multipart/related` body: JSON metadata part, then base64 media part.
fn multipart_related_body(
    metadata: &serde_json::Value,
    bytes: &[u8],
    mime_type: &str,
    boundary: &str,
) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!(
        "--{b}\r\n\
         Content-Type: application/json; charset=UTF-8\r\n\r\n\
         {meta}\r\n\
         --{b}\r\n\
         Content-Type: {mime}\r\n\
         Content-Transfer-Encoding: base64\r\n\r\n\
         {data}\r\n\
         --{b}--",
        b = boundary,
        meta = metadata,
        mime = mime_type,
        data = encoded,
    )
}

async fn check_status(response: Response) -> Result<Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GoogleErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    tracing::warn!("Drive request failed with {}: {}", status, message);
    Err(AppError::Remote { status, message })
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    let response = check_status(response).await?;
    let status = response.status().as_u16();
    response.json::<T>().await.map_err(|e| AppError::Remote {
        status,
        message: format!("Unexpected Drive response: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::fake::{FakeDrive, FAKE_ACCESS_TOKEN};

    fn token() -> AccessToken {
        AccessToken::new(FAKE_ACCESS_TOKEN, None)
    }

    #[test]
    fn test_escape_query_literal() {
        assert_eq!(escape_query_literal("Ms O'Neil"), "Ms O\\'Neil");
        assert_eq!(escape_query_literal("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_related_body(&json!({ "name": "a.txt" }), b"hi", "text/plain", "XYZ");

        assert!(body.starts_with("--XYZ\r\nContent-Type: application/json"));
        assert!(body.contains("{\"name\":\"a.txt\"}"));
        assert!(body.contains("Content-Transfer-Encoding: base64\r\n\r\naGk=\r\n"));
        assert!(body.ends_with("--XYZ--"));
    }

    #[tokio::test]
    async fn test_ensure_folder_reuses_existing() {
        let fake = FakeDrive::start().await;
        let client = DriveClient::new(&fake.config());

        let first = client.ensure_folder(&token(), "Evidence").await.unwrap();
        let second = client.ensure_folder(&token(), "Evidence").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fake.folder_count("Evidence"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_ensure_folder_may_duplicate() {
        let fake = FakeDrive::start().await;
        fake.set_search_delay_ms(50);
        let client = DriveClient::new(&fake.config());
        let t = token();

        let (a, b) = tokio::join!(
            client.ensure_folder(&t, "X"),
            client.ensure_folder(&t, "X")
        );
        a.unwrap();
        b.unwrap();

        // No locking is applied, so one or two folders are both acceptable.
        let created = fake.folder_count("X");
        assert!((1..=2).contains(&created), "created {} folders", created);
    }

    #[tokio::test]
    async fn test_upload_sends_metadata_and_content() {
        let fake = FakeDrive::start().await;
        let client = DriveClient::new(&fake.config());

        let folder = client.ensure_folder(&token(), "Evidence").await.unwrap();
        let id = client
            .upload(&token(), b"lesson plan body", "plan.txt", "text/plain", &folder)
            .await
            .unwrap();

        let file = fake.file(&id).unwrap();
        assert_eq!(file.name, "plan.txt");
        assert_eq!(file.mime_type, "text/plain");
        assert_eq!(file.parents, vec![folder]);
        assert_eq!(file.content, b"lesson plan body".to_vec());
    }

    #[tokio::test]
    async fn test_make_public_and_share_links() {
        let fake = FakeDrive::start().await;
        let client = DriveClient::new(&fake.config());

        let folder = client.ensure_folder(&token(), "Evidence").await.unwrap();
        let id = client
            .upload(&token(), b"x", "x.pdf", "application/pdf", &folder)
            .await
            .unwrap();
        client.make_public(&token(), &id).await.unwrap();

        assert!(fake.file(&id).unwrap().public);
        let links = client.get_share_links(&token(), &id).await.unwrap();
        assert!(links.view_link.contains(&id));
        assert!(links.download_link.contains(&id));
    }

    #[tokio::test]
    async fn test_remote_error_surfaces_status_and_message() {
        let fake = FakeDrive::start().await;
        fake.set_fail_permissions(true);
        let client = DriveClient::new(&fake.config());

        let err = client.make_public(&token(), "missing").await.unwrap_err();

        match err {
            AppError::Remote { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "The user does not have sufficient permissions");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_token_is_remote_401() {
        let fake = FakeDrive::start().await;
        let client = DriveClient::new(&fake.config());

        let err = client
            .ensure_folder(&AccessToken::new("wrong", None), "Evidence")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Remote { status: 401, .. }));
    }
}

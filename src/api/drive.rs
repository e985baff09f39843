//! Drive session endpoints.

use axum::{body::Bytes, extract::State};

use super::{success, ApiResult};
use crate::drive::{SessionStatus, SignInGrant};
use crate::errors::AppError;
use crate::AppState;

/// GET /api/drive/status
pub async fn drive_status(State(state): State<AppState>) -> ApiResult<SessionStatus> {
    success(state.sync.status())
}

/// POST /api/drive/sign-in - Body is a grant, or empty to use the configured refresh token.
pub async fn drive_sign_in(State(state): State<AppState>, body: Bytes) -> ApiResult<SessionStatus> {
    let grant = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let grant: SignInGrant = serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid sign-in grant: {}", e)))?;
        Some(grant)
    };

    success(state.sync.sign_in(grant).await?)
}

/// POST /api/drive/sign-out
pub async fn drive_sign_out(State(state): State<AppState>) -> ApiResult<SessionStatus> {
    success(state.sync.sign_out())
}

//! Profile API endpoints.

use axum::{extract::State, Json};

use super::{success, ApiResult};
use crate::models::{ProfileRecord, ProfileView};
use crate::AppState;

/// GET /api/profile - Saved profile, or defaults when none was saved.
pub async fn get_profile(State(state): State<AppState>) -> ApiResult<ProfileView> {
    success(state.store.load_profile().await.into())
}

/// PUT /api/profile - Overwrite the whole profile.
pub async fn save_profile(
    State(state): State<AppState>,
    Json(profile): Json<ProfileRecord>,
) -> ApiResult<ProfileView> {
    state.store.save_profile(&profile).await?;
    success(Some(profile).into())
}

/// DELETE /api/profile
pub async fn clear_profile(State(state): State<AppState>) -> ApiResult<()> {
    state.store.clear_profile().await?;
    success(())
}

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{ChangePasswordRequest, UpdateDetailsRequest},
    repo_types::{PublicUser, UserChanges},
    services::{ensure_identity_free, is_valid_email, normalized_opt},
};
use crate::{
    auth::{password::hash_password, CurrentUser},
    error::{ApiError, ApiJson, ApiMultipart, ApiResult},
    media::{read_upload_form, upload_on_media_host, MediaFolder},
    response::ApiResponse,
    state::AppState,
};

const UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/change-password", post(change_current_password))
        .route("/get-current-user", post(get_current_user))
        .route("/update-user-details", post(update_user_details))
        .route(
            "/update-user-avatar",
            post(update_user_avatar).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route(
            "/update-user-cover-image",
            post(update_user_cover_image).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
}

#[instrument(skip(state, user, payload))]
pub async fn change_current_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<serde_json::Value>> {
    if payload.old_password.is_empty() || payload.new_password.trim().is_empty() {
        return Err(ApiError::validation("oldPassword and newPassword are required"));
    }

    // the guard hands out a sanitized record; the hash needs a fresh read
    let record = state
        .users
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid access token"))?;

    if !record.is_password_correct(&payload.old_password)? {
        warn!(user_id = %user.id, "password change with wrong old password");
        return Err(ApiError::validation("Invalid old password"));
    }

    let hash = hash_password(&payload.new_password)?;
    state.users.set_password_hash(user.id, &hash).await?;

    info!(user_id = %user.id, "password changed");
    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    ))
}

#[instrument(skip(user))]
pub async fn get_current_user(CurrentUser(user): CurrentUser) -> ApiResponse<PublicUser> {
    ApiResponse::ok(user, "Current user fetched successfully")
}

#[instrument(skip(state, user, payload))]
pub async fn update_user_details(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<UpdateDetailsRequest>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let changes = UserChanges {
        fullname: payload
            .fullname
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        email: normalized_opt(payload.email.as_deref()),
        username: normalized_opt(payload.username.as_deref()),
        ..Default::default()
    };
    if changes.is_empty() {
        return Err(ApiError::validation(
            "fullname, email or username is required to update user details",
        ));
    }
    if let Some(email) = &changes.email {
        if !is_valid_email(email) {
            return Err(ApiError::validation("Invalid email"));
        }
    }
    if changes.email.is_some() || changes.username.is_some() {
        ensure_identity_free(
            state.users.as_ref(),
            changes.username.as_deref(),
            changes.email.as_deref(),
            Some(user.id),
        )
        .await?;
    }

    let updated = apply_changes(&state, user.id, &changes).await?;
    info!(user_id = %user.id, "user details updated");
    Ok(ApiResponse::ok(updated, "User details updated successfully"))
}

#[instrument(skip(state, user, mp))]
pub async fn update_user_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiMultipart(mp): ApiMultipart,
) -> ApiResult<ApiResponse<PublicUser>> {
    let url = upload_single_image(&state, mp, "avatar", MediaFolder::Avatars).await?;
    let changes = UserChanges {
        avatar: Some(url),
        ..Default::default()
    };
    let updated = apply_changes(&state, user.id, &changes).await?;
    info!(user_id = %user.id, "avatar updated");
    Ok(ApiResponse::ok(updated, "Avatar image updated successfully"))
}

#[instrument(skip(state, user, mp))]
pub async fn update_user_cover_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiMultipart(mp): ApiMultipart,
) -> ApiResult<ApiResponse<PublicUser>> {
    let url = upload_single_image(&state, mp, "coverImage", MediaFolder::CoverImages).await?;
    let changes = UserChanges {
        cover_image: Some(url),
        ..Default::default()
    };
    let updated = apply_changes(&state, user.id, &changes).await?;
    info!(user_id = %user.id, "cover image updated");
    Ok(ApiResponse::ok(updated, "Cover image updated successfully"))
}

async fn upload_single_image(
    state: &AppState,
    mp: Multipart,
    field: &str,
    folder: MediaFolder,
) -> Result<String, ApiError> {
    let mut form = read_upload_form(mp, &state.config.media.upload_tmp_dir).await?;
    let file = form
        .take_file(field)
        .ok_or_else(|| ApiError::validation(format!("{} file is required", field)))?;
    upload_on_media_host(state.storage.as_ref(), file, folder)
        .await
        .map_err(|_| ApiError::validation(format!("Error while uploading {}", field)))
}

async fn apply_changes(
    state: &AppState,
    user_id: Uuid,
    changes: &UserChanges,
) -> Result<PublicUser, ApiError> {
    state
        .users
        .update_fields(user_id, changes)
        .await?
        .map(PublicUser::from)
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))
}

use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use brewers_db::models::{ProfileUpdate, UserSearch};
use brewers_types::api::{Claims, UpdateProfileRequest, UserSearchQuery, UserSearchResult};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

pub async fn get_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let user = state
        .run_db(move |db| db.get_user_by_id(&uid))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(convert::user(user)))
}

pub async fn update_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_string();
    if !email.contains('@') {
        return Err(ApiError::Validation("Email address is invalid".into()));
    }

    let uid = claims.sub.to_string();
    let user = state
        .run_db(move |db| {
            db.update_profile(
                &uid,
                &ProfileUpdate {
                    email: &email,
                    first_name: req.first_name.trim(),
                    last_name: req.last_name.trim(),
                    city: req.city.as_deref(),
                    state: req.state.as_deref(),
                    zip: req.zip.as_deref(),
                },
            )?;
            db.get_user_by_id(&uid)
        })
        .await
        .map_err(|e| e.on_conflict("Email is already in use"))?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(convert::user(user)))
}

/// Removes the account and everything hanging off it.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let deleted = state.run_db(move |db| db.delete_user(&uid)).await?;
    if !deleted {
        return Err(ApiError::NotFound("User"));
    }

    info!("User {} ({}) deleted their account", claims.username, claims.sub);
    Ok(StatusCode::NO_CONTENT)
}

/// Case-insensitive substring search. The caller is left out of the
/// results; everyone else is flagged with whether they are already a friend.
pub async fn search_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<UserSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let (rows, friend_ids) = state
        .run_db(move |db| {
            let rows = db.search_users(&UserSearch {
                username: query.username.as_deref(),
                first_name: query.first_name.as_deref(),
                last_name: query.last_name.as_deref(),
                zip: query.zip.as_deref(),
            })?;
            let friend_ids = db.friend_ids(&uid)?;
            Ok((rows, friend_ids))
        })
        .await?;

    let friend_ids: HashSet<String> = friend_ids.into_iter().collect();
    let me = claims.sub.to_string();

    let results: Vec<UserSearchResult> = rows
        .into_iter()
        .filter(|row| row.id != me)
        .map(|row| {
            let is_friend = friend_ids.contains(&row.id);
            UserSearchResult {
                user: convert::public_user(row),
                is_friend,
            }
        })
        .collect();

    Ok(Json(results))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let id = user_id.to_string();
    let user = state
        .run_db(move |db| db.get_user_by_id(&id))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(convert::public_user(user)))
}

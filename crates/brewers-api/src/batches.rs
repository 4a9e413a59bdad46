use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use brewers_types::api::{BatchDetail, Claims, CreateBatchRequest, UpdateBatchRequest};
use brewers_types::models::{Batch, average_rating};

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, require_text};

/// Loads a batch or fails with 404.
pub(crate) async fn load_batch(state: &AppState, batch_id: Uuid) -> Result<Batch, ApiError> {
    let id = batch_id.to_string();
    state
        .run_db(move |db| db.get_batch(&id))
        .await?
        .map(convert::batch)
        .ok_or(ApiError::NotFound("Batch"))
}

/// Loads a batch the caller must own: 404 if absent, 403 if someone else's.
pub(crate) async fn load_owned_batch(
    state: &AppState,
    batch_id: Uuid,
    user_id: Uuid,
) -> Result<Batch, ApiError> {
    let batch = load_batch(state, batch_id).await?;
    if batch.owner_id != user_id {
        return Err(ApiError::Forbidden("Cannot edit data you do not own.".into()));
    }
    Ok(batch)
}

pub async fn create_batch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_text("Name", &req.name)?;

    let batch_id = Uuid::new_v4();
    let id = batch_id.to_string();
    let owner = claims.sub.to_string();
    let name = req.name.trim().to_string();
    state
        .run_db(move |db| db.create_batch(&id, &owner, &name, req.batch_type.as_str()))
        .await?;

    info!("User {} created batch {}", claims.sub, batch_id);

    let batch = load_batch(&state, batch_id).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

pub async fn list_batches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = claims.sub.to_string();
    let rows = state
        .run_db(move |db| db.list_batches_for_owner(&owner))
        .await?;

    let batches: Vec<Batch> = rows.into_iter().map(convert::batch).collect();
    Ok(Json(batches))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let batch = load_batch(&state, batch_id).await?;

    let id = batch_id.to_string();
    let ratings = state
        .run_db(move |db| db.rating_values_for_batch(&id))
        .await?;

    Ok(Json(BatchDetail {
        batch,
        average_rating: average_rating(&ratings),
        rating_count: ratings.len(),
    }))
}

pub async fn update_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_text("Name", &req.name)?;
    load_owned_batch(&state, batch_id, claims.sub).await?;

    let id = batch_id.to_string();
    let name = req.name.trim().to_string();
    state
        .run_db(move |db| db.update_batch(&id, &name, req.batch_type.as_str()))
        .await?;

    let batch = load_batch(&state, batch_id).await?;
    Ok(Json(batch))
}

pub async fn delete_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    load_owned_batch(&state, batch_id, claims.sub).await?;

    let id = batch_id.to_string();
    state.run_db(move |db| db.delete_batch(&id)).await?;

    info!("User {} deleted batch {}", claims.sub, batch_id);
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use brewers_types::api::{Claims, CreateContainerRequest, UpdateContainerRequest};
use brewers_types::models::Container;

use crate::auth::AppState;
use crate::batches::load_batch;
use crate::convert;
use crate::error::{ApiError, require_text};

/// A container must point at an existing batch. A dangling batch id is a
/// server-side fault (500) rather than a 404 on the container route.
pub async fn create_container(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateContainerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_text("Name", &req.name)?;

    let bid = req.batch_id.to_string();
    let batch_exists = state
        .run_db(move |db| db.get_batch(&bid))
        .await?
        .is_some();
    if !batch_exists {
        warn!("Container for missing batch {} refused", req.batch_id);
        return Err(ApiError::InvalidReference("batch"));
    }

    let container_id = Uuid::new_v4();
    let id = container_id.to_string();
    let bid = req.batch_id.to_string();
    let owner = claims.sub.to_string();
    let row = state
        .run_db(move |db| {
            db.insert_container(&id, &bid, &owner, req.name.trim(), req.volume, req.unit.as_deref())?;
            db.get_container(&id)
        })
        .await?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("container vanished after insert")))?;

    info!("User {} created container {}", claims.sub, container_id);
    Ok((StatusCode::CREATED, Json(convert::container(row))))
}

async fn load_container(state: &AppState, container_id: Uuid) -> Result<Container, ApiError> {
    let id = container_id.to_string();
    state
        .run_db(move |db| db.get_container(&id))
        .await?
        .map(convert::container)
        .ok_or(ApiError::NotFound("Container"))
}

async fn load_editable(
    state: &AppState,
    container_id: Uuid,
    user_id: Uuid,
) -> Result<Container, ApiError> {
    let container = load_container(state, container_id).await?;
    if !container.can_edit(user_id) {
        return Err(ApiError::Forbidden("Cannot edit data you do not own.".into()));
    }
    Ok(container)
}

pub async fn get_container(
    State(state): State<AppState>,
    Path(container_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let container = load_container(&state, container_id).await?;
    if !container.can_view(claims.sub) {
        return Err(ApiError::Forbidden("Cannot view this container.".into()));
    }
    Ok(Json(container))
}

pub async fn list_my_containers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = claims.sub.to_string();
    let rows = state
        .run_db(move |db| db.list_containers_for_owner(&owner))
        .await?;

    let containers: Vec<Container> = rows.into_iter().map(convert::container).collect();
    Ok(Json(containers))
}

pub async fn list_batch_containers(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    load_batch(&state, batch_id).await?;

    let bid = batch_id.to_string();
    let rows = state
        .run_db(move |db| db.list_containers_for_batch(&bid))
        .await?;

    let containers: Vec<Container> = rows
        .into_iter()
        .map(convert::container)
        .filter(|c| c.can_view(claims.sub))
        .collect();
    Ok(Json(containers))
}

pub async fn update_container(
    State(state): State<AppState>,
    Path(container_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateContainerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_text("Name", &req.name)?;
    load_editable(&state, container_id, claims.sub).await?;

    let id = container_id.to_string();
    state
        .run_db(move |db| {
            db.update_container(&id, req.name.trim(), req.volume, req.unit.as_deref())
        })
        .await?;

    Ok(Json(load_container(&state, container_id).await?))
}

pub async fn delete_container(
    State(state): State<AppState>,
    Path(container_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    load_editable(&state, container_id, claims.sub).await?;

    let id = container_id.to_string();
    state.run_db(move |db| db.delete_container(&id)).await?;

    info!("User {} deleted container {}", claims.sub, container_id);
    Ok(StatusCode::NO_CONTENT)
}

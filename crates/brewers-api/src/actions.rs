use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use brewers_types::api::{Claims, RecordActionRequest};
use brewers_types::models::BatchAction;

use crate::auth::AppState;
use crate::batches::{load_batch, load_owned_batch};
use crate::convert;
use crate::error::{ApiError, require_text};

/// Only the batch owner records actions. Empty title or description is
/// rejected before anything is written.
pub async fn record_action(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RecordActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_text("Title", &req.title)?;
    require_text("Description", &req.description)?;

    load_owned_batch(&state, batch_id, claims.sub).await?;

    let action_id = Uuid::new_v4();
    let id = action_id.to_string();
    let bid = batch_id.to_string();
    let performer = claims.sub.to_string();
    let row = state
        .run_db(move |db| {
            db.insert_action(
                &id,
                &bid,
                &performer,
                req.title.trim(),
                req.description.trim(),
                req.action_type.as_str(),
            )?;
            db.get_action(&id)
        })
        .await?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("action vanished after insert")))?;

    info!("User {} recorded action {} on batch {}", claims.sub, action_id, batch_id);
    Ok((StatusCode::CREATED, Json(convert::action(row))))
}

pub async fn list_actions(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    load_batch(&state, batch_id).await?;

    let bid = batch_id.to_string();
    let rows = state
        .run_db(move |db| db.list_actions_for_batch(&bid))
        .await?;

    let actions: Vec<BatchAction> = rows.into_iter().map(convert::action).collect();
    Ok(Json(actions))
}

async fn load_action(state: &AppState, action_id: Uuid) -> Result<BatchAction, ApiError> {
    let id = action_id.to_string();
    state
        .run_db(move |db| db.get_action(&id))
        .await?
        .map(convert::action)
        .ok_or(ApiError::NotFound("Action"))
}

pub async fn get_action(
    State(state): State<AppState>,
    Path(action_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(load_action(&state, action_id).await?))
}

/// The performer or the owner of the batch may delete an action.
pub async fn delete_action(
    State(state): State<AppState>,
    Path(action_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let action = load_action(&state, action_id).await?;
    if action.performer_id != claims.sub {
        let batch = load_batch(&state, action.batch_id).await?;
        if batch.owner_id != claims.sub {
            return Err(ApiError::Forbidden("Cannot edit data you do not own.".into()));
        }
    }

    let id = action_id.to_string();
    state.run_db(move |db| db.delete_action(&id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

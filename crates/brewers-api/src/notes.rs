use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use brewers_types::api::{Claims, NoteRequest};
use brewers_types::models::BatchNote;

use crate::auth::AppState;
use crate::batches::{load_batch, load_owned_batch};
use crate::convert;
use crate::error::{ApiError, require_text};

pub async fn create_note(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_text("Title", &req.title)?;
    require_text("Text", &req.body)?;
    load_owned_batch(&state, batch_id, claims.sub).await?;

    let id = Uuid::new_v4().to_string();
    let bid = batch_id.to_string();
    let author = claims.sub.to_string();
    let row = state
        .run_db(move |db| {
            db.insert_note(&id, &bid, &author, req.title.trim(), req.body.trim())?;
            db.get_note(&id)
        })
        .await?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("note vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(convert::note(row))))
}

pub async fn list_notes(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    load_batch(&state, batch_id).await?;

    let bid = batch_id.to_string();
    let rows = state.run_db(move |db| db.list_notes_for_batch(&bid)).await?;

    let notes: Vec<BatchNote> = rows.into_iter().map(convert::note).collect();
    Ok(Json(notes))
}

async fn load_note(state: &AppState, note_id: Uuid) -> Result<BatchNote, ApiError> {
    let id = note_id.to_string();
    state
        .run_db(move |db| db.get_note(&id))
        .await?
        .map(convert::note)
        .ok_or(ApiError::NotFound("Note"))
}

async fn load_authored_note(
    state: &AppState,
    note_id: Uuid,
    user_id: Uuid,
) -> Result<BatchNote, ApiError> {
    let note = load_note(state, note_id).await?;
    if note.author_id != user_id {
        return Err(ApiError::Forbidden("Cannot edit data you do not own.".into()));
    }
    Ok(note)
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(load_note(&state, note_id).await?))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_text("Title", &req.title)?;
    require_text("Text", &req.body)?;
    load_authored_note(&state, note_id, claims.sub).await?;

    let id = note_id.to_string();
    state
        .run_db(move |db| db.update_note(&id, req.title.trim(), req.body.trim()))
        .await?;

    Ok(Json(load_note(&state, note_id).await?))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    load_authored_note(&state, note_id, claims.sub).await?;

    let id = note_id.to_string();
    state.run_db(move |db| db.delete_note(&id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

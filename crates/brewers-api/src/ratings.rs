use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use brewers_types::api::{Claims, RateBatchRequest};
use brewers_types::models::{BatchRating, MAX_RATING, MIN_RATING, average_rating, rating_in_range};

use crate::auth::AppState;
use crate::batches::load_batch;
use crate::convert;
use crate::error::ApiError;

/// One rating per user per batch. A repeat attempt is refused with 403 when
/// the existing rating is seen up front, and with 409 when a concurrent
/// request wins the race and the storage key rejects the insert.
pub async fn rate_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RateBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !rating_in_range(req.rating) {
        return Err(ApiError::Validation(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }

    load_batch(&state, batch_id).await?;

    let bid = batch_id.to_string();
    let uid = claims.sub.to_string();
    let existing = state
        .run_db(move |db| db.get_rating(&bid, &uid))
        .await?;
    if existing.is_some() {
        return Err(ApiError::Forbidden("You have already rated this batch".into()));
    }

    let comment = req.comment.filter(|c| !c.trim().is_empty());
    let rating = store_rating(&state, batch_id, claims.sub, req.rating, comment).await?;

    info!("User {} rated batch {} with {}", claims.sub, batch_id, req.rating);
    Ok((StatusCode::CREATED, Json(rating)))
}

/// Inserts the rating. A row that appeared since the pre-check loses to the
/// composite key and comes back as a 409.
async fn store_rating(
    state: &AppState,
    batch_id: Uuid,
    user_id: Uuid,
    rating: i64,
    comment: Option<String>,
) -> Result<BatchRating, ApiError> {
    let bid = batch_id.to_string();
    let uid = user_id.to_string();
    let row = state
        .run_db(move |db| {
            db.insert_rating(&bid, &uid, rating, comment.as_deref())?;
            db.get_rating(&bid, &uid)
        })
        .await
        .map_err(|e| {
            if matches!(e, ApiError::Conflict(_)) {
                warn!("Concurrent duplicate rating by {} on batch {}", user_id, batch_id);
            }
            e.on_conflict("You have already rated this batch")
        })?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("rating vanished after insert")))?;

    Ok(convert::rating(row))
}

pub async fn list_ratings(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    load_batch(&state, batch_id).await?;

    let bid = batch_id.to_string();
    let rows = state
        .run_db(move |db| db.list_ratings_for_batch(&bid))
        .await?;

    let ratings: Vec<BatchRating> = rows.into_iter().map(convert::rating).collect();
    Ok(Json(ratings))
}

/// Mean rating rounded to one decimal, as a bare JSON number. 0 without ratings.
pub async fn average(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    load_batch(&state, batch_id).await?;

    let bid = batch_id.to_string();
    let values = state
        .run_db(move |db| db.rating_values_for_batch(&bid))
        .await?;

    Ok(Json(average_rating(&values)))
}

pub async fn my_rating(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    load_batch(&state, batch_id).await?;

    let bid = batch_id.to_string();
    let uid = claims.sub.to_string();
    let row = state
        .run_db(move |db| db.get_rating(&bid, &uid))
        .await?
        .ok_or(ApiError::NotFound("Rating"))?;

    Ok(Json(convert::rating(row)))
}

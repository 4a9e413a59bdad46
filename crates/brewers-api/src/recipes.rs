use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use brewers_types::api::{Claims, CreateRecipeRequest};
use brewers_types::models::Recipe;

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, require_text};

pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateRecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_text("Name", &req.name)?;

    let id = Uuid::new_v4().to_string();
    let owner = claims.sub.to_string();
    let row = state
        .run_db(move |db| {
            db.insert_recipe(
                &id,
                &owner,
                req.name.trim(),
                req.style.as_deref(),
                req.instructions.as_deref(),
            )?;
            db.get_recipe(&id)
        })
        .await?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("recipe vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(convert::recipe(row))))
}

pub async fn list_recipes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = claims.sub.to_string();
    let rows = state
        .run_db(move |db| db.list_recipes_for_owner(&owner))
        .await?;

    let recipes: Vec<Recipe> = rows.into_iter().map(convert::recipe).collect();
    Ok(Json(recipes))
}

async fn load_recipe(state: &AppState, recipe_id: Uuid) -> Result<Recipe, ApiError> {
    let id = recipe_id.to_string();
    state
        .run_db(move |db| db.get_recipe(&id))
        .await?
        .map(convert::recipe)
        .ok_or(ApiError::NotFound("Recipe"))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(load_recipe(&state, recipe_id).await?))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let recipe = load_recipe(&state, recipe_id).await?;
    if recipe.owner_id != claims.sub {
        return Err(ApiError::Forbidden("Cannot edit data you do not own.".into()));
    }

    let id = recipe_id.to_string();
    state.run_db(move |db| db.delete_recipe(&id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

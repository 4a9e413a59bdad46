use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{accounts, actions, batches, containers, friends, notes, ratings, recipes};

/// Full HTTP surface. Everything outside the public group needs a bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot", post(auth::forgot_password))
        .route("/auth/reset", post(auth::reset_password))
        .route("/friends/accept", post(friends::accept_invite));

    let protected_routes = Router::new()
        // Account
        .route(
            "/account",
            get(accounts::get_account)
                .put(accounts::update_account)
                .delete(accounts::delete_account),
        )
        .route("/account/password", put(auth::change_password))
        .route("/users/search", get(accounts::search_users))
        .route("/users/{user_id}", get(accounts::get_user))
        // Batches
        .route("/batches", get(batches::list_batches).post(batches::create_batch))
        .route(
            "/batches/{batch_id}",
            get(batches::get_batch)
                .put(batches::update_batch)
                .delete(batches::delete_batch),
        )
        .route(
            "/batches/{batch_id}/ratings",
            get(ratings::list_ratings).post(ratings::rate_batch),
        )
        .route("/batches/{batch_id}/ratings/average", get(ratings::average))
        .route("/batches/{batch_id}/ratings/mine", get(ratings::my_rating))
        .route(
            "/batches/{batch_id}/actions",
            get(actions::list_actions).post(actions::record_action),
        )
        .route(
            "/batches/{batch_id}/notes",
            get(notes::list_notes).post(notes::create_note),
        )
        .route("/batches/{batch_id}/containers", get(containers::list_batch_containers))
        .route(
            "/actions/{action_id}",
            get(actions::get_action).delete(actions::delete_action),
        )
        .route(
            "/notes/{note_id}",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        // Containers
        .route(
            "/containers",
            get(containers::list_my_containers).post(containers::create_container),
        )
        .route(
            "/containers/{container_id}",
            get(containers::get_container)
                .put(containers::update_container)
                .delete(containers::delete_container),
        )
        // Recipes
        .route("/recipes", get(recipes::list_recipes).post(recipes::create_recipe))
        .route(
            "/recipes/{recipe_id}",
            get(recipes::get_recipe).delete(recipes::delete_recipe),
        )
        // Friends
        .route("/friends", get(friends::list_friends))
        .route(
            "/friends/{friend_id}",
            post(friends::add_friend).delete(friends::remove_friend),
        )
        .route("/friends/{friend_id}/invite", post(friends::invite_friend))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public_routes.merge(protected_routes).with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

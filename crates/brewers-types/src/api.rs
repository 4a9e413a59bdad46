use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ActionType, Batch, BatchType, PublicUser};

// -- JWT Claims --

/// Bearer token claims. Every protected handler receives these explicitly
/// and passes `sub` down as the acting user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Response for operations whose email side effect may fail without
/// undoing the main write.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

// -- Account --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserSearchQuery {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSearchResult {
    #[serde(flatten)]
    pub user: PublicUser,
    pub is_friend: bool,
}

// -- Batches --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBatchRequest {
    pub name: String,
    pub batch_type: BatchType,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBatchRequest {
    pub name: String,
    pub batch_type: BatchType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchDetail {
    #[serde(flatten)]
    pub batch: Batch,
    pub average_rating: f64,
    pub rating_count: usize,
}

// -- Ratings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateBatchRequest {
    pub rating: i64,
    pub comment: Option<String>,
}

// -- Actions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordActionRequest {
    pub title: String,
    pub description: String,
    pub action_type: ActionType,
}

// -- Notes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoteRequest {
    pub title: String,
    pub body: String,
}

// -- Containers --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateContainerRequest {
    pub batch_id: Uuid,
    pub name: String,
    pub volume: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateContainerRequest {
    pub name: String,
    pub volume: Option<f64>,
    pub unit: Option<String>,
}

// -- Recipes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRecipeRequest {
    pub name: String,
    pub style: Option<String>,
    pub instructions: Option<String>,
}

// -- Friends --

#[derive(Debug, Serialize, Deserialize)]
pub struct AddFriendResponse {
    pub friend: PublicUser,
    pub added: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptInviteRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveFriendResponse {
    pub removed: bool,
}

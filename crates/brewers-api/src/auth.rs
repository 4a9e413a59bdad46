use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{error, info};
use uuid::Uuid;

use brewers_crypto::reset::{RESET_TTL_SECS, generate_reset_token, hash_reset_token};
use brewers_db::Database;
use brewers_db::models::NewUser;
use brewers_types::api::{
    ChangePasswordRequest, Claims, ForgotPasswordRequest, LoginRequest, LoginResponse,
    MessageResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest,
};

use crate::error::ApiError;
use crate::mailer::{Mailer, OutgoingMail, deliver, escape_html};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Key for signed friend invite links.
    pub token_secret: Vec<u8>,
    /// Prefix for links sent by mail, without a trailing slash.
    pub base_url: String,
    pub mailer: Arc<dyn Mailer>,
}

impl AppStateInner {
    /// Runs a blocking DB call off the async runtime.
    pub async fn run_db<F, T>(self: &Arc<Self>, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&state.db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(anyhow::anyhow!("DB task failed: {}", e))
            })?
            .map_err(ApiError::from)
    }
}

const MIN_PASSWORD_LEN: usize = 8;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    let username = req.username.trim().to_string();
    let username_len = username.chars().count();
    if !(3..=32).contains(&username_len) {
        return Err(ApiError::Validation("Username must be 3 to 32 characters".into()));
    }
    if !username.chars().all(is_username_char) {
        return Err(ApiError::Validation(
            "Username may only contain letters, digits, '_', '.' and '-'".into(),
        ));
    }
    validate_password(&req.password)?;
    let email = req.email.trim().to_string();
    if !email.contains('@') {
        return Err(ApiError::Validation("Email address is invalid".into()));
    }

    // Check if username is taken
    let lookup = username.clone();
    if state
        .run_db(move |db| db.get_user_by_username(&lookup))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Username is already taken".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    let name = username.clone();
    state
        .run_db(move |db| {
            db.create_user(&NewUser {
                id: &user_id.to_string(),
                username: &name,
                email: &email,
                password_hash: &password_hash,
                first_name: req.first_name.trim(),
                last_name: req.last_name.trim(),
                city: req.city.as_deref(),
                state: req.state.as_deref(),
                zip: req.zip.as_deref(),
            })
        })
        .await
        .map_err(|e| e.on_conflict("Username or email is already in use"))?;

    info!("Registered user {} ({})", username, user_id);

    let token = create_token(&state.jwt_secret, user_id, &username)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let user = state
        .run_db(move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    verify_password(&req.password, &user.password)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id {}: {}", user.id, e)))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

/// Mails a single-use reset link. The link works for `RESET_TTL_SECS`.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let user = state
        .run_db(move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    let token = generate_reset_token();
    let token_hash = hash_reset_token(&token);
    let expires_at = chrono::Utc::now().timestamp() + RESET_TTL_SECS;

    let user_id = user.id.clone();
    state
        .run_db(move |db| db.insert_password_reset(&token_hash, &user_id, expires_at))
        .await?;

    let link = format!("{}/reset-password?token={}", state.base_url, token);
    let warning = deliver(
        state.mailer.as_ref(),
        OutgoingMail {
            to: user.email,
            subject: "Password Reset".into(),
            html_body: format!(
                "<b>A password reset was requested for {}.</b><br/><a href='{}'>Reset Password</a>",
                escape_html(&user.username),
                link
            ),
        },
    )
    .await;

    let message = if warning.is_none() { "Mail sent." } else { "Reset requested." };
    Ok(Json(MessageResponse {
        message: message.into(),
        warning,
    }))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_password(&req.new_password)?;

    let password_hash = hash_password(&req.new_password)?;
    let token_hash = hash_reset_token(req.token.trim());
    let now = chrono::Utc::now().timestamp();
    let user_id = state
        .run_db(move |db| db.reset_password(&token_hash, now, &password_hash))
        .await?
        .ok_or_else(|| ApiError::Forbidden("Reset token is invalid or expired".into()))?;

    info!("Password reset for user {}", user_id);
    Ok(Json(MessageResponse {
        message: "Password has been reset.".into(),
        warning: None,
    }))
}

/// Signed-in password change. The current password must be given again.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_password(&req.new_password)?;

    let uid = claims.sub.to_string();
    let user = state
        .run_db(move |db| db.get_user_by_id(&uid))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    verify_password(&req.current_password, &user.password).map_err(|e| match e {
        ApiError::Unauthorized => ApiError::Forbidden("Current password is incorrect".into()),
        other => other,
    })?;

    let password_hash = hash_password(&req.new_password)?;
    let updated = state
        .run_db(move |db| db.update_password(&user.id, &password_hash))
        .await?;
    if !updated {
        return Err(ApiError::NotFound("User"));
    }

    info!("User {} changed their password", claims.sub);
    Ok(Json(MessageResponse {
        message: "Password has been changed.".into(),
        warning: None,
    }))
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Checks `password` against a stored Argon2 hash. A mismatch is `Unauthorized`.
fn verify_password(password: &str, stored_hash: &str) -> Result<(), ApiError> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)
}

/// Argon2id with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::*;
    use crate::test_support::{TEST_PASSWORD, TestApp};

    #[test]
    fn token_roundtrip() {
        let id = Uuid::new_v4();
        let token = create_token("secret", id, "bob").unwrap();

        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "bob");

        assert!(matches!(decode_token("other", &token), Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn register_then_login() {
        let app = TestApp::new();

        let (status, body) = app
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "username": "bob",
                    "password": "correct horse",
                    "email": "bob@example.com",
                    "first_name": "Bob",
                    "last_name": "Smith"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["token"].is_string());

        let (status, body) = app
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": "bob", "password": "correct horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "bob");

        let (status, _) = app
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": "bob", "password": "wrong password" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let app = TestApp::new();
        app.seed_user("bob").await;

        let (status, _) = app
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "username": "bob", "password": "12345678", "email": "new@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = app
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "username": "robert", "password": "12345678", "email": "bob@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Username or email is already in use");
    }

    #[tokio::test]
    async fn weak_registration_is_rejected() {
        let app = TestApp::new();

        let (status, _) = app
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "username": "bob", "password": "short", "email": "bob@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "username": "bo", "password": "12345678", "email": "bob@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn markup_usernames_are_rejected() {
        let app = TestApp::new();

        let (status, _) = app
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "username": "<a href='http://x'>win</a>",
                    "password": "12345678",
                    "email": "mallory@example.com"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "username": "john_doe.2", "password": "12345678", "email": "john@example.com" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn change_password_requires_the_current_one() {
        let app = TestApp::new();
        let bob = app.seed_user("bob").await;

        let (status, _) = app
            .request(
                Method::PUT,
                "/account/password",
                None,
                Some(json!({ "current_password": TEST_PASSWORD, "new_password": "brand new pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .request(
                Method::PUT,
                "/account/password",
                Some(&bob.token),
                Some(json!({ "current_password": "not my password", "new_password": "brand new pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .request(
                Method::PUT,
                "/account/password",
                Some(&bob.token),
                Some(json!({ "current_password": TEST_PASSWORD, "new_password": "short" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .request(
                Method::PUT,
                "/account/password",
                Some(&bob.token),
                Some(json!({ "current_password": TEST_PASSWORD, "new_password": "brand new pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Password has been changed.");

        for (password, expected) in [
            (TEST_PASSWORD, StatusCode::UNAUTHORIZED),
            ("brand new pass", StatusCode::OK),
        ] {
            let (status, _) = app
                .request(
                    Method::POST,
                    "/auth/login",
                    None,
                    Some(json!({ "username": "bob", "password": password })),
                )
                .await;
            assert_eq!(status, expected);
        }
    }

    #[tokio::test]
    async fn rejected_reset_keeps_the_token() {
        let app = TestApp::new();
        app.seed_user("bob").await;

        app.request(Method::POST, "/auth/forgot", None, Some(json!({ "username": "bob" })))
            .await;
        let token = app.mailer.sent()[0]
            .html_body
            .split("token=")
            .nth(1)
            .and_then(|rest| rest.split('\'').next())
            .unwrap()
            .to_string();

        let (status, _) = app
            .request(
                Method::POST,
                "/auth/reset",
                None,
                Some(json!({ "token": token, "new_password": "short" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .request(
                Method::POST,
                "/auth/reset",
                None,
                Some(json!({ "token": token, "new_password": "brand new pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn password_reset_flow() {
        let app = TestApp::new();
        app.seed_user("bob").await;

        let (status, body) = app
            .request(Method::POST, "/auth/forgot", None, Some(json!({ "username": "bob" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Mail sent.");

        let sent = app.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "bob@example.com");
        let token = sent[0]
            .html_body
            .split("token=")
            .nth(1)
            .and_then(|rest| rest.split('\'').next())
            .unwrap()
            .to_string();

        let (status, _) = app
            .request(
                Method::POST,
                "/auth/reset",
                None,
                Some(json!({ "token": token, "new_password": "brand new pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        // Single use.
        let (status, _) = app
            .request(
                Method::POST,
                "/auth/reset",
                None,
                Some(json!({ "token": token, "new_password": "another pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": "bob", "password": "brand new pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn forgot_password_survives_mail_failure() {
        let app = TestApp::with_failing_mail();
        app.seed_user("bob").await;

        let (status, body) = app
            .request(Method::POST, "/auth/forgot", None, Some(json!({ "username": "bob" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["warning"].is_string());

        let (status, _) = app
            .request(Method::POST, "/auth/forgot", None, Some(json!({ "username": "nobody" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

use axum::{
    RequestExt,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use tracing::debug;

use crate::auth::{AppState, decode_token};
use crate::error::ApiError;

/// Resolves the caller from the bearer token and hands the claims to the
/// handler as an extension. Tokens of deleted accounts are refused.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = req
        .extract_parts::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| ApiError::Unauthorized)?;

    let claims = decode_token(&state.jwt_secret, bearer.token())?;

    let user_id = claims.sub.to_string();
    let exists = state
        .run_db(move |db| db.get_user_by_id(&user_id))
        .await?
        .is_some();
    if !exists {
        debug!("Token for missing user {} refused", claims.sub);
        return Err(ApiError::Unauthorized);
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

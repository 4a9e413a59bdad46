use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use brewers_crypto::invite::{InvitePayload, sign_invite, verify_invite};
use brewers_db::models::UserRow;
use brewers_types::api::{
    AcceptInviteRequest, AddFriendResponse, Claims, MessageResponse, RemoveFriendResponse,
};
use brewers_types::models::PublicUser;

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;
use crate::mailer::{OutgoingMail, deliver, escape_html};

fn reject_self(user_id: Uuid, other_id: Uuid) -> Result<(), ApiError> {
    if user_id == other_id {
        return Err(ApiError::Validation("You cannot befriend yourself".into()));
    }
    Ok(())
}

async fn load_user(state: &AppState, user_id: Uuid) -> Result<UserRow, ApiError> {
    let id = user_id.to_string();
    state
        .run_db(move |db| db.get_user_by_id(&id))
        .await?
        .ok_or(ApiError::NotFound("User"))
}

pub async fn list_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let rows = state.run_db(move |db| db.list_friends(&uid)).await?;

    let friends: Vec<PublicUser> = rows.into_iter().map(convert::public_user).collect();
    Ok(Json(friends))
}

/// Adds the friendship right away, then lets the other user know by mail.
/// A mail failure is reported as a warning; the friendship stays.
pub async fn add_friend(
    State(state): State<AppState>,
    Path(friend_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    reject_self(claims.sub, friend_id)?;
    let friend = load_user(&state, friend_id).await?;

    let uid = claims.sub.to_string();
    let fid = friend_id.to_string();
    let added = state.run_db(move |db| db.add_friend(&uid, &fid)).await?;

    let warning = if added {
        info!("User {} added friend {}", claims.sub, friend_id);
        deliver(
            state.mailer.as_ref(),
            OutgoingMail {
                to: friend.email.clone(),
                subject: "Friend Request".into(),
                html_body: format!(
                    "<b>{} has added you as a friend on BrewersBuddy.</b>",
                    escape_html(&claims.username)
                ),
            },
        )
        .await
    } else {
        None
    };

    Ok(Json(AddFriendResponse {
        friend: convert::public_user(friend),
        added,
        warning,
    }))
}

/// Mails a signed accept link. Nothing is stored until the link is used.
pub async fn invite_friend(
    State(state): State<AppState>,
    Path(friend_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    reject_self(claims.sub, friend_id)?;
    let friend = load_user(&state, friend_id).await?;

    let payload = InvitePayload::new(claims.sub, friend_id, chrono::Utc::now().timestamp());
    let token = sign_invite(&payload, &state.token_secret)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("signing invite: {}", e)))?;

    let link = format!("{}/accept-friend?token={}", state.base_url, token);
    let warning = deliver(
        state.mailer.as_ref(),
        OutgoingMail {
            to: friend.email,
            subject: "Friend Request".into(),
            html_body: format!(
                "<b>{} would like to be your friend.</b><br/><a href='{}'>Accept Friend Request</a>",
                escape_html(&claims.username),
                link
            ),
        },
    )
    .await;

    let message = if warning.is_none() { "Invite sent." } else { "Invite created." };
    Ok(Json(MessageResponse {
        message: message.into(),
        warning,
    }))
}

/// Public: the signed token is the proof of the invite.
pub async fn accept_invite(
    State(state): State<AppState>,
    Json(req): Json<AcceptInviteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = chrono::Utc::now().timestamp();
    let payload = verify_invite(req.token.trim(), &state.token_secret, now).map_err(|e| {
        warn!("Rejected friend invite: {}", e);
        ApiError::Forbidden("Invite is invalid or expired".into())
    })?;

    let requestor = load_user(&state, payload.requestor).await?;
    load_user(&state, payload.friend).await?;

    let uid = payload.requestor.to_string();
    let fid = payload.friend.to_string();
    let added = state.run_db(move |db| db.add_friend(&uid, &fid)).await?;

    if added {
        info!("User {} accepted invite from {}", payload.friend, payload.requestor);
    }

    Ok(Json(AddFriendResponse {
        friend: convert::public_user(requestor),
        added,
        warning: None,
    }))
}

pub async fn remove_friend(
    State(state): State<AppState>,
    Path(friend_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    reject_self(claims.sub, friend_id)?;

    let uid = claims.sub.to_string();
    let fid = friend_id.to_string();
    let removed = state.run_db(move |db| db.remove_friend(&uid, &fid)).await?;

    if removed {
        info!("User {} removed friend {}", claims.sub, friend_id);
    }
    Ok(Json(RemoveFriendResponse { removed }))
}

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const INVITE_VERSION_V1: &str = "i1";
const MAX_INVITE_TOKEN_LEN: usize = 512;

/// Default lifetime of a friend invite link.
pub const INVITE_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InviteError {
    #[error("malformed invite token")]
    Malformed,
    #[error("unsupported invite token version")]
    UnsupportedVersion,
    #[error("invite token signature mismatch")]
    BadSignature,
    #[error("invite token expired")]
    Expired,
    #[error("invite signing key rejected")]
    InvalidKey,
}

/// Claims carried by a friend invite link: `requestor` asked to befriend
/// `friend`, valid until `exp` (unix seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitePayload {
    pub requestor: Uuid,
    pub friend: Uuid,
    pub exp: i64,
}

impl InvitePayload {
    pub fn new(requestor: Uuid, friend: Uuid, now: i64) -> Self {
        Self {
            requestor,
            friend,
            exp: now + INVITE_TTL_SECS,
        }
    }
}

/// `i1.<payload>.<signature>`, both parts base64url without padding.
pub fn sign_invite(payload: &InvitePayload, secret: &[u8]) -> Result<String, InviteError> {
    let payload_bytes = serde_json::to_vec(payload).map_err(|_| InviteError::Malformed)?;
    let payload_part = URL_SAFE_NO_PAD.encode(payload_bytes);

    let mut mac = new_mac(secret)?;
    mac.update(payload_part.as_bytes());
    let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}.{}", INVITE_VERSION_V1, payload_part, sig_part))
}

/// Checks signature first, then expiry against `now` (unix seconds).
pub fn verify_invite(token: &str, secret: &[u8], now: i64) -> Result<InvitePayload, InviteError> {
    if token.len() > MAX_INVITE_TOKEN_LEN {
        return Err(InviteError::Malformed);
    }

    let parts: Vec<&str> = token.split('.').collect();
    let (payload_part, sig_part) = match parts.as_slice() {
        [version, payload, sig] if *version == INVITE_VERSION_V1 => (*payload, *sig),
        [_, _, _] => return Err(InviteError::UnsupportedVersion),
        _ => return Err(InviteError::Malformed),
    };

    let expected = URL_SAFE_NO_PAD
        .decode(sig_part)
        .map_err(|_| InviteError::Malformed)?;
    let mut mac = new_mac(secret)?;
    mac.update(payload_part.as_bytes());
    mac.verify_slice(&expected)
        .map_err(|_| InviteError::BadSignature)?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_part)
        .map_err(|_| InviteError::Malformed)?;
    let payload: InvitePayload =
        serde_json::from_slice(&payload_bytes).map_err(|_| InviteError::Malformed)?;

    if payload.exp <= now {
        return Err(InviteError::Expired);
    }

    Ok(payload)
}

fn new_mac(secret: &[u8]) -> Result<HmacSha256, InviteError> {
    HmacSha256::new_from_slice(secret).map_err(|_| InviteError::InvalidKey)
}

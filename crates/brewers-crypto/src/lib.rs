//! BrewersBuddy token primitives.
//!
//! - Friend invite links carry an HMAC-SHA256 signed, expiring token naming
//!   both users. Nothing is stored server-side.
//! - Password reset links carry a random token. Only its SHA-256 digest is
//!   persisted.

pub mod invite;
pub mod reset;

//! Login handshake message parsing
//!
//! The authorization popup completes by posting a tagged message back to the
//! opener. The channel is shared with arbitrary unrelated traffic, so parsing
//! is deliberately forgiving: anything that is not a well-formed
//! login-success message is discarded without comment.

use crate::models::Profile;
use serde::Deserialize;

/// Discriminant tag identifying a login-completion message
pub const LOGIN_SUCCESS_TYPE: &str = "linuxdo-login-success";

#[derive(Debug, Deserialize)]
struct RawLoginMessage {
    #[serde(rename = "type")]
    kind: String,
    token: String,
    user: Profile,
}

/// A recognized login-completion message: the token plus the profile it
/// authenticates.
#[derive(Debug, Clone)]
pub struct LoginMessage {
    pub token: String,
    pub user: Profile,
}

impl LoginMessage {
    /// Parse a cross-process payload.
    ///
    /// Payloads arrive either as a JSON object or as a string containing
    /// JSON. Returns `None` for anything that does not carry the
    /// [`LOGIN_SUCCESS_TYPE`] tag or fails to parse; such messages are
    /// routine on this channel and must be ignored silently.
    pub fn parse(payload: &serde_json::Value) -> Option<Self> {
        let raw: RawLoginMessage = match payload {
            serde_json::Value::String(s) => serde_json::from_str(s).ok()?,
            other => serde_json::from_value(other.clone()).ok()?,
        };
        if raw.kind != LOGIN_SUCCESS_TYPE {
            return None;
        }
        Some(LoginMessage {
            token: raw.token,
            user: raw.user,
        })
    }
}

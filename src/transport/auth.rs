use serde::{Deserialize, Serialize};

use super::envelope::{DecodeError, DecodeStage, Envelope};
use crate::domain::{Credentials, TokenPair};

pub const LOGIN_PATH: &str = "/auth/token/";
pub const REFRESH_PATH: &str = "/auth/token/refresh/";

#[derive(Debug, Serialize)]
pub struct LoginPayload<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RefreshPayload<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenJson {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

pub fn encode_login_payload(credentials: &Credentials) -> LoginPayload<'_> {
    LoginPayload {
        email: credentials.email.as_str(),
        password: credentials.password.as_str(),
    }
}

pub fn encode_refresh_payload(refresh_token: &str) -> RefreshPayload<'_> {
    RefreshPayload {
        refresh: refresh_token,
    }
}

/// Decode the token pair carried by a login or refresh envelope.
///
/// A refresh response may carry only a new `access` token; `current_refresh`
/// fills the pair in that case. A login response must carry both.
pub fn decode_token_pair(
    envelope: &Envelope,
    current_refresh: Option<&str>,
) -> Result<TokenPair, DecodeError> {
    let tokens: TokenJson = envelope.payload()?;

    if tokens.access.trim().is_empty() {
        return Err(DecodeError::EmptyField {
            stage: DecodeStage::Payload,
            field: TokenPair::ACCESS_FIELD,
        });
    }

    let refresh = match (tokens.refresh, current_refresh) {
        (Some(refresh), _) if !refresh.trim().is_empty() => refresh,
        (_, Some(current)) => current.to_owned(),
        (Some(_), None) => {
            return Err(DecodeError::EmptyField {
                stage: DecodeStage::Payload,
                field: TokenPair::REFRESH_FIELD,
            });
        }
        (None, None) => {
            return Err(DecodeError::MissingField {
                stage: DecodeStage::Payload,
                field: TokenPair::REFRESH_FIELD,
            });
        }
    };

    TokenPair::new(tokens.access, refresh).map_err(|_| DecodeError::EmptyField {
        stage: DecodeStage::Payload,
        field: TokenPair::REFRESH_FIELD,
    })
}

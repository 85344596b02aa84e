//! Auth Gateway capability: credential login and refresh-token exchange.

use std::error::Error as StdError;

use reqwest::Method;

use super::http::{HttpResponse, RequestExecutor};
use super::{BoxFuture, SilCommsError, non_blank};
use crate::domain::{Credentials, Status, TokenPair};
use crate::transport::{
    DecodeError, LOGIN_PATH, REFRESH_PATH, decode_envelope, decode_error_message,
    decode_token_pair, encode_login_payload, encode_refresh_payload,
};

#[derive(Debug, thiserror::Error)]
/// Failure to obtain a token pair.
pub enum AuthError {
    /// The auth request never produced a response (DNS, TLS, timeouts, etc).
    #[error("auth transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    /// The auth server answered with a non-200 status.
    #[error("auth request rejected with HTTP status {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
        body: Option<String>,
    },

    /// The auth server answered 200 with a non-`success` envelope.
    #[error("auth request failed: {status} {message:?}")]
    Api { status: Status, message: String },

    /// The token response did not have the expected shape.
    #[error("invalid auth response: {0}")]
    Decode(#[from] DecodeError),

    /// A refresh was attempted before any token pair was issued.
    #[error("no refresh token available; log in first")]
    NotLoggedIn,

    /// Failure reported by a custom [`AuthGateway`] implementation.
    #[error("identity provider error: {0}")]
    Provider(#[source] Box<dyn StdError + Send + Sync>),
}

/// Source of token pairs.
///
/// The built-in implementation talks to `{base}/auth/token/` and
/// `{base}/auth/token/refresh/`. Implement this trait to delegate to a separate
/// identity provider instead, and hand it to
/// [`SilCommsClientBuilder::auth_gateway`](super::SilCommsClientBuilder::auth_gateway).
pub trait AuthGateway: Send + Sync {
    /// Exchange email + password for a token pair.
    fn login<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<TokenPair, AuthError>>;

    /// Exchange a refresh token for a new pair.
    ///
    /// If the provider does not rotate refresh tokens, return `refresh_token`
    /// unchanged in the new pair.
    fn refresh<'a>(&'a self, refresh_token: &'a str)
    -> BoxFuture<'a, Result<TokenPair, AuthError>>;
}

#[derive(Clone)]
pub(crate) struct RestAuthGateway {
    executor: RequestExecutor,
}

impl RestAuthGateway {
    pub(crate) fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }
}

impl AuthGateway for RestAuthGateway {
    fn login<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<TokenPair, AuthError>> {
        Box::pin(async move {
            let payload = encode_login_payload(credentials);
            let response = self
                .executor
                .make_request(Method::POST, LOGIN_PATH, None, Some(&payload), None)
                .await
                .map_err(auth_error_from_request)?;
            decode_token_response(response, None)
        })
    }

    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<TokenPair, AuthError>> {
        Box::pin(async move {
            let payload = encode_refresh_payload(refresh_token);
            let response = self
                .executor
                .make_request(Method::POST, REFRESH_PATH, None, Some(&payload), None)
                .await
                .map_err(auth_error_from_request)?;
            decode_token_response(response, Some(refresh_token))
        })
    }
}

fn auth_error_from_request(err: SilCommsError) -> AuthError {
    match err {
        SilCommsError::Transport(source) => AuthError::Transport(source),
        other => AuthError::Provider(Box::new(other)),
    }
}

fn decode_token_response(
    response: HttpResponse,
    current_refresh: Option<&str>,
) -> Result<TokenPair, AuthError> {
    if response.status != 200 {
        return Err(AuthError::Rejected {
            status: response.status,
            message: decode_error_message(&response.body),
            body: non_blank(response.body),
        });
    }

    let envelope = decode_envelope(&response.body)?;
    if envelope.status != Status::Success {
        return Err(AuthError::Api {
            status: envelope.status,
            message: envelope.message,
        });
    }

    Ok(decode_token_pair(&envelope, current_refresh)?)
}

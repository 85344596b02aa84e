use std::fmt;
use std::time::Duration;

use crate::domain::validation::ValidationError;
use crate::domain::value::{Email, Password};

/// Default access token lifetime: the access token is rotated every 30 minutes.
pub const DEFAULT_ACCESS_TOKEN_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Default refresh token lifetime: a full credential login happens every 24 hours.
pub const DEFAULT_REFRESH_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
/// Email + password pair used for credential login.
pub struct Credentials {
    pub email: Email,
    pub password: Password,
}

impl Credentials {
    /// Validate both parts and build [`Credentials`].
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            email: Email::new(email)?,
            password: Password::new(password)?,
        })
    }
}

#[derive(Clone, PartialEq, Eq)]
/// Access + refresh token pair issued by a login or a refresh.
///
/// A pair is immutable once issued and is always replaced as a whole.
/// The `Debug` output never contains token material.
pub struct TokenPair {
    access: String,
    refresh: String,
}

impl TokenPair {
    /// JSON field name of the access token (`access`).
    pub const ACCESS_FIELD: &'static str = "access";
    /// JSON field name of the refresh token (`refresh`).
    pub const REFRESH_FIELD: &'static str = "refresh";

    /// Build a pair; both tokens must be non-empty after trimming.
    pub fn new(
        access: impl Into<String>,
        refresh: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let access = access.into();
        if access.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: Self::ACCESS_FIELD,
            });
        }
        let refresh = refresh.into();
        if refresh.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: Self::REFRESH_FIELD,
            });
        }
        Ok(Self { access, refresh })
    }

    /// Bearer credential for API calls.
    pub fn access(&self) -> &str {
        &self.access
    }

    /// Credential exchanged for a new access token.
    pub fn refresh(&self) -> &str {
        &self.refresh
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"***")
            .field("refresh", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How long issued tokens stay valid, which is also how often they are rotated.
pub struct TokenLifetimes {
    access: Duration,
    refresh: Duration,
}

impl TokenLifetimes {
    /// Validate that both lifetimes are non-zero.
    pub fn new(access: Duration, refresh: Duration) -> Result<Self, ValidationError> {
        if access.is_zero() {
            return Err(ValidationError::ZeroDuration {
                field: "access_token_lifetime",
            });
        }
        if refresh.is_zero() {
            return Err(ValidationError::ZeroDuration {
                field: "refresh_token_lifetime",
            });
        }
        Ok(Self { access, refresh })
    }

    /// Access token lifetime.
    pub fn access(self) -> Duration {
        self.access
    }

    /// Refresh token lifetime.
    pub fn refresh(self) -> Duration {
        self.refresh
    }
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: DEFAULT_ACCESS_TOKEN_LIFETIME,
            refresh: DEFAULT_REFRESH_TOKEN_LIFETIME,
        }
    }
}

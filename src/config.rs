//! Environment-backed construction of [`SilCommsClientBuilder`].

use url::Url;

use crate::client::SilCommsClientBuilder;
use crate::domain::{Credentials, Email, Password, SenderId};

pub const BASE_URL_VAR: &str = "SIL_COMMS_BASE_URL";
pub const EMAIL_VAR: &str = "SIL_COMMS_EMAIL";
pub const PASSWORD_VAR: &str = "SIL_COMMS_PASSWORD";
pub const SENDER_ID_VAR: &str = "SIL_COMMS_SENDER_ID";
pub const AFYA_MOJA_SENDER_ID_VAR: &str = "SIL_COMMS_AFYAMOJA_SENDER_ID";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// Missing or invalid client configuration.
pub enum ConfigError {
    #[error("missing required setting {name}")]
    Missing { name: &'static str },

    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, err: impl ToString) -> Self {
        Self::Invalid {
            name,
            reason: err.to_string(),
        }
    }
}

impl SilCommsClientBuilder {
    /// Start a builder from the `SIL_COMMS_*` process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Start a builder from any variable lookup.
    ///
    /// `SIL_COMMS_BASE_URL`, `SIL_COMMS_EMAIL`, `SIL_COMMS_PASSWORD` and
    /// `SIL_COMMS_SENDER_ID` are required; `SIL_COMMS_AFYAMOJA_SENDER_ID` is
    /// optional. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing { name });

        let base_url = require(BASE_URL_VAR)?;
        Url::parse(&base_url).map_err(|err| ConfigError::invalid(BASE_URL_VAR, err))?;

        let credentials = Credentials {
            email: Email::new(require(EMAIL_VAR)?)
                .map_err(|err| ConfigError::invalid(EMAIL_VAR, err))?,
            password: Password::new(require(PASSWORD_VAR)?)
                .map_err(|err| ConfigError::invalid(PASSWORD_VAR, err))?,
        };
        let sender_id = SenderId::new(require(SENDER_ID_VAR)?)
            .map_err(|err| ConfigError::invalid(SENDER_ID_VAR, err))?;

        let mut builder = Self::new(base_url, credentials, sender_id);
        if let Some(value) = get(AFYA_MOJA_SENDER_ID_VAR) {
            let sender_id = SenderId::new(value)
                .map_err(|err| ConfigError::invalid(AFYA_MOJA_SENDER_ID_VAR, err))?;
            builder = builder.afya_moja_sender_id(sender_id);
        }

        Ok(builder)
    }
}

use std::fmt;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

use crate::domain::Status;

/// Which of the two decoding steps failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// The outer `{status, message, data}` wrapper.
    Envelope,
    /// The endpoint-specific shape inside `data`.
    Payload,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Envelope => f.write_str("response envelope"),
            Self::Payload => f.write_str("response payload"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to decode {stage}: {source}")]
    Json {
        stage: DecodeStage,
        #[source]
        source: serde_json::Error,
    },

    #[error("{stage} is missing required field `{field}`")]
    MissingField {
        stage: DecodeStage,
        field: &'static str,
    },

    #[error("{stage} field `{field}` must not be empty")]
    EmptyField {
        stage: DecodeStage,
        field: &'static str,
    },
}

impl DecodeError {
    pub fn stage(&self) -> DecodeStage {
        match self {
            Self::Json { stage, .. }
            | Self::MissingField { stage, .. }
            | Self::EmptyField { stage, .. } => *stage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TransportStatus {
    Success,
    Failure,
    Error,
}

impl From<TransportStatus> for Status {
    fn from(value: TransportStatus) -> Self {
        match value {
            TransportStatus::Success => Status::Success,
            TransportStatus::Failure => Status::Failure,
            TransportStatus::Error => Status::Error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnvelopeJson {
    status: TransportStatus,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Box<RawValue>>,
}

/// Outer response wrapper with the payload left undecoded.
#[derive(Debug)]
pub struct Envelope {
    pub status: Status,
    pub message: String,
    data: Option<Box<RawValue>>,
}

impl Envelope {
    /// Decode the `data` member into `T`.
    ///
    /// A missing or `null` `data` member is reported as [`DecodeError::MissingField`].
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let raw = self
            .data
            .as_deref()
            .filter(|raw| raw.get() != "null")
            .ok_or(DecodeError::MissingField {
                stage: DecodeStage::Envelope,
                field: "data",
            })?;
        serde_json::from_str(raw.get()).map_err(|source| DecodeError::Json {
            stage: DecodeStage::Payload,
            source,
        })
    }
}

pub fn decode_envelope(json: &str) -> Result<Envelope, DecodeError> {
    let parsed: EnvelopeJson = serde_json::from_str(json).map_err(|source| DecodeError::Json {
        stage: DecodeStage::Envelope,
        source,
    })?;

    Ok(Envelope {
        status: parsed.status.into(),
        message: parsed.message.unwrap_or_default(),
        data: parsed.data,
    })
}

/// Best-effort extraction of a human-readable reason from an error response body.
///
/// Error responses usually reuse the envelope shape, sometimes with a `detail`
/// member instead (`{"detail": "..."}`).
pub fn decode_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorJson {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        detail: Option<String>,
    }

    let parsed: ErrorJson = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(parsed.detail)
        .filter(|message| !message.trim().is_empty())
}

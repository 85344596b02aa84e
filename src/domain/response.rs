use std::fmt;
use std::str::FromStr;

use crate::domain::validation::ValidationError;

/// Top-level `status` of every SIL Comms response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Failure,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "error" => Ok(Self::Error),
            other => Err(ValidationError::UnknownVariant {
                field: "status",
                value: other.to_owned(),
            }),
        }
    }
}

/// Bulk SMS record returned once the API accepted a bulk send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkSms {
    pub guid: String,
    pub sender: String,
    pub message: String,
    pub recipients: Vec<String>,
    pub state: String,
    pub sms: Vec<String>,
    pub created: String,
    pub updated: String,
}

/// Premium SMS record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PremiumSms {
    pub guid: String,
    pub body: String,
    pub msisdn: String,
    pub subscription: Option<String>,
    pub state: String,
    pub created: String,
    pub updated: String,
}

/// Subscription of a phone number to an offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub guid: String,
    pub offer: String,
    pub msisdn: String,
    pub created: String,
    pub updated: String,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::validation::ValidationError;
use crate::domain::value::{MessageText, OfferCode, RawPhoneNumber, SubscriptionId};

/// Which sender id a bulk SMS goes out under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variant {
    /// The client's default sender id.
    #[default]
    Default,
    /// The AfyaMoja application sender id.
    AfyaMoja,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::AfyaMoja => "AFYA_MOJA",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "DEFAULT" => Ok(Self::Default),
            "AFYA_MOJA" => Ok(Self::AfyaMoja),
            other => Err(ValidationError::UnknownVariant {
                field: "variant",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SendBulkSms {
    message: MessageText,
    recipients: Vec<RawPhoneNumber>,
    variant: Variant,
}

impl SendBulkSms {
    pub fn new(
        message: MessageText,
        recipients: Vec<RawPhoneNumber>,
        variant: Variant,
    ) -> Result<Self, ValidationError> {
        if recipients.is_empty() {
            return Err(ValidationError::NoRecipients);
        }
        Ok(Self {
            message,
            recipients,
            variant,
        })
    }

    pub fn message(&self) -> &MessageText {
        &self.message
    }

    pub fn recipients(&self) -> &[RawPhoneNumber] {
        &self.recipients
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }
}

#[derive(Debug, Clone)]
pub struct SendPremiumSms {
    pub body: MessageText,
    pub msisdn: RawPhoneNumber,
    pub subscription: SubscriptionId,
}

#[derive(Debug, Clone)]
pub struct ActivateSubscription {
    pub offer: OfferCode,
    pub msisdn: RawPhoneNumber,
    /// Whether the subscription should also be activated on the SDP.
    /// `None` leaves the server default in place.
    pub activate: Option<bool>,
}

/// Query parameters for listing subscriptions, passed through as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionQuery {
    params: BTreeMap<String, String>,
}

impl SubscriptionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn msisdn(self, msisdn: &RawPhoneNumber) -> Self {
        self.param(RawPhoneNumber::FIELD, msisdn.raw())
    }

    pub fn offer(self, offer: &OfferCode) -> Self {
        self.param(OfferCode::FIELD, offer.as_str())
    }

    pub fn page(self, page: u32) -> Self {
        self.param("page", page.to_string())
    }

    /// Set an arbitrary query parameter, replacing an earlier value for the same key.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for SubscriptionQuery
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

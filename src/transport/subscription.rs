use serde::{Deserialize, Serialize};

use super::envelope::{DecodeError, Envelope};
use crate::domain::{ActivateSubscription, Page, Subscription};

pub const SUBSCRIPTIONS_PATH: &str = "/v1/sms/subscriptions/";

#[derive(Debug, Serialize)]
pub struct ActivateSubscriptionPayload<'a> {
    offer: &'a str,
    msisdn: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    activate: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PageJson {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    previous: Option<String>,
    results: Vec<SubscriptionJson>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionJson {
    guid: String,
    offer: String,
    msisdn: String,
    #[serde(default)]
    created: String,
    #[serde(default)]
    updated: String,
}

pub fn encode_activate_subscription_payload(
    request: &ActivateSubscription,
) -> ActivateSubscriptionPayload<'_> {
    ActivateSubscriptionPayload {
        offer: request.offer.as_str(),
        msisdn: request.msisdn.raw(),
        activate: request.activate,
    }
}

pub fn decode_subscriptions_page(envelope: &Envelope) -> Result<Page<Subscription>, DecodeError> {
    let parsed: PageJson = envelope.payload()?;
    Ok(Page {
        count: parsed.count,
        next: parsed.next,
        previous: parsed.previous,
        results: parsed
            .results
            .into_iter()
            .map(|item| Subscription {
                guid: item.guid,
                offer: item.offer,
                msisdn: item.msisdn,
                created: item.created,
                updated: item.updated,
            })
            .collect(),
    })
}

use serde::{Deserialize, Serialize};

use super::envelope::{DecodeError, Envelope};
use crate::domain::{BulkSms, PremiumSms, RawPhoneNumber, SendBulkSms, SendPremiumSms, SenderId};

pub const BULK_SMS_PATH: &str = "/v1/sms/bulk/";
pub const PREMIUM_SMS_PATH: &str = "/v1/sms/sms/";

#[derive(Debug, Serialize)]
pub struct BulkSmsPayload<'a> {
    sender: &'a str,
    message: &'a str,
    recipients: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct PremiumSmsPayload<'a> {
    body: &'a str,
    msisdn: &'a str,
    subscription: &'a str,
}

#[derive(Debug, Deserialize)]
struct BulkSmsJson {
    guid: String,
    #[serde(default)]
    sender: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    recipients: Vec<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    sms: Vec<String>,
    #[serde(default)]
    created: String,
    #[serde(default)]
    updated: String,
}

#[derive(Debug, Deserialize)]
struct PremiumSmsJson {
    guid: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    msisdn: String,
    #[serde(default)]
    subscription: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    created: String,
    #[serde(default)]
    updated: String,
}

pub fn encode_bulk_sms_payload<'a>(
    request: &'a SendBulkSms,
    sender: &'a SenderId,
) -> BulkSmsPayload<'a> {
    BulkSmsPayload {
        sender: sender.as_str(),
        message: request.message().as_str(),
        recipients: request
            .recipients()
            .iter()
            .map(RawPhoneNumber::raw)
            .collect(),
    }
}

pub fn encode_premium_sms_payload(request: &SendPremiumSms) -> PremiumSmsPayload<'_> {
    PremiumSmsPayload {
        body: request.body.as_str(),
        msisdn: request.msisdn.raw(),
        subscription: request.subscription.as_str(),
    }
}

pub fn decode_bulk_sms(envelope: &Envelope) -> Result<BulkSms, DecodeError> {
    let parsed: BulkSmsJson = envelope.payload()?;
    Ok(BulkSms {
        guid: parsed.guid,
        sender: parsed.sender,
        message: parsed.message,
        recipients: parsed.recipients,
        state: parsed.state,
        sms: parsed.sms,
        created: parsed.created,
        updated: parsed.updated,
    })
}

pub fn decode_premium_sms(envelope: &Envelope) -> Result<PremiumSms, DecodeError> {
    let parsed: PremiumSmsJson = envelope.payload()?;
    Ok(PremiumSms {
        guid: parsed.guid,
        body: parsed.body,
        msisdn: parsed.msisdn,
        subscription: parsed.subscription,
        state: parsed.state,
        created: parsed.created,
        updated: parsed.updated,
    })
}

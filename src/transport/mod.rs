//! Transport layer: wire-format details (JSON payloads and envelope decoding).

mod auth;
mod envelope;
mod sms;
mod subscription;

pub use auth::{
    LOGIN_PATH, REFRESH_PATH, decode_token_pair, encode_login_payload, encode_refresh_payload,
};
pub use envelope::{DecodeError, DecodeStage, Envelope, decode_envelope, decode_error_message};
pub use sms::{
    BULK_SMS_PATH, PREMIUM_SMS_PATH, decode_bulk_sms, decode_premium_sms, encode_bulk_sms_payload,
    encode_premium_sms_payload,
};
pub use subscription::{
    SUBSCRIPTIONS_PATH, decode_subscriptions_page, encode_activate_subscription_payload,
};

//! Typed Rust client for the SIL Comms SMS HTTP API.
//!
//! The crate is split into a domain layer of strong types, a transport layer
//! for wire-format details, and a client layer that owns the token lifecycle:
//! the client logs in when it is built, refreshes the access token and logs in
//! again on schedule, and refuses authenticated requests while the last
//! scheduled rotation has failed.
//!
//! ```rust,no_run
//! use silcomms::{
//!     Credentials, MessageText, RawPhoneNumber, SendBulkSms, SenderId, SilCommsClient, Variant,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), silcomms::SilCommsError> {
//!     let client = SilCommsClient::builder(
//!         "https://api.example.com",
//!         Credentials::new("ops@example.com", "...")?,
//!         SenderId::new("SIL")?,
//!     )
//!     .build()
//!     .await?;
//!
//!     let request = SendBulkSms::new(
//!         MessageText::new("hello")?,
//!         vec![RawPhoneNumber::new("+254700000000")?],
//!         Variant::Default,
//!     )?;
//!     let _bulk = client.send_bulk_sms(request).await?;
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod domain;
mod transport;

pub use client::{
    AuthError, AuthGateway, BoxFuture, DEFAULT_HTTP_TIMEOUT, HttpResponse, Scheduler,
    SessionManager, SessionStatus, SilCommsClient, SilCommsClientBuilder, SilCommsError,
};
pub use config::ConfigError;
pub use domain::{
    ActivateSubscription, BulkSms, Credentials, Email, MessageText, OfferCode, Page, Password,
    PhoneNumber, PremiumSms, RawPhoneNumber, SendBulkSms, SendPremiumSms, SenderId, Status,
    Subscription, SubscriptionId, SubscriptionQuery, TokenLifetimes, TokenPair, ValidationError,
    Variant,
};
pub use transport::{DecodeError, DecodeStage};

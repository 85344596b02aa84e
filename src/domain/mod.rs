//! Domain layer: strong types with validation and invariants (no I/O).

mod request;
mod response;
mod token;
mod validation;
mod value;

pub use request::{ActivateSubscription, SendBulkSms, SendPremiumSms, SubscriptionQuery, Variant};
pub use response::{BulkSms, Page, PremiumSms, Status, Subscription};
pub use token::{
    Credentials, DEFAULT_ACCESS_TOKEN_LIFETIME, DEFAULT_REFRESH_TOKEN_LIFETIME, TokenLifetimes,
    TokenPair,
};
pub use validation::ValidationError;
pub use value::{
    Email, MessageText, OfferCode, Password, PhoneNumber, RawPhoneNumber, SenderId,
    SubscriptionId,
};

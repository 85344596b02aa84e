use std::io;

use silcomms::{MessageText, RawPhoneNumber, SendBulkSms, SilCommsClientBuilder, Variant};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let phone_raw = std::env::var("SIL_COMMS_PHONE").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "SIL_COMMS_PHONE environment variable is required",
        )
    })?;
    let message = std::env::var("SIL_COMMS_MESSAGE")
        .unwrap_or_else(|_| "Hello from the silcomms demo.".to_owned());
    let variant = match std::env::var("SIL_COMMS_VARIANT") {
        Ok(value) => value.parse::<Variant>()?,
        Err(_) => Variant::Default,
    };

    let client = SilCommsClientBuilder::from_env()?.build().await?;

    let request = SendBulkSms::new(
        MessageText::new(message)?,
        vec![RawPhoneNumber::new(phone_raw)?],
        variant,
    )?;
    let bulk = client.send_bulk_sms(request).await?;
    println!(
        "guid: {}, state: {}, recipients: {:?}",
        bulk.guid, bulk.state, bulk.recipients
    );

    client.shutdown().await;
    Ok(())
}

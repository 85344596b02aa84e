use silcomms::{RawPhoneNumber, SilCommsClientBuilder, SubscriptionQuery};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut query = SubscriptionQuery::new();
    if let Ok(phone) = std::env::var("SIL_COMMS_PHONE") {
        query = query.msisdn(&RawPhoneNumber::new(phone)?);
    }

    let client = SilCommsClientBuilder::from_env()?.build().await?;

    let page = client.get_subscriptions_page(&query).await?;
    println!("{} subscription(s)", page.count);
    for subscription in &page.results {
        println!(
            "{} offer={} msisdn={}",
            subscription.guid, subscription.offer, subscription.msisdn
        );
    }

    client.shutdown().await;
    Ok(())
}

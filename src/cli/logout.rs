use crate::{cli::open_stores, config::Config, error, success};

pub async fn logout(config: &Config) {
    let (mut durable, mut session) = open_stores(config).await;

    if let Err(e) = session.clear().await {
        error!("Failed to clear the session cache: {}", e);
    }
    if let Err(e) = durable.clear().await {
        error!("Failed to clear the durable store: {}", e);
    }

    success!("Logged out. Cached tokens and documents were removed.");
}

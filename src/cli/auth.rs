use crate::{cli::open_stores, config::Config, error, info, spotify, success};

pub async fn auth(config: &Config) {
    let (mut durable, mut session) = open_stores(config).await;

    info!("Opening the Spotify authorization page...");
    match spotify::auth::authorize(config, &mut durable, &mut session).await {
        Ok(tokens) => {
            if tokens.refresh_token.is_none() {
                info!("No refresh token was issued; run spotme auth again when it expires.");
            }
            success!("Authentication successful!");
        }
        Err(e) => error!("Authentication failed: {}", e),
    }
}

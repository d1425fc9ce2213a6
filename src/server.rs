use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tokio::{net::TcpListener, sync::Mutex};

use crate::{api, config::Config, error::AuthError, types::CallbackState};

/// Binds the address named by the redirect URI.
///
/// Binding happens before the browser is opened so a busy port is reported
/// instead of leaving the user on a dead callback page.
pub async fn bind_callback_listener(config: &Config) -> Result<TcpListener, AuthError> {
    let addr = config
        .callback_addr()
        .map_err(|e| AuthError::Listener(e.to_string()))?;

    TcpListener::bind(&addr)
        .await
        .map_err(|e| AuthError::Listener(format!("cannot bind {addr}: {e}")))
}

pub fn router(state: Arc<Mutex<CallbackState>>, callback_path: &str) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route(callback_path, get(api::callback).layer(Extension(state)))
}

/// Serves the callback and health routes until the task is aborted.
pub async fn start_api_server(
    listener: TcpListener,
    state: Arc<Mutex<CallbackState>>,
    callback_path: &str,
) -> std::io::Result<()> {
    let app = router(state, callback_path);
    axum::serve(listener, app).await
}

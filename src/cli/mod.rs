//! # CLI Module
//!
//! User-facing commands. Each command opens the stores it needs, delegates
//! to [`crate::spotify`] and [`crate::management`], and turns errors into
//! terminal output. This is the only layer that exits the process.
//!
//! ## Commands
//!
//! - [`auth`] - run the PKCE authorization flow and cache the tokens
//! - [`me`] - show profile, top artists and top tracks
//! - [`logout`] - forget tokens, cached documents and any pending verifier
//!
//! ## Usage
//!
//! ```bash
//! spotme auth          # authorize in the browser
//! spotme me            # render from cache, fetching what is missing
//! spotme me --refresh  # always fetch
//! spotme me --json     # raw documents
//! spotme logout
//! ```

mod auth;
mod logout;
mod me;

pub use auth::auth;
pub use logout::logout;
pub use me::me;

use crate::{
    config::Config,
    error,
    management::{SessionCache, Storage},
};

/// Opens the durable store and the session cache, exiting on failure.
async fn open_stores(config: &Config) -> (Storage, SessionCache) {
    let durable = match Storage::open(config.durable_store_path()).await {
        Ok(store) => store,
        Err(e) => error!(
            "Failed to open {}: {}",
            config.durable_store_path().display(),
            e
        ),
    };
    let session = match Storage::open(config.session_store_path()).await {
        Ok(store) => SessionCache::new(store),
        Err(e) => error!(
            "Failed to open {}: {}. Run spotme logout to reset it.",
            config.session_store_path().display(),
            e
        ),
    };
    (durable, session)
}

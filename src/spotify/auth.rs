use std::{sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::{Client, Response, Url};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::{
    config::Config,
    debug,
    error::AuthError,
    management::{SessionCache, Storage},
    server,
    types::{CallbackOutcome, CallbackState, TokenPair, TokenResponse},
    utils, warning,
};

/// Durable store key holding the PKCE code verifier between redirect and exchange.
pub const KEY_VERIFIER: &str = "verifier";

/// Runs the complete OAuth 2.0 PKCE authorization flow.
///
/// 1. Binds the local callback listener on the redirect URI's address
/// 2. Generates and stores a fresh verifier, builds the authorize URL
/// 3. Opens the URL in the default browser (or prints it)
/// 4. Waits for the callback, at most `config.callback_timeout`
/// 5. Exchanges the code for tokens and stores them in the session cache
///
/// The listener is stopped before this returns, whatever the outcome.
///
/// # Arguments
///
/// * `config` - Client id, endpoints and redirect URI
/// * `durable` - Store holding the verifier between redirect and exchange
/// * `session` - Cache receiving `accessToken` and `refreshToken`
///
/// # Errors
///
/// - [`AuthError::Listener`] when the redirect URI's port cannot be bound
/// - [`AuthError::Denied`] when the user declined the consent screen
/// - [`AuthError::Timeout`] when no callback arrived in time
/// - any error of [`complete_authorization`]
///
/// # Example
///
/// ```rust,no_run
/// let tokens = authorize(&config, &mut durable, &mut session).await?;
/// ```
pub async fn authorize(
    config: &Config,
    durable: &mut Storage,
    session: &mut SessionCache,
) -> Result<TokenPair, AuthError> {
    let shared_state = Arc::new(Mutex::new(CallbackState::default()));

    let listener = server::bind_callback_listener(config).await?;
    let server_state = Arc::clone(&shared_state);
    let callback_path = config.callback_path();
    let server = tokio::spawn(async move {
        if let Err(e) = server::start_api_server(listener, server_state, &callback_path).await {
            warning!("Callback listener stopped: {}", e);
        }
    });

    let auth_url = match redirect_to_authorize(config, durable).await {
        Ok(url) => url,
        Err(e) => {
            server.abort();
            return Err(e);
        }
    };

    if webbrowser::open(auth_url.as_str()).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let pb = utils::spinner("Waiting for authorization in the browser...");
    let outcome = wait_for_callback(shared_state, config.callback_timeout).await;
    pb.finish_and_clear();
    server.abort();

    let code = match outcome {
        Some(CallbackOutcome::Code(code)) => code,
        Some(CallbackOutcome::Denied(reason)) => return Err(AuthError::Denied(reason)),
        None => return Err(AuthError::Timeout),
    };

    complete_authorization(config, durable, session, &code).await
}

/// Exchanges the callback's `code` and stores the resulting tokens.
///
/// The session is only written after a successful exchange. A rejected
/// exchange leaves it without an access token, so nothing downstream can
/// reach the resource API.
pub async fn complete_authorization(
    config: &Config,
    durable: &mut Storage,
    session: &mut SessionCache,
    code: &str,
) -> Result<TokenPair, AuthError> {
    let tokens = exchange_code_for_token(config, durable, code).await?;
    session.store_tokens(&tokens).await?;
    Ok(tokens)
}

/// Restores a usable access token after the resource API rejected the old one.
///
/// Tries the cached refresh token once; when there is none or the token
/// endpoint refuses it, falls back to the interactive [`authorize`] flow.
pub async fn reauthorize(
    config: &Config,
    durable: &mut Storage,
    session: &mut SessionCache,
) -> Result<TokenPair, AuthError> {
    if let Some(refresh_token) = session.refresh_token() {
        match refresh_access_token(config, &refresh_token).await {
            Ok(tokens) => {
                session.store_tokens(&tokens).await?;
                debug!("Access token refreshed");
                return Ok(tokens);
            }
            Err(e) => warning!("Token refresh failed, authorizing again: {}", e),
        }
    }

    authorize(config, durable, session).await
}

/// Prepares the redirect to the authorization endpoint.
///
/// A fresh verifier is generated for every call and written to the durable
/// store under [`KEY_VERIFIER`], replacing any earlier one. The returned URL
/// carries only the derived challenge.
pub async fn redirect_to_authorize(
    config: &Config,
    durable: &mut Storage,
) -> Result<Url, AuthError> {
    let code_verifier = utils::generate_code_verifier(config.verifier_length);
    let code_challenge = utils::generate_code_challenge(&code_verifier);

    durable.save(KEY_VERIFIER, json!(code_verifier)).await?;

    build_authorize_url(config, &code_challenge)
}

/// Builds the `/authorize` URL for `code_challenge`.
pub fn build_authorize_url(config: &Config, code_challenge: &str) -> Result<Url, AuthError> {
    Url::parse_with_params(
        &config.authorize_url(),
        &[
            ("client_id", config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", config.scope.as_str()),
            ("code_challenge_method", "S256"),
            ("code_challenge", code_challenge),
        ],
    )
    .map_err(|e| AuthError::InvalidUrl(e.to_string()))
}

/// Exchanges an authorization code for tokens.
///
/// The verifier stored by [`redirect_to_authorize`] is removed from the
/// durable store before the request goes out, so it is never sent twice.
/// Nothing is sent when the code is empty or no verifier is stored.
///
/// # Errors
///
/// - [`AuthError::MissingCode`] / [`AuthError::MissingVerifier`] for unmet
///   preconditions
/// - [`AuthError::Server`] when the token endpoint answers with an `error`
/// - [`AuthError::Status`] for other non-success statuses
/// - [`AuthError::MissingAccessToken`] when a success lacks `access_token`
/// - [`AuthError::Http`] for transport failures
pub async fn exchange_code_for_token(
    config: &Config,
    durable: &mut Storage,
    code: &str,
) -> Result<TokenPair, AuthError> {
    if code.trim().is_empty() {
        return Err(AuthError::MissingCode);
    }

    let code_verifier = durable
        .take_str(KEY_VERIFIER)
        .await?
        .ok_or(AuthError::MissingVerifier)?;

    let client = Client::new();
    let res = client
        .post(config.token_url())
        .form(&[
            ("client_id", config.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("code_verifier", code_verifier.as_str()),
        ])
        .send()
        .await?;

    token_from_response(res, None).await
}

/// Trades a refresh token for a new access token.
///
/// Spotify does not always rotate the refresh token; when the response
/// omits one, the token passed in is kept.
pub async fn refresh_access_token(
    config: &Config,
    refresh_token: &str,
) -> Result<TokenPair, AuthError> {
    let client = Client::new();
    let res = client
        .post(config.token_url())
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.client_id.as_str()),
        ])
        .send()
        .await?;

    token_from_response(res, Some(refresh_token)).await
}

/// Polls the shared callback state until an outcome arrives or `max_wait` elapses.
pub async fn wait_for_callback(
    shared_state: Arc<Mutex<CallbackState>>,
    max_wait: Duration,
) -> Option<CallbackOutcome> {
    use std::time::Instant;

    let start = Instant::now();

    loop {
        {
            let lock = shared_state.lock().await;
            if let Some(outcome) = &lock.outcome {
                return Some(outcome.clone());
            }
        }
        if start.elapsed() >= max_wait {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

async fn token_from_response(
    res: Response,
    previous_refresh_token: Option<&str>,
) -> Result<TokenPair, AuthError> {
    let status = res.status();
    let text = res.text().await?;

    let body: TokenResponse = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(_) if !status.is_success() => return Err(AuthError::Status(status)),
        Err(_) => return Err(AuthError::MissingAccessToken),
    };

    if let Some(error) = &body.error {
        return Err(server_error(error, body.error_description.clone()));
    }
    if !status.is_success() {
        return Err(AuthError::Status(status));
    }

    let access_token = body
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingAccessToken)?;

    Ok(TokenPair {
        access_token,
        refresh_token: body
            .refresh_token
            .or_else(|| previous_refresh_token.map(str::to_string)),
        scope: body.scope,
        expires_in: body.expires_in,
        obtained_at: Utc::now().timestamp() as u64,
    })
}

/// Maps both error shapes the accounts service uses: a bare OAuth error
/// code next to `error_description`, or an object with `status`/`message`.
fn server_error(error: &Value, description: Option<String>) -> AuthError {
    match error {
        Value::String(code) => AuthError::Server {
            error: code.clone(),
            description,
        },
        Value::Object(obj) => {
            let message = obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
            let status = obj.get("status").and_then(Value::as_u64);
            AuthError::Server {
                error: match (status, &message) {
                    (Some(status), Some(message)) => format!("{status} {message}"),
                    (None, Some(message)) => message.clone(),
                    _ => error.to_string(),
                },
                description,
            }
        }
        other => AuthError::Server {
            error: other.to_string(),
            description,
        },
    }
}

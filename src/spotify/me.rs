use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::{config::Config, error::FetchError};

/// Window for the top-items endpoints: roughly the last four weeks.
pub const TOP_TIME_RANGE: &str = "short_term";
pub const TOP_LIMIT: u32 = 5;

/// `GET /me`, the current user's profile.
pub async fn fetch_profile(config: &Config, token: &str) -> Result<Value, FetchError> {
    get_json(&config.api_endpoint("/me"), token).await
}

/// `GET /me/top/artists` for the fixed window and limit.
pub async fn fetch_top_artists(config: &Config, token: &str) -> Result<Value, FetchError> {
    get_json(&top_items_url(config, "artists"), token).await
}

/// `GET /me/top/tracks` for the fixed window and limit.
pub async fn fetch_top_tracks(config: &Config, token: &str) -> Result<Value, FetchError> {
    get_json(&top_items_url(config, "tracks"), token).await
}

fn top_items_url(config: &Config, kind: &str) -> String {
    config.api_endpoint(&format!(
        "/me/top/{kind}?time_range={TOP_TIME_RANGE}&limit={TOP_LIMIT}"
    ))
}

/// Issues an authenticated GET and returns the body verbatim.
///
/// An `error` object in the body wins over the HTTP status, since the Web
/// API reports `{"error": {"status": 401, "message": ...}}` for expired
/// tokens.
async fn get_json(url: &str, token: &str) -> Result<Value, FetchError> {
    let client = Client::new();
    let response = client.get(url).bearer_auth(token).send().await?;

    let status = response.status();
    let text = response.text().await?;
    let body: Option<Value> = serde_json::from_str(&text).ok();

    if let Some(error) = body.as_ref().and_then(|b| b.get("error")) {
        return Err(api_error(status, error));
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(FetchError::Unauthorized(text));
    }
    if !status.is_success() {
        return Err(FetchError::Api {
            status: status.as_u16(),
            message: text,
        });
    }

    body.ok_or_else(|| FetchError::Decode(format!("{} bytes of non-JSON body", text.len())))
}

fn api_error(status: StatusCode, error: &Value) -> FetchError {
    let code = error
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok())
        .unwrap_or(status.as_u16());
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());

    if code == StatusCode::UNAUTHORIZED.as_u16() {
        FetchError::Unauthorized(message)
    } else {
        FetchError::Api {
            status: code,
            message,
        }
    }
}

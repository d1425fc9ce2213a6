//! PKCE round trips against a stub authorization server that performs real
//! S256 verification, plus the end-to-end authorize → exchange → fetch →
//! cache scenario.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use spotme::{
    config::Config,
    error::AuthError,
    management::{DashboardOutcome, KEY_USER_DATA, SessionCache, Storage, load_dashboard},
    spotify::auth::{
        KEY_VERIFIER, build_authorize_url, complete_authorization, exchange_code_for_token,
        redirect_to_authorize,
    },
};

const CODE: &str = "abc123";

#[derive(Clone, Default)]
struct StubState {
    /// authorization code -> (code_challenge, redirect_uri)
    pending: Arc<Mutex<HashMap<String, (String, String)>>>,
}

fn profile() -> Value {
    json!({
        "display_name": "Alice",
        "id": "u1",
        "email": "a@example.com",
        "uri": "spotify:user:u1",
        "images": []
    })
}

async fn authorize(
    State(state): State<StubState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    if params.get("code_challenge_method").map(String::as_str) != Some("S256")
        || params.get("response_type").map(String::as_str) != Some("code")
    {
        return (StatusCode::BAD_REQUEST, "unsupported request".to_string());
    }
    let (Some(challenge), Some(redirect_uri)) =
        (params.get("code_challenge"), params.get("redirect_uri"))
    else {
        return (StatusCode::BAD_REQUEST, "missing parameters".to_string());
    };

    state
        .pending
        .lock()
        .unwrap()
        .insert(CODE.to_string(), (challenge.clone(), redirect_uri.clone()));
    (StatusCode::OK, CODE.to_string())
}

async fn token(
    State(state): State<StubState>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let invalid = |description: &str| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": description})),
        )
    };

    if form.get("grant_type").map(String::as_str) != Some("authorization_code") {
        return invalid("unsupported grant type");
    }
    let code = form.get("code").cloned().unwrap_or_default();
    // codes are single use
    let Some((challenge, redirect_uri)) = state.pending.lock().unwrap().remove(&code) else {
        return invalid("Invalid authorization code");
    };
    if form.get("redirect_uri") != Some(&redirect_uri) {
        return invalid("Invalid redirect URI");
    }
    let verifier = form.get("code_verifier").cloned().unwrap_or_default();
    if URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes())) != challenge {
        return invalid("code_verifier was incorrect");
    }

    (StatusCode::OK, Json(json!({"access_token": "tok1"})))
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer tok1")
}

async fn resource(headers: HeaderMap, body: Value) -> (StatusCode, Json<Value>) {
    if authorized(&headers) {
        (StatusCode::OK, Json(body))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"status": 401, "message": "Invalid access token"}})),
        )
    }
}

async fn start_stub() -> String {
    let app = Router::new()
        .route("/authorize", get(authorize))
        .route("/api/token", post(token))
        .route("/v1/me", get(|h: HeaderMap| resource(h, profile())))
        .route(
            "/v1/me/top/artists",
            get(|h: HeaderMap| resource(h, json!({"items": [{"id": "a1", "name": "Artist"}]}))),
        )
        .route(
            "/v1/me/top/tracks",
            get(|h: HeaderMap| resource(h, json!({"items": []}))),
        )
        .with_state(StubState::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config_for(base: &str) -> Config {
    Config::new("client-123")
        .with_accounts_url(base)
        .with_api_url(format!("{base}/v1"))
}

/// Plays the user agent: follows the authorize URL and returns the code.
async fn consent(url: &reqwest::Url) -> String {
    let res = reqwest::get(url.clone()).await.unwrap();
    assert!(res.status().is_success(), "authorize rejected: {}", res.status());
    res.text().await.unwrap()
}

#[tokio::test]
async fn exchange_succeeds_with_the_verifier_behind_the_challenge() {
    let base = start_stub().await;
    let config = config_for(&base);
    let mut durable = Storage::in_memory();

    let url = redirect_to_authorize(&config, &mut durable).await.unwrap();
    let code = consent(&url).await;

    let tokens = exchange_code_for_token(&config, &mut durable, &code)
        .await
        .unwrap();
    assert_eq!(tokens.access_token, "tok1");
    assert_eq!(tokens.refresh_token, None);

    // the verifier is consumed by the exchange
    assert!(!durable.has(KEY_VERIFIER));
    let err = exchange_code_for_token(&config, &mut durable, &code)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::MissingVerifier));
}

#[tokio::test]
async fn exchange_fails_with_a_different_verifier() {
    let base = start_stub().await;
    let config = config_for(&base);
    let mut durable = Storage::in_memory();

    let url = redirect_to_authorize(&config, &mut durable).await.unwrap();
    let code = consent(&url).await;

    // a later redirect replaced the verifier the challenge was derived from
    durable.save(KEY_VERIFIER, json!("not-the-original-verifier")).await.unwrap();

    let err = exchange_code_for_token(&config, &mut durable, &code)
        .await
        .unwrap_err();
    match err {
        AuthError::Server { error, description } => {
            assert_eq!(error, "invalid_grant");
            assert_eq!(description.as_deref(), Some("code_verifier was incorrect"));
        }
        other => panic!("expected a server error, got {other:?}"),
    }
}

#[tokio::test]
async fn exchange_fails_when_redirect_uri_differs() {
    let base = start_stub().await;
    let config = config_for(&base);
    let mut durable = Storage::in_memory();

    let url = redirect_to_authorize(&config, &mut durable).await.unwrap();
    let code = consent(&url).await;

    let other = config.clone().with_redirect_uri("http://localhost:5173/other");
    let err = exchange_code_for_token(&other, &mut durable, &code)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Server { ref error, .. } if error == "invalid_grant"));
}

#[tokio::test]
async fn authorize_exchange_fetch_and_cache_end_to_end() {
    let base = start_stub().await;
    let config = config_for(&base);
    let mut durable = Storage::in_memory();
    let mut session = SessionCache::in_memory();

    // redirect with verifier "V"
    durable.save(KEY_VERIFIER, json!("V")).await.unwrap();
    let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(b"V"));
    let url = build_authorize_url(&config, &challenge).unwrap();
    let code = consent(&url).await;
    assert_eq!(code, CODE);

    let tokens = complete_authorization(&config, &mut durable, &mut session, CODE)
        .await
        .unwrap();
    assert_eq!(tokens.access_token, "tok1");
    assert_eq!(session.access_token().as_deref(), Some("tok1"));

    let outcome = load_dashboard(&config, &mut session, false).await.unwrap();
    let (dashboard, from_cache) = match outcome {
        DashboardOutcome::Ready {
            dashboard,
            from_cache,
        } => (dashboard, from_cache),
        other => panic!("expected a ready dashboard, got {other:?}"),
    };
    assert!(!from_cache);
    assert_eq!(dashboard.profile.unwrap(), profile());

    assert_eq!(session.load(KEY_USER_DATA), Some(profile()));
}

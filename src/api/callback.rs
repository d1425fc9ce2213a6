use std::sync::Arc;

use axum::{Extension, extract::Query, response::Html};
use tokio::sync::Mutex;

use crate::types::{CallbackOutcome, CallbackParams, CallbackState};

/// Receives the redirect from the authorization server.
///
/// Only the first code or denial is recorded; reloads of the callback page
/// cannot replace a code the flow may already be exchanging.
pub async fn callback(
    Query(params): Query<CallbackParams>,
    Extension(shared_state): Extension<Arc<Mutex<CallbackState>>>,
) -> Html<&'static str> {
    let outcome = match (params.code, params.error) {
        (Some(code), _) if !code.is_empty() => CallbackOutcome::Code(code),
        (_, Some(error)) => CallbackOutcome::Denied(error),
        _ => return Html("<h4>Missing authorization code.</h4>"),
    };

    let mut state = shared_state.lock().await;
    if state.outcome.is_some() {
        return Html("<h4>Authorization already received.</h4><p>Close this browser window.</p>");
    }

    let page = match outcome {
        CallbackOutcome::Code(_) => concat!(
            "<h2>Authorization received.</h2>",
            "<p>Close this browser window and return to the terminal.</p>"
        ),
        CallbackOutcome::Denied(_) => "<h4>Authorization was denied.</h4>",
    };
    state.outcome = Some(outcome);
    Html(page)
}

//! OneBot "HTTP" transport: clients POST action requests to `/`.

use std::sync::Arc;

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::{Query, State},
        http::{HeaderMap, StatusCode, header},
        response::{IntoResponse, Response},
        routing::post,
    },
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::warn,
};

use crate::{
    action::{ActionError, ActionRequest, ActionResponse},
    host::OneBotHost,
};

#[derive(Clone)]
struct HttpState {
    host: Arc<OneBotHost>,
    access_token: Option<Arc<Secret<String>>>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

/// Build the action router. An empty `access_token` disables auth.
pub fn action_router(host: Arc<OneBotHost>, access_token: Option<Secret<String>>) -> Router {
    let access_token = access_token
        .filter(|t| !t.expose_secret().is_empty())
        .map(Arc::new);
    Router::new()
        .route("/", post(action_handler))
        .with_state(HttpState { host, access_token })
}

async fn action_handler(
    State(state): State<HttpState>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(expected) = state.access_token.as_deref() {
        let provided = bearer_token(&headers).or(query.access_token.as_deref());
        if !provided.is_some_and(|t| constant_time_eq(t, expected.expose_secret())) {
            warn!("rejected action request with bad access token");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let request: ActionRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ActionResponse::failed(ActionError::bad_request(e), None)),
            )
                .into_response();
        },
    };

    Json(state.host.handle(request).await).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

//! services/web/src/web/middleware.rs
//!
//! Session resolution for every request, the route guard for page routes and
//! the session requirement for API actions.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use edumynt_core::domain::Session;
use edumynt_core::route_guard::{evaluate, sign_in_redirect, GuardDecision, DASHBOARD_PATH};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::session::ClientSession;
use crate::web::state::{AppState, CurrentSession};

/// Reads one cookie out of the `Cookie` header.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            let (key, value) = c.trim().split_once('=')?;
            (key == name).then_some(value)
        })
}

/// Looks up the client behind the cookie and its still-valid session.
/// Any lookup failure reads as signed out.
pub async fn resolve_session(state: &AppState, headers: &HeaderMap) -> CurrentSession {
    let Some(raw_id) = cookie_value(headers, &state.config.cookie_name) else {
        return CurrentSession::default();
    };
    match state.sessions.lookup(raw_id).await {
        Ok(Some(client)) => {
            let session = client.active_session().await;
            CurrentSession {
                client: Some(client),
                session,
            }
        }
        Ok(None) => CurrentSession::default(),
        Err(e) => {
            warn!("Ignoring session cookie: {}", e);
            CurrentSession::default()
        }
    }
}

/// Middleware for page routes: resolves the session once, then lets the
/// request through or redirects it.
pub async fn route_guard(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let current = resolve_session(&state, req.headers()).await;
    let path = req.uri().path().to_string();

    match evaluate(&path, current.is_signed_in()) {
        GuardDecision::Allow => {
            req.extensions_mut().insert(current);
            next.run(req).await
        }
        GuardDecision::Redirect(target) => {
            debug!(%path, %target, "Route guard redirect");
            Redirect::temporary(&target).into_response()
        }
    }
}

//=========================================================================================
// API Session Requirement
//=========================================================================================

/// The resolved client and its active session, for API actions that need one.
#[derive(Clone)]
pub struct SignedIn {
    pub client: Arc<ClientSession>,
    pub session: Session,
}

#[derive(Serialize, ToSchema)]
pub struct UnauthorizedBody {
    pub error: String,
    /// Where the browser should go to sign in.
    pub redirect_to: String,
}

/// The page that issued the request, if it is one of ours.
fn referer_path(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::REFERER)?.to_str().ok()?;
    let url = reqwest::Url::parse(raw).ok()?;
    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }
    Some(path)
}

/// Middleware for API actions that act on behalf of a user. Without a
/// session it answers 401 with a sign-in target that returns to the page
/// that made the call.
pub async fn require_session(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let current = resolve_session(&state, req.headers()).await;
    match (current.client, current.session) {
        (Some(client), Some(session)) => {
            req.extensions_mut().insert(SignedIn { client, session });
            next.run(req).await
        }
        _ => {
            let return_to = referer_path(req.headers()).unwrap_or_else(|| DASHBOARD_PATH.to_string());
            let body = UnauthorizedBody {
                error: "Please sign in to continue.".to_string(),
                redirect_to: sign_in_redirect(&return_to),
            };
            (StatusCode::UNAUTHORIZED, Json(body)).into_response()
        }
    }
}

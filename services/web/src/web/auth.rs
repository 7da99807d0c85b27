//! services/web/src/web/auth.rs
//!
//! Authentication endpoints: sign-up, sign-in, sign-out, password reset and
//! the current-session lookup. Each one validates its form, then goes through
//! the auth façade.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use edumynt_core::route_guard::safe_return_target;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::session::{AuthResponse, ClientSession, UserSummary};
use crate::web::forms::{FieldError, ForgotPasswordForm, SignInForm, SignUpForm};
use crate::web::middleware::resolve_session;
use crate::web::state::AppState;

//=========================================================================================
// Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

#[derive(Serialize, ToSchema)]
pub struct SignInResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Where the browser goes next; only set on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SessionView {
    pub user: Option<UserSummary>,
}

fn invalid(errors: Vec<FieldError>) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(ValidationErrors { errors })).into_response()
}

//=========================================================================================
// Cookie Handling
//=========================================================================================

fn session_cookie(state: &AppState, client_id: &str) -> String {
    let secure = if state.config.site_url.starts_with("https://") {
        "; Secure"
    } else {
        ""
    };
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/{}",
        state.config.cookie_name, client_id, secure
    )
}

fn expired_cookie(state: &AppState) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        state.config.cookie_name
    )
}

/// The caller's existing client slot, or a fresh one. The flag is true for
/// a fresh slot so a failed attempt can discard it.
async fn client_for(state: &AppState, headers: &HeaderMap) -> (Arc<ClientSession>, bool) {
    if let Some(client) = resolve_session(state, headers).await.client {
        return (client, false);
    }
    (state.sessions.open().await, true)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/signup - Create a new account
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignUpForm,
    responses(
        (status = 200, description = "Account created; a session is established unless email confirmation is required"),
        (status = 400, description = "Rejected by the auth backend"),
        (status = 422, description = "Invalid form", body = ValidationErrors)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(form): Json<SignUpForm>,
) -> Response {
    if let Err(errors) = form.validate() {
        return invalid(errors);
    }

    let (client, fresh) = client_for(&state, &headers).await;
    let response = state
        .facade
        .sign_up(&client, form.email.trim(), &form.password, form.full_name.trim())
        .await;

    let signed_in = client.active_session().await.is_some();
    if !signed_in && fresh {
        state.sessions.close(client.id).await;
    }

    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    if signed_in {
        let cookie = session_cookie(&state, &client.id.to_string());
        (status, [(header::SET_COOKIE, cookie)], Json(response)).into_response()
    } else {
        (status, Json(response)).into_response()
    }
}

/// POST /api/auth/signin - Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/signin",
    request_body = SignInForm,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Credentials rejected", body = SignInResponse),
        (status = 422, description = "Invalid form", body = ValidationErrors)
    )
)]
pub async fn signin_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(form): Json<SignInForm>,
) -> Response {
    if let Err(errors) = form.validate() {
        return invalid(errors);
    }

    let (client, fresh) = client_for(&state, &headers).await;
    let AuthResponse { success, data, error } = state
        .facade
        .sign_in(&client, form.email.trim(), &form.password)
        .await;

    if !success {
        if fresh {
            state.sessions.close(client.id).await;
        }
        let body = SignInResponse {
            success,
            data,
            error,
            redirect_to: None,
        };
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    }

    let body = SignInResponse {
        success,
        data,
        error,
        redirect_to: Some(safe_return_target(form.redirect_to.as_deref())),
    };
    let cookie = session_cookie(&state, &client.id.to_string());
    (StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(body)).into_response()
}

/// POST /api/auth/signout - End the current session
#[utoipa::path(
    post,
    path = "/api/auth/signout",
    responses(
        (status = 200, description = "Signed out; the client cookie is cleared")
    )
)]
pub async fn signout_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let response = match resolve_session(&state, &headers).await.client {
        Some(client) => {
            let response = state.facade.sign_out(&client).await;
            state.sessions.close(client.id).await;
            response
        }
        // no client slot means nothing to sign out of
        None => AuthResponse::<()>::done(),
    };
    (
        StatusCode::OK,
        [(header::SET_COOKIE, expired_cookie(&state))],
        Json(response),
    )
        .into_response()
}

/// POST /api/auth/forgot-password - Request a password-reset email
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordForm,
    responses(
        (status = 200, description = "Reset email requested"),
        (status = 400, description = "Rejected by the auth backend"),
        (status = 422, description = "Invalid form", body = ValidationErrors)
    )
)]
pub async fn forgot_password_handler(
    State(state): State<Arc<AppState>>,
    Json(form): Json<ForgotPasswordForm>,
) -> Response {
    if let Err(errors) = form.validate() {
        return invalid(errors);
    }
    let response = state.facade.reset_password(form.email.trim()).await;
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(response)).into_response()
}

/// GET /api/auth/session - The signed-in user, if any
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Current user or null", body = SessionView)
    )
)]
pub async fn session_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<SessionView> {
    let user = resolve_session(&state, &headers)
        .await
        .session
        .map(|s| UserSummary::from(&s.user));
    Json(SessionView { user })
}

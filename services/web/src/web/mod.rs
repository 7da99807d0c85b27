pub mod auth;
pub mod forms;
pub mod middleware;
pub mod pages;
pub mod rest;
pub mod state;


use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

pub use middleware::{require_session, route_guard};
pub use state::AppState;

/// Builds every route of the service. Page routes sit behind the route
/// guard; API actions that act for a user sit behind the session check;
/// the auth actions are open.
pub fn router(state: Arc<AppState>) -> Router {
    let pages = Router::new()
        .route("/", get(pages::home_page))
        .route("/auth/signin", get(pages::signin_page))
        .route("/auth/signup", get(pages::signup_page))
        .route("/auth/forgot-password", get(pages::forgot_password_page))
        .route("/courses", get(pages::courses_page))
        .route("/course/{id}", get(pages::course_page))
        .route("/lesson/{id}", get(pages::lesson_page))
        .route("/lesson/{id}/preview", get(pages::lesson_page))
        .route("/dashboard", get(pages::dashboard_page))
        .route("/settings", get(pages::settings_page))
        .route(pages::NOT_FOUND_PATH, get(pages::not_found_page))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), route_guard));

    let open_api = Router::new()
        .route("/api/auth/signup", post(auth::signup_handler))
        .route("/api/auth/signin", post(auth::signin_handler))
        .route("/api/auth/signout", post(auth::signout_handler))
        .route("/api/auth/forgot-password", post(auth::forgot_password_handler))
        .route("/api/auth/session", get(auth::session_handler))
        .route("/api/courses/{id}/start", get(rest::start_course_handler));

    let session_api = Router::new()
        .route("/api/courses/{id}/enroll", post(rest::enroll_handler))
        .route("/api/courses/{id}/progress", get(rest::course_progress_handler))
        .route("/api/lessons/{id}/progress", put(rest::update_progress_handler))
        .route("/api/lessons/{id}/complete", post(rest::complete_lesson_handler))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(pages)
        .merge(open_api)
        .merge(session_api)
        .with_state(state)
}

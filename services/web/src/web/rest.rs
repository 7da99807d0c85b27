//! services/web/src/web/rest.rs
//!
//! Contains the Axum handlers for the course and progress API actions and the
//! master definition for the OpenAPI specification.

use crate::session::{SignUpData, UserSummary};
use crate::web::auth::{SessionView, SignInResponse, ValidationErrors};
use crate::web::forms::{FieldError, ForgotPasswordForm, SignInForm, SignUpForm};
use crate::web::middleware::{SignedIn, UnauthorizedBody};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::{DateTime, Utc};
use edumynt_core::access::check_lesson_access;
use edumynt_core::domain::LessonProgress;
use edumynt_core::enrollment::{enroll, post_enroll_target, EnrollOutcome};
use edumynt_core::ports::PortError;
use edumynt_core::progress::{mark_lesson_completed, update_lesson_progress, ProgressUpdate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::signin_handler,
        crate::web::auth::signout_handler,
        crate::web::auth::forgot_password_handler,
        crate::web::auth::session_handler,
        enroll_handler,
        start_course_handler,
        course_progress_handler,
        update_progress_handler,
        complete_lesson_handler,
    ),
    components(
        schemas(
            SignUpForm, SignInForm, ForgotPasswordForm, FieldError, ValidationErrors,
            SignInResponse, SessionView, UserSummary, SignUpData, UnauthorizedBody,
            EnrollResponse, NavigationResponse, LessonProgressView, ProgressRequest,
            ActionError
        )
    ),
    tags(
        (name = "Edumynt API", description = "Auth, enrollment and progress actions behind the Edumynt pages.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct EnrollResponse {
    pub success: bool,
    /// True when the user was enrolled before this call.
    pub already_enrolled: bool,
    pub redirect_to: String,
}

#[derive(Serialize, ToSchema)]
pub struct ActionError {
    pub success: bool,
    pub error: String,
}

#[derive(Serialize, ToSchema)]
pub struct NavigationResponse {
    pub redirect_to: String,
}

#[derive(Serialize, ToSchema)]
pub struct LessonProgressView {
    pub lesson_id: Uuid,
    pub progress: u8,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<LessonProgress> for LessonProgressView {
    fn from(row: LessonProgress) -> Self {
        Self {
            lesson_id: row.lesson_id,
            progress: row.progress.value(),
            completed_at: row.completed_at,
        }
    }
}

impl LessonProgressView {
    fn written(lesson_id: Uuid, update: ProgressUpdate) -> Self {
        Self {
            lesson_id,
            progress: update.progress.value(),
            completed_at: update.completed_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ProgressRequest {
    /// Any integer; stored clamped into 0..=100.
    pub progress: i64,
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ActionError {
            success: false,
            error: message.into(),
        }),
    )
        .into_response()
}

fn port_failure(context: &str, e: PortError) -> Response {
    match e {
        PortError::NotFound(what) => failure(StatusCode::NOT_FOUND, format!("Not found: {}", what)),
        PortError::Unauthorized => failure(StatusCode::FORBIDDEN, "Not allowed"),
        e => {
            error!("{}: {}", context, e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong. Please try again.")
        }
    }
}

fn parse_path_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| failure(StatusCode::NOT_FOUND, format!("Not found: {}", raw)))
}

//=========================================================================================
// Course Actions
//=========================================================================================

/// Enroll the signed-in user in a course. Enrolling twice is not an error.
#[utoipa::path(
    post,
    path = "/api/courses/{id}/enroll",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Enrolled (or already enrolled)", body = EnrollResponse),
        (status = 401, description = "No session", body = UnauthorizedBody),
        (status = 404, description = "Unknown course", body = ActionError),
        (status = 500, description = "Store failure", body = ActionError)
    )
)]
pub async fn enroll_handler(
    State(state): State<Arc<AppState>>,
    Extension(signed_in): Extension<SignedIn>,
    Path(raw_id): Path<String>,
) -> Response {
    let course_id = match parse_path_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let user_id = signed_in.session.user.id;

    match enroll(state.store.as_ref(), user_id, course_id).await {
        Ok(outcome) => {
            let already_enrolled = outcome == EnrollOutcome::AlreadyEnrolled;
            info!(%user_id, %course_id, already_enrolled, "Enrollment requested");
            Json(EnrollResponse {
                success: true,
                already_enrolled,
                redirect_to: post_enroll_target(course_id),
            })
            .into_response()
        }
        Err(e) => port_failure("Error enrolling in course", e),
    }
}

/// Where "Start Learning" goes: the first lesson, or the course page when
/// the course has no lessons.
#[utoipa::path(
    get,
    path = "/api/courses/{id}/start",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Navigation target", body = NavigationResponse)
    )
)]
pub async fn start_course_handler(State(state): State<Arc<AppState>>, Path(raw_id): Path<String>) -> Response {
    let course_id = match parse_path_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let first = state.store.first_lesson_id(course_id).await.unwrap_or_else(|e| {
        error!("Error fetching first lesson of {}: {}", course_id, e);
        None
    });
    let redirect_to = match first {
        Some(lesson_id) => format!("/lesson/{}", lesson_id),
        None => format!("/course/{}", course_id),
    };
    Json(NavigationResponse { redirect_to }).into_response()
}

/// The signed-in user's lesson progress within a course.
#[utoipa::path(
    get,
    path = "/api/courses/{id}/progress",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Progress rows", body = [LessonProgressView]),
        (status = 401, description = "No session", body = UnauthorizedBody)
    )
)]
pub async fn course_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(signed_in): Extension<SignedIn>,
    Path(raw_id): Path<String>,
) -> Response {
    let course_id = match parse_path_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state
        .store
        .lesson_progress_for_course(signed_in.session.user.id, course_id)
        .await
    {
        Ok(rows) => {
            let views: Vec<LessonProgressView> = rows.into_iter().map(Into::into).collect();
            Json(views).into_response()
        }
        Err(e) => port_failure("Error fetching lesson progress", e),
    }
}

//=========================================================================================
// Lesson Progress
//=========================================================================================

/// Progress is only written for lessons the user can open.
async fn ensure_lesson_access(state: &AppState, signed_in: &SignedIn, lesson_id: Uuid) -> Result<(), Response> {
    let lesson = state
        .store
        .get_lesson(lesson_id)
        .await
        .map_err(|e| port_failure("Error fetching lesson", e))?;
    let access = check_lesson_access(state.store.as_ref(), &lesson, Some(signed_in.session.user.id))
        .await
        .map_err(|e| port_failure("Error checking lesson access", e))?;
    if access.is_granted() {
        Ok(())
    } else {
        Err(failure(
            StatusCode::FORBIDDEN,
            "You need to enroll in this course to access this lesson.",
        ))
    }
}

#[utoipa::path(
    put,
    path = "/api/lessons/{id}/progress",
    params(("id" = Uuid, Path, description = "Lesson id")),
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Stored progress", body = LessonProgressView),
        (status = 401, description = "No session", body = UnauthorizedBody),
        (status = 403, description = "Lesson locked", body = ActionError),
        (status = 404, description = "Unknown lesson", body = ActionError)
    )
)]
pub async fn update_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(signed_in): Extension<SignedIn>,
    Path(raw_id): Path<String>,
    Json(body): Json<ProgressRequest>,
) -> Response {
    let lesson_id = match parse_path_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if let Err(response) = ensure_lesson_access(&state, &signed_in, lesson_id).await {
        return response;
    }
    match update_lesson_progress(state.store.as_ref(), signed_in.session.user.id, lesson_id, body.progress).await {
        Ok(update) => Json(LessonProgressView::written(lesson_id, update)).into_response(),
        Err(e) => port_failure("Error updating lesson progress", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/lessons/{id}/complete",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Lesson marked complete", body = LessonProgressView),
        (status = 401, description = "No session", body = UnauthorizedBody),
        (status = 403, description = "Lesson locked", body = ActionError),
        (status = 404, description = "Unknown lesson", body = ActionError)
    )
)]
pub async fn complete_lesson_handler(
    State(state): State<Arc<AppState>>,
    Extension(signed_in): Extension<SignedIn>,
    Path(raw_id): Path<String>,
) -> Response {
    let lesson_id = match parse_path_id(&raw_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if let Err(response) = ensure_lesson_access(&state, &signed_in, lesson_id).await {
        return response;
    }
    match mark_lesson_completed(state.store.as_ref(), signed_in.session.user.id, lesson_id).await {
        Ok(update) => {
            info!(user_id = %signed_in.session.user.id, %lesson_id, "Lesson completed");
            Json(LessonProgressView::written(lesson_id, update)).into_response()
        }
        Err(e) => port_failure("Error marking lesson complete", e),
    }
}

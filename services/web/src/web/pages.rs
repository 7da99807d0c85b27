//! services/web/src/web/pages.rs
//!
//! Page routes. Each handler answers `GET` with the view model the browser
//! renders. They sit behind the route guard, which has already resolved the
//! session into a `CurrentSession` extension.
//!
//! A failed fetch never fails the page: it is logged and the view degrades
//! to its empty state, or to the not-found page for a missing entity.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use edumynt_core::access::{check_lesson_access, Access};
use edumynt_core::catalog::{group_by_subject, DashboardTab, EnrollmentIndex, LearningStats, SubjectGroup};
use edumynt_core::domain::{Course, CourseWithLessons, Enrollment, Lesson, LessonProgress, Progress};
use edumynt_core::ports::PortError;
use edumynt_core::route_guard::{safe_return_target, sign_in_redirect, DASHBOARD_PATH};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::session::UserSummary;
use crate::web::state::{AppState, CurrentSession};

pub const NOT_FOUND_PATH: &str = "/404";

/// A navigation target offered by a view.
#[derive(Debug, Serialize)]
pub struct Action {
    pub label: &'static str,
    pub href: String,
}

impl Action {
    fn new(label: &'static str, href: impl Into<String>) -> Self {
        Self {
            label,
            href: href.into(),
        }
    }
}

fn not_found() -> Response {
    Redirect::temporary(NOT_FOUND_PATH).into_response()
}

/// Logs a fetch failure unless it is a plain miss.
fn log_fetch_error(what: &str, id: Uuid, e: &PortError) {
    match e {
        PortError::NotFound(_) => warn!("{} {} not found", what, id),
        _ => error!("Failed to fetch {} {}: {}", what, id, e),
    }
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

//=========================================================================================
// Home and Auth Pages
//=========================================================================================

#[derive(Serialize)]
pub struct HomeView {
    pub signed_in: bool,
    pub display_name: Option<String>,
    pub call_to_action: Action,
}

pub async fn home_page(Extension(current): Extension<CurrentSession>) -> Json<HomeView> {
    let call_to_action = if current.is_signed_in() {
        Action::new("Go to Dashboard", DASHBOARD_PATH)
    } else {
        Action::new("Get Started", "/auth/signup")
    };
    Json(HomeView {
        signed_in: current.is_signed_in(),
        display_name: current.user().map(|u| u.display_name().to_string()),
        call_to_action,
    })
}

#[derive(Serialize)]
pub struct AuthPageView {
    pub page: &'static str,
    pub submit_to: &'static str,
    pub fields: &'static [&'static str],
    /// Carried into the sign-in form so the user lands back where they started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    pub links: Vec<Action>,
}

#[derive(Deserialize)]
pub struct AuthPageQuery {
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

pub async fn signin_page(Query(query): Query<AuthPageQuery>) -> Json<AuthPageView> {
    let redirect_to = query
        .redirect_to
        .as_deref()
        .map(|target| safe_return_target(Some(target)));
    Json(AuthPageView {
        page: "signin",
        submit_to: "/api/auth/signin",
        fields: &["email", "password"],
        redirect_to,
        links: vec![
            Action::new("Forgot password?", "/auth/forgot-password"),
            Action::new("Create an account", "/auth/signup"),
        ],
    })
}

pub async fn signup_page() -> Json<AuthPageView> {
    Json(AuthPageView {
        page: "signup",
        submit_to: "/api/auth/signup",
        fields: &["full_name", "email", "password", "confirm_password"],
        redirect_to: None,
        links: vec![Action::new("Already have an account? Sign in", "/auth/signin")],
    })
}

pub async fn forgot_password_page() -> Json<AuthPageView> {
    Json(AuthPageView {
        page: "forgot-password",
        submit_to: "/api/auth/forgot-password",
        fields: &["email"],
        redirect_to: None,
        links: vec![Action::new("Back to sign in", "/auth/signin")],
    })
}

//=========================================================================================
// Course List
//=========================================================================================

#[derive(Serialize)]
pub struct CourseListView {
    pub subjects: Vec<SubjectGroup>,
    /// The subject shown first: the first course's subject.
    pub active_subject: Option<String>,
    pub is_empty: bool,
}

pub async fn courses_page(State(state): State<Arc<AppState>>) -> Json<CourseListView> {
    let courses = state.store.list_published_courses().await.unwrap_or_else(|e| {
        error!("Failed to fetch courses: {}", e);
        Vec::new()
    });
    let subjects = group_by_subject(&courses);
    Json(CourseListView {
        active_subject: subjects.first().map(|g| g.subject.clone()),
        is_empty: subjects.is_empty(),
        subjects,
    })
}

//=========================================================================================
// Course Detail
//=========================================================================================

#[derive(Serialize)]
pub struct CourseDetailView {
    pub course: Course,
    pub lessons: Vec<Lesson>,
    pub preview_lessons: Vec<Lesson>,
    pub lesson_count: usize,
    pub total_duration: i32,
    pub is_enrolled: bool,
    /// The viewer's per-lesson progress, only for enrolled viewers.
    pub lesson_progress: Vec<LessonProgress>,
    pub primary_action: Action,
}

pub async fn course_page(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(course_id) = parse_id(&raw_id) else {
        return not_found();
    };

    let course = match state.store.get_course(course_id).await {
        Ok(course) => course,
        Err(e) => {
            log_fetch_error("course", course_id, &e);
            return not_found();
        }
    };
    let lessons = match state.store.list_lessons(course_id, false).await {
        Ok(lessons) => lessons,
        Err(e) => {
            error!("Failed to fetch lessons for course {}: {}", course_id, e);
            Vec::new()
        }
    };
    let detail = match CourseWithLessons::new(course, lessons) {
        Ok(detail) => detail,
        Err(e) => {
            error!("Course {} has inconsistent lessons: {}", course_id, e);
            return not_found();
        }
    };

    // Enrollment is looked up only for signed-in viewers.
    let is_enrolled = match current.user() {
        Some(user) => state
            .store
            .enrollment_exists(user.id, course_id)
            .await
            .unwrap_or_else(|e| {
                error!("Failed to check enrollment in {}: {}", course_id, e);
                false
            }),
        None => false,
    };
    let lesson_progress = match current.user() {
        Some(user) if is_enrolled => state
            .store
            .lesson_progress_for_course(user.id, course_id)
            .await
            .unwrap_or_else(|e| {
                error!("Failed to fetch lesson progress for {}: {}", course_id, e);
                Vec::new()
            }),
        _ => Vec::new(),
    };

    let primary_action = if is_enrolled {
        Action::new("Start Learning", format!("/api/courses/{}/start", course_id))
    } else {
        Action::new("Enroll Now", format!("/api/courses/{}/enroll", course_id))
    };

    let preview_lessons = detail.preview_lessons().cloned().collect();
    Json(CourseDetailView {
        lesson_count: detail.lessons.len(),
        total_duration: detail.total_duration(),
        preview_lessons,
        course: detail.course,
        lessons: detail.lessons,
        is_enrolled,
        lesson_progress,
        primary_action,
    })
    .into_response()
}

//=========================================================================================
// Lesson Viewer
//=========================================================================================

#[derive(Serialize)]
pub struct LessonView {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub order_index: i32,
    pub estimated_duration: i32,
    pub is_preview: bool,
    pub has_access: bool,
    pub access: &'static str,
    /// Only present when the viewer has access.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub previous_lesson: Option<Uuid>,
    pub next_lesson: Option<Uuid>,
    pub actions: Vec<Action>,
}

fn access_label(access: Access) -> &'static str {
    match access {
        Access::Preview => "preview",
        Access::Enrolled => "enrolled",
        Access::SignInRequired => "sign_in_required",
        Access::EnrollmentRequired => "enrollment_required",
    }
}

/// Neighbouring lessons by order index.
fn neighbours(lessons: &[Lesson], lesson_id: Uuid) -> (Option<Uuid>, Option<Uuid>) {
    let Some(pos) = lessons.iter().position(|l| l.id == lesson_id) else {
        return (None, None);
    };
    let previous = pos.checked_sub(1).and_then(|i| lessons.get(i)).map(|l| l.id);
    let next = lessons.get(pos + 1).map(|l| l.id);
    (previous, next)
}

pub async fn lesson_page(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(lesson_id) = parse_id(&raw_id) else {
        return not_found();
    };
    let lesson = match state.store.get_lesson(lesson_id).await {
        Ok(lesson) => lesson,
        Err(e) => {
            log_fetch_error("lesson", lesson_id, &e);
            return not_found();
        }
    };

    let user_id = current.user().map(|u| u.id);
    let access = check_lesson_access(state.store.as_ref(), &lesson, user_id)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to check access to lesson {}: {}", lesson_id, e);
            Access::EnrollmentRequired
        });
    let course_href = format!("/course/{}", lesson.course_id);

    let mut actions = Vec::new();
    let (mut previous_lesson, mut next_lesson) = (None, None);
    if access.is_granted() {
        match state.store.list_lessons(lesson.course_id, false).await {
            Ok(siblings) => (previous_lesson, next_lesson) = neighbours(&siblings, lesson.id),
            Err(e) => warn!("Lesson navigation unavailable for {}: {}", lesson_id, e),
        }
        if user_id.is_none() {
            actions.push(Action::new("Sign Up Free", "/auth/signup"));
            actions.push(Action::new("View Course", course_href));
        }
    } else {
        actions.push(Action::new("View Course Details", course_href));
        actions.push(Action::new("Browse All Courses", "/dashboard?tab=courses"));
    }

    let granted = access.is_granted();
    Json(LessonView {
        id: lesson.id,
        course_id: lesson.course_id,
        title: lesson.title,
        order_index: lesson.order_index,
        estimated_duration: lesson.estimated_duration,
        is_preview: lesson.is_preview,
        has_access: granted,
        access: access_label(access),
        content: lesson.content.filter(|_| granted),
        video_url: lesson.video_url.filter(|_| granted),
        previous_lesson,
        next_lesson,
        actions,
    })
    .into_response()
}

//=========================================================================================
// Dashboard
//=========================================================================================

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub tab: Option<String>,
    /// Set after enrolling, to highlight the new course.
    pub course: Option<String>,
}

#[derive(Serialize)]
pub struct CatalogEntry {
    pub course: Course,
    pub is_enrolled: bool,
    pub progress: Progress,
}

#[derive(Serialize)]
pub struct Placeholder {
    pub title: &'static str,
    pub message: &'static str,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DashboardContent {
    Home {
        enrolled_courses: Vec<Enrollment>,
        stats: LearningStats,
    },
    Courses {
        subjects: Vec<String>,
        courses: Vec<CatalogEntry>,
        highlighted_course: Option<Uuid>,
    },
    Tests(Placeholder),
    Discuss(Placeholder),
    Profile {
        user: UserSummary,
        sign_out: &'static str,
    },
}

#[derive(Serialize)]
pub struct DashboardView {
    pub tab: DashboardTab,
    pub tabs: [DashboardTab; 5],
    pub user: UserSummary,
    pub content: DashboardContent,
}

pub async fn dashboard_page(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentSession>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let Some(user) = current.user() else {
        return Redirect::temporary(&sign_in_redirect(DASHBOARD_PATH)).into_response();
    };
    let tab = DashboardTab::from_query(query.tab.as_deref());

    // Both fetches must resolve before the view is built.
    let (courses, enrollments) = tokio::join!(
        state.store.list_published_courses(),
        state.store.list_enrollments(user.id)
    );
    let courses = courses.unwrap_or_else(|e| {
        error!("Failed to fetch courses: {}", e);
        Vec::new()
    });
    let enrollments = enrollments.unwrap_or_else(|e| {
        error!("Failed to fetch enrollments for {}: {}", user.id, e);
        Vec::new()
    });

    let content = match tab {
        DashboardTab::Home => DashboardContent::Home {
            stats: LearningStats::from_enrollments(&enrollments),
            enrolled_courses: enrollments,
        },
        DashboardTab::Courses => {
            let index = EnrollmentIndex::new(&enrollments);
            let subjects = group_by_subject(&courses).into_iter().map(|g| g.subject).collect();
            let entries = courses
                .into_iter()
                .map(|course| CatalogEntry {
                    is_enrolled: index.is_enrolled(course.id),
                    progress: index.progress_for(course.id),
                    course,
                })
                .collect();
            DashboardContent::Courses {
                subjects,
                courses: entries,
                highlighted_course: query.course.as_deref().and_then(parse_id),
            }
        }
        DashboardTab::Tests => DashboardContent::Tests(Placeholder {
            title: "Practice Tests",
            message: "Mock tests for your enrolled courses will appear here.",
        }),
        DashboardTab::Discuss => DashboardContent::Discuss(Placeholder {
            title: "Discussions",
            message: "Ask questions and join conversations with other learners.",
        }),
        DashboardTab::Profile => DashboardContent::Profile {
            user: UserSummary::from(user),
            sign_out: "/api/auth/signout",
        },
    };

    Json(DashboardView {
        tab,
        tabs: DashboardTab::ALL,
        user: UserSummary::from(user),
        content,
    })
    .into_response()
}

//=========================================================================================
// Settings and Not Found
//=========================================================================================

#[derive(Serialize)]
pub struct NotificationSettings {
    pub push: bool,
    pub email: bool,
}

#[derive(Serialize)]
pub struct SettingsView {
    pub themes: [&'static str; 3],
    pub notifications: NotificationSettings,
    pub account: [&'static str; 3],
    pub sign_out: Option<&'static str>,
}

pub async fn settings_page(Extension(current): Extension<CurrentSession>) -> Json<SettingsView> {
    Json(SettingsView {
        themes: ["light", "dark", "system"],
        notifications: NotificationSettings {
            push: false,
            email: false,
        },
        account: ["Profile Settings", "Privacy & Security", "Help & Support"],
        sign_out: current.is_signed_in().then_some("/api/auth/signout"),
    })
}

#[derive(Serialize)]
pub struct NotFoundView {
    pub message: &'static str,
    pub actions: Vec<Action>,
}

pub async fn not_found_page() -> (StatusCode, Json<NotFoundView>) {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundView {
            message: "The page you're looking for doesn't exist or has been removed.",
            actions: vec![
                Action::new("Browse Courses", "/dashboard?tab=courses"),
                Action::new("Home", "/"),
            ],
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn lesson(order_index: i32) -> Lesson {
        Lesson {
            id: Uuid::from_u128(order_index as u128 + 1),
            course_id: Uuid::from_u128(0xc0),
            title: format!("Lesson {}", order_index),
            content: None,
            video_url: None,
            order_index,
            is_preview: false,
            estimated_duration: 10,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn neighbours_follow_order() {
        let lessons = vec![lesson(0), lesson(1), lesson(2)];
        assert_eq!(neighbours(&lessons, lessons[0].id), (None, Some(lessons[1].id)));
        assert_eq!(
            neighbours(&lessons, lessons[1].id),
            (Some(lessons[0].id), Some(lessons[2].id))
        );
        assert_eq!(neighbours(&lessons, lessons[2].id), (Some(lessons[1].id), None));
        assert_eq!(neighbours(&lessons, Uuid::nil()), (None, None));
    }
}

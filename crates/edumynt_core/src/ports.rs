//! crates/edumynt_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! The hosted backend is reached only through these traits, so the core
//! never depends on a particular database driver or HTTP client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Course, Enrollment, Lesson, LessonProgress, Progress, Session, User};

//=========================================================================================
// Error and Result Types
//=========================================================================================

/// A stored record did not have the shape the domain requires.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not decode {field}: {reason}")]
pub struct DecodeError {
    pub field: &'static str,
    pub reason: String,
}

impl DecodeError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// A generic error type for all data-store operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Errors from the hosted auth service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The service answered with an error message (e.g. "Invalid login credentials").
    #[error("{0}")]
    Rejected(String),
    /// The request never produced a usable answer.
    #[error("auth transport error: {0}")]
    Transport(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Typed access to the `courses`, `lessons`, `user_course_enrollments`
/// and `user_lesson_progress` tables. One method per table operation.
#[async_trait]
pub trait CourseStore: Send + Sync {
    // --- Catalog ---
    /// Published courses, newest first.
    async fn list_published_courses(&self) -> PortResult<Vec<Course>>;

    async fn get_course(&self, course_id: Uuid) -> PortResult<Course>;

    /// Lessons of a course in ascending `order_index`, optionally previews only.
    async fn list_lessons(&self, course_id: Uuid, preview_only: bool) -> PortResult<Vec<Lesson>>;

    async fn get_lesson(&self, lesson_id: Uuid) -> PortResult<Lesson>;

    async fn first_lesson_id(&self, course_id: Uuid) -> PortResult<Option<Uuid>>;

    // --- Enrollments ---
    async fn enrollment_exists(&self, user_id: Uuid, course_id: Uuid) -> PortResult<bool>;

    /// Inserts an enrollment with progress 0. A second insert for the same
    /// pair fails with [`PortError::Conflict`].
    async fn create_enrollment(&self, user_id: Uuid, course_id: Uuid) -> PortResult<Enrollment>;

    /// The user's enrollments joined with their course, newest first.
    async fn list_enrollments(&self, user_id: Uuid) -> PortResult<Vec<Enrollment>>;

    // --- Lesson progress ---
    async fn lesson_progress_for_course(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> PortResult<Vec<LessonProgress>>;

    /// Inserts or replaces the row keyed by (user, lesson).
    async fn upsert_lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        progress: Progress,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()>;
}

/// What a sign-up returns: the new user, plus a session unless the backend
/// requires email confirmation first.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: User,
    pub session: Option<Session>,
}

/// The hosted email/password auth service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> AuthResult<SignUpOutcome>;

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Session>;

    async fn sign_out(&self, access_token: &str) -> AuthResult<()>;

    /// Requests a password-reset email whose link lands on `redirect_to`.
    async fn reset_password(&self, email: &str, redirect_to: &str) -> AuthResult<()>;

    async fn refresh(&self, refresh_token: &str) -> AuthResult<Session>;
}

//! services/web/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `CourseStore` port from the `core` crate. It reads and writes the hosted
//! backend's PostgreSQL tables using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edumynt_core::domain::{Course, Enrollment, Lesson, LessonProgress, Progress};
use edumynt_core::ports::{CourseStore, DecodeError, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `CourseStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Inserts a course unless one with the same id exists. Returns whether a row was written.
    pub async fn insert_course(&self, course: &Course) -> PortResult<bool> {
        let result = sqlx::query(
            "INSERT INTO courses (id, title, description, subject, thumbnail_url, is_published, is_free, price, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) ON CONFLICT (id) DO NOTHING",
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.subject)
        .bind(&course.thumbnail_url)
        .bind(course.is_published)
        .bind(course.is_free)
        .bind(course.price)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    /// Inserts a lesson unless its id or its (course, order index) slot is taken.
    pub async fn insert_lesson(&self, lesson: &Lesson) -> PortResult<bool> {
        let result = sqlx::query(
            "INSERT INTO lessons (id, course_id, title, content, video_url, order_index, is_preview, estimated_duration, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) ON CONFLICT DO NOTHING",
        )
        .bind(lesson.id)
        .bind(lesson.course_id)
        .bind(&lesson.title)
        .bind(&lesson.content)
        .bind(&lesson.video_url)
        .bind(lesson.order_index)
        .bind(lesson.is_preview)
        .bind(lesson.estimated_duration)
        .bind(lesson.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what()),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// Database Record Structs and their decode step
//=========================================================================================

const COURSE_COLUMNS: &str =
    "id, title, description, subject, thumbnail_url, is_published, is_free, price, created_at, updated_at";
const LESSON_COLUMNS: &str =
    "id, course_id, title, content, video_url, order_index, is_preview, estimated_duration, created_at";

#[derive(FromRow)]
struct CourseRecord {
    id: Uuid,
    title: String,
    description: Option<String>,
    subject: String,
    thumbnail_url: Option<String>,
    is_published: bool,
    is_free: bool,
    price: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CourseRecord> for Course {
    type Error = DecodeError;

    fn try_from(r: CourseRecord) -> Result<Self, Self::Error> {
        if r.title.trim().is_empty() {
            return Err(DecodeError::new("courses.title", format!("empty title on {}", r.id)));
        }
        if r.subject.trim().is_empty() {
            return Err(DecodeError::new("courses.subject", format!("empty subject on {}", r.id)));
        }
        if !r.price.is_finite() || r.price < 0.0 {
            return Err(DecodeError::new("courses.price", format!("{} on {}", r.price, r.id)));
        }
        Ok(Course {
            id: r.id,
            title: r.title,
            description: r.description,
            subject: r.subject,
            thumbnail_url: r.thumbnail_url,
            is_published: r.is_published,
            is_free: r.is_free,
            price: r.price,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(FromRow)]
struct LessonRecord {
    id: Uuid,
    course_id: Uuid,
    title: String,
    content: Option<String>,
    video_url: Option<String>,
    order_index: i32,
    is_preview: bool,
    estimated_duration: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<LessonRecord> for Lesson {
    type Error = DecodeError;

    fn try_from(r: LessonRecord) -> Result<Self, Self::Error> {
        if r.order_index < 0 {
            return Err(DecodeError::new(
                "lessons.order_index",
                format!("negative index {} on {}", r.order_index, r.id),
            ));
        }
        if r.estimated_duration < 0 {
            return Err(DecodeError::new(
                "lessons.estimated_duration",
                format!("negative duration on {}", r.id),
            ));
        }
        Ok(Lesson {
            id: r.id,
            course_id: r.course_id,
            title: r.title,
            content: r.content,
            video_url: r.video_url,
            order_index: r.order_index,
            is_preview: r.is_preview,
            estimated_duration: r.estimated_duration,
            created_at: r.created_at,
        })
    }
}

#[derive(FromRow)]
struct EnrollmentRecord {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    enrolled_at: DateTime<Utc>,
    progress: i32,
}

impl TryFrom<EnrollmentRecord> for Enrollment {
    type Error = DecodeError;

    fn try_from(r: EnrollmentRecord) -> Result<Self, Self::Error> {
        Ok(Enrollment {
            id: r.id,
            user_id: r.user_id,
            course_id: r.course_id,
            enrolled_at: r.enrolled_at,
            progress: Progress::try_from_stored(r.progress)?,
            course: None,
        })
    }
}

/// An enrollment row joined with its course; course columns carry a `c_` prefix.
#[derive(FromRow)]
struct EnrollmentWithCourseRecord {
    #[sqlx(flatten)]
    enrollment: EnrollmentRecord,
    c_id: Uuid,
    c_title: String,
    c_description: Option<String>,
    c_subject: String,
    c_thumbnail_url: Option<String>,
    c_is_published: bool,
    c_is_free: bool,
    c_price: f64,
    c_created_at: DateTime<Utc>,
    c_updated_at: DateTime<Utc>,
}

impl TryFrom<EnrollmentWithCourseRecord> for Enrollment {
    type Error = DecodeError;

    fn try_from(r: EnrollmentWithCourseRecord) -> Result<Self, Self::Error> {
        let course = Course::try_from(CourseRecord {
            id: r.c_id,
            title: r.c_title,
            description: r.c_description,
            subject: r.c_subject,
            thumbnail_url: r.c_thumbnail_url,
            is_published: r.c_is_published,
            is_free: r.c_is_free,
            price: r.c_price,
            created_at: r.c_created_at,
            updated_at: r.c_updated_at,
        })?;
        let mut enrollment = Enrollment::try_from(r.enrollment)?;
        enrollment.course = Some(course);
        Ok(enrollment)
    }
}

#[derive(FromRow)]
struct LessonProgressRecord {
    id: Uuid,
    user_id: Uuid,
    lesson_id: Uuid,
    progress: i32,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<LessonProgressRecord> for LessonProgress {
    type Error = DecodeError;

    fn try_from(r: LessonProgressRecord) -> Result<Self, Self::Error> {
        let progress = Progress::try_from_stored(r.progress)?;
        if r.completed_at.is_some() && !progress.is_complete() {
            return Err(DecodeError::new(
                "user_lesson_progress.completed_at",
                format!("completion stamped at {}% on {}", progress.value(), r.id),
            ));
        }
        Ok(LessonProgress {
            id: r.id,
            user_id: r.user_id,
            lesson_id: r.lesson_id,
            progress,
            completed_at: r.completed_at,
        })
    }
}

fn decode_all<R, T>(records: Vec<R>) -> PortResult<Vec<T>>
where
    T: TryFrom<R, Error = DecodeError>,
{
    records
        .into_iter()
        .map(|r| T::try_from(r).map_err(PortError::from))
        .collect()
}

//=========================================================================================
// `CourseStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CourseStore for DbAdapter {
    async fn list_published_courses(&self) -> PortResult<Vec<Course>> {
        let sql = format!(
            "SELECT {} FROM courses WHERE is_published = TRUE ORDER BY created_at DESC",
            COURSE_COLUMNS
        );
        let records = sqlx::query_as::<_, CourseRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        decode_all(records)
    }

    async fn get_course(&self, course_id: Uuid) -> PortResult<Course> {
        let sql = format!("SELECT {} FROM courses WHERE id = $1", COURSE_COLUMNS);
        let record = sqlx::query_as::<_, CourseRecord>(&sql)
            .bind(course_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, || format!("Course {} not found", course_id)))?;
        Ok(Course::try_from(record)?)
    }

    async fn list_lessons(&self, course_id: Uuid, preview_only: bool) -> PortResult<Vec<Lesson>> {
        let sql = format!(
            "SELECT {} FROM lessons WHERE course_id = $1 AND ($2 = FALSE OR is_preview = TRUE) ORDER BY order_index ASC",
            LESSON_COLUMNS
        );
        let records = sqlx::query_as::<_, LessonRecord>(&sql)
            .bind(course_id)
            .bind(preview_only)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        decode_all(records)
    }

    async fn get_lesson(&self, lesson_id: Uuid) -> PortResult<Lesson> {
        let sql = format!("SELECT {} FROM lessons WHERE id = $1", LESSON_COLUMNS);
        let record = sqlx::query_as::<_, LessonRecord>(&sql)
            .bind(lesson_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, || format!("Lesson {} not found", lesson_id)))?;
        Ok(Lesson::try_from(record)?)
    }

    async fn first_lesson_id(&self, course_id: Uuid) -> PortResult<Option<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM lessons WHERE course_id = $1 ORDER BY order_index ASC LIMIT 1",
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn enrollment_exists(&self, user_id: Uuid, course_id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_course_enrollments WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn create_enrollment(&self, user_id: Uuid, course_id: Uuid) -> PortResult<Enrollment> {
        let record = sqlx::query_as::<_, EnrollmentRecord>(
            "INSERT INTO user_course_enrollments (user_id, course_id, progress) VALUES ($1, $2, 0) \
             RETURNING id, user_id, course_id, enrolled_at, progress",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => PortError::Conflict(format!(
                "User {} is already enrolled in course {}",
                user_id, course_id
            )),
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                PortError::NotFound(format!("Course {} not found", course_id))
            }
            other => unexpected(other),
        })?;
        Ok(Enrollment::try_from(record)?)
    }

    async fn list_enrollments(&self, user_id: Uuid) -> PortResult<Vec<Enrollment>> {
        let records = sqlx::query_as::<_, EnrollmentWithCourseRecord>(
            "SELECT e.id, e.user_id, e.course_id, e.enrolled_at, e.progress, \
                    c.id AS c_id, c.title AS c_title, c.description AS c_description, \
                    c.subject AS c_subject, c.thumbnail_url AS c_thumbnail_url, \
                    c.is_published AS c_is_published, c.is_free AS c_is_free, c.price AS c_price, \
                    c.created_at AS c_created_at, c.updated_at AS c_updated_at \
             FROM user_course_enrollments e \
             JOIN courses c ON c.id = e.course_id \
             WHERE e.user_id = $1 \
             ORDER BY e.enrolled_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        decode_all(records)
    }

    async fn lesson_progress_for_course(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> PortResult<Vec<LessonProgress>> {
        let records = sqlx::query_as::<_, LessonProgressRecord>(
            "SELECT p.id, p.user_id, p.lesson_id, p.progress, p.completed_at \
             FROM user_lesson_progress p \
             JOIN lessons l ON l.id = p.lesson_id \
             WHERE p.user_id = $1 AND l.course_id = $2 \
             ORDER BY l.order_index ASC",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        decode_all(records)
    }

    async fn upsert_lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        progress: Progress,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()> {
        // The first completion stamp is kept; dropping below 100 clears it.
        sqlx::query(
            "INSERT INTO user_lesson_progress (user_id, lesson_id, progress, completed_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, lesson_id) DO UPDATE SET \
                progress = EXCLUDED.progress, \
                completed_at = CASE WHEN EXCLUDED.progress = 100 \
                    THEN COALESCE(user_lesson_progress.completed_at, EXCLUDED.completed_at) \
                    ELSE NULL END",
        )
        .bind(user_id)
        .bind(lesson_id)
        .bind(progress.value() as i32)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                PortError::NotFound(format!("Lesson {} not found", lesson_id))
            }
            other => unexpected(other),
        })?;
        Ok(())
    }
}

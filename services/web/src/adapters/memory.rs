//! services/web/src/adapters/memory.rs
//!
//! An in-process implementation of the `CourseStore` port. It applies the same
//! filters, orderings and uniqueness rules as the PostgreSQL schema, and backs
//! local runs without a database as well as the test-suite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edumynt_core::domain::{Course, Enrollment, Lesson, LessonProgress, Progress};
use edumynt_core::ports::{CourseStore, PortError, PortResult};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::demo;

#[derive(Default)]
struct Tables {
    courses: Vec<Course>,
    lessons: Vec<Lesson>,
    enrollments: Vec<Enrollment>,
    progress: Vec<LessonProgress>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with the demo catalog.
    pub fn with_demo_catalog() -> Self {
        Self::with_catalog(demo::courses(), demo::lessons())
    }

    pub fn with_catalog(courses: Vec<Course>, lessons: Vec<Lesson>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                courses,
                lessons,
                ..Tables::default()
            }),
        }
    }

    /// Overwrites the stored course-level progress of an enrollment.
    pub async fn set_enrollment_progress(&self, user_id: Uuid, course_id: Uuid, progress: Progress) {
        let mut tables = self.tables.write().await;
        if let Some(e) = tables
            .enrollments
            .iter_mut()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
        {
            e.progress = progress;
        }
    }

    pub async fn enrollment_count(&self, user_id: Uuid, course_id: Uuid) -> usize {
        self.tables
            .read()
            .await
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id && e.course_id == course_id)
            .count()
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn list_published_courses(&self) -> PortResult<Vec<Course>> {
        let tables = self.tables.read().await;
        let mut courses: Vec<Course> = tables
            .courses
            .iter()
            .filter(|c| c.is_published)
            .cloned()
            .collect();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(courses)
    }

    async fn get_course(&self, course_id: Uuid) -> PortResult<Course> {
        self.tables
            .read()
            .await
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Course {} not found", course_id)))
    }

    async fn list_lessons(&self, course_id: Uuid, preview_only: bool) -> PortResult<Vec<Lesson>> {
        let tables = self.tables.read().await;
        let mut lessons: Vec<Lesson> = tables
            .lessons
            .iter()
            .filter(|l| l.course_id == course_id && (!preview_only || l.is_preview))
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.order_index);
        Ok(lessons)
    }

    async fn get_lesson(&self, lesson_id: Uuid) -> PortResult<Lesson> {
        self.tables
            .read()
            .await
            .lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Lesson {} not found", lesson_id)))
    }

    async fn first_lesson_id(&self, course_id: Uuid) -> PortResult<Option<Uuid>> {
        Ok(self
            .tables
            .read()
            .await
            .lessons
            .iter()
            .filter(|l| l.course_id == course_id)
            .min_by_key(|l| l.order_index)
            .map(|l| l.id))
    }

    async fn enrollment_exists(&self, user_id: Uuid, course_id: Uuid) -> PortResult<bool> {
        Ok(self
            .tables
            .read()
            .await
            .enrollments
            .iter()
            .any(|e| e.user_id == user_id && e.course_id == course_id))
    }

    async fn create_enrollment(&self, user_id: Uuid, course_id: Uuid) -> PortResult<Enrollment> {
        let mut tables = self.tables.write().await;
        if !tables.courses.iter().any(|c| c.id == course_id) {
            return Err(PortError::NotFound(format!("Course {} not found", course_id)));
        }
        if tables
            .enrollments
            .iter()
            .any(|e| e.user_id == user_id && e.course_id == course_id)
        {
            return Err(PortError::Conflict(format!(
                "User {} is already enrolled in course {}",
                user_id, course_id
            )));
        }
        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            enrolled_at: Utc::now(),
            progress: Progress::ZERO,
            course: None,
        };
        tables.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn list_enrollments(&self, user_id: Uuid) -> PortResult<Vec<Enrollment>> {
        let tables = self.tables.read().await;
        let mut enrollments: Vec<Enrollment> = tables
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter_map(|e| {
                // inner join: enrollments whose course vanished are skipped
                let course = tables.courses.iter().find(|c| c.id == e.course_id)?;
                Some(Enrollment {
                    course: Some(course.clone()),
                    ..e.clone()
                })
            })
            .collect();
        enrollments.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        Ok(enrollments)
    }

    async fn lesson_progress_for_course(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> PortResult<Vec<LessonProgress>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<(i32, LessonProgress)> = tables
            .progress
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| {
                let lesson = tables
                    .lessons
                    .iter()
                    .find(|l| l.id == p.lesson_id && l.course_id == course_id)?;
                Some((lesson.order_index, p.clone()))
            })
            .collect();
        rows.sort_by_key(|(order, _)| *order);
        Ok(rows.into_iter().map(|(_, p)| p).collect())
    }

    async fn upsert_lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        progress: Progress,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.lessons.iter().any(|l| l.id == lesson_id) {
            return Err(PortError::NotFound(format!("Lesson {} not found", lesson_id)));
        }
        match tables
            .progress
            .iter_mut()
            .find(|p| p.user_id == user_id && p.lesson_id == lesson_id)
        {
            Some(row) => {
                row.completed_at = if progress.is_complete() {
                    row.completed_at.or(completed_at)
                } else {
                    None
                };
                row.progress = progress;
            }
            None => tables.progress.push(LessonProgress {
                id: Uuid::new_v4(),
                user_id,
                lesson_id,
                progress,
                completed_at: if progress.is_complete() { completed_at } else { None },
            }),
        }
        Ok(())
    }
}

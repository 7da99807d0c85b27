//! crates/edumynt_core/src/enrollment.rs
//!
//! Enrolling a user in a course. The store owns uniqueness of
//! (user, course); a second attempt is reported as already enrolled.

use uuid::Uuid;

use crate::domain::Enrollment;
use crate::ports::{CourseStore, PortError, PortResult};

#[derive(Debug, Clone, PartialEq)]
pub enum EnrollOutcome {
    Enrolled(Enrollment),
    AlreadyEnrolled,
}

pub async fn enroll(store: &dyn CourseStore, user_id: Uuid, course_id: Uuid) -> PortResult<EnrollOutcome> {
    match store.create_enrollment(user_id, course_id).await {
        Ok(enrollment) => Ok(EnrollOutcome::Enrolled(enrollment)),
        Err(PortError::Conflict(_)) => Ok(EnrollOutcome::AlreadyEnrolled),
        Err(e) => Err(e),
    }
}

/// Where the browser lands after enrolling.
pub fn post_enroll_target(course_id: Uuid) -> String {
    format!("/dashboard?tab=courses&course={}", course_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Course, Lesson, LessonProgress, Progress};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Enrollments {
        rows: Mutex<Vec<(Uuid, Uuid)>>,
    }

    #[async_trait]
    impl CourseStore for Enrollments {
        async fn list_published_courses(&self) -> PortResult<Vec<Course>> {
            unimplemented!()
        }
        async fn get_course(&self, _: Uuid) -> PortResult<Course> {
            unimplemented!()
        }
        async fn list_lessons(&self, _: Uuid, _: bool) -> PortResult<Vec<Lesson>> {
            unimplemented!()
        }
        async fn get_lesson(&self, _: Uuid) -> PortResult<Lesson> {
            unimplemented!()
        }
        async fn first_lesson_id(&self, _: Uuid) -> PortResult<Option<Uuid>> {
            unimplemented!()
        }
        async fn enrollment_exists(&self, user_id: Uuid, course_id: Uuid) -> PortResult<bool> {
            Ok(self.rows.lock().unwrap().contains(&(user_id, course_id)))
        }
        async fn create_enrollment(&self, user_id: Uuid, course_id: Uuid) -> PortResult<Enrollment> {
            if course_id.is_nil() {
                return Err(PortError::NotFound(format!("course {}", course_id)));
            }
            let mut rows = self.rows.lock().unwrap();
            if rows.contains(&(user_id, course_id)) {
                return Err(PortError::Conflict("enrollment".to_string()));
            }
            rows.push((user_id, course_id));
            Ok(Enrollment {
                id: Uuid::new_v4(),
                user_id,
                course_id,
                enrolled_at: Utc::now(),
                progress: Progress::ZERO,
                course: None,
            })
        }
        async fn list_enrollments(&self, _: Uuid) -> PortResult<Vec<Enrollment>> {
            unimplemented!()
        }
        async fn lesson_progress_for_course(&self, _: Uuid, _: Uuid) -> PortResult<Vec<LessonProgress>> {
            unimplemented!()
        }
        async fn upsert_lesson_progress(
            &self,
            _: Uuid,
            _: Uuid,
            _: Progress,
            _: Option<DateTime<Utc>>,
        ) -> PortResult<()> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn enrolling_twice_keeps_one_row() {
        let store = Enrollments::default();
        let (user, course) = (Uuid::new_v4(), Uuid::new_v4());

        let first = enroll(&store, user, course).await.unwrap();
        assert!(matches!(first, EnrollOutcome::Enrolled(ref e) if e.progress == Progress::ZERO));
        assert_eq!(enroll(&store, user, course).await.unwrap(), EnrollOutcome::AlreadyEnrolled);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn other_failures_propagate() {
        let store = Enrollments::default();
        let err = enroll(&store, Uuid::new_v4(), Uuid::nil()).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
        assert!(store.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn lands_on_the_courses_tab() {
        let id = Uuid::from_u128(7);
        assert_eq!(
            post_enroll_target(id),
            "/dashboard?tab=courses&course=00000000-0000-0000-0000-000000000007"
        );
    }
}

//! crates/edumynt_core/src/access.rs
//!
//! The lesson access rule: a lesson is viewable iff it is a preview or the
//! viewer is enrolled in the lesson's course.

use uuid::Uuid;

use crate::domain::Lesson;
use crate::ports::{CourseStore, PortResult};

/// Why a lesson was or was not opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Preview,
    Enrolled,
    SignInRequired,
    EnrollmentRequired,
}

impl Access {
    pub fn is_granted(self) -> bool {
        matches!(self, Access::Preview | Access::Enrolled)
    }
}

/// Evaluates the rule once the enrollment question has been answered.
pub fn decide(lesson: &Lesson, user_id: Option<Uuid>, enrolled: bool) -> Access {
    if lesson.is_preview {
        Access::Preview
    } else if user_id.is_none() {
        Access::SignInRequired
    } else if enrolled {
        Access::Enrolled
    } else {
        Access::EnrollmentRequired
    }
}

/// Checks access against the store. No caching: every call re-reads the
/// enrollment. Previews and anonymous viewers never touch the store.
pub async fn check_lesson_access(
    store: &dyn CourseStore,
    lesson: &Lesson,
    user_id: Option<Uuid>,
) -> PortResult<Access> {
    let enrolled = match user_id {
        Some(user_id) if !lesson.is_preview => {
            store.enrollment_exists(user_id, lesson.course_id).await?
        }
        _ => false,
    };
    Ok(decide(lesson, user_id, enrolled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Course, Enrollment, LessonProgress, Progress};
    use crate::ports::PortError;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers only the enrollment question and counts how often it is asked.
    struct EnrollmentOnly {
        enrolled: Vec<(Uuid, Uuid)>,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl CourseStore for EnrollmentOnly {
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
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.enrolled.contains(&(user_id, course_id)))
        }
        async fn create_enrollment(&self, _: Uuid, _: Uuid) -> PortResult<Enrollment> {
            Err(PortError::Unauthorized)
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

    fn lesson(course_id: Uuid, is_preview: bool) -> Lesson {
        Lesson {
            id: Uuid::new_v4(),
            course_id,
            title: "Parts of Speech".to_string(),
            content: None,
            video_url: None,
            order_index: 1,
            is_preview,
            estimated_duration: 20,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn access_equals_preview_or_enrollment() {
        let course_id = Uuid::new_v4();
        let member = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let store = EnrollmentOnly {
            enrolled: vec![(member, course_id)],
            lookups: AtomicUsize::new(0),
        };

        for is_preview in [true, false] {
            let l = lesson(course_id, is_preview);
            for (user, enrolled) in [(Some(member), true), (Some(stranger), false), (None, false)] {
                let access = check_lesson_access(&store, &l, user).await.unwrap();
                assert_eq!(access.is_granted(), is_preview || enrolled);
            }
        }
    }

    #[tokio::test]
    async fn previews_and_anonymous_viewers_skip_the_lookup() {
        let store = EnrollmentOnly {
            enrolled: vec![],
            lookups: AtomicUsize::new(0),
        };
        let course_id = Uuid::new_v4();

        let preview = lesson(course_id, true);
        assert_eq!(
            check_lesson_access(&store, &preview, Some(Uuid::new_v4())).await.unwrap(),
            Access::Preview
        );
        let locked = lesson(course_id, false);
        assert_eq!(
            check_lesson_access(&store, &locked, None).await.unwrap(),
            Access::SignInRequired
        );
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);

        assert_eq!(
            check_lesson_access(&store, &locked, Some(Uuid::new_v4())).await.unwrap(),
            Access::EnrollmentRequired
        );
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
    }
}

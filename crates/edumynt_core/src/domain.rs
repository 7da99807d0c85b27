//! crates/edumynt_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or wire format; the
//! adapters decode their own records into them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::ports::DecodeError;

/// A percentage in the range `0..=100`.
///
/// The only way to build one from an arbitrary integer is [`Progress::clamped`],
/// so a stored value can never leave the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct Progress(u8);

impl Progress {
    pub const ZERO: Progress = Progress(0);
    pub const COMPLETE: Progress = Progress(100);

    /// Clamps any integer into `0..=100`.
    pub fn clamped(value: i64) -> Self {
        Progress(value.clamp(0, 100) as u8)
    }

    /// Strict conversion used when decoding stored rows.
    pub fn try_from_stored(value: i32) -> Result<Self, DecodeError> {
        if (0..=100).contains(&value) {
            Ok(Progress(value as u8))
        } else {
            Err(DecodeError::new(
                "progress",
                format!("{} is outside 0..=100", value),
            ))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_complete(self) -> bool {
        self.0 == 100
    }
}

// Represents a user - referenced, never mutated, by the rest of the app
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

impl User {
    /// The name shown in greetings: the display name, else the email's local part.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}

/// The authenticated client's current token pair plus identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// A published (or draft) course. Authored elsewhere; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub subject: String,
    pub thumbnail_url: Option<String>,
    pub is_published: bool,
    pub is_free: bool,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub order_index: i32,
    pub is_preview: bool,
    /// Minutes.
    pub estimated_duration: i32,
    pub created_at: DateTime<Utc>,
}

/// Links a user to a course. At most one per (user, course).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub progress: Progress,
    /// Present when the enrollment was read joined with its course.
    pub course: Option<Course>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub progress: Progress,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A course together with its lessons in ascending `order_index`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseWithLessons {
    pub course: Course,
    pub lessons: Vec<Lesson>,
}

impl CourseWithLessons {
    /// Builds the aggregate, rejecting lessons from other courses and
    /// duplicate order indexes.
    pub fn new(course: Course, mut lessons: Vec<Lesson>) -> Result<Self, DecodeError> {
        if let Some(stray) = lessons.iter().find(|l| l.course_id != course.id) {
            return Err(DecodeError::new(
                "lessons.course_id",
                format!("lesson {} belongs to course {}", stray.id, stray.course_id),
            ));
        }
        lessons.sort_by_key(|l| l.order_index);
        if let Some(pair) = lessons
            .windows(2)
            .find(|w| w[0].order_index == w[1].order_index)
        {
            return Err(DecodeError::new(
                "lessons.order_index",
                format!(
                    "duplicate order index {} in course {}",
                    pair[0].order_index, course.id
                ),
            ));
        }
        Ok(Self { course, lessons })
    }

    pub fn preview_lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.lessons.iter().filter(|l| l.is_preview)
    }

    pub fn first_lesson(&self) -> Option<&Lesson> {
        self.lessons.first()
    }

    pub fn total_duration(&self) -> i32 {
        self.lessons.iter().map(|l| l.estimated_duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> Course {
        Course {
            id: Uuid::new_v4(),
            title: "English Grammar Mastery".to_string(),
            description: None,
            subject: "English".to_string(),
            thumbnail_url: None,
            is_published: true,
            is_free: true,
            price: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn lesson(course_id: Uuid, order_index: i32, is_preview: bool) -> Lesson {
        Lesson {
            id: Uuid::new_v4(),
            course_id,
            title: format!("Lesson {}", order_index),
            content: None,
            video_url: None,
            order_index,
            is_preview,
            estimated_duration: 15,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn progress_clamps_out_of_range_input() {
        assert_eq!(Progress::clamped(-10).value(), 0);
        assert_eq!(Progress::clamped(150).value(), 100);
        assert_eq!(Progress::clamped(42).value(), 42);
        assert!(Progress::clamped(100).is_complete());
    }

    #[test]
    fn stored_progress_outside_range_is_a_decode_error() {
        assert!(Progress::try_from_stored(101).is_err());
        assert!(Progress::try_from_stored(-1).is_err());
        assert_eq!(Progress::try_from_stored(55).unwrap().value(), 55);
    }

    #[test]
    fn lessons_are_sorted_and_duplicates_rejected() {
        let c = course();
        let lessons = vec![lesson(c.id, 3, false), lesson(c.id, 1, true), lesson(c.id, 2, false)];
        let agg = CourseWithLessons::new(c.clone(), lessons).unwrap();
        let order: Vec<i32> = agg.lessons.iter().map(|l| l.order_index).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(agg.first_lesson().unwrap().order_index, 1);
        assert_eq!(agg.preview_lessons().count(), 1);
        assert_eq!(agg.total_duration(), 45);

        let dup = vec![lesson(c.id, 1, false), lesson(c.id, 1, false)];
        assert!(CourseWithLessons::new(c, dup).is_err());
    }

    #[test]
    fn lesson_from_another_course_is_rejected() {
        let c = course();
        let stray = lesson(Uuid::new_v4(), 1, false);
        assert!(CourseWithLessons::new(c, vec![stray]).is_err());
    }

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        let mut user = User {
            id: Uuid::new_v4(),
            email: "asha@example.com".to_string(),
            full_name: None,
        };
        assert_eq!(user.display_name(), "asha");
        user.full_name = Some("Asha Rao".to_string());
        assert_eq!(user.display_name(), "Asha Rao");
    }
}

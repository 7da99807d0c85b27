//! crates/edumynt_core/src/progress.rs
//!
//! Lesson progress writes. Course-level progress on the enrollment row is
//! stored separately and is not derived from these values.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::Progress;
use crate::ports::{CourseStore, PortResult};

/// The row values written for one (user, lesson) upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub progress: Progress,
    /// `Some` exactly when `progress` is 100.
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProgressUpdate {
    /// Clamps `value` into `0..=100`. Reaching 100 stamps completion at `now`.
    pub fn set(value: i64, now: DateTime<Utc>) -> Self {
        let progress = Progress::clamped(value);
        Self {
            progress,
            completed_at: progress.is_complete().then_some(now),
        }
    }

    pub fn completed(now: DateTime<Utc>) -> Self {
        Self {
            progress: Progress::COMPLETE,
            completed_at: Some(now),
        }
    }
}

pub async fn update_lesson_progress(
    store: &dyn CourseStore,
    user_id: Uuid,
    lesson_id: Uuid,
    value: i64,
) -> PortResult<ProgressUpdate> {
    let update = ProgressUpdate::set(value, Utc::now());
    store
        .upsert_lesson_progress(user_id, lesson_id, update.progress, update.completed_at)
        .await?;
    Ok(update)
}

pub async fn mark_lesson_completed(
    store: &dyn CourseStore,
    user_id: Uuid,
    lesson_id: Uuid,
) -> PortResult<ProgressUpdate> {
    let update = ProgressUpdate::completed(Utc::now());
    store
        .upsert_lesson_progress(user_id, lesson_id, update.progress, update.completed_at)
        .await?;
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_matches_min_max() {
        let now = Utc::now();
        for p in [-500, -10, -1, 0, 1, 37, 99, 100, 101, 150, 10_000] {
            let expected = p.clamp(0, 100);
            assert_eq!(ProgressUpdate::set(p, now).progress.value() as i64, expected);
        }
    }

    #[test]
    fn completion_is_stamped_only_at_100() {
        let now = Utc::now();
        assert_eq!(ProgressUpdate::set(-10, now).completed_at, None);
        assert_eq!(ProgressUpdate::set(99, now).completed_at, None);
        assert_eq!(ProgressUpdate::set(150, now).completed_at, Some(now));

        let done = ProgressUpdate::completed(now);
        assert!(done.progress.is_complete());
        assert_eq!(done.completed_at, Some(now));
    }
}

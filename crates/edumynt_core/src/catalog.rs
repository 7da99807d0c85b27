//! crates/edumynt_core/src/catalog.rs
//!
//! Shaping fetched catalog and enrollment records for the course list and
//! dashboard views.

use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Course, Enrollment, Progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardTab {
    #[default]
    Home,
    Courses,
    Tests,
    Discuss,
    Profile,
}

impl DashboardTab {
    pub const ALL: [DashboardTab; 5] = [
        DashboardTab::Home,
        DashboardTab::Courses,
        DashboardTab::Tests,
        DashboardTab::Discuss,
        DashboardTab::Profile,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DashboardTab::Home => "home",
            DashboardTab::Courses => "courses",
            DashboardTab::Tests => "tests",
            DashboardTab::Discuss => "discuss",
            DashboardTab::Profile => "profile",
        }
    }

    /// Unknown or missing values fall back to the home tab.
    pub fn from_query(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dashboard tab '{0}'")]
pub struct UnknownTab(pub String);

impl FromStr for DashboardTab {
    type Err = UnknownTab;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DashboardTab::ALL
            .into_iter()
            .find(|tab| tab.as_str() == s)
            .ok_or_else(|| UnknownTab(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectGroup {
    pub subject: String,
    pub courses: Vec<Course>,
}

/// Groups courses by subject, keeping the order in which subjects first
/// appear and the input order inside each group.
pub fn group_by_subject(courses: &[Course]) -> Vec<SubjectGroup> {
    let mut groups: Vec<SubjectGroup> = Vec::new();
    for course in courses {
        match groups.iter_mut().find(|g| g.subject == course.subject) {
            Some(group) => group.courses.push(course.clone()),
            None => groups.push(SubjectGroup {
                subject: course.subject.clone(),
                courses: vec![course.clone()],
            }),
        }
    }
    groups
}

/// Lookups over a user's enrollments.
pub struct EnrollmentIndex<'a> {
    enrollments: &'a [Enrollment],
}

impl<'a> EnrollmentIndex<'a> {
    pub fn new(enrollments: &'a [Enrollment]) -> Self {
        Self { enrollments }
    }

    pub fn is_enrolled(&self, course_id: Uuid) -> bool {
        self.enrollments.iter().any(|e| e.course_id == course_id)
    }

    /// Stored course-level progress; 0 when not enrolled.
    pub fn progress_for(&self, course_id: Uuid) -> Progress {
        self.enrollments
            .iter()
            .find(|e| e.course_id == course_id)
            .map(|e| e.progress)
            .unwrap_or(Progress::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LearningStats {
    pub enrolled: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub average_progress: u8,
}

impl LearningStats {
    pub fn from_enrollments(enrollments: &[Enrollment]) -> Self {
        if enrollments.is_empty() {
            return Self::default();
        }
        let completed = enrollments.iter().filter(|e| e.progress.is_complete()).count();
        let in_progress = enrollments
            .iter()
            .filter(|e| e.progress.value() > 0 && !e.progress.is_complete())
            .count();
        let total: usize = enrollments.iter().map(|e| e.progress.value() as usize).sum();
        Self {
            enrolled: enrollments.len(),
            completed,
            in_progress,
            average_progress: (total / enrollments.len()) as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn course(subject: &str, title: &str) -> Course {
        Course {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            subject: subject.to_string(),
            thumbnail_url: None,
            is_published: true,
            is_free: true,
            price: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn enrollment(course_id: Uuid, progress: i64) -> Enrollment {
        Enrollment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            course_id,
            enrolled_at: Utc::now(),
            progress: Progress::clamped(progress),
            course: None,
        }
    }

    #[test]
    fn tabs_parse_and_fall_back_to_home() {
        assert_eq!(DashboardTab::from_query(Some("discuss")), DashboardTab::Discuss);
        assert_eq!(DashboardTab::from_query(Some("billing")), DashboardTab::Home);
        assert_eq!(DashboardTab::from_query(None), DashboardTab::Home);
        assert!("Courses".parse::<DashboardTab>().is_err());
    }

    #[test]
    fn subjects_keep_first_seen_order() {
        let courses = vec![
            course("English", "Advanced English Literature"),
            course("Mathematics", "Quantitative Aptitude Basics"),
            course("English", "English Grammar Mastery"),
        ];
        let groups = group_by_subject(&courses);
        let subjects: Vec<&str> = groups.iter().map(|g| g.subject.as_str()).collect();
        assert_eq!(subjects, vec!["English", "Mathematics"]);
        assert_eq!(groups[0].courses[1].title, "English Grammar Mastery");
        assert!(group_by_subject(&[]).is_empty());
    }

    #[test]
    fn enrollment_index_reports_progress() {
        let enrolled = Uuid::new_v4();
        let enrollments = vec![enrollment(enrolled, 40)];
        let index = EnrollmentIndex::new(&enrollments);
        assert!(index.is_enrolled(enrolled));
        assert_eq!(index.progress_for(enrolled).value(), 40);
        assert!(!index.is_enrolled(Uuid::new_v4()));
        assert_eq!(index.progress_for(Uuid::new_v4()), Progress::ZERO);
    }

    #[test]
    fn stats_summarise_enrollments() {
        let enrollments = vec![
            enrollment(Uuid::new_v4(), 100),
            enrollment(Uuid::new_v4(), 50),
            enrollment(Uuid::new_v4(), 0),
        ];
        let stats = LearningStats::from_enrollments(&enrollments);
        assert_eq!(stats.enrolled, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.average_progress, 50);
        assert_eq!(LearningStats::from_enrollments(&[]), LearningStats::default());
    }
}

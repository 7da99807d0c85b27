//! services/web/src/adapters/demo.rs
//!
//! The demo catalog: four published courses with their opening lessons.
//! Loaded into the in-memory store when no database is configured, and
//! written to PostgreSQL by the `seed` binary.

use chrono::{DateTime, Duration, TimeZone, Utc};
use edumynt_core::domain::{Course, Lesson};
use uuid::Uuid;

pub const ENGLISH_GRAMMAR: Uuid = Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440001);
pub const EDUCATIONAL_PSYCHOLOGY: Uuid = Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440002);
pub const ENGLISH_LITERATURE: Uuid = Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440003);
pub const QUANTITATIVE_APTITUDE: Uuid = Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440004);

struct CourseSeed {
    id: Uuid,
    title: &'static str,
    description: &'static str,
    subject: &'static str,
    price: f64,
}

const COURSES: &[CourseSeed] = &[
    CourseSeed {
        id: ENGLISH_GRAMMAR,
        title: "English Grammar Mastery",
        description: "Complete English grammar course designed for government exam aspirants. Master all essential grammar concepts with interactive lessons and practice exercises.",
        subject: "English",
        price: 0.0,
    },
    CourseSeed {
        id: EDUCATIONAL_PSYCHOLOGY,
        title: "Educational Psychology",
        description: "Comprehensive course covering educational psychology concepts essential for teaching exams like CTET, TET, and other government teaching positions.",
        subject: "Psychology",
        price: 0.0,
    },
    CourseSeed {
        id: ENGLISH_LITERATURE,
        title: "Advanced English Literature",
        description: "In-depth study of English literature for competitive exams. Covers major authors, literary movements, and critical analysis techniques.",
        subject: "English",
        price: 299.0,
    },
    CourseSeed {
        id: QUANTITATIVE_APTITUDE,
        title: "Quantitative Aptitude Basics",
        description: "Foundation course in quantitative aptitude covering arithmetic, algebra, and basic mathematics for government exams.",
        subject: "Mathematics",
        price: 0.0,
    },
];

// (course, title, order_index, is_preview, minutes, summary)
type LessonSeed = (Uuid, &'static str, i32, bool, i32, &'static str);

const LESSONS: &[LessonSeed] = &[
    (ENGLISH_GRAMMAR, "Introduction to Parts of Speech", 1, true, 25,
        "# Parts of Speech\n\nEvery English word belongs to one of eight categories: nouns, pronouns, verbs, adjectives, adverbs, prepositions, conjunctions and interjections."),
    (ENGLISH_GRAMMAR, "Nouns: Types and Usage", 2, true, 30,
        "# Nouns\n\nCommon and proper nouns, countable and uncountable nouns, collective nouns and their agreement with verbs."),
    (ENGLISH_GRAMMAR, "Pronouns and Their Types", 3, false, 35,
        "# Pronouns\n\nPersonal, possessive, reflexive, demonstrative, relative and interrogative pronouns."),
    (ENGLISH_GRAMMAR, "Verbs: Action and Linking Verbs", 4, false, 40,
        "# Verbs\n\nAction verbs describe what the subject does; linking verbs connect the subject to more information about it."),
    (ENGLISH_GRAMMAR, "Adjectives and Adverbs", 5, false, 35,
        "# Adjectives and Adverbs\n\nAdjectives modify nouns; adverbs modify verbs, adjectives and other adverbs."),
    (EDUCATIONAL_PSYCHOLOGY, "Introduction to Educational Psychology", 1, true, 30,
        "# Educational Psychology\n\nThe study of how people learn, and how teaching can support that learning."),
    (EDUCATIONAL_PSYCHOLOGY, "Piaget's Theory of Cognitive Development", 2, true, 45,
        "# Piaget\n\nSensorimotor, preoperational, concrete operational and formal operational stages."),
    (EDUCATIONAL_PSYCHOLOGY, "Learning Theories: Behaviorism", 3, false, 40,
        "# Behaviorism\n\nClassical conditioning (Pavlov), operant conditioning (Skinner) and their classroom applications."),
    (ENGLISH_LITERATURE, "Introduction to English Literature", 1, true, 35,
        "# English Literature\n\nPeriods from Old English to the Modern age, with their representative authors."),
    (ENGLISH_LITERATURE, "Shakespeare: Life and Works", 2, false, 50,
        "# Shakespeare\n\nThe comedies, histories and tragedies, and the conventions of Elizabethan drama."),
    (QUANTITATIVE_APTITUDE, "Number Systems and Basic Operations", 1, true, 40,
        "# Number Systems\n\nNatural numbers, integers, rationals, divisibility rules and the order of operations."),
    (QUANTITATIVE_APTITUDE, "Percentages and Applications", 2, true, 45,
        "# Percentages\n\nConverting fractions, percentage change, and successive increases and decreases."),
];

fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200, 0).single().unwrap_or_else(Utc::now)
}

/// Courses in insertion order; each is a minute younger than the previous one.
pub fn courses() -> Vec<Course> {
    COURSES
        .iter()
        .enumerate()
        .map(|(i, seed)| {
            let created_at = epoch() + Duration::minutes(i as i64);
            Course {
                id: seed.id,
                title: seed.title.to_string(),
                description: Some(seed.description.to_string()),
                subject: seed.subject.to_string(),
                thumbnail_url: None,
                is_published: true,
                is_free: seed.price == 0.0,
                price: seed.price,
                created_at,
                updated_at: created_at,
            }
        })
        .collect()
}

pub fn lessons() -> Vec<Lesson> {
    LESSONS
        .iter()
        .enumerate()
        .map(|(i, (course_id, title, order_index, is_preview, minutes, content))| Lesson {
            id: Uuid::from_u128(0x7e55_0000_0000_4000_8000_0000_0000_0000 + i as u128 + 1),
            course_id: *course_id,
            title: title.to_string(),
            content: Some(content.to_string()),
            video_url: None,
            order_index: *order_index,
            is_preview: *is_preview,
            estimated_duration: *minutes,
            created_at: epoch(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use edumynt_core::CourseWithLessons;

    #[test]
    fn every_demo_course_has_well_ordered_lessons() {
        let lessons = lessons();
        for course in courses() {
            let own: Vec<Lesson> = lessons
                .iter()
                .filter(|l| l.course_id == course.id)
                .cloned()
                .collect();
            assert!(!own.is_empty(), "{} has no lessons", course.title);
            let agg = CourseWithLessons::new(course, own).unwrap();
            assert!(agg.preview_lessons().count() >= 1);
        }
    }

    #[test]
    fn lesson_ids_are_unique() {
        let mut ids: Vec<Uuid> = lessons().iter().map(|l| l.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), LESSONS.len());
    }
}

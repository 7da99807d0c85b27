pub mod access;
pub mod auth_messages;
pub mod catalog;
pub mod domain;
pub mod enrollment;
pub mod ports;
pub mod progress;
pub mod route_guard;
pub mod token;

pub use domain::{Course, CourseWithLessons, Enrollment, Lesson, LessonProgress, Progress, Session, User};
pub use ports::{
    AuthError, AuthProvider, AuthResult, CourseStore, DecodeError, PortError, PortResult,
    SignUpOutcome,
};

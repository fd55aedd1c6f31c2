//! Database schemas for the enrollment engine
//!
//! Defines MongoDB document structures for enrollments, courses, and learners.

mod course;
mod enrollment;
mod learner;
mod metadata;

pub use course::{CourseDoc, COURSE_COLLECTION};
pub use enrollment::{EnrollmentDoc, EnrollmentStatus, ENROLLMENT_COLLECTION};
pub use learner::{LearnerDoc, LEARNER_COLLECTION};
pub use metadata::Metadata;

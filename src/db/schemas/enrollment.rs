//! Enrollment document schema
//!
//! One document per (learner, course) pair, enforced by a unique compound
//! index. Progress writes replace `completed_lessons` wholesale and are
//! guarded by the `version` counter.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for enrollments
pub const ENROLLMENT_COLLECTION: &str = "enrollments";

/// Enrollment lifecycle state
///
/// Both states are re-enterable: un-marking lessons moves a completed
/// enrollment back to in-progress.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnrollmentStatus {
    #[default]
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

/// Enrollment document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EnrollmentDoc {
    /// MongoDB document ID (surrogate identifier for external reference)
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning learner
    pub learner_id: String,

    /// Enrolled course
    pub course_id: String,

    /// Completed lesson numbers, kept sorted and deduplicated.
    /// Every element lies in [1, lesson_count] at the time it was written.
    #[serde(default)]
    pub completed_lessons: Vec<u32>,

    /// Lifecycle state, derived from completed_lessons by the state machine
    #[serde(default)]
    pub status: EnrollmentStatus,

    /// When the learner enrolled (set once, at creation)
    pub enrolled_at: DateTime,

    /// When the course was completed; present iff status is completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,

    /// Optimistic concurrency guard, incremented by every progress write
    #[serde(default = "default_version")]
    pub version: i64,
}

fn default_version() -> i64 {
    1
}

impl Default for EnrollmentDoc {
    fn default() -> Self {
        Self {
            id: None,
            metadata: Metadata::default(),
            learner_id: String::new(),
            course_id: String::new(),
            completed_lessons: Vec::new(),
            status: EnrollmentStatus::InProgress,
            enrolled_at: DateTime::now(),
            completed_at: None,
            version: 1,
        }
    }
}

impl EnrollmentDoc {
    /// Create a fresh enrollment: in-progress, nothing completed
    pub fn new(learner_id: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            id: None,
            metadata: Metadata::new(),
            learner_id: learner_id.into(),
            course_id: course_id.into(),
            completed_lessons: Vec::new(),
            status: EnrollmentStatus::InProgress,
            enrolled_at: DateTime::now(),
            completed_at: None,
            version: 1,
        }
    }

    /// Surrogate identifier as a hex string, once assigned by the store
    pub fn id_hex(&self) -> Option<String> {
        self.id.map(|oid| oid.to_hex())
    }

    pub fn is_completed(&self) -> bool {
        self.status == EnrollmentStatus::Completed
    }
}

impl IntoIndexes for EnrollmentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique compound index: at most one enrollment per (learner, course).
            // Concurrent inserts for the same pair are serialized here.
            (
                doc! { "learner_id": 1, "course_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("learner_course_unique".to_string())
                        .build(),
                ),
            ),
            // Listing index: a learner's enrollments, newest first
            (
                doc! { "learner_id": 1, "enrolled_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("learner_enrolled_at".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for EnrollmentDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_enrollment_is_in_progress() {
        let doc = EnrollmentDoc::new("learner-1", "course-1");
        assert_eq!(doc.status, EnrollmentStatus::InProgress);
        assert!(doc.completed_lessons.is_empty());
        assert!(doc.completed_at.is_none());
        assert_eq!(doc.version, 1);
        assert!(doc.id_hex().is_none());
    }

    #[test]
    fn test_status_wire_format() {
        let in_progress = serde_json::to_value(EnrollmentStatus::InProgress).unwrap();
        assert_eq!(in_progress, "in-progress");
        let completed = serde_json::to_value(EnrollmentStatus::Completed).unwrap();
        assert_eq!(completed, "completed");
    }

    #[test]
    fn test_unique_pair_index_declared() {
        let indices = EnrollmentDoc::into_indices();
        let unique = indices
            .iter()
            .find(|(keys, _)| keys.contains_key("learner_id") && keys.contains_key("course_id"))
            .expect("compound pair index");
        assert_eq!(unique.1.as_ref().and_then(|o| o.unique), Some(true));
    }
}

//! Course document schema
//!
//! Catalog records are owned by the catalog service; this engine reads
//! `lesson_count`, `title`, and `instructor`, and performs exactly one write:
//! the atomic `$inc` of `enrolled_count` on successful enrollment.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for courses
pub const COURSE_COLLECTION: &str = "courses";

/// Course document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CourseDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Course title
    pub title: String,

    /// Course description
    #[serde(default)]
    pub description: String,

    /// Instructor display name
    pub instructor: String,

    /// Instructor account, when the instructor has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_id: Option<String>,

    /// Estimated duration, free text ("6 weeks")
    #[serde(default)]
    pub duration: String,

    /// Difficulty level
    #[serde(default = "default_level")]
    pub level: String,

    /// Category for catalog filtering
    #[serde(default)]
    pub category: String,

    /// Skills taught
    #[serde(default)]
    pub skills: Vec<String>,

    /// Whether offline course material is available for download
    #[serde(default)]
    pub is_offline_available: bool,

    /// Offline material location, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,

    /// Number of lesson units; valid lesson numbers are [1, lesson_count]
    #[serde(default)]
    pub lesson_count: u32,

    /// Enrollment aggregate, incremented once per successful enrollment.
    /// Never decremented by the engine.
    #[serde(default)]
    pub enrolled_count: i64,

    /// Average rating, 0 to 5
    #[serde(default)]
    pub rating: f64,

    /// Price, free text ("Free")
    #[serde(default)]
    pub price: String,
}

fn default_level() -> String {
    "Beginner".to_string()
}

impl IntoIndexes for CourseDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Catalog browsing filters
            (doc! { "category": 1 }, None),
            (doc! { "level": 1 }, None),
            // Instructor dashboard lookups
            (doc! { "instructor_id": 1 }, None),
        ]
    }
}

impl MutMetadata for CourseDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

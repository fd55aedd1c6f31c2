//! Learner document schema
//!
//! The identity directory is owned by the account/approval workflow; this
//! engine only reads display fields for certificate assembly.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for learners
pub const LEARNER_COLLECTION: &str = "learners";

/// Learner document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LearnerDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Account identifier (email)
    pub identifier: String,

    /// Name as printed on certificates
    pub display_name: String,

    /// Account role (learner, mentor, admin)
    #[serde(default = "default_role")]
    pub role: String,

    /// Whether the account passed the approval workflow
    #[serde(default)]
    pub is_active: bool,
}

fn default_role() -> String {
    "learner".to_string()
}

impl IntoIndexes for LearnerDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on identifier
            (
                doc! { "identifier": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("identifier_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for LearnerDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

//! Identity directory adapter
//!
//! Resolves a learner id to the display fields certificate assembly needs.
//! Session resolution (who is calling) lives in `auth`; this adapter only
//! answers "what is this learner called".

use bson::{doc, oid::ObjectId};
use dashmap::DashMap;
use serde::Serialize;

use crate::db::schemas::{LearnerDoc, LEARNER_COLLECTION};
use crate::db::MongoClient;
use crate::types::Result;

/// Learner display profile
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    pub id: String,
    /// Name as printed on certificates
    pub display_name: String,
    /// Account identifier (email)
    pub identifier: String,
}

/// Read-only learner lookups
#[async_trait::async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Resolve a learner; `None` when the id does not resolve
    async fn resolve(&self, learner_id: &str) -> Result<Option<LearnerProfile>>;
}

/// Directory backed by the `learners` collection
pub struct MongoIdentity {
    mongo: MongoClient,
}

impl MongoIdentity {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }
}

#[async_trait::async_trait]
impl IdentityDirectory for MongoIdentity {
    async fn resolve(&self, learner_id: &str) -> Result<Option<LearnerProfile>> {
        let Ok(oid) = ObjectId::parse_str(learner_id) else {
            return Ok(None);
        };

        let collection = self
            .mongo
            .collection::<LearnerDoc>(LEARNER_COLLECTION)
            .await?;
        let learner = collection.find_one(doc! { "_id": oid }).await?;

        Ok(learner.map(|l| LearnerProfile {
            id: learner_id.to_string(),
            display_name: l.display_name,
            identifier: l.identifier,
        }))
    }
}

/// In-memory directory for dev mode and tests
#[derive(Default)]
pub struct InMemoryIdentity {
    learners: DashMap<String, LearnerProfile>,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a learner and return its generated id
    pub fn add_learner(
        &self,
        display_name: impl Into<String>,
        identifier: impl Into<String>,
    ) -> String {
        let id = ObjectId::new().to_hex();
        self.learners.insert(
            id.clone(),
            LearnerProfile {
                id: id.clone(),
                display_name: display_name.into(),
                identifier: identifier.into(),
            },
        );
        id
    }
}

#[async_trait::async_trait]
impl IdentityDirectory for InMemoryIdentity {
    async fn resolve(&self, learner_id: &str) -> Result<Option<LearnerProfile>> {
        Ok(self.learners.get(learner_id).map(|l| l.clone()))
    }
}

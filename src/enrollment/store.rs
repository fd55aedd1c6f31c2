//! Enrollment persistence
//!
//! The uniqueness invariant (one enrollment per learner/course pair) is
//! enforced by the store, never by check-then-act application code: the
//! MongoDB implementation leans on the unique compound index and maps the
//! duplicate-key outcome to `AlreadyEnrolled`; the in-memory implementation
//! makes the same decision under a map shard lock.
//!
//! Progress writes are optimistic: `apply_transition` only matches when the
//! stored `version` equals the version the caller read, so of two concurrent
//! writers the stale one is rejected with `Conflict` instead of silently
//! winning by arriving last.

use bson::{doc, oid::ObjectId, DateTime};
use dashmap::DashMap;

use crate::db::mongo::is_duplicate_key_error;
use crate::db::schemas::{EnrollmentDoc, ENROLLMENT_COLLECTION};
use crate::db::MongoClient;
use crate::progress::ProgressTransition;
use crate::types::{ElimuError, Result};

/// Persistence seam for enrollments
#[async_trait::async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Insert a fresh enrollment.
    ///
    /// Atomic with respect to the uniqueness invariant: of N concurrent
    /// inserts for the same (learner, course) pair exactly one succeeds and
    /// the rest fail with `AlreadyEnrolled`.
    async fn insert(&self, enrollment: EnrollmentDoc) -> Result<EnrollmentDoc>;

    /// Look up by surrogate id; `None` when the id does not resolve
    async fn find_by_id(&self, enrollment_id: &str) -> Result<Option<EnrollmentDoc>>;

    /// A learner's enrollments, newest first
    async fn find_by_learner(&self, learner_id: &str) -> Result<Vec<EnrollmentDoc>>;

    /// Replace the progress fields, guarded by `expected_version`.
    ///
    /// Fails with `Conflict` when a concurrent writer bumped the version
    /// first, `NotFound` when the enrollment is gone.
    async fn apply_transition(
        &self,
        enrollment_id: &str,
        expected_version: i64,
        transition: &ProgressTransition,
    ) -> Result<EnrollmentDoc>;
}

// =============================================================================
// MongoDB implementation
// =============================================================================

/// Enrollment store backed by the `enrollments` collection
pub struct MongoEnrollmentStore {
    mongo: MongoClient,
}

impl MongoEnrollmentStore {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }
}

#[async_trait::async_trait]
impl EnrollmentRepository for MongoEnrollmentStore {
    async fn insert(&self, enrollment: EnrollmentDoc) -> Result<EnrollmentDoc> {
        let collection = self
            .mongo
            .collection::<EnrollmentDoc>(ENROLLMENT_COLLECTION)
            .await?;

        let mut stored = enrollment.clone();
        match collection.insert_one(enrollment).await {
            Ok(oid) => {
                stored.id = Some(oid);
                Ok(stored)
            }
            Err(e) if is_duplicate_key_error(&e) => Err(ElimuError::AlreadyEnrolled),
            Err(e) => Err(ElimuError::Database(format!("Insert failed: {}", e))),
        }
    }

    async fn find_by_id(&self, enrollment_id: &str) -> Result<Option<EnrollmentDoc>> {
        let Ok(oid) = ObjectId::parse_str(enrollment_id) else {
            return Ok(None);
        };

        let collection = self
            .mongo
            .collection::<EnrollmentDoc>(ENROLLMENT_COLLECTION)
            .await?;
        collection.find_one(doc! { "_id": oid }).await
    }

    async fn find_by_learner(&self, learner_id: &str) -> Result<Vec<EnrollmentDoc>> {
        let collection = self
            .mongo
            .collection::<EnrollmentDoc>(ENROLLMENT_COLLECTION)
            .await?;
        collection
            .find_many_sorted(doc! { "learner_id": learner_id }, doc! { "enrolled_at": -1 })
            .await
    }

    async fn apply_transition(
        &self,
        enrollment_id: &str,
        expected_version: i64,
        transition: &ProgressTransition,
    ) -> Result<EnrollmentDoc> {
        let oid = ObjectId::parse_str(enrollment_id).map_err(|_| {
            ElimuError::NotFound(format!("Enrollment {} not found", enrollment_id))
        })?;

        let collection = self
            .mongo
            .collection::<EnrollmentDoc>(ENROLLMENT_COLLECTION)
            .await?;

        let lessons = bson::to_bson(&transition.completed_lessons)
            .map_err(|e| ElimuError::Internal(format!("BSON encode failed: {}", e)))?;
        let status = bson::to_bson(&transition.status)
            .map_err(|e| ElimuError::Internal(format!("BSON encode failed: {}", e)))?;

        let update = match transition.completed_at {
            Some(completed_at) => doc! {
                "$set": {
                    "completed_lessons": lessons,
                    "status": status,
                    "completed_at": completed_at,
                    "metadata.updated_at": DateTime::now(),
                },
                "$inc": { "version": 1 },
            },
            None => doc! {
                "$set": {
                    "completed_lessons": lessons,
                    "status": status,
                    "metadata.updated_at": DateTime::now(),
                },
                "$unset": { "completed_at": "" },
                "$inc": { "version": 1 },
            },
        };

        let filter = doc! { "_id": oid, "version": expected_version };
        match collection.find_one_and_update(filter, update).await? {
            Some(updated) => Ok(updated),
            // No match: either the document is gone or another writer
            // bumped the version first
            None => match collection.find_one(doc! { "_id": oid }).await? {
                Some(_) => Err(ElimuError::Conflict),
                None => Err(ElimuError::NotFound(format!(
                    "Enrollment {} not found",
                    enrollment_id
                ))),
            },
        }
    }
}

// =============================================================================
// In-memory implementation (dev mode and tests)
// =============================================================================

/// In-memory enrollment store.
///
/// The pair index entry is taken under its shard lock, which gives the same
/// exactly-one-winner contract the unique index provides in MongoDB.
#[derive(Default)]
pub struct InMemoryEnrollmentStore {
    by_id: DashMap<String, EnrollmentDoc>,
    pair_index: DashMap<(String, String), String>,
}

impl InMemoryEnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored enrollments, for the status endpoint
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[async_trait::async_trait]
impl EnrollmentRepository for InMemoryEnrollmentStore {
    async fn insert(&self, enrollment: EnrollmentDoc) -> Result<EnrollmentDoc> {
        use dashmap::mapref::entry::Entry;

        let pair = (
            enrollment.learner_id.clone(),
            enrollment.course_id.clone(),
        );

        match self.pair_index.entry(pair) {
            Entry::Occupied(_) => Err(ElimuError::AlreadyEnrolled),
            Entry::Vacant(vacant) => {
                let oid = ObjectId::new();
                let mut stored = enrollment;
                stored.id = Some(oid);
                stored.metadata.created_at = Some(DateTime::now());
                stored.metadata.updated_at = Some(DateTime::now());

                let id = oid.to_hex();
                vacant.insert(id.clone());
                self.by_id.insert(id, stored.clone());
                Ok(stored)
            }
        }
    }

    async fn find_by_id(&self, enrollment_id: &str) -> Result<Option<EnrollmentDoc>> {
        Ok(self.by_id.get(enrollment_id).map(|e| e.clone()))
    }

    async fn find_by_learner(&self, learner_id: &str) -> Result<Vec<EnrollmentDoc>> {
        let mut enrollments: Vec<EnrollmentDoc> = self
            .by_id
            .iter()
            .filter(|entry| entry.value().learner_id == learner_id)
            .map(|entry| entry.value().clone())
            .collect();
        enrollments.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        Ok(enrollments)
    }

    async fn apply_transition(
        &self,
        enrollment_id: &str,
        expected_version: i64,
        transition: &ProgressTransition,
    ) -> Result<EnrollmentDoc> {
        match self.by_id.get_mut(enrollment_id) {
            Some(mut entry) => {
                if entry.version != expected_version {
                    return Err(ElimuError::Conflict);
                }
                entry.completed_lessons = transition.completed_lessons.clone();
                entry.status = transition.status;
                entry.completed_at = transition.completed_at;
                entry.version += 1;
                entry.metadata.updated_at = Some(DateTime::now());
                Ok(entry.clone())
            }
            None => Err(ElimuError::NotFound(format!(
                "Enrollment {} not found",
                enrollment_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::EnrollmentStatus;
    use std::sync::Arc;

    fn transition(lessons: Vec<u32>, status: EnrollmentStatus) -> ProgressTransition {
        ProgressTransition {
            completed_lessons: lessons,
            status,
            completed_at: match status {
                EnrollmentStatus::Completed => Some(DateTime::now()),
                EnrollmentStatus::InProgress => None,
            },
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_surrogate_id() {
        let store = InMemoryEnrollmentStore::new();
        let stored = store
            .insert(EnrollmentDoc::new("learner-1", "course-1"))
            .await
            .unwrap();
        let id = stored.id_hex().unwrap();
        assert!(store.find_by_id(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_pair_rejected() {
        let store = InMemoryEnrollmentStore::new();
        store
            .insert(EnrollmentDoc::new("learner-1", "course-1"))
            .await
            .unwrap();

        let err = store
            .insert(EnrollmentDoc::new("learner-1", "course-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ElimuError::AlreadyEnrolled));

        // Different pairs are unaffected
        assert!(store
            .insert(EnrollmentDoc::new("learner-1", "course-2"))
            .await
            .is_ok());
        assert!(store
            .insert(EnrollmentDoc::new("learner-2", "course-1"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_one_winner() {
        let store = Arc::new(InMemoryEnrollmentStore::new());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .insert(EnrollmentDoc::new("learner-1", "course-1"))
                        .await
                })
            })
            .collect();

        let mut wins = 0;
        let mut conflicts = 0;
        for result in futures::future::join_all(tasks).await {
            match result.unwrap() {
                Ok(_) => wins += 1,
                Err(ElimuError::AlreadyEnrolled) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(conflicts, 15);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_version_rejected() {
        let store = InMemoryEnrollmentStore::new();
        let stored = store
            .insert(EnrollmentDoc::new("learner-1", "course-1"))
            .await
            .unwrap();
        let id = stored.id_hex().unwrap();

        let updated = store
            .apply_transition(&id, 1, &transition(vec![1], EnrollmentStatus::InProgress))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        // A writer still holding version 1 lost the race
        let err = store
            .apply_transition(&id, 1, &transition(vec![1, 2], EnrollmentStatus::InProgress))
            .await
            .unwrap_err();
        assert!(matches!(err, ElimuError::Conflict));

        // State reflects only the winning write
        let current = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(current.completed_lessons, vec![1]);
        assert_eq!(current.version, 2);
    }

    #[tokio::test]
    async fn test_find_by_learner_newest_first() {
        let store = InMemoryEnrollmentStore::new();

        let mut first = EnrollmentDoc::new("learner-1", "course-1");
        first.enrolled_at = DateTime::from_millis(1_000);
        let mut second = EnrollmentDoc::new("learner-1", "course-2");
        second.enrolled_at = DateTime::from_millis(2_000);

        store.insert(first).await.unwrap();
        store.insert(second).await.unwrap();
        store
            .insert(EnrollmentDoc::new("learner-2", "course-1"))
            .await
            .unwrap();

        let listed = store.find_by_learner("learner-1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].course_id, "course-2");
        assert_eq!(listed[1].course_id, "course-1");
    }

    #[tokio::test]
    async fn test_transition_on_missing_enrollment() {
        let store = InMemoryEnrollmentStore::new();
        let err = store
            .apply_transition(
                "64b000000000000000000000",
                1,
                &transition(vec![1], EnrollmentStatus::InProgress),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ElimuError::NotFound(_)));
    }
}

//! Course catalog adapter
//!
//! Read-only access to course metadata, plus the single write the engine is
//! allowed against the catalog: the atomic increment of `enrolled_count`.
//! The `CourseCatalog` trait keeps the catalog swappable (MongoDB in
//! production, in-memory for dev mode and tests).

use bson::{doc, oid::ObjectId};
use dashmap::DashMap;
use serde::Serialize;

use crate::db::schemas::{CourseDoc, COURSE_COLLECTION};
use crate::db::MongoClient;
use crate::types::{ElimuError, Result};

/// Course metadata consumed by the enrollment engine
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    /// Course identifier (document id as hex)
    pub id: String,
    pub title: String,
    pub instructor: String,
    /// Valid lesson numbers are [1, lesson_count]
    pub lesson_count: u32,
    pub enrolled_count: i64,
}

/// Catalog access for the enrollment engine
#[async_trait::async_trait]
pub trait CourseCatalog: Send + Sync {
    /// Look up a course; `None` when the id does not resolve
    async fn get_course(&self, course_id: &str) -> Result<Option<CourseSummary>>;

    /// Atomically increment the course's enrollment aggregate.
    ///
    /// Must be a store-level increment, not read-modify-write, so concurrent
    /// enrollments across many learners never lose updates.
    async fn increment_enrolled(&self, course_id: &str) -> Result<()>;
}

// =============================================================================
// MongoDB implementation
// =============================================================================

/// Catalog adapter backed by the `courses` collection
pub struct MongoCatalog {
    mongo: MongoClient,
}

impl MongoCatalog {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    fn parse_id(course_id: &str) -> Option<ObjectId> {
        ObjectId::parse_str(course_id).ok()
    }
}

#[async_trait::async_trait]
impl CourseCatalog for MongoCatalog {
    async fn get_course(&self, course_id: &str) -> Result<Option<CourseSummary>> {
        let Some(oid) = Self::parse_id(course_id) else {
            return Ok(None);
        };

        let collection = self.mongo.collection::<CourseDoc>(COURSE_COLLECTION).await?;
        let course = collection.find_one(doc! { "_id": oid }).await?;

        Ok(course.map(|c| CourseSummary {
            id: course_id.to_string(),
            title: c.title,
            instructor: c.instructor,
            lesson_count: c.lesson_count,
            enrolled_count: c.enrolled_count,
        }))
    }

    async fn increment_enrolled(&self, course_id: &str) -> Result<()> {
        let oid = Self::parse_id(course_id)
            .ok_or_else(|| ElimuError::NotFound(format!("Course {} not found", course_id)))?;

        let collection = self.mongo.collection::<CourseDoc>(COURSE_COLLECTION).await?;
        collection
            .update_one(doc! { "_id": oid }, doc! { "$inc": { "enrolled_count": 1 } })
            .await?;

        Ok(())
    }
}

// =============================================================================
// In-memory implementation (dev mode and tests)
// =============================================================================

/// In-memory catalog with the same atomicity contract as the Mongo adapter:
/// the increment happens under the map shard lock.
#[derive(Default)]
pub struct InMemoryCatalog {
    courses: DashMap<String, CourseSummary>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a course and return its generated id
    pub fn add_course(
        &self,
        title: impl Into<String>,
        instructor: impl Into<String>,
        lesson_count: u32,
    ) -> String {
        let id = ObjectId::new().to_hex();
        self.courses.insert(
            id.clone(),
            CourseSummary {
                id: id.clone(),
                title: title.into(),
                instructor: instructor.into(),
                lesson_count,
                enrolled_count: 0,
            },
        );
        id
    }
}

#[async_trait::async_trait]
impl CourseCatalog for InMemoryCatalog {
    async fn get_course(&self, course_id: &str) -> Result<Option<CourseSummary>> {
        Ok(self.courses.get(course_id).map(|c| c.clone()))
    }

    async fn increment_enrolled(&self, course_id: &str) -> Result<()> {
        match self.courses.get_mut(course_id) {
            Some(mut course) => {
                course.enrolled_count += 1;
                Ok(())
            }
            None => Err(ElimuError::NotFound(format!(
                "Course {} not found",
                course_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_in_memory_catalog_lookup_and_increment() {
        let catalog = InMemoryCatalog::new();
        let id = catalog.add_course("Digital Marketing Fundamentals", "Sarah Mwangi", 8);

        let course = catalog.get_course(&id).await.unwrap().unwrap();
        assert_eq!(course.title, "Digital Marketing Fundamentals");
        assert_eq!(course.lesson_count, 8);
        assert_eq!(course.enrolled_count, 0);

        tokio_test::assert_ok!(catalog.increment_enrolled(&id).await);
        tokio_test::assert_ok!(catalog.increment_enrolled(&id).await);
        let course = catalog.get_course(&id).await.unwrap().unwrap();
        assert_eq!(course.enrolled_count, 2);
    }

    #[tokio::test]
    async fn test_unknown_course_is_none() {
        let catalog = InMemoryCatalog::new();
        assert!(catalog.get_course("missing").await.unwrap().is_none());
        assert!(catalog.increment_enrolled("missing").await.is_err());
    }
}

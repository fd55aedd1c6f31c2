//! Enrollment service
//!
//! Orchestrates the catalog adapter, enrollment store, and progress state
//! machine. All invariants are enforced on this path:
//!
//! - exactly-once enrollment per (learner, course) pair, via the store's
//!   atomic insert
//! - the course `enrolled_count` aggregate moves by one per successful
//!   enrollment, via the catalog's atomic increment
//! - progress writes are validated by the pure state machine and persisted
//!   under the optimistic version guard

pub mod store;

use bson::DateTime;
use std::sync::Arc;
use tracing::info;

use crate::catalog::{CourseCatalog, CourseSummary};
use crate::db::schemas::EnrollmentDoc;
use crate::progress;
use crate::types::{ElimuError, Result};

pub use store::{EnrollmentRepository, InMemoryEnrollmentStore, MongoEnrollmentStore};

/// An enrollment joined with its course summary.
///
/// The course is optional: a course removed from the catalog after
/// enrollment leaves the historical record readable.
#[derive(Debug, Clone)]
pub struct EnrollmentWithCourse {
    pub enrollment: EnrollmentDoc,
    pub course: Option<CourseSummary>,
}

/// Business logic for enrollment and progress tracking
pub struct EnrollmentService {
    repo: Arc<dyn EnrollmentRepository>,
    catalog: Arc<dyn CourseCatalog>,
}

impl EnrollmentService {
    pub fn new(repo: Arc<dyn EnrollmentRepository>, catalog: Arc<dyn CourseCatalog>) -> Self {
        Self { repo, catalog }
    }

    /// Enroll a learner in a course.
    ///
    /// Exactly one of N concurrent calls for the same pair succeeds; the
    /// rest observe `AlreadyEnrolled`. The enrolled counter is incremented
    /// only on the winning path.
    pub async fn enroll(&self, learner_id: &str, course_id: &str) -> Result<EnrollmentDoc> {
        let course = self
            .catalog
            .get_course(course_id)
            .await?
            .ok_or_else(|| ElimuError::NotFound(format!("Course {} not found", course_id)))?;

        let enrollment = self
            .repo
            .insert(EnrollmentDoc::new(learner_id, course_id))
            .await?;

        self.catalog.increment_enrolled(course_id).await?;

        info!(
            "Learner {} enrolled in '{}' ({} lessons)",
            learner_id, course.title, course.lesson_count
        );
        Ok(enrollment)
    }

    /// Replace an enrollment's completed-lesson set.
    ///
    /// The caller must own the enrollment. The requested set is validated
    /// against the course's current lesson count and the ordering policy;
    /// rejections leave stored state untouched.
    pub async fn update_progress(
        &self,
        enrollment_id: &str,
        learner_id: &str,
        requested_lessons: &[i64],
    ) -> Result<EnrollmentDoc> {
        let enrollment = self.owned_enrollment(enrollment_id, learner_id, "update").await?;

        let course = self
            .catalog
            .get_course(&enrollment.course_id)
            .await?
            .ok_or_else(|| {
                ElimuError::NotFound(format!("Course {} not found", enrollment.course_id))
            })?;

        let transition = progress::apply(
            requested_lessons,
            course.lesson_count,
            enrollment.completed_at,
            DateTime::now(),
        )?;

        let was_completed = enrollment.is_completed();
        let updated = self
            .repo
            .apply_transition(enrollment_id, enrollment.version, &transition)
            .await?;

        if updated.is_completed() && !was_completed {
            info!(
                "Learner {} completed '{}' ({} lessons)",
                learner_id, course.title, course.lesson_count
            );
        }
        Ok(updated)
    }

    /// A learner's enrollments, newest first, joined with course summaries
    pub async fn list_enrollments(&self, learner_id: &str) -> Result<Vec<EnrollmentWithCourse>> {
        let enrollments = self.repo.find_by_learner(learner_id).await?;

        let mut results = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            let course = self.catalog.get_course(&enrollment.course_id).await?;
            results.push(EnrollmentWithCourse { enrollment, course });
        }
        Ok(results)
    }

    /// A single enrollment, owner-checked, joined with its course summary
    pub async fn get_enrollment(
        &self,
        enrollment_id: &str,
        learner_id: &str,
    ) -> Result<EnrollmentWithCourse> {
        let enrollment = self.owned_enrollment(enrollment_id, learner_id, "view").await?;
        let course = self.catalog.get_course(&enrollment.course_id).await?;
        Ok(EnrollmentWithCourse { enrollment, course })
    }

    /// Fetch an enrollment and verify the caller owns it
    pub(crate) async fn owned_enrollment(
        &self,
        enrollment_id: &str,
        learner_id: &str,
        action: &str,
    ) -> Result<EnrollmentDoc> {
        let enrollment = self
            .repo
            .find_by_id(enrollment_id)
            .await?
            .ok_or_else(|| {
                ElimuError::NotFound(format!("Enrollment {} not found", enrollment_id))
            })?;

        if enrollment.learner_id != learner_id {
            return Err(ElimuError::Unauthorized(format!(
                "Not allowed to {} this enrollment",
                action
            )));
        }
        Ok(enrollment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::db::schemas::EnrollmentStatus;

    struct Fixture {
        service: EnrollmentService,
        catalog: Arc<InMemoryCatalog>,
        course_id: String,
    }

    fn fixture(lesson_count: u32) -> Fixture {
        let repo = Arc::new(InMemoryEnrollmentStore::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let course_id = catalog.add_course("Web Development Basics", "Ahmed Hassan", lesson_count);
        Fixture {
            service: EnrollmentService::new(repo, Arc::clone(&catalog) as Arc<dyn CourseCatalog>),
            catalog,
            course_id,
        }
    }

    #[tokio::test]
    async fn test_enroll_creates_fresh_enrollment() {
        let fx = fixture(3);

        let enrollment = fx.service.enroll("learner-1", &fx.course_id).await.unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::InProgress);
        assert!(enrollment.completed_lessons.is_empty());
        assert!(enrollment.id_hex().is_some());

        let course = fx.catalog.get_course(&fx.course_id).await.unwrap().unwrap();
        assert_eq!(course.enrolled_count, 1);
    }

    #[tokio::test]
    async fn test_enroll_unknown_course() {
        let fx = fixture(3);
        let err = fx
            .service
            .enroll("learner-1", "64b000000000000000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, ElimuError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_double_enroll_counts_once() {
        // Scenario: enrolling twice in sequence conflicts, and the counter
        // moved by exactly one
        let fx = fixture(3);

        fx.service.enroll("learner-1", &fx.course_id).await.unwrap();
        let err = fx
            .service
            .enroll("learner-1", &fx.course_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ElimuError::AlreadyEnrolled));

        let course = fx.catalog.get_course(&fx.course_id).await.unwrap().unwrap();
        assert_eq!(course.enrolled_count, 1);
    }

    #[tokio::test]
    async fn test_concurrent_enrolls_one_winner() {
        let fx = fixture(3);
        let service = Arc::new(fx.service);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                let course_id = fx.course_id.clone();
                tokio::spawn(async move { service.enroll("learner-1", &course_id).await })
            })
            .collect();

        let mut wins = 0;
        for result in futures::future::join_all(tasks).await {
            match result.unwrap() {
                Ok(_) => wins += 1,
                Err(ElimuError::AlreadyEnrolled) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(wins, 1);

        let course = fx.catalog.get_course(&fx.course_id).await.unwrap().unwrap();
        assert_eq!(course.enrolled_count, 1);
    }

    #[tokio::test]
    async fn test_progress_lifecycle() {
        // Scenario: [] → [1] → [1,2,3] completed → [1,2] re-opened
        let fx = fixture(3);
        let enrollment = fx.service.enroll("learner-1", &fx.course_id).await.unwrap();
        let id = enrollment.id_hex().unwrap();

        let updated = fx
            .service
            .update_progress(&id, "learner-1", &[1])
            .await
            .unwrap();
        assert_eq!(updated.completed_lessons, vec![1]);
        assert_eq!(updated.status, EnrollmentStatus::InProgress);
        assert!(updated.completed_at.is_none());

        let completed = fx
            .service
            .update_progress(&id, "learner-1", &[1, 2, 3])
            .await
            .unwrap();
        assert_eq!(completed.status, EnrollmentStatus::Completed);
        let completed_at = completed.completed_at.expect("completion timestamp");

        // Saving the same full set again keeps the original timestamp
        let resaved = fx
            .service
            .update_progress(&id, "learner-1", &[1, 2, 3])
            .await
            .unwrap();
        assert_eq!(resaved.completed_at, Some(completed_at));

        let reopened = fx
            .service
            .update_progress(&id, "learner-1", &[1, 2])
            .await
            .unwrap();
        assert_eq!(reopened.status, EnrollmentStatus::InProgress);
        assert!(reopened.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_invalid_lessons_leave_state_unchanged() {
        // Scenario: [0, 5] on a 3-lesson course
        let fx = fixture(3);
        let enrollment = fx.service.enroll("learner-1", &fx.course_id).await.unwrap();
        let id = enrollment.id_hex().unwrap();

        fx.service
            .update_progress(&id, "learner-1", &[1])
            .await
            .unwrap();

        let err = fx
            .service
            .update_progress(&id, "learner-1", &[0, 5])
            .await
            .unwrap_err();
        match err {
            ElimuError::InvalidLesson { lessons } => assert_eq!(lessons, vec![0, 5]),
            other => panic!("expected InvalidLesson, got {other:?}"),
        }

        let current = fx
            .service
            .get_enrollment(&id, "learner-1")
            .await
            .unwrap()
            .enrollment;
        assert_eq!(current.completed_lessons, vec![1]);
        assert_eq!(current.version, 2);
    }

    #[tokio::test]
    async fn test_gapped_request_rejected() {
        let fx = fixture(3);
        let enrollment = fx.service.enroll("learner-1", &fx.course_id).await.unwrap();
        let id = enrollment.id_hex().unwrap();

        let err = fx
            .service
            .update_progress(&id, "learner-1", &[1, 3])
            .await
            .unwrap_err();
        assert!(matches!(err, ElimuError::OutOfOrder { missing: 2 }));
    }

    #[tokio::test]
    async fn test_update_requires_ownership() {
        let fx = fixture(3);
        let enrollment = fx.service.enroll("learner-1", &fx.course_id).await.unwrap();
        let id = enrollment.id_hex().unwrap();

        let err = fx
            .service
            .update_progress(&id, "learner-2", &[1])
            .await
            .unwrap_err();
        assert!(matches!(err, ElimuError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_zero_lesson_course_never_completes() {
        let fx = fixture(0);
        let enrollment = fx.service.enroll("learner-1", &fx.course_id).await.unwrap();
        let id = enrollment.id_hex().unwrap();

        let updated = fx
            .service
            .update_progress(&id, "learner-1", &[])
            .await
            .unwrap();
        assert_eq!(updated.status, EnrollmentStatus::InProgress);
        assert!(updated.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_list_enrollments_joins_courses() {
        let fx = fixture(3);
        let second_course = fx.catalog.add_course("Mobile App Development", "Grace Otieno", 5);

        fx.service.enroll("learner-1", &fx.course_id).await.unwrap();
        fx.service.enroll("learner-1", &second_course).await.unwrap();
        fx.service.enroll("learner-2", &fx.course_id).await.unwrap();

        let listed = fx.service.list_enrollments("learner-1").await.unwrap();
        assert_eq!(listed.len(), 2);
        for item in &listed {
            let course = item.course.as_ref().expect("course summary");
            assert!(!course.title.is_empty());
        }
    }
}

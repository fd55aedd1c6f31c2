//! Certificate eligibility view
//!
//! Read-only projection over completed enrollments. The rendering
//! collaborator draws the certificate image; this view only assembles the
//! data tuple it consumes and never mutates state.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::enrollment::{EnrollmentService, EnrollmentWithCourse};
use crate::identity::IdentityDirectory;
use crate::types::{ElimuError, Result};

/// Data tuple consumed by the certificate renderer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateData {
    pub learner_name: String,
    pub course_title: String,
    pub instructor_name: String,
    /// Completion date, YYYY-MM-DD
    pub completion_date: String,
}

/// Read path from a completed enrollment to certificate data
pub struct CertificateView {
    service: Arc<EnrollmentService>,
    identity: Arc<dyn IdentityDirectory>,
}

impl CertificateView {
    pub fn new(service: Arc<EnrollmentService>, identity: Arc<dyn IdentityDirectory>) -> Self {
        Self { service, identity }
    }

    /// Assemble certificate data for a completed enrollment.
    ///
    /// Owner-checked like every enrollment read. Fails with `NotEligible`
    /// until the enrollment reaches the completed state. When the stored
    /// completion timestamp is absent the current date is rendered instead;
    /// the fallback is display-only and nothing is written back.
    pub async fn certificate_data(
        &self,
        enrollment_id: &str,
        learner_id: &str,
    ) -> Result<CertificateData> {
        let EnrollmentWithCourse { enrollment, course } =
            self.service.get_enrollment(enrollment_id, learner_id).await?;

        if !enrollment.is_completed() {
            return Err(ElimuError::NotEligible);
        }

        let course = course.ok_or_else(|| {
            ElimuError::NotFound(format!("Course {} not found", enrollment.course_id))
        })?;

        let learner = self
            .identity
            .resolve(learner_id)
            .await?
            .ok_or_else(|| ElimuError::NotFound(format!("Learner {} not found", learner_id)))?;

        let completion_date = enrollment
            .completed_at
            .map(|ts| ts.to_chrono().format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());

        Ok(CertificateData {
            learner_name: learner.display_name,
            course_title: course.title,
            instructor_name: course.instructor,
            completion_date,
        })
    }
}

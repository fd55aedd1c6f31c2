//! Progress state machine
//!
//! Pure transition logic from (requested lessons, course lesson count,
//! previous completion timestamp) to the next enrollment state. Holds no
//! state and performs no I/O; the enrollment service persists the result.
//!
//! Lessons must be completed in order: a requested set is only accepted when
//! it is a contiguous prefix {1..=k}. Un-marking lesson n therefore requires
//! omitting every lesson above n as well. This is validated here rather than
//! trusted to the calling UI, so divergent clients cannot persist gapped sets
//! (lesson 5 complete while lesson 2 is not).

use bson::DateTime;

use crate::db::schemas::EnrollmentStatus;
use crate::types::{ElimuError, Result};

/// Computed next state for an enrollment's progress fields
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressTransition {
    /// Canonical (sorted, deduplicated) completed set
    pub completed_lessons: Vec<u32>,
    pub status: EnrollmentStatus,
    /// Completion timestamp carried into the stored document; `None` clears it
    pub completed_at: Option<DateTime>,
}

/// Compute the transition for a progress update.
///
/// `requested` is the caller-supplied lesson set, untrusted and signed so
/// negative values are reported rather than mangled. `previous_completed_at`
/// keeps a re-saved completion idempotent: the original timestamp survives.
///
/// Rejections leave no trace; the caller only persists an `Ok` transition.
pub fn apply(
    requested: &[i64],
    lesson_count: u32,
    previous_completed_at: Option<DateTime>,
    now: DateTime,
) -> Result<ProgressTransition> {
    // Bounds first: every requested value must name a real lesson
    let mut invalid: Vec<i64> = requested
        .iter()
        .copied()
        .filter(|&n| n < 1 || n > i64::from(lesson_count))
        .collect();
    if !invalid.is_empty() {
        invalid.sort_unstable();
        invalid.dedup();
        return Err(ElimuError::InvalidLesson { lessons: invalid });
    }

    // Canonical form: sorted, deduplicated
    let mut lessons: Vec<u32> = requested.iter().map(|&n| n as u32).collect();
    lessons.sort_unstable();
    lessons.dedup();

    // Ordering policy: the set must be exactly {1..=k}
    for (i, &lesson) in lessons.iter().enumerate() {
        let expected = i as u32 + 1;
        if lesson != expected {
            return Err(ElimuError::OutOfOrder { missing: expected });
        }
    }

    // A course with no lessons can never be finished
    let complete = lesson_count > 0 && lessons.len() == lesson_count as usize;

    Ok(if complete {
        ProgressTransition {
            completed_lessons: lessons,
            status: EnrollmentStatus::Completed,
            completed_at: Some(previous_completed_at.unwrap_or(now)),
        }
    } else {
        ProgressTransition {
            completed_lessons: lessons,
            status: EnrollmentStatus::InProgress,
            completed_at: None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> DateTime {
        DateTime::from_millis(millis)
    }

    #[test]
    fn test_empty_set_stays_in_progress() {
        let t = apply(&[], 3, None, at(1)).unwrap();
        assert!(t.completed_lessons.is_empty());
        assert_eq!(t.status, EnrollmentStatus::InProgress);
        assert!(t.completed_at.is_none());
    }

    #[test]
    fn test_partial_progress() {
        let t = apply(&[1], 3, None, at(1)).unwrap();
        assert_eq!(t.completed_lessons, vec![1]);
        assert_eq!(t.status, EnrollmentStatus::InProgress);
        assert!(t.completed_at.is_none());
    }

    #[test]
    fn test_full_set_completes() {
        let t = apply(&[1, 2, 3], 3, None, at(42)).unwrap();
        assert_eq!(t.completed_lessons, vec![1, 2, 3]);
        assert_eq!(t.status, EnrollmentStatus::Completed);
        assert_eq!(t.completed_at, Some(at(42)));
    }

    #[test]
    fn test_completion_timestamp_is_idempotent() {
        // Re-saving a completed course keeps the original timestamp
        let t = apply(&[1, 2, 3], 3, Some(at(42)), at(99)).unwrap();
        assert_eq!(t.completed_at, Some(at(42)));
    }

    #[test]
    fn test_unmarking_clears_completion() {
        let t = apply(&[1, 2], 3, Some(at(42)), at(99)).unwrap();
        assert_eq!(t.completed_lessons, vec![1, 2]);
        assert_eq!(t.status, EnrollmentStatus::InProgress);
        assert!(t.completed_at.is_none());
    }

    #[test]
    fn test_out_of_range_lessons_rejected() {
        let err = apply(&[0, 5], 3, None, at(1)).unwrap_err();
        match err {
            ElimuError::InvalidLesson { lessons } => assert_eq!(lessons, vec![0, 5]),
            other => panic!("expected InvalidLesson, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_lessons_rejected() {
        let err = apply(&[-1, 2], 3, None, at(1)).unwrap_err();
        match err {
            ElimuError::InvalidLesson { lessons } => assert_eq!(lessons, vec![-1]),
            other => panic!("expected InvalidLesson, got {other:?}"),
        }
    }

    #[test]
    fn test_gapped_set_rejected() {
        let err = apply(&[1, 3], 3, None, at(1)).unwrap_err();
        match err {
            ElimuError::OutOfOrder { missing } => assert_eq!(missing, 2),
            other => panic!("expected OutOfOrder, got {other:?}"),
        }
    }

    #[test]
    fn test_set_not_starting_at_one_rejected() {
        let err = apply(&[2], 3, None, at(1)).unwrap_err();
        match err {
            ElimuError::OutOfOrder { missing } => assert_eq!(missing, 1),
            other => panic!("expected OutOfOrder, got {other:?}"),
        }
    }

    #[test]
    fn test_bounds_win_over_ordering() {
        // Both violations present; the bounds check reports first
        let err = apply(&[4], 3, None, at(1)).unwrap_err();
        assert!(matches!(err, ElimuError::InvalidLesson { .. }));
    }

    #[test]
    fn test_duplicates_collapse() {
        let t = apply(&[1, 1, 2, 2], 3, None, at(1)).unwrap();
        assert_eq!(t.completed_lessons, vec![1, 2]);
    }

    #[test]
    fn test_empty_course_never_completes() {
        let t = apply(&[], 0, None, at(1)).unwrap();
        assert_eq!(t.status, EnrollmentStatus::InProgress);
        assert!(t.completed_at.is_none());

        // Any non-empty request against a zero-lesson course is out of range
        let err = apply(&[1], 0, None, at(1)).unwrap_err();
        assert!(matches!(err, ElimuError::InvalidLesson { .. }));
    }
}

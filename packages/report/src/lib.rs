#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Report lifecycle: creation, triage status changes, and upvote toggles.
//!
//! Every mutation validates its inputs fully before touching the store, so
//! partial records are never written, and publishes a change notice on the
//! [`ReportFeed`] after the store confirms the write. Nothing here retries
//! on persistence failure — resubmission is the caller's retry mechanism.
//! The one exception is the upvote toggle, whose compare-and-swap loop
//! retries a bounded number of times when a concurrent toggle wins the
//! race.

use std::collections::BTreeSet;

use civic_lens_database::feed::{ChangeKind, ReportFeed};
use civic_lens_database::{DbError, queries};
use civic_lens_database_models::{GeoPoint, NewReport, ReportRow};
use civic_lens_report_models::{IssueSeverity, ReportStatus};
use switchy_database::Database;

/// Attempts for the upvote compare-and-swap before giving up.
const MAX_TOGGLE_ATTEMPTS: u32 = 3;

/// Errors that can occur during report lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// A required field failed validation.
    #[error("Invalid input: {message}")]
    InputInvalid {
        /// Description of the failed constraint.
        message: String,
    },

    /// The submission carried no location.
    #[error("Location unavailable")]
    LocationUnavailable,

    /// The caller lacks operator rights for this operation.
    #[error("Unauthorized")]
    Unauthorized,

    /// No report with the given id exists.
    #[error("Report not found: {id}")]
    NotFound {
        /// The missing report id.
        id: String,
    },

    /// The upvote swap kept losing to concurrent toggles.
    #[error("Concurrent update conflict on report {id}")]
    Conflict {
        /// The contended report id.
        id: String,
    },

    /// Store I/O failure.
    #[error("Persistence error: {0}")]
    Persistence(#[from] DbError),
}

/// Identity attached to a mutating call.
#[derive(Debug, Clone)]
pub struct Caller {
    /// The signed-in user id.
    pub user_id: String,
    /// Whether this caller holds municipal operator rights.
    pub is_operator: bool,
}

impl Caller {
    /// Creates a caller identity.
    #[must_use]
    pub fn new(user_id: impl Into<String>, is_operator: bool) -> Self {
        Self {
            user_id: user_id.into(),
            is_operator,
        }
    }
}

/// A report submission, as gathered from the reporting user.
///
/// `location` is optional here because geolocation capture can fail or be
/// denied; [`create`] rejects such submissions before any write happens.
#[derive(Debug, Clone)]
pub struct ReportSubmission {
    /// Image URI or inline base64 data URL.
    pub image_url: String,
    /// Captured device location, if any.
    pub location: Option<GeoPoint>,
    /// Classifier-assigned issue label.
    pub category: String,
    /// Classifier-assigned severity tier.
    pub severity: IssueSeverity,
    /// Description (classifier-supplied, user-editable before submission).
    pub description: String,
    /// The reporting user.
    pub user_id: String,
}

/// Net effect of an upvote toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleResult {
    /// The user's upvote was added.
    Added,
    /// The user's upvote was removed.
    Removed,
}

impl ToggleResult {
    /// Whether the user is upvoting the report after the toggle.
    #[must_use]
    pub const fn upvoted(self) -> bool {
        matches!(self, Self::Added)
    }
}

/// Outcome of [`toggle_upvote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Net effect for the toggling user.
    pub result: ToggleResult,
    /// Upvote count after the toggle.
    pub upvote_count: usize,
}

/// Creates a new report.
///
/// All fields are validated before the single insert, so a failure at any
/// point leaves the store untouched. The new report starts in
/// [`ReportStatus::Todo`] with an empty upvote set and becomes visible to
/// all feed subscribers.
///
/// # Errors
///
/// * [`ReportError::LocationUnavailable`] if no location was captured.
/// * [`ReportError::InputInvalid`] if the location is out of WGS84 range
///   or a required text field is empty.
/// * [`ReportError::Persistence`] if the store write fails.
pub async fn create(
    db: &dyn Database,
    feed: &ReportFeed,
    submission: ReportSubmission,
) -> Result<ReportRow, ReportError> {
    let location = validate(&submission)?;

    let new_report = NewReport {
        image_url: submission.image_url,
        location,
        category: submission.category,
        severity: submission.severity,
        description: submission.description,
        user_id: submission.user_id,
    };

    let row = queries::insert_report(db, &new_report).await?;
    log::info!(
        "Created report {} ({}, severity {})",
        row.id,
        row.category,
        row.severity
    );

    feed.publish(ChangeKind::Created, &row.id);
    Ok(row)
}

/// Changes a report's triage status.
///
/// Requires an operator caller. Any status-to-status transition is
/// permitted, including backward moves such as reopening a Done report.
///
/// # Errors
///
/// * [`ReportError::Unauthorized`] if the caller is not an operator.
/// * [`ReportError::NotFound`] if the report does not exist.
/// * [`ReportError::Persistence`] if the store write fails.
pub async fn set_status(
    db: &dyn Database,
    feed: &ReportFeed,
    caller: &Caller,
    id: &str,
    new_status: ReportStatus,
) -> Result<(), ReportError> {
    if !caller.is_operator {
        return Err(ReportError::Unauthorized);
    }

    let updated = queries::set_report_status(db, id, new_status).await?;
    if !updated {
        return Err(ReportError::NotFound { id: id.to_string() });
    }

    log::info!("Report {id} status set to {new_status} by {}", caller.user_id);
    feed.publish(ChangeKind::StatusChanged, id);
    Ok(())
}

/// Toggles a user's upvote on a report.
///
/// The membership flip is applied with a compare-and-swap guarded on the
/// upvote text previously read, so two concurrent toggles cannot lose an
/// update; the loser of the race re-reads and retries. Legacy duplicate
/// entries are collapsed on the way through.
///
/// # Errors
///
/// * [`ReportError::Unauthorized`] if `user_id` is empty.
/// * [`ReportError::NotFound`] if the report does not exist.
/// * [`ReportError::Conflict`] if every swap attempt lost the race.
/// * [`ReportError::Persistence`] if the store I/O fails.
pub async fn toggle_upvote(
    db: &dyn Database,
    feed: &ReportFeed,
    id: &str,
    user_id: &str,
) -> Result<ToggleOutcome, ReportError> {
    if user_id.trim().is_empty() {
        return Err(ReportError::Unauthorized);
    }

    for attempt in 1..=MAX_TOGGLE_ATTEMPTS {
        let observed = queries::get_report_upvotes(db, id)
            .await?
            .ok_or_else(|| ReportError::NotFound { id: id.to_string() })?;

        let upvotes: Vec<String> = serde_json::from_str(&observed).unwrap_or_default();
        let (next, result) = toggle_membership(upvotes, user_id);

        if queries::swap_report_upvotes(db, id, &observed, &next).await? {
            feed.publish(ChangeKind::UpvoteToggled, id);
            return Ok(ToggleOutcome {
                result,
                upvote_count: next.len(),
            });
        }

        log::debug!("Upvote swap on {id} lost the race (attempt {attempt}), retrying");
    }

    Err(ReportError::Conflict { id: id.to_string() })
}

/// Number of upvotes on a report.
#[must_use]
pub fn upvote_count(report: &ReportRow) -> usize {
    report.upvotes.len()
}

/// Whether the given user has upvoted the report.
#[must_use]
pub fn has_upvoted(report: &ReportRow, user_id: &str) -> bool {
    report.upvotes.iter().any(|u| u == user_id)
}

/// Validates a submission, returning its location.
fn validate(submission: &ReportSubmission) -> Result<GeoPoint, ReportError> {
    let location = submission
        .location
        .ok_or(ReportError::LocationUnavailable)?;

    if !location.is_valid() {
        return Err(ReportError::InputInvalid {
            message: format!(
                "Location out of range: {}, {}",
                location.latitude, location.longitude
            ),
        });
    }

    for (field, value) in [
        ("category", &submission.category),
        ("description", &submission.description),
        ("userId", &submission.user_id),
    ] {
        if value.trim().is_empty() {
            return Err(ReportError::InputInvalid {
                message: format!("Missing required field: {field}"),
            });
        }
    }

    Ok(location)
}

/// Flips a user's membership in the upvote set.
///
/// Deduplicates while preserving first-seen order, so legacy rows with
/// duplicate entries converge to unique membership.
fn toggle_membership(upvotes: Vec<String>, user_id: &str) -> (Vec<String>, ToggleResult) {
    let present = upvotes.iter().any(|u| u == user_id);

    let mut seen = BTreeSet::new();
    let mut next: Vec<String> = upvotes
        .into_iter()
        .filter(|u| u != user_id && seen.insert(u.clone()))
        .collect();

    if present {
        (next, ToggleResult::Removed)
    } else {
        next.push(user_id.to_string());
        (next, ToggleResult::Added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn submission() -> ReportSubmission {
        ReportSubmission {
            image_url: "data:image/jpeg;base64,Zm9v".to_string(),
            location: Some(GeoPoint::new(40.7128, -74.0060)),
            category: "Pothole".to_string(),
            severity: IssueSeverity::High,
            description: "Large pothole in the road".to_string(),
            user_id: "user-1".to_string(),
        }
    }

    fn report_with_upvotes(upvotes: &[&str]) -> ReportRow {
        ReportRow {
            id: "r1".to_string(),
            image_url: "https://example.com/img.jpg".to_string(),
            latitude: 40.7128,
            longitude: -74.0060,
            category: "Pothole".to_string(),
            severity: "High".to_string(),
            description: "Large pothole".to_string(),
            created_at: Utc::now(),
            user_id: "user-1".to_string(),
            status: None,
            upvotes: upvotes.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn validates_complete_submission() {
        assert!(validate(&submission()).is_ok());
    }

    #[test]
    fn rejects_missing_location() {
        let mut s = submission();
        s.location = None;
        assert!(matches!(
            validate(&s),
            Err(ReportError::LocationUnavailable)
        ));
    }

    #[test]
    fn rejects_out_of_range_location() {
        let mut s = submission();
        s.location = Some(GeoPoint::new(91.0, 0.0));
        assert!(matches!(validate(&s), Err(ReportError::InputInvalid { .. })));
    }

    #[test]
    fn rejects_empty_fields() {
        for field in ["category", "description", "user_id"] {
            let mut s = submission();
            match field {
                "category" => s.category = "  ".to_string(),
                "description" => s.description = String::new(),
                _ => s.user_id = String::new(),
            }
            assert!(
                matches!(validate(&s), Err(ReportError::InputInvalid { .. })),
                "expected InputInvalid for empty {field}"
            );
        }
    }

    #[test]
    fn toggle_adds_then_removes() {
        let (after_add, result) = toggle_membership(Vec::new(), "userA");
        assert_eq!(result, ToggleResult::Added);
        assert!(result.upvoted());
        assert_eq!(after_add, vec!["userA".to_string()]);

        let (after_remove, result) = toggle_membership(after_add, "userA");
        assert_eq!(result, ToggleResult::Removed);
        assert!(!result.upvoted());
        assert!(after_remove.is_empty());
    }

    #[test]
    fn double_toggle_restores_original_membership() {
        let original = vec!["userA".to_string(), "userB".to_string()];
        let (once, _) = toggle_membership(original.clone(), "userC");
        let (twice, _) = toggle_membership(once, "userC");
        assert_eq!(twice, original);
    }

    #[test]
    fn toggle_preserves_other_members() {
        let (next, result) =
            toggle_membership(vec!["userA".to_string(), "userB".to_string()], "userA");
        assert_eq!(result, ToggleResult::Removed);
        assert_eq!(next, vec!["userB".to_string()]);
    }

    #[test]
    fn toggle_collapses_legacy_duplicates() {
        let dirty = vec![
            "userA".to_string(),
            "userB".to_string(),
            "userB".to_string(),
        ];
        let (next, result) = toggle_membership(dirty, "userC");
        assert_eq!(result, ToggleResult::Added);
        assert_eq!(
            next,
            vec![
                "userA".to_string(),
                "userB".to_string(),
                "userC".to_string(),
            ]
        );
    }

    #[test]
    fn counts_and_membership() {
        let report = report_with_upvotes(&["userA", "userB"]);
        assert_eq!(upvote_count(&report), 2);
        assert!(has_upvoted(&report, "userA"));
        assert!(!has_upvoted(&report, "userC"));
        assert_eq!(upvote_count(&report_with_upvotes(&[])), 0);
    }
}

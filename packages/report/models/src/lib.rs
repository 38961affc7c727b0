#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Severity and triage status taxonomy for citizen-submitted reports.
//!
//! These are the canonical enumerations used across the entire CivicLens
//! system. Stored rows may carry legacy case variants ("HIGH", "Pending");
//! parsing is case-insensitive and [`ReportStatus::from_stored`] defines
//! the defaulting rule for absent or legacy status values.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Urgency tier assigned to a report by the image classifier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase", ascii_case_insensitive)]
pub enum IssueSeverity {
    /// Immediate safety hazard (large potholes, exposed wires, flooding).
    High,
    /// Moderate inconvenience (moderate trash, minor damage).
    Medium,
    /// Minor aesthetic issues (small litter, cosmetic damage).
    Low,
}

impl IssueSeverity {
    /// Returns the base heat-map weight for this severity tier.
    #[must_use]
    pub const fn base_weight(self) -> f64 {
        match self {
            Self::High => 3.0,
            Self::Medium => 2.0,
            Self::Low => 1.0,
        }
    }

    /// Returns the map marker icon URL used by the frontend for this tier.
    #[must_use]
    pub const fn marker_icon_url(self) -> &'static str {
        match self {
            Self::High => "http://maps.google.com/mapfiles/ms/icons/red-dot.png",
            Self::Medium => "http://maps.google.com/mapfiles/ms/icons/orange-dot.png",
            Self::Low => "http://maps.google.com/mapfiles/ms/icons/yellow-dot.png",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::High, Self::Medium, Self::Low]
    }
}

/// Triage state of a report on the admin board.
///
/// Serialized in kebab-case (`todo`, `in-progress`, `done`) to match the
/// stored document field.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ReportStatus {
    /// Initial state; also the effective state of rows with no status field.
    Todo,
    /// A repair crew has been assigned.
    InProgress,
    /// The issue has been resolved.
    Done,
}

impl ReportStatus {
    /// Resolves the effective status of a stored row.
    ///
    /// Absent values, the legacy `pending` label, and unrecognized strings
    /// all resolve to [`Self::Todo`], so every report lands in exactly one
    /// triage bucket.
    #[must_use]
    pub fn from_stored(stored: Option<&str>) -> Self {
        stored
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::Todo)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Todo, Self::InProgress, Self::Done]
    }
}

/// Classification result for an image that depicts a civic issue.
///
/// This is the shape the vision provider is prompted to return; the
/// `type` field name is part of that contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedIssue {
    /// Free-text issue label, e.g. "Pothole".
    #[serde(rename = "type")]
    pub category: String,
    /// Assigned urgency tier.
    pub severity: IssueSeverity,
    /// One-sentence description of the issue.
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parses_case_insensitively() {
        for raw in ["High", "high", "HIGH"] {
            assert_eq!(raw.parse::<IssueSeverity>().unwrap(), IssueSeverity::High);
        }
        assert_eq!(
            "medium".parse::<IssueSeverity>().unwrap(),
            IssueSeverity::Medium
        );
        assert!("urgent".parse::<IssueSeverity>().is_err());
    }

    #[test]
    fn severity_serializes_pascal_case() {
        let json = serde_json::to_string(&IssueSeverity::High).unwrap();
        assert_eq!(json, "\"High\"");
    }

    #[test]
    fn status_round_trips_kebab_case() {
        for status in ReportStatus::all() {
            let label = status.to_string();
            assert_eq!(label.parse::<ReportStatus>().unwrap(), *status);
        }
        assert_eq!(ReportStatus::InProgress.to_string(), "in-progress");
    }

    #[test]
    fn stored_status_defaults_to_todo() {
        assert_eq!(ReportStatus::from_stored(None), ReportStatus::Todo);
        assert_eq!(ReportStatus::from_stored(Some("pending")), ReportStatus::Todo);
        assert_eq!(ReportStatus::from_stored(Some("Pending")), ReportStatus::Todo);
        assert_eq!(
            ReportStatus::from_stored(Some("in-progress")),
            ReportStatus::InProgress
        );
        assert_eq!(ReportStatus::from_stored(Some("done")), ReportStatus::Done);
    }

    #[test]
    fn classified_issue_uses_type_field() {
        let issue: ClassifiedIssue = serde_json::from_str(
            r#"{"type": "Pothole", "severity": "High", "description": "Large pothole in the road."}"#,
        )
        .unwrap();
        assert_eq!(issue.category, "Pothole");
        assert_eq!(issue.severity, IssueSeverity::High);
    }

    #[test]
    fn heat_weights_match_severity_tiers() {
        assert!((IssueSeverity::High.base_weight() - 3.0).abs() < f64::EPSILON);
        assert!((IssueSeverity::Medium.base_weight() - 2.0).abs() < f64::EPSILON);
        assert!((IssueSeverity::Low.base_weight() - 1.0).abs() < f64::EPSILON);
    }
}

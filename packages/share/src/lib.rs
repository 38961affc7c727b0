#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Share-intent URL generators for escalating civic issues.
//!
//! Pure string templating: builds pre-filled Twitter/X, email, and
//! WhatsApp links for a report. No network calls happen here; the caller
//! opens the returned URL.

use civic_lens_database_models::GeoPoint;
use civic_lens_report_models::IssueSeverity;
use url::Url;

/// Municipal complaint inbox used in the email template.
const COMPLAINT_ADDRESS: &str = "complaint@municipalcorp.gov";

/// A report as presented in share messages.
#[derive(Debug, Clone)]
pub struct ShareIssue {
    /// Issue label, e.g. "Pothole".
    pub category: String,
    /// Severity tier.
    pub severity: IssueSeverity,
    /// Issue description.
    pub description: String,
    /// Resolved street address, or a coordinate label fallback.
    pub address: String,
    /// Report location.
    pub location: GeoPoint,
    /// Whether a photo is attached to the report.
    pub has_photo: bool,
}

/// Builds a Twitter/X web-intent URL with a pre-filled message.
#[must_use]
pub fn twitter_share_url(issue: &ShareIssue) -> String {
    let emoji = if issue.severity == IssueSeverity::High {
        "🚨"
    } else {
        "⚠️"
    };
    let photo_note = if issue.has_photo {
        " 📸 Photo attached"
    } else {
        ""
    };

    let text = format!(
        "{emoji} Found a {} Severity {} at {}. \n\n\"{}\"\n\nHelp our city by fixing this! Use #CivicLens to report civic issues.{photo_note}",
        issue.severity, issue.category, issue.address, issue.description
    );

    build_url(
        "https://twitter.com/intent/tweet",
        &[("text", text.as_str()), ("hashtags", "CivicLens,FixOurCity")],
    )
}

/// Builds a `mailto:` URL addressed to the municipal complaint inbox.
#[must_use]
pub fn email_share_url(issue: &ShareIssue) -> String {
    let subject = format!(
        "URGENT: {} Severity {} at {}",
        issue.severity, issue.category, issue.address
    );
    let body = format!(
        "Dear Municipal Corporation,\n\n\
         I am reporting a {} severity civic issue that needs immediate attention:\n\n\
         Issue Type: {}\n\
         Location: {}\n\
         Coordinates: {}, {}\n\
         Description: {}\n\n\
         This issue has been reported through CivicLens - a citizen civic reporting platform.\n\n\
         Please take necessary action to resolve this issue.\n\n\
         Regards,\nA Concerned Citizen",
        issue.severity,
        issue.category,
        issue.address,
        issue.location.latitude,
        issue.location.longitude,
        issue.description
    );

    build_url(
        &format!("mailto:{COMPLAINT_ADDRESS}"),
        &[("subject", subject.as_str()), ("body", body.as_str())],
    )
}

/// Builds a WhatsApp share URL with a pre-filled message.
#[must_use]
pub fn whatsapp_share_url(issue: &ShareIssue) -> String {
    let text = format!(
        "🚨 Civic Issue Alert!\n\nType: {}\nSeverity: {}\nLocation: {}\n\nDescription: {}\n\nReported via CivicLens 📍",
        issue.category, issue.severity, issue.address, issue.description
    );

    build_url("https://wa.me/", &[("text", text.as_str())])
}

/// Assembles a URL with percent-encoded query parameters.
///
/// `query_pairs_mut` form-encodes spaces as `+`, which mail clients and
/// the share intents render literally; rewrite them to `%20`.
fn build_url(base: &str, params: &[(&str, &str)]) -> String {
    let mut url = Url::parse(base).expect("share URL base is valid");
    url.query_pairs_mut().extend_pairs(params);
    url.to_string().replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue() -> ShareIssue {
        ShareIssue {
            category: "Pothole".to_string(),
            severity: IssueSeverity::High,
            description: "Large pothole near the crosswalk".to_string(),
            address: "City Hall Park, New York".to_string(),
            location: GeoPoint::new(40.7128, -74.0060),
            has_photo: true,
        }
    }

    #[test]
    fn twitter_url_embeds_encoded_message() {
        let url = twitter_share_url(&issue());
        assert!(url.starts_with("https://twitter.com/intent/tweet?text="));
        assert!(url.contains("hashtags=CivicLens%2CFixOurCity"));
        assert!(url.contains("Pothole"));
        // Spaces are percent-encoded, never form-encoded.
        assert!(!url.contains('+'));
        assert!(url.contains("%20"));
    }

    #[test]
    fn twitter_emoji_tracks_severity() {
        let mut low = issue();
        low.severity = IssueSeverity::Low;
        assert!(twitter_share_url(&issue()).contains("%F0%9F%9A%A8"));
        assert!(twitter_share_url(&low).contains("%E2%9A%A0"));
    }

    #[test]
    fn email_url_targets_complaint_inbox() {
        let url = email_share_url(&issue());
        assert!(url.starts_with("mailto:complaint@municipalcorp.gov?subject="));
        assert!(url.contains("body="));
        assert!(url.contains("40.7128"));
        assert!(url.contains("-74.006"));
    }

    #[test]
    fn whatsapp_url_encodes_newlines() {
        let url = whatsapp_share_url(&issue());
        assert!(url.starts_with("https://wa.me/?text="));
        assert!(url.contains("%0A"));
        assert!(!url.contains('\n'));
    }

    #[test]
    fn free_text_is_fully_escaped() {
        let mut spicy = issue();
        spicy.description = "50% grade & \"deep\" hole?".to_string();
        let url = twitter_share_url(&spicy);
        assert!(!url.contains('"'));
        assert!(url.contains("50%25"));
        assert!(url.contains("%26"));
    }
}

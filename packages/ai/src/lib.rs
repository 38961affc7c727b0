#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Image classification over an LLM vision provider.
//!
//! Given a photo, the provider returns an issue category, severity tier,
//! and one-line description, or the bare word `null` when the image does
//! not depict a civic issue. Supports Google Gemini and any
//! `OpenAI`-compatible chat-completions endpoint (vLLM, Ollama, LM Studio)
//! selected via the `AI_PROVIDER` environment variable.

pub mod providers;

use std::sync::LazyLock;

use civic_lens_report_models::ClassifiedIssue;
use providers::VisionProvider;
use regex::Regex;
use thiserror::Error;

/// Markdown code fences some models wrap around JSON output.
static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\n?").expect("valid regex"));

/// The classification prompt.
///
/// The JSON shape and the bare-`null` rejection token are a contract with
/// [`parse_classification`]; change them together.
const CLASSIFY_PROMPT: &str = r#"Analyze this image. If it shows a civic issue (pothole, trash, broken infrastructure, damaged roads, street lighting issues, illegal dumping, graffiti, broken sidewalks, etc), return ONLY a JSON string in this exact format: {"type": "Issue Type", "severity": "High/Medium/Low", "description": "1 sentence description"}.

Severity guidelines:
- High: Immediate safety hazard (large potholes, exposed wires, major flooding)
- Medium: Moderate inconvenience (moderate trash, minor damage)
- Low: Minor aesthetic issues (small litter, cosmetic damage)

If the image does NOT show a civic issue, return only the word: null

Return ONLY the JSON or null, no other text."#;

/// Errors that can occur during classification.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The provider answered with neither the JSON contract nor `null`.
    #[error("Malformed classification: {message}")]
    Malformed {
        /// Description of the contract violation.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// Classifies an image.
///
/// Returns `Ok(None)` when the image does not depict a civic issue.
///
/// # Errors
///
/// Returns [`AiError`] if the provider call fails or its answer violates
/// the JSON-or-`null` contract.
pub async fn classify(
    provider: &dyn VisionProvider,
    image_b64: &str,
    mime_type: &str,
) -> Result<Option<ClassifiedIssue>, AiError> {
    let text = provider
        .analyze_image(CLASSIFY_PROMPT, image_b64, mime_type)
        .await?;

    parse_classification(&text)
}

/// Parses the provider's answer against the classification contract.
///
/// Accepts the JSON object (optionally wrapped in markdown code fences)
/// or the bare word `null` in any case. Anything else is a hard error —
/// a silently mis-parsed classification would file a report with wrong
/// metadata.
fn parse_classification(text: &str) -> Result<Option<ClassifiedIssue>, AiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return Ok(None);
    }

    let cleaned = CODE_FENCE_RE.replace_all(trimmed, "");
    let issue: ClassifiedIssue =
        serde_json::from_str(cleaned.trim()).map_err(|e| AiError::Malformed {
            message: format!("Not the expected JSON shape: {e}"),
        })?;

    if issue.category.trim().is_empty() || issue.description.trim().is_empty() {
        return Err(AiError::Malformed {
            message: "Empty type or description field".to_string(),
        });
    }

    Ok(Some(issue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_lens_report_models::IssueSeverity;

    #[test]
    fn parses_plain_json_answer() {
        let issue = parse_classification(
            r#"{"type": "Pothole", "severity": "High", "description": "Large pothole in the road."}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(issue.category, "Pothole");
        assert_eq!(issue.severity, IssueSeverity::High);
    }

    #[test]
    fn strips_markdown_fences() {
        let fenced = "```json\n{\"type\": \"Garbage\", \"severity\": \"Medium\", \"description\": \"Overflowing bin.\"}\n```";
        let issue = parse_classification(fenced).unwrap().unwrap();
        assert_eq!(issue.category, "Garbage");
        assert_eq!(issue.severity, IssueSeverity::Medium);
    }

    #[test]
    fn null_answer_means_not_a_civic_issue() {
        assert!(parse_classification("null").unwrap().is_none());
        assert!(parse_classification("NULL").unwrap().is_none());
        assert!(parse_classification("  null  ").unwrap().is_none());
        assert!(parse_classification("").unwrap().is_none());
    }

    #[test]
    fn malformed_answers_are_hard_errors() {
        assert!(matches!(
            parse_classification("I think this is a pothole."),
            Err(AiError::Malformed { .. })
        ));
        assert!(matches!(
            parse_classification(r#"{"type": "Pothole"}"#),
            Err(AiError::Malformed { .. })
        ));
        assert!(matches!(
            parse_classification(
                r#"{"type": "", "severity": "Low", "description": "Something."}"#
            ),
            Err(AiError::Malformed { .. })
        ));
        // Severity outside the taxonomy.
        assert!(matches!(
            parse_classification(
                r#"{"type": "Pothole", "severity": "Critical", "description": "Bad."}"#
            ),
            Err(AiError::Malformed { .. })
        ));
    }
}

//! Google Gemini vision provider implementation.
//!
//! Uses the `generateContent` endpoint with inline image data.

use serde::{Deserialize, Serialize};

use super::VisionProvider;
use crate::AiError;

/// Gemini API provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
    #[must_use]
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        inline_data: GeminiInlineData<'a>,
    },
}

#[derive(Serialize)]
struct GeminiInlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[async_trait::async_trait]
impl VisionProvider for GeminiProvider {
    async fn analyze_image(
        &self,
        prompt: &str,
        image_b64: &str,
        mime_type: &str,
    ) -> Result<String, AiError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::Text { text: prompt },
                    GeminiPart::InlineData {
                        inline_data: GeminiInlineData {
                            mime_type,
                            data: image_b64,
                        },
                    },
                ],
            }],
        };

        let resp = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiError>(&body)
                .map_or_else(|_| format!("HTTP {status}: {body}"), |e| e.error.message);
            return Err(AiError::Provider { message });
        }

        let body: serde_json::Value = serde_json::from_str(&body)?;
        extract_text(&body)
    }
}

/// Extracts the concatenated text parts of the first candidate.
fn extract_text(body: &serde_json::Value) -> Result<String, AiError> {
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| AiError::Provider {
            message: "No candidates in Gemini response".to_string(),
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_candidate_text() {
        let body = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "{\"type\": \"Pothole\", "},
                        {"text": "\"severity\": \"High\", \"description\": \"Deep pothole.\"}"}
                    ],
                    "role": "model"
                },
                "finishReason": "STOP"
            }]
        });

        let text = extract_text(&body).unwrap();
        assert!(text.starts_with("{\"type\": \"Pothole\""));
        assert!(text.ends_with("pothole.\"}"));
    }

    #[test]
    fn missing_candidates_is_a_provider_error() {
        let body = serde_json::json!({"candidates": []});
        assert!(matches!(
            extract_text(&body),
            Err(AiError::Provider { .. })
        ));
    }
}

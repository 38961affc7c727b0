//! `OpenAI`-compatible vision provider implementation.
//!
//! Targets the chat-completions API with an `image_url` data-URL part,
//! which vLLM, Ollama, and LM Studio also speak.

use serde::{Deserialize, Serialize};

use super::VisionProvider;
use crate::AiError;

/// `OpenAI`-compatible API provider.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI`-compatible provider.
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
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: Vec<OpenAiContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum OpenAiContentPart<'a> {
    #[serde(rename = "text")]
    Text { text: &'a str },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: OpenAiImageUrl },
}

#[derive(Serialize)]
struct OpenAiImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

#[async_trait::async_trait]
impl VisionProvider for OpenAiProvider {
    async fn analyze_image(
        &self,
        prompt: &str,
        image_b64: &str,
        mime_type: &str,
    ) -> Result<String, AiError> {
        let request = OpenAiRequest {
            model: &self.model,
            messages: vec![OpenAiMessage {
                role: "user",
                content: vec![
                    OpenAiContentPart::Text { text: prompt },
                    OpenAiContentPart::ImageUrl {
                        image_url: OpenAiImageUrl {
                            url: format!("data:{mime_type};base64,{image_b64}"),
                        },
                    },
                ],
            }],
            max_tokens: 1024,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map_or_else(|_| format!("HTTP {status}: {body}"), |e| e.error.message);
            return Err(AiError::Provider { message });
        }

        let response: OpenAiResponse = serde_json::from_str(&body)?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::Provider {
                message: "No choices in OpenAI response".to_string(),
            })?;

        choice.message.content.ok_or_else(|| AiError::Provider {
            message: "Empty message content in OpenAI response".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_data_url_part() {
        let request = OpenAiRequest {
            model: "gpt-4o-mini",
            messages: vec![OpenAiMessage {
                role: "user",
                content: vec![
                    OpenAiContentPart::Text { text: "classify" },
                    OpenAiContentPart::ImageUrl {
                        image_url: OpenAiImageUrl {
                            url: "data:image/jpeg;base64,Zm9v".to_string(),
                        },
                    },
                ],
            }],
            max_tokens: 1024,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert_eq!(json["messages"][0]["content"][1]["type"], "image_url");
        assert_eq!(
            json["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,Zm9v"
        );
    }

    #[test]
    fn response_text_deserializes() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "null"}}]}"#;
        let response: OpenAiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("null")
        );
    }
}

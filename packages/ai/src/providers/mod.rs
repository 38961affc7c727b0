//! Vision provider abstraction and implementations.
//!
//! Supports Google Gemini and any `OpenAI`-compatible chat-completions
//! endpoint via a common trait.

pub mod gemini;
pub mod openai;

use crate::AiError;

/// Trait for vision-capable LLM providers.
#[async_trait::async_trait]
pub trait VisionProvider: Send + Sync {
    /// Sends a prompt plus one inline image and returns the model's text
    /// answer.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails.
    async fn analyze_image(
        &self,
        prompt: &str,
        image_b64: &str,
        mime_type: &str,
    ) -> Result<String, AiError>;
}

/// Creates a vision provider based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set (`gemini` or `openai`), uses that
/// provider. Otherwise auto-detects from available credentials:
///
/// 1. `GEMINI_API_KEY` set -> Gemini
/// 2. `OPENAI_API_KEY` set -> `OpenAI`-compatible endpoint
///
/// `AI_API_KEY` is accepted as a provider-agnostic fallback key, and
/// `AI_MODEL` / `AI_BASE_URL` override the per-provider defaults.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// requested provider is unknown.
pub fn create_provider_from_env() -> Result<Box<dyn VisionProvider>, AiError> {
    let provider = std::env::var("AI_PROVIDER").unwrap_or_else(|_| detect_provider());

    match provider.to_lowercase().as_str() {
        "gemini" => {
            let api_key = api_key_from_env("GEMINI_API_KEY")?;
            let model = std::env::var("AI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash-lite".to_string());
            let base_url = std::env::var("AI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
            log::info!("Using Gemini vision provider with model {model}");
            Ok(Box::new(gemini::GeminiProvider::new(api_key, model, base_url)))
        }
        "openai" => {
            let api_key = api_key_from_env("OPENAI_API_KEY")?;
            let model = std::env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
            let base_url = std::env::var("AI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
            log::info!("Using OpenAI-compatible vision provider with model {model}");
            Ok(Box::new(openai::OpenAiProvider::new(api_key, model, base_url)))
        }
        other => Err(AiError::Config {
            message: format!("Unknown AI_PROVIDER: {other}"),
        }),
    }
}

/// Auto-detects the provider from which API key is present.
fn detect_provider() -> String {
    if std::env::var("OPENAI_API_KEY").is_ok() && std::env::var("GEMINI_API_KEY").is_err() {
        "openai".to_string()
    } else {
        // Default to Gemini; the key lookup names the missing variable if
        // no credentials are configured at all.
        "gemini".to_string()
    }
}

/// Reads the provider-specific key, falling back to `AI_API_KEY`.
fn api_key_from_env(name: &str) -> Result<String, AiError> {
    std::env::var(name)
        .or_else(|_| std::env::var("AI_API_KEY"))
        .map_err(|_| AiError::Config {
            message: format!("Neither {name} nor AI_API_KEY environment variable is set"),
        })
}

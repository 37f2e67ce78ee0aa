//! Thin HTTP client for the Gemini `generateContent` endpoint.
//!
//! One call, one request. There are no retries, no timeouts beyond
//! reqwest's defaults, and nothing is cached between calls.
use reqwest::Client;

use super::types::{GenerateContentRequest, GenerateContentResponse};
use super::ImageGenerator;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::utils::upload::UploadedImage;

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        GeminiClient { client: Client::new(), base_url: base, api_key, model }
    }

    /// Build a client from configuration, failing when no key is present.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let key = config.gemini_api_key.clone().ok_or(AppError::MissingApiKey)?;
        Ok(Self::new(config.gemini_base_url.clone(), key, config.model.clone()))
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send `prompt` with the uploaded image and return the first image part
    /// as a `data:` URI.
    pub async fn generate_content(&self, prompt: &str, image: &UploadedImage) -> AppResult<String> {
        let url = self.endpoint();
        let body = GenerateContentRequest::image_edit(prompt, &image.media_type, image.base64_data());
        tracing::info!("Sending generation request to {}", url);
        tracing::debug!(prompt = %prompt, image_bytes = image.bytes.len(), "Generation payload");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::GenerationFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_else(|_| "Unable to read error body".to_string());
            let error_message = format!("Status: {}, Body: {}", status, error_body);
            tracing::error!("Generation request failed. {}", error_message);
            return Err(AppError::GenerationFailed(error_message));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::GenerationFailed(format!("Unreadable response: {}", e)))?;

        match parsed.first_image() {
            Some(inline) => {
                tracing::info!(mime_type = %inline.mime_type, "Received generated image");
                Ok(format!("data:{};base64,{}", inline.mime_type, inline.data))
            }
            None => {
                tracing::warn!("Response contained no image part");
                Err(AppError::NoImageReturned)
            }
        }
    }
}

impl ImageGenerator for GeminiClient {
    fn generate(&self, prompt: &str, image: &UploadedImage) -> impl std::future::Future<Output = AppResult<String>> + Send {
        self.generate_content(prompt, image)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

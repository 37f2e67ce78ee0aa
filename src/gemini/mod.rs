//! Generation client for Gemini image models.
//!
//! `ImageGenerator` is the seam the workflow controller calls through;
//! `GeminiClient` is the production implementation.
use std::future::Future;

use crate::error::AppResult;
use crate::utils::upload::UploadedImage;

pub mod client;
pub mod types;

pub use client::GeminiClient;

pub trait ImageGenerator: Send + Sync {
    /// Send `prompt` together with `image` and return the first produced
    /// image as a `data:` URI.
    fn generate(&self, prompt: &str, image: &UploadedImage) -> impl Future<Output = AppResult<String>> + Send;

    /// Identifier recorded in exported metadata.
    fn model(&self) -> &str;
}

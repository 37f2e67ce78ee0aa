//! Sticker Studio library
//!
//! Modules:
//! - `api`: Axum HTTP handlers and router over a single workflow session.
//! - `gemini`: Generation client for Gemini image models.
//! - `prompt`: Generation settings and prompt construction.
//! - `workflow`: The upload → base → variants state machine.
//! - `utils`: Upload reading and export/download helpers.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `GeminiClient`,
//! `PromptConstructor`, and `WorkflowController`.
pub mod api;
pub mod config;
pub mod error;
pub mod gemini;
pub mod prompt;
pub mod utils;
pub mod workflow;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use gemini::{GeminiClient, ImageGenerator};
pub use prompt::constructor::{PromptConstructor, PromptSubject};
pub use prompt::settings::{GenerationSettings, StylePreset};
pub use workflow::WorkflowController;

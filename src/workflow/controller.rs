//! Workflow controller.
//!
//! Holds the settings, the uploaded image and the produced stickers, and
//! sequences calls into an `ImageGenerator`:
//!
//! - `upload` → `generate_base` → `base_generated`
//! - `base_generated` → `generate_base` again (replace) or `confirm_base`
//!   (three random variants) or `generate_custom_variants` → `variants_generated`
//! - `variants_generated` → `reroll_variants` or `generate_custom_variants`
//!
//! A new upload always resets to `upload`. Calls run one at a time; while
//! one is outstanding `loading` is set and every other action is refused.
use chrono::Utc;
use rand::seq::SliceRandom;

use super::types::{SessionSnapshot, StickerResult, UploadSummary, VariantBatch, WorkflowState, BASE_LABEL};
use crate::error::{AppError, AppResult};
use crate::gemini::ImageGenerator;
use crate::prompt::constructor::{PromptConstructor, PromptSubject};
use crate::prompt::settings::GenerationSettings;
use crate::utils::export::metadata_json;
use crate::utils::upload::UploadedImage;

pub const MAX_VARIANTS: usize = 12;
pub const RANDOM_VARIANT_COUNT: usize = 3;

pub const VARIANT_POOL: &[&str] = &[
    "happy",
    "sad",
    "laughing",
    "angry",
    "surprised",
    "thumbs up",
    "waving hello",
    "sleeping",
    "in love",
    "thinking",
    "crying",
    "celebrating",
    "facepalm",
    "OK sign",
    "shrugging",
];

/// Split a comma-separated caption list, dropping blank entries and keeping
/// at most `MAX_VARIANTS`.
pub fn parse_custom_variants(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_VARIANTS)
        .map(str::to_string)
        .collect()
}

/// Distinct captions drawn from `VARIANT_POOL`.
pub fn random_captions(count: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    VARIANT_POOL
        .choose_multiple(&mut rng, count)
        .map(|s| s.to_string())
        .collect()
}

/// Raises `loading` for its lifetime. Dropping it (normally, or because the
/// owning future was cancelled mid-call) lowers the flag again.
struct LoadingFlag<'a>(&'a mut bool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        LoadingFlag(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

pub struct WorkflowController<C> {
    client: Option<C>,
    model: String,
    prompts: PromptConstructor,
    settings: GenerationSettings,
    image: Option<UploadedImage>,
    consent: bool,
    state: WorkflowState,
    base: Option<StickerResult>,
    variants: Vec<StickerResult>,
    error: Option<String>,
    loading: bool,
}

impl<C: ImageGenerator> WorkflowController<C> {
    /// `client` is `None` when no credential was configured; the session
    /// still accepts uploads and settings but cannot generate.
    pub fn new(client: Option<C>, model: impl Into<String>) -> Self {
        let model = client
            .as_ref()
            .map(|c| c.model().to_string())
            .unwrap_or_else(|| model.into());
        WorkflowController {
            client,
            model,
            prompts: PromptConstructor::new(),
            settings: GenerationSettings::default(),
            image: None,
            consent: false,
            state: WorkflowState::Upload,
            base: None,
            variants: Vec::new(),
            error: None,
            loading: false,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn base(&self) -> Option<&StickerResult> {
        self.base.as_ref()
    }

    pub fn variants(&self) -> &[StickerResult] {
        &self.variants
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Look up the base sticker or a variant by id, together with its
    /// position in the set (0 for the base, 1.. for variants).
    pub fn sticker(&self, id: uuid::Uuid) -> Option<(usize, &StickerResult)> {
        self.base
            .iter()
            .chain(self.variants.iter())
            .enumerate()
            .find(|(_, s)| s.id == id)
            .map(|(i, s)| (if self.base.is_some() { i } else { i + 1 }, s))
    }

    /// Replace the uploaded image and reset everything generated from the
    /// previous one.
    pub fn upload_image(&mut self, image: UploadedImage) -> AppResult<()> {
        self.ensure_idle()?;
        tracing::info!(file = %image.file_name, media_type = %image.media_type, "New image uploaded");
        self.image = Some(image);
        self.state = WorkflowState::Upload;
        self.base = None;
        self.variants.clear();
        self.error = None;
        Ok(())
    }

    /// Surface an upload that could not be read.
    pub fn record_error(&mut self, err: &AppError) {
        self.error = Some(err.to_string());
    }

    pub fn set_consent(&mut self, accepted: bool) -> AppResult<()> {
        self.ensure_idle()?;
        self.consent = accepted;
        Ok(())
    }

    pub fn update_settings(&mut self, settings: GenerationSettings) -> AppResult<()> {
        self.ensure_idle()?;
        self.settings = settings.normalized();
        Ok(())
    }

    pub fn can_generate_base(&self) -> bool {
        self.image.is_some()
            && self.consent
            && !self.loading
            && self.client.is_some()
            && matches!(self.state, WorkflowState::Upload | WorkflowState::BaseGenerated)
    }

    /// Generate (or regenerate) the base sticker.
    pub async fn generate_base(&mut self) -> AppResult<StickerResult> {
        self.ensure_idle()?;
        if !matches!(self.state, WorkflowState::Upload | WorkflowState::BaseGenerated) {
            return Err(AppError::Workflow(
                "The base sticker is already confirmed; upload a new image to start over".to_string(),
            ));
        }
        let Some(image) = self.image.as_ref() else {
            return Err(AppError::Workflow("Upload an image first".to_string()));
        };
        if !self.consent {
            return Err(AppError::Workflow(
                "Confirm you have permission to use this photo before generating".to_string(),
            ));
        }
        let Some(client) = self.client.as_ref() else {
            self.error = Some(AppError::MissingApiKey.to_string());
            return Err(AppError::MissingApiKey);
        };

        self.error = None;
        let prompt = self.prompts.construct_prompt(&self.settings, PromptSubject::Original);
        tracing::info!(style = %self.settings.style, strength = self.settings.style_strength, "Generating base sticker");
        let result = {
            let _loading = LoadingFlag::raise(&mut self.loading);
            client.generate(&prompt, image).await
        };

        match result {
            Ok(uri) => {
                let sticker = StickerResult::new(uri, BASE_LABEL);
                self.base = Some(sticker.clone());
                self.state = WorkflowState::BaseGenerated;
                Ok(sticker)
            }
            Err(e) => {
                tracing::error!("Base sticker generation failed: {}", e);
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Accept the base sticker and produce the first random variant set.
    pub async fn confirm_base(&mut self) -> AppResult<VariantBatch> {
        self.ensure_idle()?;
        if self.state != WorkflowState::BaseGenerated {
            return Err(AppError::Workflow("Generate a base sticker first".to_string()));
        }
        self.run_batch(random_captions(RANDOM_VARIANT_COUNT)).await
    }

    /// Replace all variants with a fresh random set.
    pub async fn reroll_variants(&mut self) -> AppResult<VariantBatch> {
        self.ensure_idle()?;
        self.ensure_variants_stage()?;
        self.run_batch(random_captions(RANDOM_VARIANT_COUNT)).await
    }

    /// Replace all variants with one sticker per comma-separated caption.
    /// Also accepted straight from `base_generated`, skipping the random set.
    pub async fn generate_custom_variants(&mut self, text: &str) -> AppResult<VariantBatch> {
        self.ensure_idle()?;
        if self.state == WorkflowState::Upload {
            return Err(AppError::Workflow("Generate a base sticker first".to_string()));
        }
        let captions = parse_custom_variants(text);
        if captions.is_empty() {
            return Err(AppError::Workflow("Enter at least one caption".to_string()));
        }
        self.run_batch(captions).await
    }

    /// Captions run strictly in order. A failed caption is reported and
    /// skipped; the batch always finishes.
    async fn run_batch(&mut self, captions: Vec<String>) -> AppResult<VariantBatch> {
        let Some(image) = self.image.as_ref() else {
            return Err(AppError::Workflow("Upload an image first".to_string()));
        };
        let Some(client) = self.client.as_ref() else {
            self.error = Some(AppError::MissingApiKey.to_string());
            return Err(AppError::MissingApiKey);
        };

        self.error = None;
        tracing::info!(count = captions.len(), "Generating variants");

        let mut batch = VariantBatch::default();
        let loading = LoadingFlag::raise(&mut self.loading);
        for caption in &captions {
            let prompt = self
                .prompts
                .construct_prompt(&self.settings, PromptSubject::Action(caption));
            match client.generate(&prompt, image).await {
                Ok(uri) => batch.variants.push(StickerResult::new(uri, caption.as_str())),
                Err(e) => {
                    let message = format!("Failed to generate \"{}\": {}", caption, e);
                    tracing::warn!("{}", message);
                    self.error = Some(message.clone());
                    batch.errors.push(message);
                }
            }
        }
        drop(loading);

        self.variants = batch.variants.clone();
        self.state = WorkflowState::VariantsGenerated;
        tracing::info!(ok = batch.variants.len(), failed = batch.errors.len(), "Variant batch finished");
        Ok(batch)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            loading: self.loading,
            consent: self.consent,
            image: self.image.as_ref().map(|i| UploadSummary {
                file_name: i.file_name.clone(),
                media_type: i.media_type.clone(),
                size: i.bytes.len(),
                preview: i.preview_uri(),
            }),
            settings: self.settings.clone(),
            base: self.base.clone(),
            variants: self.variants.clone(),
            error: self.error.clone(),
            can_generate_base: self.can_generate_base(),
            generation_enabled: self.client.is_some(),
        }
    }

    /// Metadata document for the current settings.
    pub fn metadata(&self) -> AppResult<String> {
        metadata_json(&self.settings, Utc::now(), &self.model)
    }

    fn ensure_idle(&self) -> AppResult<()> {
        if self.loading {
            Err(AppError::Busy)
        } else {
            Ok(())
        }
    }

    fn ensure_variants_stage(&self) -> AppResult<()> {
        if self.state != WorkflowState::VariantsGenerated {
            return Err(AppError::Workflow(
                "Confirm the base sticker before generating more variants".to_string(),
            ));
        }
        Ok(())
    }
}

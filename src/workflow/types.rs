use serde::Serialize;
use uuid::Uuid;

use crate::prompt::settings::GenerationSettings;

/// Label given to the base sticker.
pub const BASE_LABEL: &str = "original";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Upload,
    BaseGenerated,
    VariantsGenerated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StickerResult {
    pub id: Uuid,
    /// `data:` URI as returned by the generator.
    pub image: String,
    pub label: String,
}

impl StickerResult {
    pub fn new(image: String, label: impl Into<String>) -> Self {
        StickerResult { id: Uuid::new_v4(), image, label: label.into() }
    }
}

/// Outcome of one variant batch. Failed captions are absent from
/// `variants` and described in `errors`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariantBatch {
    pub variants: Vec<StickerResult>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub file_name: String,
    pub media_type: String,
    pub size: usize,
    /// `data:` URI of the upload, for display.
    pub preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: WorkflowState,
    pub loading: bool,
    pub consent: bool,
    pub image: Option<UploadSummary>,
    pub settings: GenerationSettings,
    pub base: Option<StickerResult>,
    pub variants: Vec<StickerResult>,
    pub error: Option<String>,
    pub can_generate_base: bool,
    pub generation_enabled: bool,
}

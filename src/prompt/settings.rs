//! User-selected generation settings.
//!
//! `GenerationSettings` serializes with camelCase keys since that is the shape
//! of the exported metadata document and of the `/settings` payload.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const MAX_STYLE_STRENGTH: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StylePreset {
    Cute,
    Chibi,
    Cartoon,
    Anime,
    Pixel,
    Watercolor,
    Clay,
    Comic,
    Custom,
}

impl StylePreset {
    pub const ALL: [StylePreset; 9] = [
        StylePreset::Cute,
        StylePreset::Chibi,
        StylePreset::Cartoon,
        StylePreset::Anime,
        StylePreset::Pixel,
        StylePreset::Watercolor,
        StylePreset::Clay,
        StylePreset::Comic,
        StylePreset::Custom,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            StylePreset::Cute => "cute",
            StylePreset::Chibi => "chibi",
            StylePreset::Cartoon => "cartoon",
            StylePreset::Anime => "anime",
            StylePreset::Pixel => "pixel",
            StylePreset::Watercolor => "watercolor",
            StylePreset::Clay => "clay",
            StylePreset::Comic => "comic",
            StylePreset::Custom => "custom",
        }
    }

    /// Label used inside prompts.
    pub fn label(&self) -> &'static str {
        match self {
            StylePreset::Cute => "Cute Kawaii",
            StylePreset::Chibi => "Chibi",
            StylePreset::Cartoon => "Bold Cartoon",
            StylePreset::Anime => "Anime",
            StylePreset::Pixel => "Pixel Art",
            StylePreset::Watercolor => "Soft Watercolor",
            StylePreset::Clay => "3D Clay",
            StylePreset::Comic => "Pop Art Comic",
            StylePreset::Custom => "Custom",
        }
    }
}

impl fmt::Display for StylePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for StylePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        StylePreset::ALL
            .iter()
            .copied()
            .find(|p| p.id() == wanted)
            .ok_or_else(|| format!("Unknown style '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationSettings {
    pub style: StylePreset,
    pub custom_style: String,
    pub style_strength: u8,
    pub description: String,
    pub character_consistency: bool,
    pub style_consistency: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            style: StylePreset::Cute,
            custom_style: String::new(),
            style_strength: 70,
            description: String::new(),
            character_consistency: true,
            style_consistency: true,
        }
    }
}

impl GenerationSettings {
    pub fn with_style(mut self, style: StylePreset) -> Self {
        self.style = style;
        self
    }

    pub fn with_custom_style(mut self, text: impl Into<String>) -> Self {
        self.style = StylePreset::Custom;
        self.custom_style = text.into();
        self
    }

    pub fn with_strength(mut self, strength: u8) -> Self {
        self.style_strength = strength.min(MAX_STYLE_STRENGTH);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_character_consistency(mut self, enabled: bool) -> Self {
        self.character_consistency = enabled;
        self
    }

    pub fn with_style_consistency(mut self, enabled: bool) -> Self {
        self.style_consistency = enabled;
        self
    }

    /// Clamp values that arrive from outside (JSON bodies, CLI flags).
    pub fn normalized(mut self) -> Self {
        self.style_strength = self.style_strength.min(MAX_STYLE_STRENGTH);
        self
    }

    /// The style name that goes into the prompt. Custom styles use the
    /// user's text, falling back to the generic label when it is blank.
    pub fn style_label(&self) -> String {
        match self.style {
            StylePreset::Custom => {
                let text = self.custom_style.trim();
                if text.is_empty() {
                    StylePreset::Custom.label().to_string()
                } else {
                    text.to_string()
                }
            }
            preset => preset.label().to_string(),
        }
    }
}

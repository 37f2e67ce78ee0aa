//! Prompt construction by plain string interpolation.
//!
//! The same template produces the base sticker prompt and every variant
//! prompt; only the subject clause differs. Output is fully determined by the
//! settings and the subject, so it is safe to compare in tests.
use super::settings::GenerationSettings;

/// What the sticker should depict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSubject<'a> {
    /// The subject as it appears in the photo.
    Original,
    /// The subject performing an action or showing an emotion.
    Action(&'a str),
}

#[derive(Debug, Clone, Default)]
pub struct PromptConstructor;

impl PromptConstructor {
    pub fn new() -> Self {
        PromptConstructor
    }

    /// Construct a prompt for `subject` from the current `settings`.
    pub fn construct_prompt(&self, settings: &GenerationSettings, subject: PromptSubject<'_>) -> String {
        let style = settings.style_label();
        let mut prompt = format!(
            "Create a die-cut sticker in {} style of the main subject from the provided photo",
            style
        );

        match subject {
            PromptSubject::Original => prompt.push_str(", keeping their original pose and expression."),
            PromptSubject::Action(action) => {
                prompt.push_str(&format!(
                    ", performing the action or expressing the emotion: \"{}\".",
                    action.trim()
                ));
            }
        }

        let description = settings.description.trim();
        if !description.is_empty() {
            prompt.push_str(&format!(" Additional details: {}.", description.trim_end_matches('.')));
        }

        prompt.push_str(&format!(
            " Apply the {} style at {}% strength.",
            style, settings.style_strength
        ));

        if settings.character_consistency {
            prompt.push_str(" Keep the subject's identity and facial features consistent with the photo.");
        }
        if settings.style_consistency {
            prompt.push_str(" Keep the art style and color palette identical across every sticker in the set.");
        }

        prompt.push_str(" Use a transparent background with a clean white outline and no text.");
        prompt
    }
}

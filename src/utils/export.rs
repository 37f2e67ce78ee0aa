//! Export helpers: metadata documents and data URI downloads.
//!
//! These are pure conversions plus thin file writers. The CLI writes files
//! into an output directory; the HTTP layer returns the same bytes as
//! attachments.
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::prompt::settings::GenerationSettings;

pub const METADATA_FILENAME: &str = "sticker-metadata.json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MetadataDocument<'a> {
    #[serde(flatten)]
    settings: &'a GenerationSettings,
    timestamp: String,
    model: &'a str,
}

/// Serialize settings, a timestamp and the model id to pretty JSON.
pub fn metadata_json(settings: &GenerationSettings, timestamp: DateTime<Utc>, model: &str) -> AppResult<String> {
    let doc = MetadataDocument {
        settings,
        timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        model,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Split a `data:<type>;base64,<payload>` URI into media type and bytes.
pub fn decode_data_uri(uri: &str) -> AppResult<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| AppError::InvalidDataUri("missing data: prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::InvalidDataUri("missing payload separator".to_string()))?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| AppError::InvalidDataUri("only base64 payloads are supported".to_string()))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::InvalidDataUri(e.to_string()))?;
    let media_type = if media_type.is_empty() { "application/octet-stream" } else { media_type };
    Ok((media_type.to_string(), bytes))
}

/// File extension for a produced image.
pub fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

/// `sticker-<NN>-<slug>.<ext>`. `index` is the sticker's position in the set
/// (0 for the base) and keeps names unique when labels slug the same; the
/// slug is the lowercase label with runs of anything non-alphanumeric
/// collapsed into a single dash.
pub fn sticker_filename(index: usize, label: &str, media_type: &str) -> String {
    let mut slug = String::new();
    for c in label.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = if slug.is_empty() { "sticker" } else { slug };
    format!("sticker-{:02}-{}.{}", index, slug, extension_for(media_type))
}

/// Decode `uri` and write it to `dir/filename`, creating `dir` as needed.
pub async fn save_data_uri(uri: &str, dir: impl AsRef<Path>, filename: &str) -> AppResult<PathBuf> {
    let (_, bytes) = decode_data_uri(uri)?;
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(filename);
    tokio::fs::write(&path, &bytes).await?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved image");
    Ok(path)
}

pub async fn save_metadata(
    settings: &GenerationSettings,
    model: &str,
    dir: impl AsRef<Path>,
) -> AppResult<PathBuf> {
    let body = metadata_json(settings, Utc::now(), model)?;
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(METADATA_FILENAME);
    tokio::fs::write(&path, body).await?;
    tracing::info!(path = %path.display(), "Saved metadata");
    Ok(path)
}

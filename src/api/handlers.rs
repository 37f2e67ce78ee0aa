//! Axum request handlers for the HTTP API.
//!
//! Read-only handlers use `try_read` and report a busy session instead of
//! queueing behind a running generation; mutating handlers use `try_write`
//! and answer `409 Conflict` for the same reason.
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::routes::AppState;
use crate::error::{AppError, AppResult};
use crate::gemini::ImageGenerator;
use crate::prompt::settings::GenerationSettings;
use crate::utils::export::{decode_data_uri, sticker_filename, METADATA_FILENAME};
use crate::utils::upload::UploadedImage;
use crate::workflow::{SessionSnapshot, StickerResult, VariantBatch};

type Shared<C> = State<Arc<AppState<C>>>;

#[derive(Debug, Deserialize)]
pub struct ConsentBody {
    pub accepted: bool,
}

#[derive(Debug, Deserialize)]
pub struct CustomVariantsBody {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct VariantsResponse {
    pub errors: Vec<String>,
    pub session: SessionSnapshot,
}

pub async fn root() -> &'static str {
    "Sticker Studio"
}

pub async fn session<C: ImageGenerator>(State(state): Shared<C>) -> Response {
    match state.session.try_read() {
        Ok(session) => Json(session.snapshot()).into_response(),
        Err(_) => Json(json!({ "loading": true })).into_response(),
    }
}

pub async fn update_settings<C: ImageGenerator>(
    State(state): Shared<C>,
    Json(settings): Json<GenerationSettings>,
) -> AppResult<Json<SessionSnapshot>> {
    let mut session = state.session.try_write().map_err(|_| AppError::Busy)?;
    session.update_settings(settings)?;
    Ok(Json(session.snapshot()))
}

pub async fn upload<C: ImageGenerator>(
    State(state): Shared<C>,
    mut multipart: Multipart,
) -> AppResult<Json<SessionSnapshot>> {
    // The body is read before locking so a slow upload does not hold the
    // session.
    let upload = read_upload(&mut multipart).await;
    let mut session = state.session.try_write().map_err(|_| AppError::Busy)?;
    match upload {
        Ok(image) => {
            session.upload_image(image)?;
            Ok(Json(session.snapshot()))
        }
        Err(e) => {
            tracing::warn!("Upload rejected: {}", e);
            session.record_error(&e);
            Err(e)
        }
    }
}

/// Take the `file` field, or the first field carrying a file name.
async fn read_upload(multipart: &mut Multipart) -> AppResult<UploadedImage> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::FileRead(e.to_string()))?
    {
        let is_file = field.name() == Some("file") || field.file_name().is_some();
        if !is_file {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let declared = field.content_type().map(|t| t.to_string());
        let data = field.bytes().await.map_err(|e| AppError::FileRead(e.to_string()))?;
        return UploadedImage::from_bytes(data.to_vec(), declared.as_deref(), file_name);
    }
    Err(AppError::FileRead("No file field in upload".to_string()))
}

pub async fn consent<C: ImageGenerator>(
    State(state): Shared<C>,
    Json(body): Json<ConsentBody>,
) -> AppResult<Json<SessionSnapshot>> {
    let mut session = state.session.try_write().map_err(|_| AppError::Busy)?;
    session.set_consent(body.accepted)?;
    Ok(Json(session.snapshot()))
}

pub async fn generate_base<C: ImageGenerator>(State(state): Shared<C>) -> AppResult<Json<SessionSnapshot>> {
    let mut session = state.session.try_write().map_err(|_| AppError::Busy)?;
    session.generate_base().await?;
    Ok(Json(session.snapshot()))
}

pub async fn confirm_base<C: ImageGenerator>(State(state): Shared<C>) -> AppResult<Json<VariantsResponse>> {
    let mut session = state.session.try_write().map_err(|_| AppError::Busy)?;
    let batch = session.confirm_base().await?;
    Ok(Json(variants_response(batch, session.snapshot())))
}

pub async fn reroll_variants<C: ImageGenerator>(State(state): Shared<C>) -> AppResult<Json<VariantsResponse>> {
    let mut session = state.session.try_write().map_err(|_| AppError::Busy)?;
    let batch = session.reroll_variants().await?;
    Ok(Json(variants_response(batch, session.snapshot())))
}

pub async fn custom_variants<C: ImageGenerator>(
    State(state): Shared<C>,
    Json(body): Json<CustomVariantsBody>,
) -> AppResult<Json<VariantsResponse>> {
    let mut session = state.session.try_write().map_err(|_| AppError::Busy)?;
    let batch = session.generate_custom_variants(&body.text).await?;
    Ok(Json(variants_response(batch, session.snapshot())))
}

fn variants_response(batch: VariantBatch, session: SessionSnapshot) -> VariantsResponse {
    VariantsResponse { errors: batch.errors, session }
}

pub async fn export_metadata<C: ImageGenerator>(State(state): Shared<C>) -> AppResult<Response> {
    let session = state.session.try_read().map_err(|_| AppError::Busy)?;
    let body = session.metadata()?;
    Ok(attachment("application/json".to_string(), METADATA_FILENAME, body.into_bytes()))
}

pub async fn export_base<C: ImageGenerator>(State(state): Shared<C>) -> AppResult<Response> {
    let session = state.session.try_read().map_err(|_| AppError::Busy)?;
    let sticker = session
        .base()
        .ok_or_else(|| AppError::NotFound("No base sticker has been generated".to_string()))?;
    sticker_download(0, sticker)
}

pub async fn export_variant<C: ImageGenerator>(
    State(state): Shared<C>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let session = state.session.try_read().map_err(|_| AppError::Busy)?;
    let (index, sticker) = session
        .sticker(id)
        .ok_or_else(|| AppError::NotFound(format!("Sticker {}", id)))?;
    sticker_download(index, sticker)
}

fn sticker_download(index: usize, sticker: &StickerResult) -> AppResult<Response> {
    let (media_type, bytes) = decode_data_uri(&sticker.image)?;
    let filename = sticker_filename(index, &sticker.label, &media_type);
    Ok(attachment(media_type, &filename, bytes))
}

fn attachment(content_type: String, filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        body,
    )
        .into_response()
}

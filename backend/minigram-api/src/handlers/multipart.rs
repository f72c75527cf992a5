/// Multipart form decoding for image uploads
use crate::error::{AppError, Result};
use crate::models::ImageUpload;
use actix_multipart::{Field, Multipart};
use futures_util::stream::StreamExt;
use std::collections::HashMap;

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// A decoded upload form: at most one file plus text fields
#[derive(Debug, Default)]
pub struct UploadForm {
    pub image: Option<ImageUpload>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Read a multipart body. The file part named `file_field` is buffered up to
/// `max_file_bytes + 1` bytes so an oversized upload is still reported by
/// size; anything beyond is drained and dropped.
pub async fn read_upload_form(
    mut payload: Multipart,
    file_field: &str,
    max_file_bytes: usize,
) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?;
        let Some(name) = field.name().map(str::to_string) else {
            drain(&mut field).await?;
            continue;
        };

        if name == file_field {
            let file_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);
            let content_type = field.content_type().map(|m| m.essence_str().to_string());
            let bytes = read_capped(&mut field, max_file_bytes.saturating_add(1)).await?;

            if !bytes.is_empty() {
                form.image = Some(ImageUpload {
                    bytes,
                    content_type,
                    file_name,
                });
            }
        } else {
            let bytes = read_capped(&mut field, MAX_TEXT_FIELD_BYTES + 1).await?;
            if bytes.len() > MAX_TEXT_FIELD_BYTES {
                return Err(AppError::BadRequest(format!("Field '{}' is too large", name)));
            }
            let value = String::from_utf8(bytes)
                .map_err(|_| AppError::BadRequest(format!("Field '{}' is not valid UTF-8", name)))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

async fn read_capped(field: &mut Field, cap: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Upload interrupted: {}", e)))?;
        let room = cap.saturating_sub(buffer.len());
        buffer.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
    Ok(buffer)
}

async fn drain(field: &mut Field) -> Result<()> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| AppError::BadRequest(format!("Upload interrupted: {}", e)))?;
    }
    Ok(())
}

//! Common utilities for the upload handler

use axum::extract::Multipart;
use axum::http::StatusCode;
use facetally_core::AppError;
use image::ImageFormat;

/// A file pulled out of a multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    pub data: Vec<u8>,
    pub filename: String,
    /// Content type declared by the client. Informational only; the stored
    /// content type comes from [`sniff_image_format`].
    pub declared_content_type: String,
}

/// Extract the single file sent under `field_name`.
/// Other fields are ignored; a second file under the same name is rejected.
pub async fn extract_multipart_file(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<UploadedFile, AppError> {
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("error read file: {}", e)))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        if file.is_some() {
            return Err(AppError::InvalidInput(format!(
                "Multiple file fields are not allowed; send exactly one field named '{}'",
                field_name
            )));
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let declared_content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let data = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge(format!("error read file: {}", e))
            } else {
                AppError::InvalidInput(format!("error read file: {}", e))
            }
        })?;

        file = Some(UploadedFile {
            data: data.to_vec(),
            filename,
            declared_content_type,
        });
    }

    file.ok_or_else(|| {
        AppError::InvalidInput(format!("error read file: no '{}' field provided", field_name))
    })
}

/// Validate file size
pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size == 0 {
        return Err(AppError::InvalidInput("File is empty".to_string()));
    }
    if file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds maximum allowed size of {} MB",
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

/// Identify the image format from its magic bytes and check its MIME type
/// against the allowlist.
pub fn sniff_image_format(
    data: &[u8],
    allowed_types: &[String],
) -> Result<(ImageFormat, &'static str), AppError> {
    let unsupported = || AppError::UnsupportedMediaType("uploaded file must be an image".to_string());

    let format = image::guess_format(data).map_err(|_| unsupported())?;
    let mime = format.to_mime_type();
    if !allowed_types.iter().any(|ct| ct.eq_ignore_ascii_case(mime)) {
        return Err(unsupported());
    }
    Ok((format, mime))
}

/// Pick the stored file extension: the client's, when it matches the sniffed
/// format, otherwise the format's canonical one.
pub fn choose_extension(filename: &str, format: ImageFormat) -> String {
    let known = format.extensions_str();
    let client_ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match client_ext {
        Some(ext) if known.contains(&ext.as_str()) => ext,
        _ => known.first().copied().unwrap_or_default().to_string(),
    }
}

/// Sanitize filename to prevent path traversal and invalid characters.
/// Returns an error if the filename contains path traversal attempts.
pub fn sanitize_filename(filename: &str) -> Result<String, AppError> {
    const MAX_FILENAME_LENGTH: usize = 255;

    let path = std::path::Path::new(filename);
    let filename_only = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    if filename_only.contains("..") {
        return Err(AppError::InvalidInput(
            "Filename contains invalid path traversal".to_string(),
        ));
    }

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim().is_empty() || sanitized.len() < 3 {
        return Ok("file".to_string());
    }

    Ok(sanitized)
}

/// Photo attachments for new reviews
/// Reads the picked file, downscales oversized photos and re-encodes them as JPEG
use image::{imageops::FilterType, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::data::ImageAttachment;

/// Longest edge kept for uploads; larger photos are downscaled
const MAX_UPLOAD_EDGE: u32 = 2048;

/// Extensions offered in the file picker
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// Load a photo for upload
/// Runs on a blocking thread, decoding large JPEGs is CPU-bound
pub async fn load_attachment(path: PathBuf) -> Result<ImageAttachment, String> {
    tokio::task::spawn_blocking(move || load_attachment_blocking(&path))
        .await
        .map_err(|e| format!("Task join error: {}", e))?
}

fn load_attachment_blocking(path: &Path) -> Result<ImageAttachment, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "photo".to_string());

    prepare_upload(file_name, bytes)
}

/// Turn raw file bytes into an upload-ready attachment
///
/// Small photos are passed through untouched; anything over
/// `MAX_UPLOAD_EDGE` is resized and sent as JPEG.
pub fn prepare_upload(file_name: String, bytes: Vec<u8>) -> Result<ImageAttachment, String> {
    let format = image::guess_format(&bytes)
        .map_err(|_| format!("{} is not a supported image", file_name))?;

    let img = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| format!("Failed to decode {}: {}", file_name, e))?;

    if img.width() <= MAX_UPLOAD_EDGE && img.height() <= MAX_UPLOAD_EDGE {
        return Ok(ImageAttachment {
            mime: format.to_mime_type().to_string(),
            file_name,
            bytes,
        });
    }

    let resized = img.resize(MAX_UPLOAD_EDGE, MAX_UPLOAD_EDGE, FilterType::Lanczos3);
    let mut encoded = Cursor::new(Vec::new());
    resized
        .to_rgb8()
        .write_to(&mut encoded, ImageFormat::Jpeg)
        .map_err(|e| format!("Failed to encode {}: {}", file_name, e))?;

    log::info!(
        "📸 Downscaled {} from {}x{} to {}x{}",
        file_name,
        img.width(),
        img.height(),
        resized.width(),
        resized.height()
    );

    Ok(ImageAttachment {
        file_name: jpeg_file_name(&file_name),
        mime: "image/jpeg".to_string(),
        bytes: encoded.into_inner(),
    })
}

/// "beach.png" -> "beach.jpg"
fn jpeg_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "photo".to_string());
    format!("{}.jpg", stem)
}

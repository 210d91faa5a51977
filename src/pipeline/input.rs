//! Input resolution: read the template and fetch the image to embed.
//!
//! The image source is either an HTTP/HTTPS URL, downloaded with `reqwest`,
//! or a local path. Either way the bytes stay in memory: they are inlined
//! into the SVG as a `data:` URI, so nothing needs to touch the disk.

use crate::error::SvgStampError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Raw image bytes and their MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read the SVG template as UTF-8 text.
pub async fn load_template(path: &Path) -> Result<String, SvgStampError> {
    let markup = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => SvgStampError::TemplateNotFound {
                path: path.to_path_buf(),
            },
            ErrorKind::PermissionDenied => SvgStampError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => SvgStampError::InvalidTemplate {
                path: path.to_path_buf(),
                detail: e.to_string(),
            },
        })?;
    debug!("Loaded template {} ({} bytes)", path.display(), markup.len());
    Ok(markup)
}

/// Fetch the image from a URL or a local path.
pub async fn fetch_image(source: &str, timeout_secs: u64) -> Result<FetchedImage, SvgStampError> {
    if is_url(source) {
        download_image(source, timeout_secs).await
    } else {
        read_local_image(Path::new(source)).await
    }
}

async fn read_local_image(path: &Path) -> Result<FetchedImage, SvgStampError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => SvgStampError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => SvgStampError::ImageNotFound {
            path: PathBuf::from(path),
        },
    })?;
    let mime_type = resolve_mime_type(None, &bytes);
    debug!(
        "Read local image {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        mime_type
    );
    Ok(FetchedImage { bytes, mime_type })
}

async fn download_image(url: &str, timeout_secs: u64) -> Result<FetchedImage, SvgStampError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SvgStampError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SvgStampError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SvgStampError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(SvgStampError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            SvgStampError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SvgStampError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    let mime_type = resolve_mime_type(header_type.as_deref(), &bytes);
    info!("Downloaded {} bytes ({})", bytes.len(), mime_type);

    Ok(FetchedImage {
        bytes: bytes.to_vec(),
        mime_type,
    })
}

/// Pick the MIME type for the data URI.
///
/// A usable `Content-Type` header wins (parameters such as `charset` are
/// dropped); otherwise the format is sniffed from the magic bytes, falling
/// back to `application/octet-stream`.
pub fn resolve_mime_type(header: Option<&str>, bytes: &[u8]) -> String {
    if let Some(essence) = header
        .and_then(|h| h.split(';').next())
        .map(str::trim)
        .filter(|h| !h.is_empty())
    {
        return essence.to_ascii_lowercase();
    }

    image::guess_format(bytes)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0";

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/photo.jpg"));
        assert!(is_url("http://example.com/photo.jpg"));
        assert!(!is_url("/tmp/photo.jpg"));
        assert!(!is_url("photo.jpg"));
        assert!(!is_url(""));
    }

    #[test]
    fn header_wins_over_sniffing() {
        assert_eq!(resolve_mime_type(Some("image/jpeg"), PNG_MAGIC), "image/jpeg");
        assert_eq!(
            resolve_mime_type(Some("Image/PNG; charset=binary"), b""),
            "image/png"
        );
    }

    #[test]
    fn sniffs_when_header_missing_or_blank() {
        assert_eq!(resolve_mime_type(None, PNG_MAGIC), "image/png");
        assert_eq!(resolve_mime_type(Some("  "), JPEG_MAGIC), "image/jpeg");
        assert_eq!(
            resolve_mime_type(None, b"not an image"),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn missing_template_is_reported() {
        let err = load_template(Path::new("/definitely/not/here.svg"))
            .await
            .unwrap_err();
        assert!(matches!(err, SvgStampError::TemplateNotFound { .. }));
    }

    #[tokio::test]
    async fn missing_local_image_is_reported() {
        let err = fetch_image("/definitely/not/here.png", 5).await.unwrap_err();
        assert!(matches!(err, SvgStampError::ImageNotFound { .. }));
    }

    #[tokio::test]
    async fn local_image_is_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.bin");
        std::fs::write(&path, PNG_MAGIC).unwrap();
        let img = fetch_image(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(img.mime_type, "image/png");
        assert_eq!(img.bytes, PNG_MAGIC);
    }
}

//! Helpers for files downloaded from a sandbox

use crate::error::{Result, SandboxError};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};

/// Decode base64 file content sent by the service
///
/// ASCII whitespace is ignored, so MIME-style payloads wrapped at 76 columns
/// decode the same as a single line.
pub fn decode_content(content_base64: &str) -> Result<Vec<u8>> {
    let compact: Vec<u8> = content_base64
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}

/// MIME type for paths with an image extension we register as artifacts
///
/// Matching is case-insensitive; only `.png`, `.jpg`, `.jpeg` and `.gif`
/// count as images.
pub fn image_mime_type(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Where a sandbox file is saved locally: its base name inside `dir`
///
/// With the default `.` directory the bare file name is returned.
pub fn local_path(dir: &Path, sandbox_path: &str) -> Result<PathBuf> {
    let name = Path::new(sandbox_path)
        .file_name()
        .ok_or_else(|| SandboxError::InvalidPath(sandbox_path.to_string()))?;

    if dir.as_os_str().is_empty() || dir == Path::new(".") {
        Ok(PathBuf::from(name))
    } else {
        Ok(dir.join(name))
    }
}

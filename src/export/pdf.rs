//! PDF export through headless Chrome/Chromium.
//!
//! The paginated HTML already carries one fixed-size container per page, so
//! the browser only has to print it with zero page margins.

use crate::config::PageGeometry;
use crate::error::{ExportError, ExportResult};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;
use url::Url;
use which::which;

/// Environment variable that overrides browser detection
pub const CHROME_ENV: &str = "PAGEMARK_CHROME_BIN";

/// Print `html` to PDF bytes using the browser at `chrome`
pub fn render_html_to_pdf(
    html: &str,
    chrome: &Path,
    geometry: &PageGeometry,
) -> ExportResult<Vec<u8>> {
    let temp_dir = tempdir()?;
    let html_path = temp_dir.path().join("pagemark-export.html");
    let mut html_file = fs::File::create(&html_path)?;
    html_file.write_all(html.as_bytes())?;
    html_file.flush()?;

    let pdf_path = temp_dir.path().join("pagemark-export.pdf");
    let file_url =
        Url::from_file_path(&html_path).map_err(|_| ExportError::InvalidUrl(html_path.clone()))?;

    let window_arg = format!(
        "--window-size={},{}",
        PageGeometry::mm_to_px(geometry.width_mm).ceil() as u32,
        PageGeometry::mm_to_px(geometry.height_mm).ceil() as u32
    );

    log::debug!("printing {} with {}", file_url, chrome.display());
    let status = Command::new(chrome)
        .arg("--headless")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--print-to-pdf-no-header")
        .arg("--no-pdf-header-footer")
        .arg(format!("--print-to-pdf={}", pdf_path.display()))
        .arg(window_arg)
        .arg(file_url.as_str())
        .status()
        .map_err(|source| ExportError::Launch {
            binary: chrome.to_path_buf(),
            source,
        })?;

    if !status.success() {
        return Err(ExportError::RendererFailed(status.to_string()));
    }

    Ok(fs::read(&pdf_path)?)
}

/// Locate a Chrome/Chromium binary.
///
/// Order: explicit configuration, `PAGEMARK_CHROME_BIN`, `CHROME_BIN`, then
/// well-known executable names on `PATH`.
pub fn resolve_chrome_binary(configured: Option<&Path>) -> ExportResult<PathBuf> {
    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }

    for var in [CHROME_ENV, "GOOGLE_CHROME_BIN", "CHROME_BIN"] {
        if let Some(path) = env::var_os(var) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
    }

    for candidate in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "chrome",
        "msedge",
    ] {
        if let Ok(path) = which(candidate) {
            return Ok(path);
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidate =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(ExportError::BrowserNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_binary_wins() {
        let path = PathBuf::from("/opt/custom/chrome");
        assert_eq!(resolve_chrome_binary(Some(&path)).unwrap(), path);
    }

    #[test]
    fn test_missing_binary_is_launch_error() {
        let err = render_html_to_pdf(
            "<html></html>",
            Path::new("/nonexistent/pagemark-chrome"),
            &PageGeometry::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::Launch { .. }));
    }
}

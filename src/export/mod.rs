//! Export of paginated documents
//!
//! - HTML: the paginated page containers as a standalone document
//! - PDF: the same document printed by headless Chrome/Chromium
//!
//! An export is a one-shot operation. While it runs the exporter reports
//! `is_exporting() == true`; the flag is cleared on every exit path.

pub mod html;
pub mod pdf;

pub use html::{document_html, page_html, pages_html, HtmlDocumentOptions, PAGES_ROOT_ID};

use crate::config::ExportConfig;
use crate::error::{ExportError, ExportResult};
use crate::file_handler::write_file_atomic;
use crate::layout::PaginatedDocument;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Export format options
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Html,
    Pdf,
}

impl ExportFormat {
    /// Get the file extension for the format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// Get display name for the format
    pub fn display_name(&self) -> &'static str {
        match self {
            ExportFormat::Html => "HTML",
            ExportFormat::Pdf => "PDF",
        }
    }

    /// Detect the format from an output path's extension
    pub fn from_path(path: &Path) -> ExportResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match extension.as_str() {
            "html" | "htm" => Ok(ExportFormat::Html),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Generate suggested output path from input path
pub fn suggest_output_path(input_path: &Path, format: ExportFormat) -> PathBuf {
    input_path.with_extension(format.extension())
}

/// Marks an export as in progress; clears the mark when dropped.
#[derive(Debug)]
pub struct ExportGuard {
    flag: Arc<AtomicBool>,
}

impl ExportGuard {
    /// Claim the flag, failing if another export holds it
    pub fn acquire(flag: &Arc<AtomicBool>) -> ExportResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ExportError::AlreadyRunning)?;
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs exports of already laid-out documents
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    config: ExportConfig,
    in_progress: Arc<AtomicBool>,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether an export is currently running
    pub fn is_exporting(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Format implied by `path`, or the configured default
    pub fn format_for(&self, path: &Path) -> ExportFormat {
        ExportFormat::from_path(path).unwrap_or(self.config.default_format)
    }

    /// Export `document` to `path` in `format`
    pub async fn export(
        &self,
        document: &PaginatedDocument,
        path: &Path,
        format: ExportFormat,
        options: &HtmlDocumentOptions,
    ) -> ExportResult<()> {
        let _guard = ExportGuard::acquire(&self.in_progress)?;
        log::info!(
            "exporting {} page(s) as {} to {}",
            document.page_count(),
            format.display_name(),
            path.display()
        );

        let html = document_html(document, options);
        match format {
            ExportFormat::Html => write_file_atomic(path, &html).await?,
            ExportFormat::Pdf => {
                let chrome = pdf::resolve_chrome_binary(self.config.chrome_binary.as_deref())?;
                let geometry = document.geometry.clone();
                let bytes = tokio::task::spawn_blocking(move || {
                    pdf::render_html_to_pdf(&html, &chrome, &geometry)
                })
                .await
                .map_err(|e| ExportError::Aborted(e.to_string()))??;
                tokio::fs::write(path, bytes).await?;
            }
        }

        log::info!("export finished: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FontChoice, PageGeometry};
    use crate::layout::Paginator;
    use chrono::NaiveDate;

    fn document() -> PaginatedDocument {
        Paginator::new(PageGeometry::default())
            .layout(
                "# Hello\n\nWorld\n",
                FontChoice::Inter,
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("a.HTML")).unwrap(), ExportFormat::Html);
        assert_eq!(ExportFormat::from_path(Path::new("a.pdf")).unwrap(), ExportFormat::Pdf);
        assert!(matches!(
            ExportFormat::from_path(Path::new("a.docx")),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_for_falls_back_to_default() {
        let exporter = Exporter::new(ExportConfig {
            default_format: ExportFormat::Pdf,
            ..Default::default()
        });
        assert_eq!(exporter.format_for(Path::new("out")), ExportFormat::Pdf);
        assert_eq!(exporter.format_for(Path::new("out.html")), ExportFormat::Html);
    }

    #[test]
    fn test_suggest_output_path() {
        let output = suggest_output_path(Path::new("/docs/readme.md"), ExportFormat::Pdf);
        assert_eq!(output, PathBuf::from("/docs/readme.pdf"));
    }

    #[test]
    fn test_guard_is_exclusive_and_released() {
        let flag = Arc::new(AtomicBool::new(false));
        {
            let _guard = ExportGuard::acquire(&flag).unwrap();
            assert!(flag.load(Ordering::Acquire));
            assert!(matches!(
                ExportGuard::acquire(&flag),
                Err(ExportError::AlreadyRunning)
            ));
        }
        assert!(!flag.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_html_export_writes_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        let exporter = Exporter::default();

        exporter
            .export(&document(), &path, ExportFormat::Html, &HtmlDocumentOptions::default())
            .await
            .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("<div id=\"pages\">"));
        assert!(written.contains("<h1>Hello</h1>"));
        assert!(!exporter.is_exporting());
    }

    #[tokio::test]
    async fn test_failed_pdf_export_clears_flag() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(ExportConfig {
            chrome_binary: Some(PathBuf::from("/nonexistent/pagemark-chrome")),
            ..Default::default()
        });

        let result = exporter
            .export(
                &document(),
                &dir.path().join("out.pdf"),
                ExportFormat::Pdf,
                &HtmlDocumentOptions::default(),
            )
            .await;

        assert!(matches!(result, Err(ExportError::Launch { .. })));
        assert!(!exporter.is_exporting());
        assert!(!dir.path().join("out.pdf").exists());
    }
}

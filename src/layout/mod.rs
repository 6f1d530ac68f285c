//! Page layout for Pagemark
//!
//! Turns document text into decorated pages:
//! - Height measurement (`measure`)
//! - Greedy pagination (`paginate`)
//! - Header/footer/background decoration (`decorate`)

pub mod decorate;
pub mod measure;
pub mod paginate;

pub use decorate::{decorate, decorate_all, decorate_on, Background, DecoratedPage, PageHeader};
pub use measure::{BlockMeasurer, MetricsMeasurer};
pub use paginate::{paginate, MeasuredBlock, Page};

use crate::config::{FontChoice, PageGeometry};
use crate::markdown::{render_document, Frontmatter, RenderOptions};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

/// Result of one full layout pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginatedDocument {
    pub frontmatter: Frontmatter,
    pub pages: Vec<DecoratedPage>,
    pub font: FontChoice,
    pub geometry: PageGeometry,
}

impl PaginatedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Runs render → measure → paginate → decorate for a document.
///
/// Holds no state between runs; the same inputs always produce the same
/// pages.
#[derive(Clone)]
pub struct Paginator {
    geometry: PageGeometry,
    options: RenderOptions,
    measurer: Arc<dyn BlockMeasurer>,
}

impl Paginator {
    /// Paginator with the font-metrics measurer for `geometry`
    pub fn new(geometry: PageGeometry) -> Self {
        let measurer = Arc::new(MetricsMeasurer::new(geometry.clone()));
        Self {
            geometry,
            options: RenderOptions::default(),
            measurer,
        }
    }

    pub fn with_measurer(mut self, measurer: Arc<dyn BlockMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn is_ready(&self) -> bool {
        self.measurer.is_ready()
    }

    /// Render and measure the body, then split it into pages
    pub fn pages(&self, text: &str, font: FontChoice) -> (Frontmatter, Vec<Page>) {
        let document = render_document(text, &self.options);
        let measured = document.blocks.into_iter().map(|block| {
            if block.is_break_marker() {
                MeasuredBlock::page_break()
            } else {
                let height = self.measurer.measure(&block, font);
                MeasuredBlock::new(block.html, height)
            }
        });
        let pages = paginate(measured, self.geometry.max_content_height_px());
        (document.frontmatter, pages)
    }

    /// Full layout pass. `None` when the measurer is not ready.
    pub fn layout(
        &self,
        text: &str,
        font: FontChoice,
        today: NaiveDate,
    ) -> Option<PaginatedDocument> {
        if !self.is_ready() {
            log::warn!("measurement unavailable; skipping layout");
            return None;
        }

        let (frontmatter, pages) = self.pages(text, font);
        let pages = decorate_all(pages, &frontmatter, today);
        Some(PaginatedDocument {
            frontmatter,
            pages,
            font,
            geometry: self.geometry.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::{RenderedBlock, PAGE_BREAK_MARKER};

    /// Every block measures the same height
    struct FixedHeight(f32);

    impl BlockMeasurer for FixedHeight {
        fn measure(&self, _block: &RenderedBlock, _font: FontChoice) -> f32 {
            self.0
        }
    }

    struct NotReady;

    impl BlockMeasurer for NotReady {
        fn is_ready(&self) -> bool {
            false
        }

        fn measure(&self, _block: &RenderedBlock, _font: FontChoice) -> f32 {
            0.0
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()
    }

    #[test]
    fn test_layout_end_to_end() {
        let paginator =
            Paginator::new(PageGeometry::default()).with_measurer(Arc::new(FixedHeight(400.0)));
        let text = format!(
            "---\nheader: Report\n---\nOne\n\nTwo\n\n{}\n\nThree\n",
            PAGE_BREAK_MARKER
        );
        let doc = paginator.layout(&text, FontChoice::Inter, today()).unwrap();

        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[0].page.blocks.len(), 2);
        assert_eq!(doc.pages[1].page.blocks[0].html.trim(), "<p>Three</p>");
        assert_eq!(doc.pages[1].footer, "Page 2 of 2");
        assert_eq!(doc.pages[0].header.as_ref().unwrap().text, "Report");
    }

    #[test]
    fn test_html_around_markers_is_never_dropped() {
        let paginator =
            Paginator::new(PageGeometry::default()).with_measurer(Arc::new(FixedHeight(10.0)));

        let (_, pages) = paginator.pages(
            "Intro\n\n<div class=\"page-break\"></div>\nNext page text\n",
            FontChoice::Inter,
        );
        assert_eq!(pages.len(), 2);
        assert!(pages[1].blocks[0].html.contains("Next page text"));

        let (_, pages) = paginator.pages(
            "<div class=\"note\">\n<p>Keep me</p>\n<span class=\"page-break\"></span>\n</div>\n\nAfter\n",
            FontChoice::Inter,
        );
        assert_eq!(pages.len(), 1);
        assert!(pages[0].blocks[0].html.contains("Keep me"));
    }

    #[test]
    fn test_height_budget_from_geometry() {
        // A4 with default margins leaves ~896px; three 400px blocks need two pages
        let paginator =
            Paginator::new(PageGeometry::default()).with_measurer(Arc::new(FixedHeight(400.0)));
        let (_, pages) = paginator.pages("a\n\nb\n\nc\n", FontChoice::Inter);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].blocks.len(), 2);
    }

    #[test]
    fn test_empty_document_has_one_page() {
        let paginator = Paginator::new(PageGeometry::default());
        let doc = paginator.layout("", FontChoice::Lora, today()).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert!(doc.pages[0].page.is_empty());
        assert_eq!(doc.pages[0].footer, "Page 1 of 1");
    }

    #[test]
    fn test_not_ready_skips_layout() {
        let paginator = Paginator::new(PageGeometry::default()).with_measurer(Arc::new(NotReady));
        assert!(paginator.layout("text", FontChoice::Inter, today()).is_none());
    }

    #[test]
    fn test_layout_is_deterministic() {
        let paginator = Paginator::new(PageGeometry::default());
        let text = "# Title\n\n".to_string() + &"Some paragraph text. ".repeat(200);
        let a = paginator.layout(&text, FontChoice::Merriweather, today());
        let b = paginator.layout(&text, FontChoice::Merriweather, today());
        assert_eq!(a, b);
    }
}

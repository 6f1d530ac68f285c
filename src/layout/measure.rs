//! Block height measurement
//!
//! The paginator only needs a height per block. Without a browser layout
//! engine the default measurer approximates heights from font metrics and the
//! content statistics gathered during rendering.

use crate::config::{FontChoice, PageGeometry};
use crate::markdown::{BlockKind, RenderedBlock};

/// Supplies rendered heights for blocks at the current page width and font.
pub trait BlockMeasurer: Send + Sync {
    /// Whether measurement is currently possible. Recomputation is skipped
    /// while this returns false.
    fn is_ready(&self) -> bool {
        true
    }

    /// Height of the block in CSS pixels
    fn measure(&self, block: &RenderedBlock, font: FontChoice) -> f32;
}

/// Heading font sizes relative to body text, h1..h6
const HEADING_SCALE: [f32; 6] = [2.0, 1.5, 1.25, 1.0, 0.875, 0.85];

/// Code is set in a monospace face at this fraction of the body size
const CODE_SCALE: f32 = 0.85;
const CODE_LINE_HEIGHT: f32 = 1.45;
const CODE_PADDING_PX: f32 = 32.0;

const TABLE_CELL_PADDING_PX: f32 = 13.0;
const RULE_HEIGHT_PX: f32 = 49.0;
const LIST_ITEM_GAP_PX: f32 = 4.0;

/// Images default to a 16:9 box spanning the content width
const IMAGE_ASPECT: f32 = 9.0 / 16.0;

/// Font-metrics approximation of a browser layout pass
#[derive(Debug, Clone)]
pub struct MetricsMeasurer {
    geometry: PageGeometry,
}

impl MetricsMeasurer {
    pub fn new(geometry: PageGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    fn chars_per_line(width: f32, font_px: f32, advance: f32) -> f32 {
        (width / (font_px * advance)).floor().max(1.0)
    }

    fn wrapped_lines(chars: usize, width: f32, font_px: f32, advance: f32) -> f32 {
        if chars == 0 {
            return 0.0;
        }
        (chars as f32 / Self::chars_per_line(width, font_px, advance)).ceil()
    }

    fn visible_html_chars(html: &str) -> usize {
        let mut in_tag = false;
        let mut count = 0;
        for c in html.chars() {
            match c {
                '<' => in_tag = true,
                '>' => in_tag = false,
                c if !in_tag && !c.is_whitespace() => count += 1,
                _ => {}
            }
        }
        count
    }
}

impl BlockMeasurer for MetricsMeasurer {
    fn measure(&self, block: &RenderedBlock, font: FontChoice) -> f32 {
        let font_px = self.geometry.font_size_px;
        let width = self.geometry.content_width_px();
        let advance = font.average_advance();
        let line = font_px * font.line_height();
        let stats = &block.stats;
        let images = stats.images as f32 * width * IMAGE_ASPECT;

        let height = match block.kind {
            BlockKind::PageBreak => 0.0,
            BlockKind::Paragraph => {
                let lines = Self::wrapped_lines(stats.text_chars, width, font_px, advance)
                    + stats.hard_breaks as f32;
                lines * line + images + font_px
            }
            BlockKind::Heading(level) => {
                let scale = HEADING_SCALE[usize::from(level.clamp(1, 6)) - 1];
                let size = font_px * scale;
                let lines = Self::wrapped_lines(stats.text_chars, width, size, advance).max(1.0);
                lines * size * 1.25 + font_px * 2.5
            }
            BlockKind::CodeBlock => {
                let size = font_px * CODE_SCALE;
                let lines = stats.code_lines.max(1) as f32;
                lines * size * CODE_LINE_HEIGHT + CODE_PADDING_PX + font_px
            }
            BlockKind::List => {
                let indent = font_px * 2.0;
                let text_lines =
                    Self::wrapped_lines(stats.text_chars, width - indent, font_px, advance);
                let lines = text_lines.max(stats.list_items as f32) + stats.hard_breaks as f32;
                lines * line
                    + stats.list_items as f32 * LIST_ITEM_GAP_PX
                    + stats.paragraphs as f32 * font_px
                    + images
                    + font_px
            }
            BlockKind::BlockQuote => {
                let indent = font_px * 1.25;
                let lines = Self::wrapped_lines(stats.text_chars, width - indent, font_px, advance)
                    + stats.hard_breaks as f32;
                lines * line + stats.paragraphs.max(1) as f32 * font_px + images
            }
            BlockKind::Table => {
                stats.table_rows as f32 * (line + TABLE_CELL_PADDING_PX) + font_px
            }
            BlockKind::Footnote => {
                let size = font_px * 0.9;
                let lines = Self::wrapped_lines(stats.text_chars, width, size, advance).max(1.0);
                lines * size * font.line_height() + font_px
            }
            BlockKind::Rule => RULE_HEIGHT_PX,
            BlockKind::Html => {
                let chars = Self::visible_html_chars(&block.html);
                Self::wrapped_lines(chars, width, font_px, advance) * line
            }
        };

        height.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::{render_blocks, RenderOptions};

    fn measure(body: &str, font: FontChoice) -> Vec<f32> {
        let measurer = MetricsMeasurer::new(PageGeometry::default());
        render_blocks(body, &RenderOptions::default())
            .iter()
            .map(|b| measurer.measure(b, font))
            .collect()
    }

    #[test]
    fn test_break_marker_has_no_height() {
        let heights = measure("<div class=\"page-break\"></div>\n", FontChoice::Inter);
        assert_eq!(heights, vec![0.0]);
    }

    #[test]
    fn test_longer_paragraph_is_taller() {
        let short = measure("Short line.\n", FontChoice::Inter)[0];
        let long = measure(&format!("{}\n", "word ".repeat(400)), FontChoice::Inter)[0];
        assert!(short > 0.0);
        assert!(long > short * 5.0);
    }

    #[test]
    fn test_wider_font_wraps_more() {
        let text = format!("{}\n", "lorem ipsum ".repeat(120));
        let narrow = measure(&text, FontChoice::Roboto)[0];
        let wide = measure(&text, FontChoice::SourceCodePro)[0];
        assert!(wide > narrow);
    }

    #[test]
    fn test_h1_taller_than_h6() {
        let heights = measure("# Big\n\n###### Small\n", FontChoice::Inter);
        assert!(heights[0] > heights[1]);
    }

    #[test]
    fn test_code_height_tracks_lines() {
        let three = measure("```\na\nb\nc\n```\n", FontChoice::Inter)[0];
        let six = measure("```\na\nb\nc\nd\ne\nf\n```\n", FontChoice::Inter)[0];
        assert!(six > three);
    }

    #[test]
    fn test_image_adds_height() {
        let plain = measure("caption\n", FontChoice::Inter)[0];
        let with_image = measure("![x](a.png) caption\n", FontChoice::Inter)[0];
        assert!(with_image > plain + 100.0);
    }

    #[test]
    fn test_visible_html_chars() {
        assert_eq!(MetricsMeasurer::visible_html_chars("<p>ab <b>c</b></p>"), 3);
    }
}

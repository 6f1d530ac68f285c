//! Markdown module for Pagemark
//!
//! Handles turning document text into renderable blocks:
//! - Frontmatter extraction
//! - Image layout directives
//! - Top-level block rendering via pulldown-cmark

pub mod blocks;
pub mod frontmatter;
pub mod image;

pub use blocks::{
    is_page_break_html, render_blocks, BlockKind, BlockStats, RenderedBlock, PAGE_BREAK_CLASS,
    PAGE_BREAK_MARKER,
};
pub use frontmatter::{BackgroundFit, DateSetting, Frontmatter};
pub use image::{render_image, ImageFields, ImageInput, ImageRules};

use pulldown_cmark::Options;

/// Options for one rendering call.
///
/// Passed explicitly to every render so no renderer state is shared between
/// callers.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// pulldown-cmark extensions
    pub markdown: Options,
    /// Image directive table
    pub image_rules: ImageRules,
}

impl Default for RenderOptions {
    fn default() -> Self {
        let mut markdown = Options::empty();
        markdown.insert(Options::ENABLE_TABLES);
        markdown.insert(Options::ENABLE_FOOTNOTES);
        markdown.insert(Options::ENABLE_STRIKETHROUGH);
        markdown.insert(Options::ENABLE_TASKLISTS);
        markdown.insert(Options::ENABLE_SMART_PUNCTUATION);

        Self {
            markdown,
            image_rules: ImageRules::default(),
        }
    }
}

impl RenderOptions {
    pub fn with_image_rules(mut self, rules: ImageRules) -> Self {
        self.image_rules = rules;
        self
    }
}

/// A document split into configuration and rendered body blocks
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub frontmatter: Frontmatter,
    pub blocks: Vec<RenderedBlock>,
}

/// Parse frontmatter and render the remaining body into blocks
pub fn render_document(raw: &str, options: &RenderOptions) -> RenderedDocument {
    let (frontmatter, body) = frontmatter::parse(raw);
    RenderedDocument {
        frontmatter,
        blocks: render_blocks(body, options),
    }
}

/// Escape text for use in HTML content and attribute values
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_document_strips_frontmatter() {
        let doc = render_document(
            "---\nheader: Notes\n---\n# Heading\n\nText\n",
            &RenderOptions::default(),
        );
        assert_eq!(doc.frontmatter.header(), Some("Notes"));
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[0].kind, BlockKind::Heading(1));
    }

    #[test]
    fn test_options_are_per_call() {
        let plain = RenderOptions::default().with_image_rules(ImageRules::none());
        let body = "![x](a.png#left)\n";
        let with_rules = render_blocks(body, &RenderOptions::default());
        let without = render_blocks(body, &plain);
        assert!(with_rules[0].html.contains("align-left"));
        assert!(!without[0].html.contains("class="));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}

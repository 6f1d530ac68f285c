//! Pagination engine
//!
//! Greedy forward fill: blocks are taken in source order and placed on the
//! current page until the next one would exceed the page content height.
//! There is no look-back and blocks are never split, so a block taller than a
//! page sits alone on its own page and overflows it.

use serde::Serialize;

/// A rendered block with its measured height
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasuredBlock {
    /// Serialized markup
    pub html: String,
    /// Rendered height at the target width and font
    pub height: f32,
    /// Explicit page break; contributes no content
    pub break_marker: bool,
}

impl MeasuredBlock {
    pub fn new(html: impl Into<String>, height: f32) -> Self {
        Self {
            html: html.into(),
            height,
            break_marker: false,
        }
    }

    pub fn page_break() -> Self {
        Self {
            html: String::new(),
            height: 0.0,
            break_marker: true,
        }
    }
}

/// One page of content
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub blocks: Vec<MeasuredBlock>,
    /// Accumulated height of the blocks on this page
    pub content_height: f32,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// A page holding a single block taller than the budget
    pub fn overflows(&self, max_page_height: f32) -> bool {
        self.content_height > max_page_height
    }

    fn push(&mut self, block: MeasuredBlock, height: f32) {
        self.content_height += height;
        self.blocks.push(block);
    }
}

/// Heights are taken as given; negative or non-finite values count as zero.
fn sanitized_height(height: f32) -> f32 {
    if height.is_finite() {
        height.max(0.0)
    } else {
        0.0
    }
}

/// Partition blocks into pages.
///
/// Break markers close a non-empty page and are dropped. The result always
/// holds at least one page, which is empty for an empty document.
pub fn paginate<I>(blocks: I, max_page_height: f32) -> Vec<Page>
where
    I: IntoIterator<Item = MeasuredBlock>,
{
    let mut pages = Vec::new();
    let mut current = Page::default();

    for block in blocks {
        if block.break_marker {
            if !current.is_empty() {
                pages.push(std::mem::take(&mut current));
            }
            continue;
        }

        let height = sanitized_height(block.height);
        if current.content_height + height > max_page_height && !current.is_empty() {
            pages.push(std::mem::take(&mut current));
        }
        if height > max_page_height {
            log::debug!(
                "block of height {:.1} exceeds page budget {:.1}; placing it alone",
                height,
                max_page_height
            );
        }
        current.push(block, height);
    }

    if !current.is_empty() {
        pages.push(current);
    }

    if pages.is_empty() {
        pages.push(Page::default());
    }

    log::debug!("paginated into {} page(s)", pages.len());
    pages
}

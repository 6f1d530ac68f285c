//! Top-level block rendering
//!
//! Converts a Markdown body into the flat list of top-level HTML blocks the
//! paginator works on. Each block keeps a few content statistics so a
//! measurer can estimate its rendered height without a layout engine.

use super::image::{render_image, ImageInput};
use super::RenderOptions;
use pulldown_cmark::{CowStr, Event, HeadingLevel, Parser, Tag};
use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use std::sync::OnceLock;

/// Class that marks an HTML block as an explicit page break
pub const PAGE_BREAK_CLASS: &str = "page-break";

/// Markup inserted by the editor's "insert page break" command
pub const PAGE_BREAK_MARKER: &str = "<div class=\"page-break\"></div>";

/// Kind of a top-level block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "type", content = "level")]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    BlockQuote,
    CodeBlock,
    List,
    Table,
    Footnote,
    Rule,
    Html,
    PageBreak,
}

/// Content statistics gathered while rendering a block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockStats {
    /// Visible characters of flowing text
    pub text_chars: usize,
    /// Lines of preformatted text (code blocks)
    pub code_lines: usize,
    /// Longest preformatted line in characters
    pub longest_code_line: usize,
    /// Explicit line breaks
    pub hard_breaks: usize,
    /// List items, at any depth
    pub list_items: usize,
    /// Table rows including the header row
    pub table_rows: usize,
    /// Inline images
    pub images: usize,
    /// Nested paragraphs (loose lists, quotes)
    pub paragraphs: usize,
}

/// One top-level rendered element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedBlock {
    pub kind: BlockKind,
    pub html: String,
    pub stats: BlockStats,
    /// Byte range of the block in the body text
    pub source: Range<usize>,
}

impl RenderedBlock {
    pub fn is_break_marker(&self) -> bool {
        self.kind == BlockKind::PageBreak
    }
}

fn class_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"class\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("class pattern is valid")
    })
}

fn opening_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\A\s*<([A-Za-z][A-Za-z0-9-]*)([^>]*?)(/?)>").expect("tag pattern is valid")
    })
}

/// Elements that never have a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn has_page_break_class(attrs: &str) -> bool {
    class_attr_regex().captures_iter(attrs).any(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|value| value.as_str().split_whitespace().any(|c| c == PAGE_BREAK_CLASS))
            .unwrap_or(false)
    })
}

/// End of the element opened at `open_end`, counting nested tags of the same name
fn closing_tag_end(html: &str, open_end: usize, name: &str) -> Option<usize> {
    let pattern = format!(r"(?i)<(/?){}\b[^>]*>", regex::escape(name));
    let tags = Regex::new(&pattern).ok()?;
    let mut depth = 0usize;
    for caps in tags.captures_iter(&html[open_end..]) {
        let tag = caps.get(0)?;
        if caps[1].is_empty() {
            if !tag.as_str().ends_with("/>") {
                depth += 1;
            }
        } else if depth == 0 {
            return Some(open_end + tag.end());
        } else {
            depth -= 1;
        }
    }
    None
}

/// Split an HTML fragment whose first element carries the page-break class
/// into that element and whatever markup follows it.
///
/// Returns `None` when the first element is not a break marker, even if a
/// marker appears nested further in.
pub fn split_page_break(html: &str) -> Option<(&str, &str)> {
    let caps = opening_tag_regex().captures(html)?;
    if !has_page_break_class(caps.get(2)?.as_str()) {
        return None;
    }
    let open_end = caps.get(0)?.end();
    let name = caps[1].to_ascii_lowercase();
    let self_closing = !caps[3].is_empty() || VOID_ELEMENTS.contains(&name.as_str());
    let end = if self_closing {
        open_end
    } else {
        closing_tag_end(html, open_end, &name).unwrap_or(open_end)
    };
    Some(html.split_at(end))
}

/// True when an HTML fragment is exactly one page-break marker element
pub fn is_page_break_html(html: &str) -> bool {
    split_page_break(html).is_some_and(|(_, rest)| rest.trim().is_empty())
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn kind_for(tag: &Tag<'_>) -> BlockKind {
    match tag {
        Tag::Heading(level, _, _) => BlockKind::Heading(heading_level(*level)),
        Tag::BlockQuote => BlockKind::BlockQuote,
        Tag::CodeBlock(_) => BlockKind::CodeBlock,
        Tag::List(_) => BlockKind::List,
        Tag::Table(_) => BlockKind::Table,
        Tag::FootnoteDefinition(_) => BlockKind::Footnote,
        _ => BlockKind::Paragraph,
    }
}

/// An image being collected until its end tag
struct PendingImage<'a> {
    dest: CowStr<'a>,
    title: CowStr<'a>,
    alt: String,
    depth: usize,
}

/// Events and stats for the block under construction
struct BlockBuilder<'a> {
    kind: BlockKind,
    events: Vec<Event<'a>>,
    stats: BlockStats,
    start: usize,
    end: usize,
    in_code: bool,
    image: Option<PendingImage<'a>>,
}

impl<'a> BlockBuilder<'a> {
    fn new(kind: BlockKind, range: &Range<usize>) -> Self {
        Self {
            kind,
            events: Vec::new(),
            stats: BlockStats::default(),
            start: range.start,
            end: range.end,
            in_code: false,
            image: None,
        }
    }

    fn push(&mut self, event: Event<'a>, options: &RenderOptions) {
        if let Some(image) = self.image.as_mut() {
            let closed = match event {
                Event::Start(Tag::Image(..)) => {
                    image.depth += 1;
                    false
                }
                Event::End(Tag::Image(..)) if image.depth > 0 => {
                    image.depth -= 1;
                    false
                }
                Event::End(Tag::Image(..)) => true,
                Event::Text(text) | Event::Code(text) => {
                    image.alt.push_str(&text);
                    false
                }
                _ => false,
            };
            if closed {
                if let Some(image) = self.image.take() {
                    let html = render_image(
                        ImageInput::Parts {
                            href: Some(&*image.dest),
                            title: Some(&*image.title),
                            alt: Some(&image.alt),
                        },
                        &options.image_rules,
                    );
                    self.stats.images += 1;
                    self.events.push(Event::Html(html.into()));
                }
            }
            return;
        }

        match &event {
            Event::Start(Tag::Image(_, dest, title)) => {
                self.image = Some(PendingImage {
                    dest: dest.clone(),
                    title: title.clone(),
                    alt: String::new(),
                    depth: 0,
                });
                return;
            }
            Event::Start(Tag::CodeBlock(_)) => self.in_code = true,
            Event::End(Tag::CodeBlock(_)) => self.in_code = false,
            Event::Start(Tag::Item) => self.stats.list_items += 1,
            Event::Start(Tag::TableHead) | Event::Start(Tag::TableRow) => {
                self.stats.table_rows += 1
            }
            Event::Start(Tag::Paragraph) if self.kind != BlockKind::Paragraph => {
                self.stats.paragraphs += 1
            }
            Event::Text(text) if self.in_code => {
                for line in text.lines() {
                    self.stats.code_lines += 1;
                    self.stats.longest_code_line =
                        self.stats.longest_code_line.max(line.chars().count());
                }
            }
            Event::Text(text) | Event::Code(text) => {
                self.stats.text_chars += text.chars().count();
            }
            Event::SoftBreak => self.stats.text_chars += 1,
            Event::HardBreak => self.stats.hard_breaks += 1,
            _ => {}
        }
        self.events.push(event);
    }

    fn finish(self) -> RenderedBlock {
        let mut html = String::new();
        pulldown_cmark::html::push_html(&mut html, self.events.into_iter());
        RenderedBlock {
            kind: self.kind,
            html,
            stats: self.stats,
            source: self.start..self.end,
        }
    }
}

/// Emit a merged top-level HTML block. Leading break markers become their own
/// blocks; the markup after them stays an ordinary HTML block.
fn push_html_block(blocks: &mut Vec<RenderedBlock>, html: &str, range: Range<usize>) {
    let mut rest = html;
    let mut start = range.start;
    while let Some((marker, tail)) = split_page_break(rest) {
        let end = (start + marker.len()).min(range.end);
        blocks.push(RenderedBlock {
            kind: BlockKind::PageBreak,
            html: marker.trim().to_string(),
            stats: BlockStats::default(),
            source: start..end,
        });
        start = end;
        rest = tail;
    }

    let trimmed = rest.trim_start_matches(['\r', '\n']);
    if !trimmed.trim().is_empty() {
        let start = (start + rest.len() - trimmed.len()).min(range.end);
        blocks.push(RenderedBlock {
            kind: BlockKind::Html,
            html: trimmed.to_string(),
            stats: BlockStats::default(),
            source: start..range.end,
        });
    }
}

/// Render a Markdown body into its top-level blocks, in source order.
pub fn render_blocks(body: &str, options: &RenderOptions) -> Vec<RenderedBlock> {
    let parser = Parser::new_ext(body, options.markdown).into_offset_iter();
    let mut blocks = Vec::new();
    let mut current: Option<BlockBuilder<'_>> = None;
    let mut depth = 0usize;
    // Consecutive top-level HTML lines belong to the same HTML block
    let mut pending_html: Option<(String, Range<usize>)> = None;

    for (event, range) in parser {
        if depth == 0 {
            match event {
                Event::Html(html) => {
                    match pending_html.as_mut() {
                        Some((buf, span)) if span.end == range.start => {
                            buf.push_str(&html);
                            span.end = range.end;
                        }
                        _ => {
                            if let Some((buf, span)) = pending_html.take() {
                                push_html_block(&mut blocks, &buf, span);
                            }
                            pending_html = Some((html.to_string(), range));
                        }
                    }
                    continue;
                }
                _ => {
                    if let Some((buf, span)) = pending_html.take() {
                        push_html_block(&mut blocks, &buf, span);
                    }
                }
            }
        }

        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    current = Some(BlockBuilder::new(kind_for(&tag), &range));
                }
                depth += 1;
                if let Some(builder) = current.as_mut() {
                    builder.push(Event::Start(tag), options);
                }
            }
            Event::End(tag) => {
                depth = depth.saturating_sub(1);
                if let Some(builder) = current.as_mut() {
                    builder.push(Event::End(tag), options);
                    builder.end = builder.end.max(range.end);
                }
                if depth == 0 {
                    if let Some(builder) = current.take() {
                        blocks.push(builder.finish());
                    }
                }
            }
            Event::Rule if depth == 0 => {
                let mut builder = BlockBuilder::new(BlockKind::Rule, &range);
                builder.push(Event::Rule, options);
                blocks.push(builder.finish());
            }
            other => {
                if let Some(builder) = current.as_mut() {
                    builder.push(other, options);
                }
            }
        }
    }

    if let Some((buf, span)) = pending_html.take() {
        push_html_block(&mut blocks, &buf, span);
    }

    log::trace!("rendered {} top-level blocks", blocks.len());
    blocks
}

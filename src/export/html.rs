//! Paginated HTML document
//!
//! Builds a static tree of pre-sized page containers: a `#pages` root with one
//! `.page` child per page. Each container has the physical page width, at
//! least the physical page height, the margin as inner padding and a forced
//! break after it, so a printer can emit one sheet per container without
//! reflowing anything.

use crate::config::PageGeometry;
use crate::layout::{Background, DecoratedPage, PageHeader, PaginatedDocument};
use crate::markdown::escape_html;
use std::fmt::Write;

/// Id of the root container holding the pages
pub const PAGES_ROOT_ID: &str = "pages";

/// Options for the HTML document wrapper
#[derive(Debug, Clone, Default)]
pub struct HtmlDocumentOptions {
    /// Document title
    pub title: Option<String>,
    /// Custom CSS appended after the built-in styles
    pub custom_css: Option<String>,
}

fn page_css(geometry: &PageGeometry, font_family: &str) -> String {
    format!(
        r#"
        @page {{
            size: {w}mm {h}mm;
            margin: 0;
        }}

        * {{
            box-sizing: border-box;
        }}

        html, body {{
            margin: 0;
            padding: 0;
        }}

        #{root} {{
            display: flex;
            flex-direction: column;
            gap: 0;
        }}

        .page {{
            position: relative;
            width: {w}mm;
            min-height: {h}mm;
            padding: {m}mm;
            overflow: hidden;
            background: #ffffff;
            color: #24292e;
            font-family: {font};
            font-size: {fs}px;
            line-height: 1.6;
            page-break-after: always;
            break-after: page;
        }}

        .page:last-child {{
            page-break-after: auto;
            break-after: auto;
        }}

        .page-background {{
            position: absolute;
            inset: 0;
            background-position: center;
            background-repeat: no-repeat;
            pointer-events: none;
            z-index: 0;
        }}

        .page-header, .page-content, .page-footer {{
            position: relative;
            z-index: 1;
        }}

        .page-header {{
            display: flex;
            justify-content: space-between;
            height: {hr}mm;
            font-size: 0.8em;
            color: #6a737d;
        }}

        .page-footer {{
            position: absolute;
            left: {m}mm;
            right: {m}mm;
            bottom: {m}mm;
            height: {fr}mm;
            text-align: center;
            font-size: 0.8em;
            color: #6a737d;
        }}

        .page-content h1, .page-content h2, .page-content h3,
        .page-content h4, .page-content h5, .page-content h6 {{
            margin-top: 24px;
            margin-bottom: 16px;
            font-weight: 600;
            line-height: 1.25;
        }}

        .page-content h1 {{ font-size: 2em; }}
        .page-content h2 {{ font-size: 1.5em; }}
        .page-content h3 {{ font-size: 1.25em; }}
        .page-content h4 {{ font-size: 1em; }}
        .page-content h5 {{ font-size: .875em; }}
        .page-content h6 {{ font-size: .85em; }}

        .page-content p {{ margin: 0 0 16px; }}

        .page-content pre {{
            background-color: #f6f8fa;
            padding: 16px;
            border-radius: 6px;
            line-height: 1.45;
            font-size: 85%;
            white-space: pre;
            overflow: hidden;
        }}

        .page-content code {{
            font-family: 'Source Code Pro', Consolas, monospace;
        }}

        .page-content blockquote {{
            margin: 0 0 16px;
            padding: 0 1em;
            color: #6a737d;
            border-left: .25em solid #e1e4e8;
        }}

        .page-content table {{
            border-collapse: collapse;
            width: 100%;
            margin: 0 0 16px;
        }}

        .page-content th, .page-content td {{
            padding: 6px 13px;
            border: 1px solid #e1e4e8;
        }}

        .page-content hr {{
            border: 0;
            border-top: 1px solid #e1e4e8;
            margin: 24px 0;
        }}

        .page-content img {{ max-width: 100%; height: auto; }}
        .page-content img.align-left {{ display: block; margin-right: auto; }}
        .page-content img.align-right {{ display: block; margin-left: auto; }}
        .page-content img.align-center {{ display: block; margin: 0 auto; }}
        .page-content img.align-full {{ display: block; width: 100%; }}
        .page-content img.float-left {{ float: left; margin: 0 1em 1em 0; max-width: 50%; }}
        .page-content img.float-right {{ float: right; margin: 0 0 1em 1em; max-width: 50%; }}
        .page-content img.width-half {{ width: 50%; }}
        .page-content img.width-third {{ width: 33.333%; }}

        .page-break {{ display: none; }}
"#,
        w = geometry.width_mm,
        h = geometry.height_mm,
        m = geometry.margin_mm,
        hr = geometry.header_reserve_mm,
        fr = geometry.footer_reserve_mm,
        fs = geometry.font_size_px,
        font = font_family,
        root = PAGES_ROOT_ID,
    )
}

fn css_url(url: &str) -> String {
    url.replace('\\', "\\\\").replace('\'', "\\'")
}

fn background_html(background: &Background) -> String {
    let style = format!(
        "background-image: url('{}'); background-size: {}; opacity: {}; transform: rotate({});",
        css_url(&background.image),
        background.fit.css_size(),
        background.opacity,
        background.rotate,
    );
    format!(
        "<div class=\"page-background\" style=\"{}\"></div>",
        escape_html(&style)
    )
}

fn header_html(header: &PageHeader) -> String {
    let mut html = String::from("<header class=\"page-header\">");
    let _ = write!(
        html,
        "<span class=\"page-header-text\">{}</span>",
        escape_html(&header.text)
    );
    if let Some(date) = &header.date {
        let _ = write!(html, "<span class=\"page-date\">{}</span>", escape_html(date));
    }
    html.push_str("</header>");
    html
}

/// Markup for a single decorated page
pub fn page_html(page: &DecoratedPage) -> String {
    let mut html = format!(
        "<section class=\"page\" data-page=\"{}\">\n",
        page.number
    );
    if let Some(background) = &page.background {
        html.push_str(&background_html(background));
        html.push('\n');
    }
    if let Some(header) = &page.header {
        html.push_str(&header_html(header));
        html.push('\n');
    }
    html.push_str("<main class=\"page-content\">\n");
    for block in &page.page.blocks {
        html.push_str(&block.html);
    }
    html.push_str("</main>\n");
    let _ = writeln!(
        html,
        "<footer class=\"page-footer\">{}</footer>",
        escape_html(&page.footer)
    );
    html.push_str("</section>\n");
    html
}

/// The `#pages` root with every page container
pub fn pages_html(document: &PaginatedDocument) -> String {
    let mut html = format!("<div id=\"{}\">\n", PAGES_ROOT_ID);
    for page in &document.pages {
        html.push_str(&page_html(page));
    }
    html.push_str("</div>\n");
    html
}

/// A standalone HTML document for preview or printing
pub fn document_html(document: &PaginatedDocument, options: &HtmlDocumentOptions) -> String {
    let title = options
        .title
        .as_deref()
        .or_else(|| document.frontmatter.header())
        .unwrap_or("Document");
    let styles = page_css(&document.geometry, document.font.css_family());
    let custom = options.custom_css.as_deref().unwrap_or("");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="generator" content="Pagemark">
    <title>{}</title>
    <style>{}
        {}
    </style>
</head>
<body>
{}</body>
</html>
"#,
        escape_html(title),
        styles,
        custom,
        pages_html(document)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FontChoice;
    use crate::layout::Paginator;
    use chrono::NaiveDate;

    fn layout(text: &str) -> PaginatedDocument {
        Paginator::new(PageGeometry::default())
            .layout(text, FontChoice::Lora, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
            .unwrap()
    }

    #[test]
    fn test_one_container_per_page() {
        let doc = layout("one\n\n<div class=\"page-break\"></div>\n\ntwo\n");
        let html = document_html(&doc, &HtmlDocumentOptions::default());
        assert!(html.contains("<div id=\"pages\">"));
        assert_eq!(html.matches("<section class=\"page\"").count(), 2);
        assert!(html.contains("Page 2 of 2"));
        assert!(html.contains("'Lora', serif"));
        assert!(html.contains("width: 210mm;"));
        assert!(html.contains("min-height: 297mm;"));
        assert!(html.contains("padding: 20mm;"));
    }

    #[test]
    fn test_header_and_background_rendered() {
        let doc = layout(
            "---\nheader: Q&A\ndate: 2024 edition\nbg-image: it's.png\nbg-fit: contain\n---\nBody\n",
        );
        let html = page_html(&doc.pages[0]);
        assert!(html.contains("<span class=\"page-header-text\">Q&amp;A</span>"));
        assert!(html.contains("<span class=\"page-date\">2024 edition</span>"));
        assert!(html.contains("class=\"page-background\""));
        assert!(html.contains("background-size: contain"));
        assert!(html.contains("rotate(0deg)"));
        assert!(html.contains("url(&#39;it\\&#39;s.png&#39;)"));
    }

    #[test]
    fn test_no_header_without_keys() {
        let doc = layout("Body\n");
        let html = page_html(&doc.pages[0]);
        assert!(!html.contains("page-header\""));
        assert!(!html.contains("page-background\""));
        assert!(html.contains("<footer class=\"page-footer\">Page 1 of 1</footer>"));
    }

    #[test]
    fn test_title_falls_back_to_header() {
        let doc = layout("---\nheader: Minutes\n---\nx\n");
        let html = document_html(&doc, &HtmlDocumentOptions::default());
        assert!(html.contains("<title>Minutes</title>"));

        let titled = document_html(
            &doc,
            &HtmlDocumentOptions {
                title: Some("Custom".to_string()),
                ..Default::default()
            },
        );
        assert!(titled.contains("<title>Custom</title>"));
    }
}

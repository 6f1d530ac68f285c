//! Image layout directives
//!
//! Image URLs may carry a fragment naming a layout directive, for example
//! `![Logo](logo.png#float-right "Company")`. The fragment is stripped from the
//! source and mapped to a CSS class on the emitted `<img>` element.

use super::escape_html;
use serde_json::Value;

/// One directive → class mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveRule {
    pub directive: String,
    pub class: String,
}

/// The directive table used while rendering images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRules {
    rules: Vec<DirectiveRule>,
}

const DEFAULT_DIRECTIVES: [(&str, &str); 8] = [
    ("left", "align-left"),
    ("right", "align-right"),
    ("center", "align-center"),
    ("full", "align-full"),
    ("float-left", "float-left"),
    ("float-right", "float-right"),
    ("half", "width-half"),
    ("third", "width-third"),
];

impl Default for ImageRules {
    fn default() -> Self {
        Self {
            rules: DEFAULT_DIRECTIVES
                .iter()
                .map(|(directive, class)| DirectiveRule {
                    directive: directive.to_string(),
                    class: class.to_string(),
                })
                .collect(),
        }
    }
}

impl ImageRules {
    /// Rules that never assign a class
    pub fn none() -> Self {
        Self { rules: Vec::new() }
    }

    /// Resolve a directive, case-insensitively. Only exact matches count.
    pub fn class_for(&self, directive: &str) -> Option<&str> {
        let directive = directive.to_ascii_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.directive == directive)
            .map(|rule| rule.class.as_str())
    }

    pub fn rules(&self) -> &[DirectiveRule] {
        &self.rules
    }
}

/// An image reference as handed over by a renderer integration.
///
/// Integrations either pass the whole link token (`{"href", "title", "text"}`)
/// or the three parts separately. Both are accepted.
#[derive(Debug, Clone, Copy)]
pub enum ImageInput<'a> {
    Token(&'a Value),
    Parts {
        href: Option<&'a str>,
        title: Option<&'a str>,
        alt: Option<&'a str>,
    },
}

/// Normalized image fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFields {
    pub href: String,
    pub title: String,
    pub alt: String,
}

impl<'a> ImageInput<'a> {
    /// Normalize to the three fields. `None` when the URL is not a string.
    pub fn normalize(&self) -> Option<ImageFields> {
        match self {
            ImageInput::Token(token) => {
                let href = token.get("href")?.as_str()?;
                let text_field = |name: &str| {
                    token
                        .get(name)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                Some(ImageFields {
                    href: href.to_string(),
                    title: text_field("title"),
                    alt: text_field("text"),
                })
            }
            ImageInput::Parts { href, title, alt } => Some(ImageFields {
                href: (*href)?.to_string(),
                title: title.unwrap_or_default().to_string(),
                alt: alt.unwrap_or_default().to_string(),
            }),
        }
    }
}

/// Split a URL into its effective source and optional directive
pub fn split_directive(url: &str) -> (&str, Option<&str>) {
    match url.split_once('#') {
        Some((src, directive)) => (src, Some(directive)),
        None => (url, None),
    }
}

/// Render an image reference to an `<img>` element.
///
/// Returns an empty string when the reference has no usable URL; one bad image
/// never fails the surrounding render.
pub fn render_image(input: ImageInput<'_>, rules: &ImageRules) -> String {
    let Some(fields) = input.normalize() else {
        log::debug!("skipping image without a string URL");
        return String::new();
    };

    let (src, directive) = split_directive(&fields.href);
    let class = directive.and_then(|d| rules.class_for(d));

    let mut html = format!("<img src=\"{}\"", escape_html(src));
    if !fields.alt.is_empty() {
        html.push_str(&format!(" alt=\"{}\"", escape_html(&fields.alt)));
    }
    if !fields.title.is_empty() {
        html.push_str(&format!(" title=\"{}\"", escape_html(&fields.title)));
    }
    if let Some(class) = class {
        html.push_str(&format!(" class=\"{}\"", class));
    }
    html.push_str(" />");
    html
}

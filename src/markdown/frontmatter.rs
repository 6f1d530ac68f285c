//! Frontmatter extraction
//!
//! A document may open with a `---` delimited block of `key: value` lines that
//! configures page decoration. Parsing is best-effort: anything that does not
//! look like a frontmatter block is treated as body text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Recognized keys
pub const KEY_HEADER: &str = "header";
pub const KEY_DATE: &str = "date";
pub const KEY_BG_IMAGE: &str = "bg-image";
pub const KEY_BG_OPACITY: &str = "bg-opacity";
pub const KEY_BG_ROTATE: &str = "bg-rotate";
pub const KEY_BG_FIT: &str = "bg-fit";

fn frontmatter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // The empty block is tried first so the first closing line ends it
        Regex::new(r"(?s)\A---\r?\n(?:---\r?\n|(.*?)\r?\n---\r?\n)")
            .expect("frontmatter pattern is valid")
    })
}

/// Key/value configuration taken from the frontmatter block.
///
/// Unknown keys are kept so callers can inspect them, they just have no
/// effect on decoration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frontmatter {
    entries: BTreeMap<String, String>,
}

/// How the date slot of the header is filled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSetting {
    /// `date: false`
    Hidden,
    /// `date: true` or no `date` key
    Today,
    /// Any other value, shown verbatim
    Literal(String),
}

/// How the background image is scaled into the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundFit {
    /// Fill the page, cropping as needed
    #[default]
    Cover,
    /// Fit inside the page preserving aspect ratio
    Contain,
    /// Stretch to the page box
    Stretch,
}

impl BackgroundFit {
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            Some("stretch") => BackgroundFit::Stretch,
            Some("contain") => BackgroundFit::Contain,
            _ => BackgroundFit::Cover,
        }
    }

    /// CSS `background-size` value
    pub fn css_size(&self) -> &'static str {
        match self {
            BackgroundFit::Cover => "cover",
            BackgroundFit::Contain => "contain",
            BackgroundFit::Stretch => "100% 100%",
        }
    }
}

impl Frontmatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw lookup of any key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn header(&self) -> Option<&str> {
        self.get(KEY_HEADER)
    }

    pub fn date(&self) -> DateSetting {
        match self.get(KEY_DATE) {
            Some("false") => DateSetting::Hidden,
            None | Some("true") => DateSetting::Today,
            Some(other) => DateSetting::Literal(other.to_string()),
        }
    }

    pub fn bg_image(&self) -> Option<&str> {
        self.get(KEY_BG_IMAGE)
    }

    /// Background opacity, 1.0 when absent or unparsable
    pub fn bg_opacity(&self) -> f32 {
        self.get(KEY_BG_OPACITY)
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(1.0)
    }

    /// Background rotation as a CSS angle. Bare numbers get a `deg` suffix.
    pub fn bg_rotate(&self) -> String {
        match self.get(KEY_BG_ROTATE) {
            None | Some("") => "0deg".to_string(),
            Some(value) if value.ends_with(|c: char| c.is_ascii_alphabetic()) => {
                value.to_string()
            }
            Some(value) => format!("{}deg", value),
        }
    }

    pub fn bg_fit(&self) -> BackgroundFit {
        BackgroundFit::from_value(self.get(KEY_BG_FIT))
    }
}

/// Split raw document text into its frontmatter and body.
///
/// Never fails: without a well-formed leading block the config is empty and
/// the body is the input unchanged.
pub fn parse(raw: &str) -> (Frontmatter, &str) {
    let Some(captures) = frontmatter_regex().captures(raw) else {
        return (Frontmatter::new(), raw);
    };

    let block_end = captures.get(0).map_or(0, |m| m.end());
    let mut config = Frontmatter::new();

    if let Some(block) = captures.get(1) {
        for line in block.as_str().lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            config.insert(key.trim(), value.trim());
        }
    }

    log::trace!("frontmatter: {} keys, body starts at byte {}", config.len(), block_end);
    (config, &raw[block_end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_hidden_date() {
        let (config, body) = parse("---\nheader: X\ndate: false\n---\nBody");
        assert_eq!(config.get("header"), Some("X"));
        assert_eq!(config.get("date"), Some("false"));
        assert_eq!(config.len(), 2);
        assert_eq!(body, "Body");
        assert_eq!(config.date(), DateSetting::Hidden);
    }

    #[test]
    fn test_no_frontmatter() {
        let raw = "# Title\n\ntext";
        let (config, body) = parse(raw);
        assert!(config.is_empty());
        assert_eq!(body, raw);
    }

    #[test]
    fn test_unterminated_block_is_body() {
        let raw = "---\nheader: X\nno closing";
        let (config, body) = parse(raw);
        assert!(config.is_empty());
        assert_eq!(body, raw);
    }

    #[test]
    fn test_closing_delimiter_needs_line_terminator() {
        let raw = "---\nheader: X\n---";
        let (config, body) = parse(raw);
        assert!(config.is_empty());
        assert_eq!(body, raw);
    }

    #[test]
    fn test_empty_block() {
        let (config, body) = parse("---\n---\nrest");
        assert!(config.is_empty());
        assert_eq!(body, "rest");
    }

    #[test]
    fn test_empty_block_ends_at_first_delimiter() {
        let (config, body) = parse("---\n---\nIntro\n\n---\nmore\n");
        assert!(config.is_empty());
        assert_eq!(body, "Intro\n\n---\nmore\n");
    }

    #[test]
    fn test_later_thematic_break_stays_in_body() {
        let (config, body) = parse("---\nheader: Notes\n---\nIntro\n\n---\n\nOutro\n");
        assert_eq!(config.header(), Some("Notes"));
        assert_eq!(body, "Intro\n\n---\n\nOutro\n");
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let (config, _) = parse("---\nbg-image: https://example.com/a.png\n---\n");
        assert_eq!(config.bg_image(), Some("https://example.com/a.png"));
    }

    #[test]
    fn test_lines_without_colon_ignored_unknown_kept() {
        let (config, body) = parse("---\njust words\n\ntheme: dark\n---\nx");
        assert_eq!(config.len(), 1);
        assert_eq!(config.get("theme"), Some("dark"));
        assert_eq!(body, "x");
    }

    #[test]
    fn test_crlf_block() {
        let (config, body) = parse("---\r\nheader: Report\r\n---\r\nBody");
        assert_eq!(config.header(), Some("Report"));
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_must_start_at_document_start() {
        let raw = "\n---\nheader: X\n---\n";
        let (config, body) = parse(raw);
        assert!(config.is_empty());
        assert_eq!(body, raw);
    }

    #[test]
    fn test_date_settings() {
        let mut config = Frontmatter::new();
        assert_eq!(config.date(), DateSetting::Today);
        config.insert("date", "true");
        assert_eq!(config.date(), DateSetting::Today);
        config.insert("date", "March 2024");
        assert_eq!(config.date(), DateSetting::Literal("March 2024".to_string()));
    }

    #[test]
    fn test_background_defaults_and_values() {
        let mut config = Frontmatter::new();
        assert_eq!(config.bg_opacity(), 1.0);
        assert_eq!(config.bg_rotate(), "0deg");
        assert_eq!(config.bg_fit(), BackgroundFit::Cover);

        config.insert("bg-opacity", "0.25");
        config.insert("bg-rotate", "15");
        config.insert("bg-fit", "contain");
        assert_eq!(config.bg_opacity(), 0.25);
        assert_eq!(config.bg_rotate(), "15deg");
        assert_eq!(config.bg_fit(), BackgroundFit::Contain);

        config.insert("bg-opacity", "half");
        config.insert("bg-rotate", "0.5turn");
        config.insert("bg-fit", "tile");
        assert_eq!(config.bg_opacity(), 1.0);
        assert_eq!(config.bg_rotate(), "0.5turn");
        assert_eq!(config.bg_fit(), BackgroundFit::Cover);
    }
}

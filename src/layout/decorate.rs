//! Per-page decoration
//!
//! Header, date, background and footer for each page, derived from the
//! document frontmatter and the page position.

use super::paginate::Page;
use crate::markdown::frontmatter::KEY_DATE;
use crate::markdown::{BackgroundFit, DateSetting, Frontmatter};
use chrono::{Local, NaiveDate};
use serde::Serialize;

/// Header line shown at the top of a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageHeader {
    pub text: String,
    /// Absent when the frontmatter sets `date: false`
    pub date: Option<String>,
}

/// Background image layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Background {
    pub image: String,
    pub opacity: f32,
    /// CSS angle, e.g. `15deg`
    pub rotate: String,
    pub fit: BackgroundFit,
}

/// A page with its decoration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecoratedPage {
    pub page: Page,
    /// 1-indexed page number
    pub number: usize,
    pub total: usize,
    pub header: Option<PageHeader>,
    pub background: Option<Background>,
    pub footer: String,
}

/// Footer label for a zero-based page index
pub fn footer_label(index: usize, total: usize) -> String {
    format!("Page {} of {}", index + 1, total)
}

fn header_for(config: &Frontmatter, today: NaiveDate) -> Option<PageHeader> {
    let header_text = config.header().filter(|h| !h.is_empty());
    let date_requested = matches!(config.get(KEY_DATE), Some(d) if d != "false");

    if header_text.is_none() && !date_requested {
        return None;
    }

    let date = match config.date() {
        DateSetting::Hidden => None,
        DateSetting::Literal(value) => Some(value),
        DateSetting::Today => Some(today.format("%Y-%m-%d").to_string()),
    };

    Some(PageHeader {
        text: config.header().unwrap_or_default().to_string(),
        date,
    })
}

fn background_for(config: &Frontmatter) -> Option<Background> {
    config.bg_image().map(|image| Background {
        image: image.to_string(),
        opacity: config.bg_opacity(),
        rotate: config.bg_rotate(),
        fit: config.bg_fit(),
    })
}

/// Decorate a page using today's local date
pub fn decorate(page: Page, index: usize, total: usize, config: &Frontmatter) -> DecoratedPage {
    decorate_on(page, index, total, config, Local::now().date_naive())
}

/// Decorate a page with an explicit "today"
pub fn decorate_on(
    page: Page,
    index: usize,
    total: usize,
    config: &Frontmatter,
    today: NaiveDate,
) -> DecoratedPage {
    DecoratedPage {
        page,
        number: index + 1,
        total,
        header: header_for(config, today),
        background: background_for(config),
        footer: footer_label(index, total),
    }
}

/// Decorate every page of a pagination result
pub fn decorate_all(
    pages: Vec<Page>,
    config: &Frontmatter,
    today: NaiveDate,
) -> Vec<DecoratedPage> {
    let total = pages.len();
    pages
        .into_iter()
        .enumerate()
        .map(|(index, page)| decorate_on(page, index, total, config, today))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::frontmatter;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    fn config(raw: &str) -> Frontmatter {
        frontmatter::parse(raw).0
    }

    #[test]
    fn test_header_without_date() {
        let cfg = config("---\nheader: X\ndate: false\n---\nBody");
        let page = decorate_on(Page::default(), 0, 1, &cfg, day());
        let header = page.header.expect("header shown");
        assert_eq!(header.text, "X");
        assert_eq!(header.date, None);
    }

    #[test]
    fn test_date_true_is_today() {
        let cfg = config("---\ndate: true\n---\n");
        let header = decorate_on(Page::default(), 0, 1, &cfg, day()).header.unwrap();
        assert_eq!(header.text, "");
        assert_eq!(header.date.as_deref(), Some("2024-03-07"));
    }

    #[test]
    fn test_today_format_is_zero_padded() {
        let cfg = config("---\ndate: true\n---\n");
        let header = decorate(Page::default(), 0, 1, &cfg).header.unwrap();
        let date = header.date.unwrap();
        assert_eq!(date.len(), 10);
        assert!(NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok());
    }

    #[test]
    fn test_literal_date() {
        let cfg = config("---\nheader: Memo\ndate: Q3 2024\n---\n");
        let header = decorate_on(Page::default(), 0, 1, &cfg, day()).header.unwrap();
        assert_eq!(header.date.as_deref(), Some("Q3 2024"));
    }

    #[test]
    fn test_header_with_absent_date_shows_today() {
        let cfg = config("---\nheader: Memo\n---\n");
        let header = decorate_on(Page::default(), 0, 1, &cfg, day()).header.unwrap();
        assert_eq!(header.date.as_deref(), Some("2024-03-07"));
    }

    #[test]
    fn test_no_header_keys_hides_header() {
        let cfg = config("---\ntheme: dark\n---\n");
        assert!(decorate_on(Page::default(), 0, 1, &cfg, day()).header.is_none());

        let hidden = config("---\nheader:\ndate: false\n---\n");
        assert!(decorate_on(Page::default(), 0, 1, &hidden, day()).header.is_none());
    }

    #[test]
    fn test_background_only_with_image() {
        let none = config("---\nbg-opacity: 0.5\n---\n");
        assert!(decorate_on(Page::default(), 0, 1, &none, day()).background.is_none());

        let cfg =
            config("---\nbg-image: paper.jpg\nbg-opacity: 0.3\nbg-rotate: 90\nbg-fit: stretch\n---\n");
        let bg = decorate_on(Page::default(), 0, 1, &cfg, day()).background.unwrap();
        assert_eq!(bg.image, "paper.jpg");
        assert_eq!(bg.opacity, 0.3);
        assert_eq!(bg.rotate, "90deg");
        assert_eq!(bg.fit, BackgroundFit::Stretch);
    }

    #[test]
    fn test_footer_numbering() {
        let pages = decorate_all(vec![Page::default(); 3], &Frontmatter::new(), day());
        let footers: Vec<&str> = pages.iter().map(|p| p.footer.as_str()).collect();
        assert_eq!(footers, vec!["Page 1 of 3", "Page 2 of 3", "Page 3 of 3"]);
        assert_eq!(pages[2].number, 3);
    }
}

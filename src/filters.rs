//! Value filters used by the layouts.
//!
//! All pure except [`random_limit`] (unseeded shuffle). Minification filters
//! live in [`crate::minify`].

use crate::computed;
use crate::content::{Project, parse_date};
use chrono::{DateTime, Datelike, Utc};
use deunicode::deunicode_char;
use pulldown_cmark::{Options, Parser, html as md_html};
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("not a date: {0}")]
    NotADate(String),
}

// =============================================================================
// Collections
// =============================================================================

/// The first `n` items.
pub fn limit<T>(items: &[T], n: usize) -> &[T] {
    &items[..n.min(items.len())]
}

/// Anything with a public page URL.
pub trait PageUrl {
    fn page_url(&self) -> Option<String>;
}

impl PageUrl for Project {
    fn page_url(&self) -> Option<String> {
        computed::page_location(self).map(|loc| loc.url)
    }
}

impl<T: PageUrl + ?Sized> PageUrl for &T {
    fn page_url(&self) -> Option<String> {
        (**self).page_url()
    }
}

/// Up to `n` items other than the current page, in random order.
///
/// Unseeded: the selection differs between builds.
pub fn random_limit<'a, T: PageUrl>(items: &'a [T], n: usize, current_url: &str) -> Vec<&'a T> {
    let mut others: Vec<&T> = items
        .iter()
        .filter(|item| item.page_url().as_deref() != Some(current_url))
        .collect();
    others.shuffle(&mut rand::thread_rng());
    others.truncate(n);
    others
}

// =============================================================================
// Strings
// =============================================================================

/// Google Fonts family name for a CSS API URL: whitespace becomes `+`.
pub fn format_google_font_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '+' } else { c })
        .collect()
}

/// Percent-encode like JavaScript's `encodeURIComponent`: everything except
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
pub fn encode_url(url: &str) -> String {
    urlencoding::encode(url)
        .replace("%21", "!")
        .replace("%2A", "*")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
}

/// Symbols spelled out before stripping.
fn symbol_word(c: char) -> Option<&'static str> {
    Some(match c {
        '&' => "and",
        '$' => "dollar",
        '%' => "percent",
        '<' => "less",
        '>' => "greater",
        '|' => "or",
        _ => return None,
    })
}

/// Strict URL slug: `Ünïcode & Friends – 2023` → `unicode-and-friends-2023`.
pub fn slug(input: &str) -> String {
    let mut transliterated = String::with_capacity(input.len());
    for c in input.chars() {
        if let Some(word) = symbol_word(c) {
            transliterated.push_str(word);
        } else if c == '-' {
            transliterated.push(' ');
        } else if c.is_ascii() {
            transliterated.push(c);
        } else if let Some(ascii) = deunicode_char(c) {
            transliterated.push_str(ascii);
        }
    }

    let strict: String = transliterated
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    strict
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Render markdown to HTML. Raw HTML passes through unsanitized.
pub fn render_using_markdown(raw: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(raw, options);
    let mut out = String::new();
    md_html::push_html(&mut out, parser);
    out
}

// =============================================================================
// Dates
// =============================================================================

/// Values the date filters accept.
pub trait DateLike {
    fn to_datetime(&self) -> Result<DateTime<Utc>, FilterError>;
}

impl DateLike for DateTime<Utc> {
    fn to_datetime(&self) -> Result<DateTime<Utc>, FilterError> {
        Ok(*self)
    }
}

impl DateLike for str {
    fn to_datetime(&self) -> Result<DateTime<Utc>, FilterError> {
        parse_date(self.trim()).map_err(|_| FilterError::NotADate(self.to_string()))
    }
}

impl DateLike for String {
    fn to_datetime(&self) -> Result<DateTime<Utc>, FilterError> {
        self.as_str().to_datetime()
    }
}

/// Four-digit year (UTC).
pub fn date_full_year<D: DateLike + ?Sized>(date: &D) -> Result<String, FilterError> {
    Ok(format!("{:04}", date.to_datetime()?.year()))
}

/// Epoch milliseconds in base 36; a short cache-busting token.
pub fn hash_from_date<D: DateLike + ?Sized>(date: &D) -> Result<String, FilterError> {
    Ok(to_base36(date.to_datetime()?.timestamp_millis()))
}

fn to_base36(value: i64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let negative = value < 0;
    let mut n = value.unsigned_abs();
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    if negative {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    // =========================================================================
    // limit / random_limit
    // =========================================================================

    #[test]
    fn limit_truncates_without_panicking() {
        let items = [1, 2, 3, 4];
        assert_eq!(limit(&items, 2), &[1, 2]);
        assert_eq!(limit(&items, 10), &[1, 2, 3, 4]);
        assert!(limit(&items, 0).is_empty());
    }

    struct Page(&'static str);

    impl PageUrl for Page {
        fn page_url(&self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    #[test]
    fn random_limit_excludes_current_page() {
        let pages = [Page("/a/"), Page("/b/"), Page("/c/"), Page("/d/")];
        for _ in 0..20 {
            let picked = random_limit(&pages, 3, "/b/");
            assert_eq!(picked.len(), 3);
            assert!(picked.iter().all(|p| p.0 != "/b/"));
            let unique: HashSet<_> = picked.iter().map(|p| p.0).collect();
            assert_eq!(unique.len(), 3);
        }
    }

    #[test]
    fn random_limit_returns_fewer_when_short() {
        let pages = [Page("/a/"), Page("/b/")];
        let picked = random_limit(&pages, 3, "/a/");
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].0, "/b/");
    }

    #[test]
    fn project_page_url_follows_permalink() {
        let p = Project {
            title: "A".into(),
            file_slug: "a".into(),
            ..Default::default()
        };
        assert_eq!(p.page_url().as_deref(), Some("/projects/a/"));
        let draft = Project {
            draft: true,
            ..p.clone()
        };
        assert_eq!(draft.page_url(), None);
    }

    // =========================================================================
    // Strings
    // =========================================================================

    #[test]
    fn google_font_name() {
        assert_eq!(format_google_font_name("EB Garamond"), "EB+Garamond");
        assert_eq!(format_google_font_name("Space  Grotesk"), "Space++Grotesk");
        assert_eq!(format_google_font_name("Inter"), "Inter");
    }

    #[test]
    fn encode_url_matches_uri_component() {
        assert_eq!(
            encode_url("https://a.com/x y?q=1&r=é"),
            "https%3A%2F%2Fa.com%2Fx%20y%3Fq%3D1%26r%3D%C3%A9"
        );
        assert_eq!(encode_url("-_.!~*'()"), "-_.!~*'()");
    }

    #[test]
    fn slug_is_strict() {
        assert_eq!(slug("Hello World"), "hello-world");
        assert_eq!(slug("  Déjà  vu!  "), "deja-vu");
        assert_eq!(slug("rock-n-roll"), "rock-n-roll");
        assert_eq!(slug("Salt & Pepper"), "salt-and-pepper");
        assert_eq!(slug("a -- b"), "a-b");
        assert_eq!(slug("!!!"), "");
    }

    #[test]
    fn markdown_renders_inline_and_raw_html() {
        assert_eq!(
            render_using_markdown("Hello *world*"),
            "<p>Hello <em>world</em></p>\n"
        );
        assert!(render_using_markdown("<b>raw</b>").contains("<b>raw</b>"));
    }

    // =========================================================================
    // Dates
    // =========================================================================

    #[test]
    fn full_year_from_date_and_string() {
        let d = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(date_full_year(&d).unwrap(), "2023");
        assert_eq!(date_full_year("2019-01-02").unwrap(), "2019");
    }

    #[test]
    fn full_year_rejects_non_dates() {
        assert_eq!(
            date_full_year("yesterday"),
            Err(FilterError::NotADate("yesterday".into()))
        );
    }

    #[test]
    fn hash_from_date_is_base36_millis() {
        let d = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(hash_from_date(&d).unwrap(), to_base36(1_700_000_000_000));
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(-36), "-10");
    }
}

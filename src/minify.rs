//! Minification: the `cssmin` and `jsmin` filters and the HTML output
//! transform.
//!
//! All three go through `minify-html`. CSS and JS are minified by wrapping
//! them in a `<style>` / `<script>` element and unwrapping the result.
//!
//! The filters never fail a build: when the minifier cannot make sense of
//! its input they log a warning and hand the input back unchanged. The JS
//! minifier asserts on some valid input instead of returning an error, so
//! every call runs under `catch_unwind` and a panic counts as a failure.
//! The HTML transform leaves inline scripts alone; they went through
//! [`jsmin`] when the page was assembled.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::warn;

fn base_cfg() -> minify_html::Cfg {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = false;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    cfg
}

fn script_cfg() -> minify_html::Cfg {
    let mut cfg = base_cfg();
    cfg.minify_js = true;
    cfg
}

/// Run the minifier, turning a panic into `None`.
fn minify_guarded(input: &[u8], cfg: &minify_html::Cfg) -> Option<Vec<u8>> {
    panic::catch_unwind(AssertUnwindSafe(|| minify_html::minify(input, cfg))).ok()
}

/// Minify `code` inside `<tag>` and unwrap it again.
fn minify_wrapped(code: &str, tag: &str, cfg: &minify_html::Cfg) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    if code.contains(&close) {
        return None;
    }
    let wrapped = format!("{open}{code}{close}");
    let out = minify_guarded(wrapped.as_bytes(), cfg)?;
    let out = String::from_utf8(out).ok()?;
    out.trim()
        .strip_prefix(&open)?
        .strip_suffix(&close)
        .map(str::to_string)
}

/// Minify a stylesheet. Returns the input on failure.
pub fn cssmin(code: &str) -> String {
    match minify_wrapped(code, "style", &base_cfg()) {
        Some(min) => min,
        None => {
            warn!("cssmin: could not minify stylesheet, using it unchanged");
            code.to_string()
        }
    }
}

/// Minify a script. Returns the input on failure.
pub fn jsmin(code: &str) -> String {
    match minify_wrapped(code, "script", &script_cfg()) {
        Some(min) => min,
        None => {
            warn!("jsmin: could not minify script, using it unchanged");
            code.to_string()
        }
    }
}

/// Output transform: minify pages whose output path is HTML; everything else
/// passes through.
pub fn minify_html_output(content: &str, output_path: &Path) -> String {
    let is_html = output_path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("html"));
    if !is_html {
        return content.to_string();
    }
    let Some(out) = minify_guarded(content.as_bytes(), &base_cfg()) else {
        warn!("htmlmin: minifier failed on {}, writing it unchanged", output_path.display());
        return content.to_string();
    };
    match String::from_utf8(out) {
        Ok(html) => html,
        Err(e) => {
            warn!("htmlmin: minifier produced invalid UTF-8 for {}: {e}", output_path.display());
            content.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cssmin_removes_whitespace_and_comments() {
        let css = "/* theme */\n:root {\n    --color-bg: #ffffff;\n}\n\nbody {\n    margin: 0;\n}\n";
        let min = cssmin(css);
        assert!(min.len() < css.len());
        assert!(!min.contains("/* theme */"));
        assert!(!min.contains('\n'));
        assert!(min.contains("--color-bg"));
    }

    #[test]
    fn cssmin_returns_input_it_cannot_wrap() {
        let weird = "a{}</style><b>";
        assert_eq!(cssmin(weird), weird);
    }

    #[test]
    fn jsmin_shrinks_script() {
        let js = "// toggle\nfunction toggle ( el ) {\n    el.classList.toggle( 'on' );\n}\n";
        let min = jsmin(js);
        assert!(min.len() < js.len());
        assert!(min.contains("classList"));
    }

    #[test]
    fn jsmin_returns_input_it_cannot_wrap() {
        let weird = "var a = '</script>';";
        assert_eq!(jsmin(weird), weird);
    }

    const DARK_MODE_JS: &str = include_str!("../static/dark_mode.js");
    const GLOBAL_JS: &str = include_str!("../static/global.js");

    #[test]
    fn jsmin_handles_bundled_scripts() {
        let dark = jsmin(DARK_MODE_JS);
        assert!(dark.contains("halide-color-scheme"));
        assert!(dark.contains("dark-toggle"));
        assert!(dark.len() <= DARK_MODE_JS.len());

        let global = jsmin(GLOBAL_JS);
        assert!(global.contains("loaded"));
        assert!(global.len() <= GLOBAL_JS.len());
    }

    #[test]
    fn html_transform_keeps_inline_scripts() {
        let html = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<script>{DARK_MODE_JS}</script>\n</head>\n<body>\n<p>Hi</p>\n<script>{GLOBAL_JS}</script>\n</body>\n</html>"
        );
        let min = minify_html_output(&html, Path::new("_site/index.html"));
        assert!(min.len() < html.len());
        assert!(min.contains(r#"localStorage.setItem("halide-color-scheme", scheme)"#));
        assert!(min.contains(r#"img.classList.add("loaded")"#));
    }

    #[test]
    fn html_transform_only_touches_html() {
        let html = "<!DOCTYPE html>\n<html>\n  <head>\n  <!-- note -->\n  </head>\n  <body>\n    <p>Hello   World</p>\n  </body>\n</html>";
        let min = minify_html_output(html, Path::new("_site/index.html"));
        assert!(!min.contains("<!-- note -->"));
        assert!(!min.contains("\n  "));
        assert!(min.contains("Hello"));

        let xml = "<feed>\n  <entry/>\n</feed>";
        assert_eq!(minify_html_output(xml, Path::new("_site/feed.xml")), xml);
    }
}

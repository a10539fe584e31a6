//! CLI output formatting.
//!
//! Output is **information-centric, not file-centric**: each project is
//! shown by its position in the collection and its title, with the source
//! file and output URL as indented context lines.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Projects
//! 001 Salt Flats (4 images) → /projects/salt-flats/
//!     Source: projects/salt-flats.md
//!     Description: Long exposures on the Uyuni...
//! 002 Ice → /work/ice/
//!     Source: projects/ice.md
//!
//! Hidden
//!     projects/wip.md: draft
//!
//! Settings
//!     Font: EB Garamond 420
//!     Images: avif 60, jpeg 80
//! ```
//!
//! ## Build
//!
//! ```text
//! Pages
//!     index.html
//!     projects/salt-flats/index.html
//!
//! Failed
//!     projects/ice.md: Cannot read source image ...
//!
//! Cache: 12 cached, 0 copied, 4 encoded (16 total)
//! Built 2 pages (1 failed)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::computed::{self, ComputedPermalink};
use crate::content::Project;
use crate::filters::render_using_markdown;
use crate::pipeline::BuildReport;
use crate::schema::SchemaViolations;
use crate::settings::Settings;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format a project header: positional index + title, with image count.
///
/// ```text
/// 001 Salt Flats (4 images)
/// 002 Ice
/// ```
fn entity_header(index: usize, title: &str, images: usize) -> String {
    match images {
        0 => format!("{} {}", format_index(index), title),
        1 => format!("{} {} (1 image)", format_index(index), title),
        n => format!("{} {} ({} images)", format_index(index), title, n),
    }
}

/// Strip HTML tags from a string (simple angle-bracket stripping).
fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// One-line plain-text preview of a markdown description.
fn description_preview(markdown: &str) -> String {
    let plain = strip_html_tags(&render_using_markdown(markdown));
    let joined = plain.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_desc(&joined, 40)
}

fn hidden_reason(project: &Project) -> Option<&'static str> {
    let fields = computed::resolve(project);
    if !fields.exclude_from_collections {
        return None;
    }
    Some(match fields.permalink {
        ComputedPermalink::Suppressed => "draft",
        ComputedPermalink::Disabled => "permalink disabled",
        _ => "excluded from collections",
    })
}

// ============================================================================
// Check
// ============================================================================

/// Content inventory: the collection in render order, hidden items, and the
/// settings that shape the output.
pub fn format_check_output(
    projects: &[Project],
    collection: &[&Project],
    settings: &Settings,
) -> Vec<String> {
    let mut lines = vec!["Projects".to_string()];
    if collection.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, project) in collection.iter().enumerate() {
        let header = entity_header(i + 1, &project.title, project.images.len());
        match computed::page_location(project) {
            Some(location) => lines.push(format!("{header} → {}", location.url)),
            None => lines.push(header),
        }
        lines.push(format!(
            "{}Source: {}",
            indent(1),
            project.input_path.display()
        ));
        if let Some(description) = &project.description {
            lines.push(format!(
                "{}Description: {}",
                indent(1),
                description_preview(description)
            ));
        }
    }

    let hidden: Vec<String> = projects
        .iter()
        .filter_map(|p| {
            hidden_reason(p).map(|reason| {
                format!("{}{}: {}", indent(1), p.input_path.display(), reason)
            })
        })
        .collect();
    if !hidden.is_empty() {
        lines.push(String::new());
        lines.push("Hidden".to_string());
        lines.extend(hidden);
    }

    let typography = &settings.theme.theme_typography;
    let formats = settings
        .images
        .output_formats()
        .into_iter()
        .map(|f| format!("{} {}", f, settings.images.quality(f).value()))
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(String::new());
    lines.push("Settings".to_string());
    lines.push(format!(
        "{}Font: {} {}",
        indent(1),
        typography.font,
        typography.font_weight
    ));
    lines.push(format!("{}Images: {}", indent(1), formats));
    lines
}

pub fn print_check_output(projects: &[Project], collection: &[&Project], settings: &Settings) {
    for line in format_check_output(projects, collection, settings) {
        println!("{}", line);
    }
}

// ============================================================================
// Validate
// ============================================================================

/// Per-document schema results. Violations are listed one per line under
/// the offending file.
pub fn format_validation_output(
    results: &[(PathBuf, Result<(), SchemaViolations>)],
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(()) => lines.push(format!("ok      {}", path.display())),
            Err(violations) => {
                failed += 1;
                lines.push(format!("invalid {}", path.display()));
                for v in &violations.0 {
                    lines.push(format!("{}{}", indent(1), v));
                }
            }
        }
    }
    lines.push(String::new());
    lines.push(format!(
        "{} documents checked, {} invalid",
        results.len(),
        failed
    ));
    lines
}

pub fn print_validation_output(results: &[(PathBuf, Result<(), SchemaViolations>)]) {
    for line in format_validation_output(results) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_output(report: &BuildReport, output_root: &Path) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    for page in &report.pages {
        lines.push(format!("{}{}", indent(1), page.display()));
    }
    if report.favicon_svg_copied {
        lines.push(format!("{}favicon.svg (copied)", indent(1)));
    }

    if !report.failures.is_empty() {
        lines.push(String::new());
        lines.push("Failed".to_string());
        for failure in &report.failures {
            lines.push(format!("{}{}: {}", indent(1), failure.page, failure.message));
        }
    }

    lines.push(String::new());
    lines.push(format!("Cache: {}", report.cache));
    let summary = format!(
        "Built {} pages into {}",
        report.pages.len(),
        output_root.display()
    );
    if report.failures.is_empty() {
        lines.push(summary);
    } else {
        lines.push(format!("{summary} ({} failed)", report.failures.len()));
    }
    lines
}

pub fn print_build_output(report: &BuildReport, output_root: &Path) {
    for line in format_build_output(report, output_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Env
// ============================================================================

/// Which runtime variables are set. Values are never printed.
pub fn format_env_output(branch: &str, presence: &[(&str, bool)]) -> Vec<String> {
    let mut lines = vec![format!("Branch: {branch}")];
    for (name, set) in presence {
        lines.push(format!(
            "{}{}: {}",
            indent(1),
            name,
            if *set { "set" } else { "not set" }
        ));
    }
    lines
}

pub fn print_env_output(branch: &str, presence: &[(&str, bool)]) {
    for line in format_env_output(branch, presence) {
        println!("{}", line);
    }
}

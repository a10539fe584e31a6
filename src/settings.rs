//! The singleton site settings document.
//!
//! Settings are content, not build configuration: the CMS edits them in
//! `_data/settings.yaml` and every page reads them through the render context.
//! Exactly one document exists. A missing or invalid file aborts the build.
//!
//! ```yaml
//! metadata:
//!   site_url: https://www.johndoe.com
//!   site_title: John Doe
//! theme:
//!   theme_colors:
//!     background: "#FFFFFF"
//!   theme_features:
//!     enable_dark_mode: true
//! images:
//!   webp: { enabled: true, quality: 80 }
//! i18n:
//!   site_language: en
//! ```
//!
//! Every field is optional except `metadata.site_url` and
//! `metadata.site_title`; omitted values take the defaults below.

use crate::imaging::{OutputFormat, Quality};
use crate::schema::{self, SchemaViolations};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Location of the settings document relative to the project root.
pub const SETTINGS_PATH: &str = "_data/settings.yaml";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings document not found at {0}")]
    Missing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error in settings: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("settings rejected by schema: {0}")]
    Schema(#[from] SchemaViolations),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub metadata: Metadata,
    pub theme: Theme,
    pub images: ImagePolicy,
    pub i18n: Locale,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Production URL without a trailing slash.
    pub site_url: String,
    pub site_title: String,
    pub site_subtitle_1: Option<String>,
    pub site_subtitle_2: Option<String>,
    /// Markdown, shown on the home page only.
    pub site_description: Option<String>,
    pub site_email: Option<String>,
    pub site_social_url: Option<String>,
    pub site_icon_svg: Option<String>,
    pub site_icon_png: Option<String>,
    pub site_ga4_id: Option<String>,
    pub seo: SiteSeo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSeo {
    pub site_title: Option<String>,
    pub site_description: Option<String>,
    /// Adds `noindex` to every page, overriding per-project settings.
    pub no_index: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub theme_layout: ThemeLayout,
    pub theme_colors: ThemeColors,
    pub theme_typography: ThemeTypography,
    pub theme_features: ThemeFeatures,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeLayout {
    /// Percentage applied to margins, padding and line height.
    pub space_scale: f64,
}

impl Default for ThemeLayout {
    fn default() -> Self {
        Self { space_scale: 100.0 }
    }
}

/// Light/dark color pairs. Light values double as the default scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeColors {
    pub background: String,
    pub text: String,
    pub link: String,
    pub background_dark: String,
    pub text_dark: String,
    pub link_dark: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            text: "#101010".to_string(),
            link: "#101010".to_string(),
            background_dark: "#101010".to_string(),
            text_dark: "#F1F1F1".to_string(),
            link_dark: "#F1F1F1".to_string(),
        }
    }
}

/// Value of [`ThemeTypography::font`] that selects the system font stack.
pub const SYSTEM_FONT: &str = "system";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeTypography {
    /// A Google Fonts family name, or `"system"`.
    pub font: String,
    pub font_weight: u32,
    pub font_scale: f64,
    pub line_height_scale: f64,
}

impl Default for ThemeTypography {
    fn default() -> Self {
        Self {
            font: SYSTEM_FONT.to_string(),
            font_weight: 420,
            font_scale: 100.0,
            line_height_scale: 100.0,
        }
    }
}

impl ThemeTypography {
    /// The Google Fonts family to load, or `None` for the system stack.
    pub fn google_font(&self) -> Option<&str> {
        let font = self.font.trim();
        (!font.is_empty() && font != SYSTEM_FONT).then_some(font)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeFeatures {
    pub enable_dark_mode: bool,
    /// Maximum number of projects on the home page grid.
    pub item_output_limit: usize,
    /// Animation length in milliseconds.
    pub transition_duration: u32,
    pub show_project_year: bool,
    pub show_project_grid_titles: bool,
}

impl Default for ThemeFeatures {
    fn default() -> Self {
        Self {
            enable_dark_mode: false,
            item_output_limit: 48,
            transition_duration: 300,
            show_project_year: true,
            show_project_grid_titles: true,
        }
    }
}

/// Per-format output policy for responsive images.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagePolicy {
    pub avif: FormatPolicy,
    pub webp: FormatPolicy,
    pub jpeg: FormatPolicy,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            avif: FormatPolicy::disabled(),
            webp: FormatPolicy::disabled(),
            jpeg: FormatPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatPolicy {
    pub enabled: bool,
    /// 1-100; range enforced by the schema before deserialization.
    pub quality: u32,
}

impl Default for FormatPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            quality: 80,
        }
    }
}

impl FormatPolicy {
    fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl ImagePolicy {
    /// Formats to emit, in `<source>` order (most efficient first).
    ///
    /// JPEG is always included: it is the `<img>` fallback, and its
    /// `enabled` flag is hidden in the editor.
    pub fn output_formats(&self) -> Vec<OutputFormat> {
        let mut formats = Vec::with_capacity(3);
        if self.avif.enabled {
            formats.push(OutputFormat::Avif);
        }
        if self.webp.enabled {
            formats.push(OutputFormat::Webp);
        }
        formats.push(OutputFormat::Jpeg);
        formats
    }

    pub fn quality(&self, format: OutputFormat) -> Quality {
        let q = match format {
            OutputFormat::Avif => self.avif.quality,
            OutputFormat::Webp => self.webp.quality,
            OutputFormat::Jpeg | OutputFormat::Png => self.jpeg.quality,
        };
        Quality::new(q)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Locale {
    /// ISO 639-1 code for `<html lang>`.
    pub site_language: String,
    /// Footer link text for the social profile.
    pub site_social_title: Option<String>,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            site_language: "en".to_string(),
            site_social_title: None,
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Parse and validate a settings document from YAML text.
///
/// Schema rules (required fields, quality ranges) are checked on the raw
/// document first so violations are reported, never clamped.
pub fn parse_settings(yaml: &str) -> Result<Settings, SettingsError> {
    let raw: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    schema::validate_document(&schema::SETTINGS, &raw)?;
    Ok(serde_yaml::from_value(raw)?)
}

/// Load the settings document from a project root.
pub fn load_settings(root: &Path) -> Result<Settings, SettingsError> {
    let path = root.join(SETTINGS_PATH);
    if !path.is_file() {
        return Err(SettingsError::Missing(path));
    }
    let content = fs::read_to_string(&path)?;
    parse_settings(&content)
}

// =============================================================================
// CSS generation
// =============================================================================

/// Generate CSS custom properties from the theme colors.
///
/// The dark scheme applies when the `dark` attribute is set on `<html>`, which
/// the dark-mode script toggles. Without dark mode only the light block is
/// emitted.
pub fn generate_color_css(colors: &ThemeColors, dark_mode: bool) -> String {
    let light = format!(
        r#":root {{
    --color-bg: {bg};
    --color-text: {text};
    --color-link: {link};
}}"#,
        bg = colors.background,
        text = colors.text,
        link = colors.link,
    );
    if !dark_mode {
        return light;
    }
    format!(
        r#"{light}

:root[dark] {{
    --color-bg: {bg};
    --color-text: {text};
    --color-link: {link};
}}"#,
        bg = colors.background_dark,
        text = colors.text_dark,
        link = colors.link_dark,
    )
}

/// Generate layout and typography custom properties from the theme.
pub fn generate_theme_css(theme: &Theme) -> String {
    let family = match theme.theme_typography.google_font() {
        Some(font) => format!("\"{font}\", system-ui, sans-serif"),
        None => "system-ui, -apple-system, \"Segoe UI\", Roboto, sans-serif".to_string(),
    };
    format!(
        r#":root {{
    --space-scale: {space};
    --font-family: {family};
    --font-weight: {weight};
    --font-scale: {font_scale};
    --line-height-scale: {line_height};
    --transition-duration: {transition}ms;
}}"#,
        space = theme.theme_layout.space_scale / 100.0,
        weight = theme.theme_typography.font_weight,
        font_scale = theme.theme_typography.font_scale / 100.0,
        line_height = theme.theme_typography.line_height_scale / 100.0,
        transition = theme.theme_features.transition_duration,
    )
}

//! Build configuration module.
//!
//! Two configuration surfaces feed a build:
//!
//! - **`halide.toml`** (optional, project root): where content lives, where
//!   the site is written, cache locations, and image width presets. Loaded by
//!   merging the user file on top of stock defaults, so the file only needs
//!   the keys it wants to change.
//! - **Runtime environment**: CMS branch, client id and tokens supplied by the
//!   hosting provider. Read through [`RuntimeEnv`], never validated beyond
//!   presence.
//!
//! Site *content* settings (title, colors, fonts, image quality) are not
//! configuration: they are a content document edited through the CMS and
//! live in [`crate::settings`].
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! input_dir = "."
//! output_dir = "_site"
//! cache_dir = ".cache"
//!
//! [build]
//! minify_html = true
//! # max_processes = 4      # Image encoding workers (omit for auto = CPU cores)
//!
//! [images]
//! project_widths = [1080, 1800, 2400]
//! grid_widths = [600, 1080]
//! project_sizes = "(min-width: 1200px) 80vw, 100vw"
//! grid_sizes = "(min-width: 800px) 33vw, 100vw"
//!
//! [cms]
//! media_root = "assets/uploads"
//! public_folder = "_site"
//! admin_output_folder = "admin"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use confique::Config;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the optional build configuration file in the project root.
pub const CONFIG_FILENAME: &str = "halide.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    Env(#[from] confique::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build configuration loaded from `halide.toml`.
///
/// All fields have defaults matching the conventional project layout:
/// content in the current directory, output in `_site/`, caches in `.cache/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Project root holding `projects/`, `_data/` and `assets/`.
    pub input_dir: PathBuf,
    /// Directory the generated site is written to.
    pub output_dir: PathBuf,
    /// Remote fetch cache.
    pub cache_dir: PathBuf,
    pub build: BuildConfig,
    pub images: ImagesConfig,
    pub cms: CmsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("_site"),
            cache_dir: PathBuf::from(".cache"),
            build: BuildConfig::default(),
            images: ImagesConfig::default(),
            cms: CmsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.project_widths.is_empty() {
            return Err(ConfigError::Validation(
                "images.project_widths must not be empty".into(),
            ));
        }
        if self.images.grid_widths.is_empty() {
            return Err(ConfigError::Validation(
                "images.grid_widths must not be empty".into(),
            ));
        }
        if self
            .images
            .project_widths
            .iter()
            .chain(&self.images.grid_widths)
            .any(|&w| w == 0)
        {
            return Err(ConfigError::Validation(
                "image widths must be non-zero".into(),
            ));
        }
        if self.build.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "build.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Directory (inside the output tree) that responsive image variants land in.
    pub fn images_output_dir(&self) -> PathBuf {
        self.output_dir.join("assets").join("images")
    }
}

/// Output and worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Collapse whitespace and drop comments in generated HTML.
    pub minify_html: bool,
    /// Maximum number of parallel image encoding workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            minify_html: true,
            max_processes: None,
        }
    }
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &BuildConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Width presets handed to the image shortcode by the layouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Output widths for images on project pages.
    pub project_widths: Vec<u32>,
    /// Output widths for the home page project grid.
    pub grid_widths: Vec<u32>,
    /// `sizes` attribute for project page images.
    pub project_sizes: String,
    /// `sizes` attribute for grid images.
    pub grid_sizes: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            project_widths: vec![1080, 1800, 2400],
            grid_widths: vec![600, 1080],
            project_sizes: "(min-width: 1200px) 80vw, 100vw".to_string(),
            grid_sizes: "(min-width: 800px) 33vw, 100vw".to_string(),
        }
    }
}

/// Settings shared with the CMS editing surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CmsConfig {
    /// Upload directory for media, relative to the project root.
    pub media_root: String,
    /// Folder the CMS serves the built site from.
    pub public_folder: String,
    /// Folder (inside the public folder) the CMS admin UI is built into.
    pub admin_output_folder: String,
    pub search: SearchConfig,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            media_root: "assets/uploads".to_string(),
            public_folder: "_site".to_string(),
            admin_output_folder: "admin".to_string(),
            search: SearchConfig::default(),
        }
    }
}

/// Search indexer settings passed through to the CMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub stopword_languages: Vec<String>,
    pub index_batch_size: u32,
    pub max_search_index_field_length: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            stopword_languages: vec!["eng".to_string()],
            index_batch_size: 100,
            max_search_index_field_length: 100,
        }
    }
}

// =============================================================================
// Runtime environment
// =============================================================================

/// Values supplied by the hosting environment.
///
/// Every field is optional; the build never fails because one is missing.
#[derive(Debug, Clone, Config)]
pub struct RuntimeEnv {
    /// Branch name exported by Netlify-style hosts.
    #[config(env = "HEAD")]
    pub head: Option<String>,
    /// Branch name exported by Vercel.
    #[config(env = "VERCEL_GIT_COMMIT_REF")]
    pub vercel_git_commit_ref: Option<String>,
    #[config(env = "TINA_CMS_CLIENT_ID")]
    pub client_id: Option<String>,
    #[config(env = "TINA_CMS_TOKEN")]
    pub token: Option<String>,
    #[config(env = "TINA_CMS_SEARCH_TOKEN")]
    pub search_token: Option<String>,
}

impl RuntimeEnv {
    /// Read the runtime surface from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::builder().env().load()?)
    }

    /// Content branch: `HEAD`, then `VERCEL_GIT_COMMIT_REF`, then `main`.
    pub fn branch(&self) -> &str {
        [&self.head, &self.vercel_git_commit_ref]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .find(|v| !v.is_empty())
            .unwrap_or("main")
    }

    /// `(name, present)` pairs for display; values are never echoed.
    pub fn presence(&self) -> Vec<(&'static str, bool)> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        vec![
            ("TINA_CMS_CLIENT_ID", present(&self.client_id)),
            ("TINA_CMS_TOKEN", present(&self.token)),
            ("TINA_CMS_SEARCH_TOKEN", present(&self.search_token)),
        ]
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `halide.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `halide.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys, and
/// validates the result. Relative paths in the file are resolved against
/// `root`.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let mut config: SiteConfig = merged.try_into()?;
    config.validate()?;
    for dir in [
        &mut config.input_dir,
        &mut config.output_dir,
        &mut config.cache_dir,
    ] {
        if dir.is_relative() {
            *dir = root.join(&*dir);
        }
    }
    Ok(config)
}

/// Returns a fully-commented stock `halide.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Halide build configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.
#
# Site content settings (title, colors, fonts, image quality) are edited
# through the CMS and live in _data/settings.yaml, not here.

# Project root holding projects/, _data/ and assets/
input_dir = "."

# Where the generated site is written
output_dir = "_site"

# Remote fetch cache (Google Fonts CSS, remote images)
cache_dir = ".cache"

# ---------------------------------------------------------------------------
# Build
# ---------------------------------------------------------------------------
[build]
# Collapse whitespace and strip comments from generated HTML.
minify_html = true

# Maximum parallel image-encoding workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Responsive images
# ---------------------------------------------------------------------------
[images]
# Output widths for images on project pages.
project_widths = [1080, 1800, 2400]

# Output widths for the home page project grid.
grid_widths = [600, 1080]

# sizes attributes emitted on <source> elements.
project_sizes = "(min-width: 1200px) 80vw, 100vw"
grid_sizes = "(min-width: 800px) 33vw, 100vw"

# ---------------------------------------------------------------------------
# CMS
# ---------------------------------------------------------------------------
[cms]
media_root = "assets/uploads"
public_folder = "_site"
admin_output_folder = "admin"

[cms.search]
stopword_languages = ["eng"]
index_batch_size = 100
max_search_index_field_length = 100
"##
}

//! Project documents.
//!
//! Each project is one markdown file under `projects/` with YAML front matter
//! between `---` fences:
//!
//! ```text
//! ---
//! title: Dunes
//! year: 2023
//! position: 10
//! images:
//!   - src: /assets/uploads/dune.jpg
//!     caption: Dune at dawn
//! ---
//! Optional markdown body, shown under the images.
//! ```
//!
//! Front matter is checked against [`schema::PROJECT`] before it is
//! deserialized, so a document that the editor would refuse to save also
//! fails the build. Loaded projects are read-only for the rest of the
//! pipeline.

use crate::schema::{self, SchemaViolations};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Directory (relative to the input root) holding project documents.
pub const PROJECTS_DIR: &str = "projects";

/// Position given to projects that do not set one.
pub const DEFAULT_POSITION: i64 = 999;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot list {dir}: {source}")]
    Walk {
        dir: PathBuf,
        source: walkdir::Error,
    },
    #[error("{0}: front matter is not closed with ---")]
    UnterminatedFrontMatter(PathBuf),
    #[error("{path}: invalid front matter: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("{path}: {source}")]
    Schema {
        path: PathBuf,
        source: SchemaViolations,
    },
}

/// Authored `permalink` value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Permalink {
    /// Not set (or empty): the default `/projects/<slug>/` URL.
    #[default]
    Default,
    /// `permalink: false`: never written.
    Disabled,
    /// An explicit output path such as `/work/dunes/`.
    Custom(String),
}

impl<'de> Deserialize<'de> for Permalink {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_yaml::Value::Bool(false) => Permalink::Disabled,
            serde_yaml::Value::String(s) if !s.trim().is_empty() => Permalink::Custom(s),
            _ => Permalink::Default,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProjectImage {
    pub src: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProjectSeo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub no_index: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Project {
    pub title: String,
    pub description: Option<String>,
    pub year: Option<i64>,
    pub images: Vec<ProjectImage>,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: Option<DateTime<Utc>>,
    pub draft: bool,
    pub position: i64,
    pub permalink: Permalink,
    pub seo: Option<ProjectSeo>,
    #[serde(rename = "eleventyExcludeFromCollections")]
    pub exclude_from_collections: Option<bool>,
    /// Markdown after the front matter.
    #[serde(skip)]
    pub body: String,
    /// Path relative to the input root, e.g. `projects/dunes.md`.
    #[serde(skip)]
    pub input_path: PathBuf,
    /// File stem, e.g. `dunes`.
    #[serde(skip)]
    pub file_slug: String,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            year: None,
            images: Vec::new(),
            date: None,
            draft: false,
            position: DEFAULT_POSITION,
            permalink: Permalink::Default,
            seo: None,
            exclude_from_collections: None,
            body: String::new(),
            input_path: PathBuf::new(),
            file_slug: String::new(),
        }
    }
}

impl Project {
    /// First image with a source, used for grid thumbnails.
    pub fn cover_image(&self) -> Option<&ProjectImage> {
        self.images.iter().find(|img| img.src.is_some())
    }

    pub fn no_index(&self) -> bool {
        self.seo.as_ref().is_some_and(|s| s.no_index)
    }
}

/// Accepts RFC 3339 timestamps (what the editor writes) and bare
/// `YYYY-MM-DD` dates (midnight UTC).
fn deserialize_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s).map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid date: {s}"))
}

/// Split a document into its front matter and body.
///
/// Documents without an opening fence have no front matter. An opening
/// fence without a closing one is an error (`None`).
fn split_front_matter(input: &str) -> Option<(&str, &str)> {
    const FENCE: &str = "---";
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    let first_line_end = input.find('\n').unwrap_or(input.len());
    if input[..first_line_end].trim_end() != FENCE {
        return Some(("", input));
    }
    let yaml_start = (first_line_end + 1).min(input.len());

    let mut offset = yaml_start;
    for line in input[yaml_start..].split_inclusive('\n') {
        if line.trim_end() == FENCE {
            let body = &input[offset + line.len()..];
            return Some((&input[yaml_start..offset], body));
        }
        offset += line.len();
    }
    None
}

/// Split a document into its raw front matter and body, without applying
/// any schema rules.
pub fn read_front_matter<'a>(
    input_path: &Path,
    text: &'a str,
) -> Result<(serde_yaml::Value, &'a str), ContentError> {
    let (yaml, body) = split_front_matter(text)
        .ok_or_else(|| ContentError::UnterminatedFrontMatter(input_path.to_path_buf()))?;
    let raw = if yaml.trim().is_empty() {
        serde_yaml::Value::Null
    } else {
        serde_yaml::from_str(yaml).map_err(|source| ContentError::Yaml {
            path: input_path.to_path_buf(),
            source,
        })?
    };
    Ok((raw, body))
}

/// Parse one project document. `input_path` is only used for errors and
/// recorded on the result.
pub fn parse_project(input_path: &Path, text: &str) -> Result<Project, ContentError> {
    let (raw, body) = read_front_matter(input_path, text)?;
    schema::validate_document(&schema::PROJECT, &raw).map_err(|source| ContentError::Schema {
        path: input_path.to_path_buf(),
        source,
    })?;

    let mut project: Project = serde_yaml::from_value(raw).map_err(|source| ContentError::Yaml {
        path: input_path.to_path_buf(),
        source,
    })?;
    project.body = body.trim().to_string();
    project.input_path = input_path.to_path_buf();
    project.file_slug = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(project)
}

/// Paths of every `projects/*.md` document, sorted by file name.
pub fn project_paths(root: &Path) -> Result<Vec<PathBuf>, ContentError> {
    let dir = root.join(PROJECTS_DIR);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| ContentError::Walk {
            dir: dir.clone(),
            source,
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|e| e == "md") {
            paths.push(path.to_path_buf());
        }
    }
    Ok(paths)
}

/// Load every project document under `root`.
pub fn load_projects(root: &Path) -> Result<Vec<Project>, ContentError> {
    let mut projects = Vec::new();
    for path in project_paths(root)? {
        let text = fs::read_to_string(&path).map_err(|source| ContentError::Io {
            path: path.clone(),
            source,
        })?;
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let project = parse_project(relative, &text)?;
        debug!("loaded {} ({})", relative.display(), project.title);
        projects.push(project);
    }
    Ok(projects)
}

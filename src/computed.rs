//! Per-project computed fields.
//!
//! Visibility is decided here and nowhere else: the collection builder and
//! the page writer both call [`resolve`], so a draft can never be listed
//! while being unpublished (or the other way round).

use crate::content::{Permalink, Project};
use std::path::{Component, PathBuf};

/// The permalink after draft handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputedPermalink {
    Default,
    Disabled,
    Custom(String),
    /// Draft: no page is written regardless of the authored value.
    Suppressed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedFields {
    pub permalink: ComputedPermalink,
    pub exclude_from_collections: bool,
}

pub fn resolve(project: &Project) -> ComputedFields {
    let permalink = if project.draft {
        ComputedPermalink::Suppressed
    } else {
        match &project.permalink {
            Permalink::Default => ComputedPermalink::Default,
            Permalink::Disabled => ComputedPermalink::Disabled,
            Permalink::Custom(path) => ComputedPermalink::Custom(path.clone()),
        }
    };
    let exclude_from_collections = project.draft
        || project.permalink == Permalink::Disabled
        || project.exclude_from_collections.unwrap_or(false);
    ComputedFields {
        permalink,
        exclude_from_collections,
    }
}

/// Where a page lands: the file under the output root and its public URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub output_path: PathBuf,
    pub url: String,
}

impl PageLocation {
    /// Map a URL-ish permalink to an output file. A trailing `/` (or no
    /// extension) means a directory index.
    pub fn from_permalink(permalink: &str) -> Self {
        let trimmed = permalink.trim();
        let with_root = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        let relative = with_root.trim_start_matches('/');
        let last = relative.rsplit('/').next().unwrap_or("");
        if relative.is_empty() || with_root.ends_with('/') || !last.contains('.') {
            let dir = relative.trim_end_matches('/');
            let url = if dir.is_empty() {
                "/".to_string()
            } else {
                format!("/{dir}/")
            };
            let output_path = if dir.is_empty() {
                PathBuf::from("index.html")
            } else {
                PathBuf::from(dir).join("index.html")
            };
            Self { output_path, url }
        } else {
            Self {
                output_path: PathBuf::from(relative),
                url: with_root,
            }
        }
    }

    /// True when the output path stays under the output root: only plain
    /// segments, no `..` and no root.
    pub fn is_contained(&self) -> bool {
        self.output_path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    }
}

/// Output location for a project, or `None` when it is not published.
pub fn page_location(project: &Project) -> Option<PageLocation> {
    match resolve(project).permalink {
        ComputedPermalink::Default => Some(PageLocation::from_permalink(&format!(
            "/projects/{}/",
            project.file_slug
        ))),
        ComputedPermalink::Custom(path) => Some(PageLocation::from_permalink(&path)),
        ComputedPermalink::Disabled | ComputedPermalink::Suppressed => None,
    }
}

//! Shared test utilities.
//!
//! [`SiteFixture`] builds a content tree in a temp directory: the settings
//! document, project files and arbitrary assets. [`create_test_jpeg`] writes
//! a small real JPEG for tests that go through the `image` crate.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::SiteFixture;
//!
//! let site = SiteFixture::new()
//!     .file("assets/uploads/dunes.jpg", "jpeg")
//!     .project("dunes", "title: Dunes\nimages:\n  - src: /assets/uploads/dunes.jpg");
//!
//! // ... build into site.root() ...
//! assert!(site.output("projects/dunes/index.html").exists());
//! ```

use image::{ImageEncoder, RgbImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::content::PROJECTS_DIR;
use crate::settings::SETTINGS_PATH;

pub const MINIMAL_SETTINGS: &str = "\
metadata:
  site_url: https://www.johndoe.com
  site_title: John Doe
";

// =========================================================================
// Content tree
// =========================================================================

pub struct SiteFixture {
    tmp: TempDir,
    settings_extra: String,
}

impl SiteFixture {
    /// A content root with the minimal settings document and no projects.
    pub fn new() -> Self {
        let fixture = Self::empty();
        fixture.write_settings();
        fixture
    }

    /// A content root with nothing in it.
    pub fn empty() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
            settings_extra: String::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    /// Append YAML to the settings document (top-level keys).
    pub fn settings_extra(mut self, yaml: &str) -> Self {
        self.settings_extra.push_str(yaml);
        self.write_settings();
        self
    }

    /// Write `projects/<slug>.md` with the given front matter and no body.
    pub fn project(self, slug: &str, front_matter: &str) -> Self {
        self.project_with_body(slug, front_matter, "")
    }

    pub fn project_with_body(self, slug: &str, front_matter: &str, body: &str) -> Self {
        let rel = format!("{PROJECTS_DIR}/{slug}.md");
        self.file(&rel, &format!("---\n{front_matter}\n---\n{body}"))
    }

    /// Write any file under the content root.
    pub fn file(self, rel: &str, contents: &str) -> Self {
        let path = self.root().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
        self
    }

    /// Path under the default output directory.
    pub fn output(&self, rel: &str) -> PathBuf {
        self.root().join("_site").join(rel)
    }

    pub fn read_output(&self, rel: &str) -> String {
        let path = self.output(rel);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
    }

    fn write_settings(&self) {
        let path = self.root().join(SETTINGS_PATH);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, format!("{MINIMAL_SETTINGS}{}", self.settings_extra)).unwrap();
    }
}

// =========================================================================
// Images
// =========================================================================

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

#[test]
fn fixture_writes_settings_and_projects() {
    let site = SiteFixture::new()
        .settings_extra("i18n:\n  site_language: fr\n")
        .project("dunes", "title: Dunes");

    let settings = std::fs::read_to_string(site.root().join(SETTINGS_PATH)).unwrap();
    assert!(settings.starts_with(MINIMAL_SETTINGS));
    assert!(settings.ends_with("site_language: fr\n"));
    let project = std::fs::read_to_string(site.root().join("projects/dunes.md")).unwrap();
    assert_eq!(project, "---\ntitle: Dunes\n---\n");
}

#[test]
fn empty_fixture_has_no_settings() {
    let site = SiteFixture::empty();
    assert!(!site.root().join(SETTINGS_PATH).exists());
}

//! Encode cache for responsive image variants.
//!
//! Encoding (AVIF in particular) dominates build time, so every variant the
//! transformer writes is recorded here and reused on the next build when
//! neither the source image nor the encode options changed.
//!
//! ## Cache keys
//!
//! Lookups are **content-addressed** by `source_hash` plus `params_hash`:
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Remote images
//!   are hashed after download, so a changed upstream file re-encodes even
//!   when its URL stays the same.
//! - **`params_hash`**: SHA-256 of (format, width, quality).
//!
//! A hit requires a matching entry whose output file still exists. When the
//! same content is requested at a different output path (a favicon and a
//! grid image sharing a source, say), the stored file is copied instead of
//! re-encoded.
//!
//! ## Storage
//!
//! The manifest lives at `<output>/assets/images/.cache-manifest.json`.
//! Stored paths are relative to the site output root so favicons written to
//! the root and variants under `assets/images/` share one manifest.
//!
//! `--no-cache` starts from an empty manifest; files are overwritten as
//! they are re-encoded.

use crate::imaging::{OutputFormat, Quality};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

const MANIFEST_FILENAME: &str = ".cache-manifest.json";

/// Bump to invalidate every existing manifest when key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// Length of the content hash used in variant filenames.
const OUTPUT_HASH_LEN: usize = 10;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk manifest mapping output paths to the content that produced them.
///
/// `content_index` is the runtime reverse map
/// `"{source_hash}:{params_hash}"` → output path. It is rebuilt on load and
/// never serialized.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
    #[serde(skip)]
    content_index: HashMap<String, String>,
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Load the manifest stored in `dir`. A missing, corrupt or
    /// version-mismatched manifest yields an empty one.
    pub fn load(dir: &Path) -> Self {
        let content = match std::fs::read_to_string(manifest_path(dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache manifest: {e}");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest.content_index = build_content_index(&manifest.entries);
        manifest
    }

    pub fn save(&self, dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(dir), json)
    }

    /// Find the stored output path for this content, if the file still exists
    /// under `site_root`. The path may differ from the one the caller is about
    /// to write; copying is up to the caller.
    pub fn find_cached(
        &self,
        source_hash: &str,
        params_hash: &str,
        site_root: &Path,
    ) -> Option<String> {
        let stored_path = self
            .content_index
            .get(&content_key(source_hash, params_hash))?;
        site_root
            .join(stored_path)
            .exists()
            .then(|| stored_path.clone())
    }

    /// Record an output file. An older entry for the same content at another
    /// path is dropped.
    pub fn insert(&mut self, output_path: String, source_hash: String, params_hash: String) {
        let key = content_key(&source_hash, &params_hash);

        if let Some(old_path) = self.content_index.get(&key)
            && *old_path != output_path
        {
            self.entries.remove(old_path.as_str());
        }

        self.content_index.insert(key, output_path.clone());
        self.entries.insert(
            output_path,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }
}

fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{source_hash}:{params_hash}")
}

fn build_content_index(entries: &HashMap<String, CacheEntry>) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(output_path, entry)| {
            (
                content_key(&entry.source_hash, &entry.params_hash),
                output_path.clone(),
            )
        })
        .collect()
}

/// SHA-256 of a file's contents as lowercase hex.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of the encode options for one variant.
pub fn hash_variant_params(format: OutputFormat, width: u32, quality: Quality) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"variant\0");
    hasher.update(format.extension().as_bytes());
    hasher.update(b"\0");
    hasher.update(width.to_le_bytes());
    hasher.update(quality.value().to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Short hash used as the variant filename stem (`<hash>-<width>.<ext>`).
///
/// Derived from the source content and the per-format encode options, so
/// every width of one format shares a stem and a quality change produces
/// new URLs.
pub fn output_hash(source_hash: &str, format: OutputFormat, quality: Quality) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_hash.as_bytes());
    hasher.update(b"\0");
    hasher.update(format.extension().as_bytes());
    hasher.update(quality.value().to_le_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..OUTPUT_HASH_LEN].to_string()
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn copy(&mut self) {
        self.copies += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits == 0 && self.copies == 0 {
            return write!(f, "{} encoded", self.misses);
        }
        if self.copies > 0 {
            write!(
                f,
                "{} cached, {} copied, {} encoded ({} total)",
                self.hits,
                self.copies,
                self.misses,
                self.total()
            )
        } else {
            write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        }
    }
}

pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // CacheManifest
    // =========================================================================

    #[test]
    fn empty_manifest_has_no_entries() {
        let m = CacheManifest::empty();
        assert_eq!(m.version, MANIFEST_VERSION);
        assert!(m.entries.is_empty());
        assert!(m.content_index.is_empty());
    }

    #[test]
    fn find_cached_hit_relative_to_site_root() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert(
            "assets/images/abc-1080.jpeg".into(),
            "src".into(),
            "prm".into(),
        );

        let dir = tmp.path().join("assets/images");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("abc-1080.jpeg"), "data").unwrap();

        assert_eq!(
            m.find_cached("src", "prm", tmp.path()),
            Some("assets/images/abc-1080.jpeg".to_string())
        );
        assert_eq!(m.find_cached("other", "prm", tmp.path()), None);
        assert_eq!(m.find_cached("src", "other", tmp.path()), None);
    }

    #[test]
    fn find_cached_miss_when_file_deleted() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("favicon-48.png".into(), "h".into(), "p".into());
        assert_eq!(m.find_cached("h", "p", tmp.path()), None);
    }

    #[test]
    fn insert_moves_entry_when_path_changes() {
        let mut m = CacheManifest::empty();
        m.insert("assets/images/a-48.png".into(), "s".into(), "p".into());
        m.insert("favicon-48.png".into(), "s".into(), "p".into());

        assert!(!m.entries.contains_key("assets/images/a-48.png"));
        assert!(m.entries.contains_key("favicon-48.png"));
    }

    #[test]
    fn save_and_load_rebuilds_index() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("assets/images");
        let mut m = CacheManifest::empty();
        m.insert("x.jpeg".into(), "s1".into(), "p1".into());
        m.insert("y.webp".into(), "s2".into(), "p2".into());
        m.save(&dir).unwrap();

        let loaded = CacheManifest::load(&dir);
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(
            loaded.content_index.get("s2:p2"),
            Some(&"y.webp".to_string())
        );
    }

    #[test]
    fn load_missing_corrupt_or_stale_returns_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());

        fs::write(manifest_path(tmp.path()), "not json").unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());

        let json = format!(
            r#"{{"version": {}, "entries": {{"a": {{"source_hash":"h","params_hash":"p"}}}}}}"#,
            MANIFEST_VERSION + 1
        );
        fs::write(manifest_path(tmp.path()), json).unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());
    }

    // =========================================================================
    // Hashes
    // =========================================================================

    #[test]
    fn hash_file_tracks_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        fs::write(&path, b"one").unwrap();
        let h1 = hash_file(&path).unwrap();
        assert_eq!(h1.len(), 64);
        assert_eq!(h1, hash_bytes(b"one"));

        fs::write(&path, b"two").unwrap();
        assert_ne!(h1, hash_file(&path).unwrap());
    }

    #[test]
    fn variant_params_hash_varies_with_each_option() {
        let base = hash_variant_params(OutputFormat::Jpeg, 1080, Quality::new(80));
        assert_eq!(
            base,
            hash_variant_params(OutputFormat::Jpeg, 1080, Quality::new(80))
        );
        assert_ne!(
            base,
            hash_variant_params(OutputFormat::Webp, 1080, Quality::new(80))
        );
        assert_ne!(
            base,
            hash_variant_params(OutputFormat::Jpeg, 1800, Quality::new(80))
        );
        assert_ne!(
            base,
            hash_variant_params(OutputFormat::Jpeg, 1080, Quality::new(75))
        );
    }

    #[test]
    fn output_hash_is_short_and_option_sensitive() {
        let h = output_hash("abc", OutputFormat::Jpeg, Quality::new(80));
        assert_eq!(h.len(), OUTPUT_HASH_LEN);
        assert_ne!(h, output_hash("abd", OutputFormat::Jpeg, Quality::new(80)));
        assert_ne!(h, output_hash("abc", OutputFormat::Jpeg, Quality::new(70)));
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display() {
        let mut s = CacheStats::default();
        s.misses = 3;
        assert_eq!(s.to_string(), "3 encoded");

        s.hits = 5;
        assert_eq!(s.to_string(), "5 cached, 3 encoded (8 total)");

        s.copies = 2;
        assert_eq!(s.to_string(), "5 cached, 2 copied, 3 encoded (10 total)");
    }
}

//! Responsive variant generation.
//!
//! [`ImageTransformer`] turns one local source image into every requested
//! (format × width) variant, consulting the encode cache first. Variants of
//! one request are encoded in parallel on the rayon pool; callers on the
//! async side run [`ImageTransformer::transform`] through `spawn_blocking`.
//!
//! Two concurrent requests for the same source are serialized on a
//! per-source lock, so the second one finds the first one's files in the
//! manifest instead of encoding them again.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{ResponsiveSize, calculate_responsive_sizes};
use super::params::{OutputFormat, Quality, ResizeParams};
use crate::cache::{self, CacheManifest, CacheStats};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Cannot read source image {path}: {source}")]
    Source {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Image processing failed for {path}: {source}")]
    Backend {
        path: PathBuf,
        source: BackendError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How variant files are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantNaming {
    /// `<content-hash>-<width>.<ext>`
    Hashed,
    /// `<prefix>-<width>.<ext>` (favicons)
    Prefixed(String),
}

/// One transform request: a local source and the variants to produce.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub source: PathBuf,
    pub widths: Vec<u32>,
    /// Formats in output order, each with its encode quality.
    pub formats: Vec<(OutputFormat, Quality)>,
    pub naming: VariantNaming,
    /// Directory the files are written to.
    pub output_dir: PathBuf,
    /// Public URL prefix of `output_dir`, ending in `/`.
    pub url_path: String,
}

/// A generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageVariant {
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub url: String,
    /// MIME type for `<source type>`.
    pub source_type: String,
    /// `"<url> <width>w"`
    pub srcset: String,
    pub filename: String,
    pub output_path: PathBuf,
    pub size: u64,
}

/// Every variant of one source, grouped by format in request order; widths
/// ascending within a format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMetadata {
    pub formats: Vec<(OutputFormat, Vec<ImageVariant>)>,
}

impl ImageMetadata {
    pub fn get(&self, format: OutputFormat) -> Option<&[ImageVariant]> {
        self.formats
            .iter()
            .find(|(f, _)| *f == format)
            .map(|(_, v)| v.as_slice())
    }
}

pub struct ImageTransformer {
    backend: Arc<dyn ImageBackend>,
    site_root: PathBuf,
    manifest_dir: PathBuf,
    manifest: Mutex<CacheManifest>,
    stats: Mutex<CacheStats>,
    source_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

/// Recover the guard from a poisoned lock; the guarded data stays consistent
/// because every critical section is a single insert or lookup.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

struct Job {
    format: OutputFormat,
    quality: Quality,
    size: ResponsiveSize,
}

impl ImageTransformer {
    /// `site_root` is the output root that manifest paths are relative to;
    /// the manifest itself is stored in `manifest_dir`. With `use_cache`
    /// false every variant is re-encoded.
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        site_root: PathBuf,
        manifest_dir: PathBuf,
        use_cache: bool,
    ) -> Self {
        let manifest = if use_cache {
            CacheManifest::load(&manifest_dir)
        } else {
            CacheManifest::empty()
        };
        Self {
            backend,
            site_root,
            manifest_dir,
            manifest: Mutex::new(manifest),
            stats: Mutex::new(CacheStats::default()),
            source_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn stats(&self) -> CacheStats {
        *lock(&self.stats)
    }

    /// Persist the manifest and return the run's cache statistics.
    pub fn finish(&self) -> std::io::Result<CacheStats> {
        lock(&self.manifest).save(&self.manifest_dir)?;
        Ok(self.stats())
    }

    fn source_lock(&self, source: &Path) -> Arc<Mutex<()>> {
        lock(&self.source_locks)
            .entry(source.to_path_buf())
            .or_default()
            .clone()
    }

    pub fn transform(&self, request: &TransformRequest) -> Result<ImageMetadata, TransformError> {
        let source = &request.source;
        let per_source = self.source_lock(source);
        let _guard = lock(&per_source);

        let source_hash = cache::hash_file(source).map_err(|e| TransformError::Source {
            path: source.clone(),
            source: e,
        })?;
        let dims = self
            .backend
            .identify(source)
            .map_err(|e| TransformError::Backend {
                path: source.clone(),
                source: e,
            })?;
        let sizes = calculate_responsive_sizes((dims.width, dims.height), &request.widths);

        let jobs: Vec<Job> = request
            .formats
            .iter()
            .flat_map(|&(format, quality)| {
                sizes.iter().map(move |&size| Job {
                    format,
                    quality,
                    size,
                })
            })
            .collect();

        let variants = jobs
            .par_iter()
            .map(|job| self.produce(request, &source_hash, job))
            .collect::<Result<Vec<_>, _>>()?;

        let mut metadata = ImageMetadata::default();
        for variant in variants {
            match metadata.formats.iter_mut().find(|(f, _)| *f == variant.format) {
                Some((_, list)) => list.push(variant),
                None => metadata.formats.push((variant.format, vec![variant])),
            }
        }
        Ok(metadata)
    }

    fn produce(
        &self,
        request: &TransformRequest,
        source_hash: &str,
        job: &Job,
    ) -> Result<ImageVariant, TransformError> {
        let stem = match &request.naming {
            VariantNaming::Hashed => cache::output_hash(source_hash, job.format, job.quality),
            VariantNaming::Prefixed(prefix) => prefix.clone(),
        };
        let filename = format!("{}-{}.{}", stem, job.size.width, job.format.extension());
        let output_path = request.output_dir.join(&filename);
        let relative = self.relative_path(&output_path);
        let params_hash = cache::hash_variant_params(job.format, job.size.width, job.quality);

        let cached = lock(&self.manifest).find_cached(source_hash, &params_hash, &self.site_root);
        match cached {
            Some(stored) if stored == relative => {
                debug!("cache hit: {relative}");
                lock(&self.stats).hit();
            }
            Some(stored) => {
                debug!("cache copy: {stored} -> {relative}");
                std::fs::create_dir_all(&request.output_dir)?;
                std::fs::copy(self.site_root.join(&stored), &output_path)?;
                lock(&self.stats).copy();
            }
            None => {
                debug!("encoding {relative}");
                self.backend
                    .resize(&ResizeParams {
                        source: request.source.clone(),
                        output: output_path.clone(),
                        width: job.size.width,
                        height: job.size.height,
                        format: job.format,
                        quality: job.quality,
                    })
                    .map_err(|e| TransformError::Backend {
                        path: request.source.clone(),
                        source: e,
                    })?;
                lock(&self.stats).miss();
            }
        }
        lock(&self.manifest).insert(relative, source_hash.to_string(), params_hash);

        let size = std::fs::metadata(&output_path)?.len();
        let url = format!("{}{}", request.url_path, filename);
        Ok(ImageVariant {
            format: job.format,
            width: job.size.width,
            height: job.size.height,
            srcset: format!("{} {}w", url, job.size.width),
            source_type: job.format.mime_type().to_string(),
            url,
            filename,
            output_path,
            size,
        })
    }

    fn relative_path(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.site_root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

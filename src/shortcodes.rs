//! Asset shortcodes: markup fragments that produce files as a side effect.
//!
//! - [`Shortcodes::favicon`]: PNG icons at the site root plus a `<link>`.
//! - [`Shortcodes::generate_image`]: responsive variants plus `<picture>`.
//! - [`Shortcodes::google_fonts_css`]: cached, minified font CSS.
//!
//! Image encoding is CPU-bound and runs on tokio's blocking pool; remote
//! sources are downloaded through the fetch cache first.

use crate::fetch::{self, CacheDuration, FetchCache, FetchError, FetchOptions, ResponseKind};
use crate::imaging::{
    ImageMetadata, ImageTransformer, Orientation, OutputFormat, Quality, TransformError,
    TransformRequest, VariantNaming,
};
use crate::minify::cssmin;
use maud::html;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub const FAVICON_WIDTHS: [u32; 3] = [48, 192, 512];
pub const DEFAULT_OUTPUT_WIDTHS: [u32; 3] = [1080, 1800, 2400];
pub const IMAGES_URL_PATH: &str = "/assets/images/";

/// Google Fonts picks font formats from the user agent; this one gets WOFF2.
pub const FONTS_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14_5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/74.0.3729.169 Safari/537.36";

/// Fetch cache lifetimes, in the `<n><unit>` form of [`CacheDuration::parse`].
const REMOTE_IMAGE_DURATION: &str = "5y";
const FONTS_DURATION: &str = "1d";

#[derive(Error, Debug)]
pub enum ShortcodeError {
    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),
    #[error("{src}: no JPEG variant to use as the <img> fallback")]
    NoFallbackFormat { src: String },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("image task failed: {0}")]
    Task(String),
}

impl ShortcodeError {
    /// Author mistakes abort the build; everything else only fails the page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingParameter(_))
    }
}

/// Parameters of [`Shortcodes::generate_image`], with the shortcode defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageParams {
    pub src: Option<String>,
    pub alt: String,
    pub classes: String,
    pub loading_type: String,
    pub viewport_sizes: String,
    pub output_widths: Vec<u32>,
    pub output_formats: Vec<OutputFormat>,
    pub quality_jpeg: Quality,
    pub quality_webp: Quality,
    pub quality_avif: Quality,
}

impl Default for ImageParams {
    fn default() -> Self {
        Self {
            src: None,
            alt: String::new(),
            classes: String::new(),
            loading_type: "lazy".to_string(),
            viewport_sizes: String::new(),
            output_widths: DEFAULT_OUTPUT_WIDTHS.to_vec(),
            output_formats: vec![OutputFormat::Jpeg],
            quality_jpeg: Quality::new(75),
            quality_webp: Quality::new(75),
            quality_avif: Quality::new(75),
        }
    }
}

impl ImageParams {
    pub fn with_src(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            ..Self::default()
        }
    }

    fn quality(&self, format: OutputFormat) -> Quality {
        match format {
            OutputFormat::Jpeg => self.quality_jpeg,
            OutputFormat::Webp => self.quality_webp,
            OutputFormat::Avif => self.quality_avif,
            OutputFormat::Png => Quality::default(),
        }
    }
}

fn strip_leading_slash(src: &str) -> &str {
    src.strip_prefix('/').unwrap_or(src)
}

pub struct Shortcodes {
    input_root: PathBuf,
    output_root: PathBuf,
    transformer: Arc<ImageTransformer>,
    fetch: Arc<FetchCache>,
}

impl Shortcodes {
    pub fn new(
        input_root: PathBuf,
        output_root: PathBuf,
        transformer: Arc<ImageTransformer>,
        fetch: Arc<FetchCache>,
    ) -> Self {
        Self {
            input_root,
            output_root,
            transformer,
            fetch,
        }
    }

    /// Local path of a source: remote URLs are downloaded into the fetch
    /// cache, local paths resolve against the input root.
    async fn resolve_source(&self, src: &str) -> Result<PathBuf, ShortcodeError> {
        if fetch::is_remote(src) {
            let duration = CacheDuration::parse(REMOTE_IMAGE_DURATION)?;
            let options = FetchOptions::new(duration, ResponseKind::Buffer).without_query_params();
            return Ok(self.fetch.fetch_to_path(src, &options).await?);
        }
        Ok(self.input_root.join(strip_leading_slash(src)))
    }

    async fn transform(&self, request: TransformRequest) -> Result<ImageMetadata, ShortcodeError> {
        let transformer = self.transformer.clone();
        let metadata = tokio::task::spawn_blocking(move || transformer.transform(&request))
            .await
            .map_err(|e| ShortcodeError::Task(e.to_string()))??;
        Ok(metadata)
    }

    /// Write `favicon-<w>.png` icons to the output root and return the link
    /// to the smallest one.
    pub async fn favicon(&self, src: &str) -> Result<String, ShortcodeError> {
        let source = self.resolve_source(src).await?;
        let metadata = self
            .transform(TransformRequest {
                source,
                widths: FAVICON_WIDTHS.to_vec(),
                formats: vec![(OutputFormat::Png, Quality::default())],
                naming: VariantNaming::Prefixed("favicon".to_string()),
                output_dir: self.output_root.clone(),
                url_path: "/".to_string(),
            })
            .await?;

        let smallest = metadata
            .get(OutputFormat::Png)
            .and_then(|v| v.first())
            .ok_or_else(|| ShortcodeError::Task(format!("{src}: no favicon produced")))?;
        Ok(html! {
            link rel="icon" href=(smallest.url) type="image/png";
        }
        .into_string())
    }

    /// Write responsive variants and return the `<picture>` markup.
    pub async fn generate_image(&self, params: ImageParams) -> Result<String, ShortcodeError> {
        let src = params
            .src
            .as_deref()
            .ok_or(ShortcodeError::MissingParameter("src"))?;
        let source = self.resolve_source(src).await?;

        let metadata = self
            .transform(TransformRequest {
                source,
                widths: params.output_widths.clone(),
                formats: params
                    .output_formats
                    .iter()
                    .map(|&f| (f, params.quality(f)))
                    .collect(),
                naming: VariantNaming::Hashed,
                output_dir: self.output_root.join("assets").join("images"),
                url_path: IMAGES_URL_PATH.to_string(),
            })
            .await?;

        picture_markup(src, &params, &metadata)
    }

    /// Fetch Google Fonts CSS (cached for a day) and minify it.
    pub async fn google_fonts_css(&self, url: &str) -> Result<String, ShortcodeError> {
        let duration = CacheDuration::parse(FONTS_DURATION)?;
        let options = FetchOptions::new(duration, ResponseKind::Text)
            .header("user-agent", FONTS_USER_AGENT);
        let css = self.fetch.fetch_text(url, &options).await?;
        Ok(cssmin(&css))
    }
}

/// `<picture>` with one `<source>` per format and the smallest JPEG as the
/// `<img>` fallback.
pub fn picture_markup(
    src: &str,
    params: &ImageParams,
    metadata: &ImageMetadata,
) -> Result<String, ShortcodeError> {
    let lowsrc = metadata
        .get(OutputFormat::Jpeg)
        .and_then(|v| v.first())
        .ok_or_else(|| ShortcodeError::NoFallbackFormat {
            src: src.to_string(),
        })?;
    let orientation = Orientation::from_dimensions(lowsrc.width, lowsrc.height);

    Ok(html! {
        picture class=(params.classes) data-orientation=(orientation.as_str()) {
            @for (format, variants) in &metadata.formats {
                source
                    type=(format.mime_type())
                    srcset=(variants.iter().map(|v| v.srcset.as_str()).collect::<Vec<_>>().join(", "))
                    sizes=(params.viewport_sizes);
            }
            img
                src=(lowsrc.url)
                width=(lowsrc.width)
                height=(lowsrc.height)
                alt=(params.alt)
                class="hover-fade"
                loading=(params.loading_type)
                decoding="async";
        }
    }
    .into_string())
}

//! The build: content in, site out.
//!
//! ```text
//! load settings + projects ──► collection ──► shared fragments ──► pages ──► minify + write
//!                                              (favicon, fonts)    (concurrent)
//! ```
//!
//! Pages render concurrently with `join_all`; each awaits its own image
//! shortcodes, whose encoding runs on the blocking pool. A page that fails
//! on fetch, transform or write is logged and counted, and the rest of the
//! site still builds. Configuration, settings, content and author errors
//! (a shortcode called without a required parameter) abort the build.

use crate::cache::CacheStats;
use crate::collection::build_project_collection;
use crate::computed::{self, PageLocation};
use crate::config::SiteConfig;
use crate::content::{self, ContentError, Project};
use crate::fetch::{FetchCache, HttpClient};
use crate::filters::{FilterError, date_full_year, limit, random_limit};
use crate::imaging::{ImageBackend, ImageTransformer, OutputFormat};
use crate::minify::minify_html_output;
use crate::schema::{self, SchemaViolations};
use crate::render::{
    FigureView, GridItem, HomeView, ProjectView, RenderContext, SiteAssets, google_fonts_url,
    render_home, render_project,
};
use crate::settings::{self, Settings, SettingsError};
use crate::shortcodes::{ImageParams, ShortcodeError, Shortcodes};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Passthrough copy: source under the input root, destination under the output root.
pub const FAVICON_SVG_SOURCE: &str = "assets/icons/favicon.svg";
pub const FAVICON_SVG_OUTPUT: &str = "favicon.svg";

/// Number of other projects suggested at the bottom of a project page.
pub const MORE_PROJECTS: usize = 3;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("{page}: {source}")]
    Shortcode {
        page: String,
        source: ShortcodeError,
    },
    #[error("{path} is written by both {first} and {second}")]
    DuplicateOutput {
        path: PathBuf,
        first: String,
        second: String,
    },
    #[error("{page}: permalink {permalink} points outside the output directory")]
    PermalinkEscapesOutput { page: String, permalink: String },
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub struct BuildOptions {
    /// Loaded config; its directories are already resolved.
    pub config: SiteConfig,
    /// When false, every image variant is re-encoded.
    pub use_cache: bool,
}

/// A page that could not be rendered or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    /// Input path of the project, or `index` for the home page.
    pub page: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub projects_loaded: usize,
    pub projects_in_collection: usize,
    /// Written pages, relative to the output root.
    pub pages: Vec<PathBuf>,
    pub failures: Vec<PageFailure>,
    pub favicon_svg_copied: bool,
    pub cache: CacheStats,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A rendered page waiting to be written.
struct RenderedPage {
    id: String,
    output_path: PathBuf,
    html: String,
}

/// A failed page carries its id for the report.
type PageResult = Result<RenderedPage, (String, ShortcodeError)>;

/// Run a full build with the given image backend and HTTP client.
pub async fn build(
    options: &BuildOptions,
    backend: Arc<dyn ImageBackend>,
    client: Arc<dyn HttpClient>,
) -> Result<BuildReport, BuildError> {
    let config = &options.config;
    let input_root = config.input_dir.clone();
    let output_root = config.output_dir.clone();

    let settings = settings::load_settings(&input_root)?;
    let projects = content::load_projects(&input_root)?;
    let collection = build_project_collection(&projects);
    info!(
        "Loaded {} projects, {} in collection",
        projects.len(),
        collection.len()
    );

    let locations = page_locations(&projects)?;

    create_dir(&output_root)?;
    let favicon_svg_copied = copy_favicon_svg(&input_root, &output_root)?;

    let transformer = Arc::new(ImageTransformer::new(
        backend,
        output_root.clone(),
        config.images_output_dir(),
        options.use_cache,
    ));
    let fetch = Arc::new(FetchCache::new(config.cache_dir.clone(), client));
    let shortcodes = Shortcodes::new(
        input_root.clone(),
        output_root.clone(),
        transformer.clone(),
        fetch,
    );

    let assets = shared_assets(&settings, &shortcodes, favicon_svg_copied).await?;
    let ctx = RenderContext {
        settings: &settings,
        assets: &assets,
        year: date_full_year(&Utc::now())?,
    };
    let pages = Pages {
        ctx: &ctx,
        config,
        shortcodes: &shortcodes,
        collection: &collection,
    };

    let (home, project_pages) = futures::join!(
        pages.home(),
        join_all(
            locations
                .iter()
                .map(|(project, location)| pages.project(project, location))
        )
    );

    let mut report = BuildReport {
        projects_loaded: projects.len(),
        projects_in_collection: collection.len(),
        favicon_svg_copied,
        ..Default::default()
    };

    let mut rendered = Vec::with_capacity(project_pages.len() + 1);
    for result in std::iter::once(home).chain(project_pages) {
        match result {
            Ok(page) => rendered.push(page),
            Err((page, source)) if source.is_fatal() => {
                return Err(BuildError::Shortcode { page, source });
            }
            Err((page, source)) => {
                error!("{page}: {source}");
                report.failures.push(PageFailure {
                    page,
                    message: source.to_string(),
                });
            }
        }
    }

    for page in rendered {
        let path = output_root.join(&page.output_path);
        let html = if config.build.minify_html {
            minify_html_output(&page.html, &path)
        } else {
            page.html
        };
        match write_page(&path, &html) {
            Ok(()) => {
                debug!("wrote {}", path.display());
                report.pages.push(page.output_path);
            }
            Err(e) => {
                error!("{}: cannot write {}: {e}", page.id, path.display());
                report.failures.push(PageFailure {
                    page: page.id,
                    message: e.to_string(),
                });
            }
        }
    }

    report.cache = transformer.finish().map_err(|source| BuildError::Io {
        path: config.images_output_dir(),
        source,
    })?;
    info!(
        "Wrote {} pages to {} ({} failed)",
        report.pages.len(),
        output_root.display(),
        report.failures.len()
    );
    Ok(report)
}

/// Schema results for the settings document and every project, without
/// building. Malformed YAML is still an error.
pub fn validate_documents(
    input_root: &Path,
) -> Result<Vec<(PathBuf, Result<(), SchemaViolations>)>, BuildError> {
    let mut results = Vec::new();

    let settings_path = input_root.join(settings::SETTINGS_PATH);
    if !settings_path.is_file() {
        return Err(SettingsError::Missing(settings_path).into());
    }
    let text = read_to_string(&settings_path)?;
    let raw: serde_yaml::Value = serde_yaml::from_str(&text).map_err(SettingsError::from)?;
    results.push((
        PathBuf::from(settings::SETTINGS_PATH),
        schema::validate_document(&schema::SETTINGS, &raw),
    ));

    for path in content::project_paths(input_root)? {
        let text = read_to_string(&path)?;
        let relative = path.strip_prefix(input_root).unwrap_or(&path).to_path_buf();
        let (raw, _) = content::read_front_matter(&relative, &text)?;
        let result = schema::validate_document(&schema::PROJECT, &raw);
        results.push((relative, result));
    }
    Ok(results)
}

fn read_to_string(path: &Path) -> Result<String, BuildError> {
    std::fs::read_to_string(path).map_err(|source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Published projects with their output locations. Two pages claiming the
/// same file is an error.
fn page_locations(projects: &[Project]) -> Result<Vec<(&Project, PageLocation)>, BuildError> {
    let mut claimed: HashMap<PathBuf, String> =
        HashMap::from([(PathBuf::from("index.html"), "index".to_string())]);
    let mut located = Vec::new();
    for project in projects {
        let Some(location) = computed::page_location(project) else {
            debug!("{}: not published", project.input_path.display());
            continue;
        };
        let id = project.input_path.display().to_string();
        if !location.is_contained() {
            return Err(BuildError::PermalinkEscapesOutput {
                page: id,
                permalink: location.url,
            });
        }
        if let Some(first) = claimed.insert(location.output_path.clone(), id.clone()) {
            return Err(BuildError::DuplicateOutput {
                path: location.output_path,
                first,
                second: id,
            });
        }
        located.push((project, location));
    }
    Ok(located)
}

fn create_dir(path: &Path) -> Result<(), BuildError> {
    std::fs::create_dir_all(path).map_err(|source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn copy_favicon_svg(input_root: &Path, output_root: &Path) -> Result<bool, BuildError> {
    let source = input_root.join(FAVICON_SVG_SOURCE);
    if !source.is_file() {
        return Ok(false);
    }
    let dest = output_root.join(FAVICON_SVG_OUTPUT);
    std::fs::copy(&source, &dest).map_err(|source| BuildError::Io { path: dest, source })?;
    debug!("copied {FAVICON_SVG_SOURCE}");
    Ok(true)
}

fn write_page(path: &Path, html: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
}

/// Theme CSS and scripts plus the favicon link and fonts CSS. Every page
/// shares these, so a failure here fails the build.
async fn shared_assets(
    settings: &Settings,
    shortcodes: &Shortcodes,
    svg_favicon: bool,
) -> Result<SiteAssets, BuildError> {
    let mut assets = SiteAssets::from_settings(settings);
    assets.svg_favicon = svg_favicon;
    let fragment_error = |source| BuildError::Shortcode {
        page: "site".to_string(),
        source,
    };

    if let Some(icon) = &settings.metadata.site_icon_png {
        assets.favicon_link = Some(shortcodes.favicon(icon).await.map_err(fragment_error)?);
    }
    if let Some(url) = google_fonts_url(settings) {
        assets.fonts_css = Some(
            shortcodes
                .google_fonts_css(&url)
                .await
                .map_err(fragment_error)?,
        );
    }
    Ok(assets)
}

/// Image shortcode parameters for the enabled formats in settings.
pub fn image_params(
    settings: &Settings,
    src: Option<String>,
    alt: &str,
    classes: &str,
    widths: &[u32],
    sizes: &str,
) -> ImageParams {
    let policy = &settings.images;
    let formats = policy.output_formats();
    let quality = |f| policy.quality(f);
    ImageParams {
        src,
        alt: alt.to_string(),
        classes: classes.to_string(),
        viewport_sizes: sizes.to_string(),
        output_widths: widths.to_vec(),
        quality_jpeg: quality(OutputFormat::Jpeg),
        quality_webp: quality(OutputFormat::Webp),
        quality_avif: quality(OutputFormat::Avif),
        output_formats: formats,
        ..ImageParams::default()
    }
}

/// Everything a page render needs, borrowed for the duration of the build.
struct Pages<'a> {
    ctx: &'a RenderContext<'a>,
    config: &'a SiteConfig,
    shortcodes: &'a Shortcodes,
    collection: &'a [&'a Project],
}

impl Pages<'_> {
    async fn grid_item(&self, project: &Project) -> Result<Option<GridItem>, ShortcodeError> {
        let Some(location) = computed::page_location(project) else {
            return Ok(None);
        };
        let picture = match project.cover_image() {
            Some(cover) => {
                let params = image_params(
                    self.ctx.settings,
                    cover.src.clone(),
                    cover.caption.as_deref().unwrap_or(&project.title),
                    "grid-image",
                    &self.config.images.grid_widths,
                    &self.config.images.grid_sizes,
                );
                Some(self.shortcodes.generate_image(params).await?)
            }
            None => None,
        };
        Ok(Some(GridItem {
            title: project.title.clone(),
            url: location.url,
            year: project.year,
            picture,
        }))
    }

    async fn grid(&self, projects: &[&Project]) -> Result<Vec<GridItem>, ShortcodeError> {
        let mut items = Vec::with_capacity(projects.len());
        for project in projects {
            if let Some(item) = self.grid_item(project).await? {
                items.push(item);
            }
        }
        Ok(items)
    }

    async fn home(&self) -> PageResult {
        let id = "index".to_string();
        let shown = limit(
            self.collection,
            self.ctx.settings.theme.theme_features.item_output_limit,
        );
        let grid = self.grid(shown).await.map_err(|e| (id.clone(), e))?;
        let html = render_home(self.ctx, &HomeView { grid }).into_string();
        Ok(RenderedPage {
            id,
            output_path: PathBuf::from("index.html"),
            html,
        })
    }

    async fn project(&self, project: &Project, location: &PageLocation) -> PageResult {
        let id = project.input_path.display().to_string();
        let view = self
            .project_view(project, &location.url)
            .await
            .map_err(|e| (id.clone(), e))?;
        let html = render_project(self.ctx, project, &location.url, &view).into_string();
        Ok(RenderedPage {
            id,
            output_path: location.output_path.clone(),
            html,
        })
    }

    async fn project_view(&self, project: &Project, url: &str) -> Result<ProjectView, ShortcodeError> {
        let mut figures = Vec::with_capacity(project.images.len());
        for image in &project.images {
            let params = image_params(
                self.ctx.settings,
                image.src.clone(),
                image.caption.as_deref().unwrap_or(""),
                "project-image",
                &self.config.images.project_widths,
                &self.config.images.project_sizes,
            );
            figures.push(FigureView {
                picture: self.shortcodes.generate_image(params).await?,
                caption: image.caption.clone(),
            });
        }

        let picks: Vec<&Project> = random_limit(self.collection, MORE_PROJECTS, url)
            .into_iter()
            .copied()
            .collect();
        let more = self.grid(&picks).await?;
        Ok(ProjectView { figures, more })
    }
}

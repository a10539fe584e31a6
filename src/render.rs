//! Page layouts.
//!
//! Every page is a [`Layout`] rendered inside the shared base document.
//! Templates are [maud](https://maud.lambda.xyz/) markup checked at compile
//! time, with automatic escaping.
//!
//! Rendering is split in two. The pipeline first resolves everything that
//! needs I/O (picture markup from the image shortcode, the favicon link, the
//! fonts CSS) into plain view structs; the functions here are then pure and
//! only read [`RenderContext`], which carries the settings explicitly.
//!
//! ## Pages
//!
//! - **Home** (`/index.html`): site description and the project grid
//! - **Project** (`/projects/<slug>/index.html` or the permalink): images
//!   with captions, description, body, share links, "more projects"

use crate::content::Project;
use crate::filters::{encode_url, format_google_font_name, render_using_markdown};
use crate::minify::{cssmin, jsmin};
use crate::settings::{self, Settings};
use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS_STATIC: &str = include_str!("../static/style.css");
const DARK_MODE_JS: &str = include_str!("../static/dark_mode.js");
const GLOBAL_JS: &str = include_str!("../static/global.js");

/// Which page template to render inside the base document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Home,
    Project,
}

impl Layout {
    pub fn body_class(self) -> &'static str {
        match self {
            Self::Home => "layout-home",
            Self::Project => "layout-project",
        }
    }
}

/// Build-wide fragments inlined into every page.
#[derive(Debug, Clone, Default)]
pub struct SiteAssets {
    /// `<link rel="icon">` for the PNG favicon, when one was generated.
    pub favicon_link: Option<String>,
    /// `/favicon.svg` was copied into the output root.
    pub svg_favicon: bool,
    /// Minified Google Fonts CSS, when a web font is selected.
    pub fonts_css: Option<String>,
    pub css: String,
    pub dark_mode_js: Option<String>,
    pub global_js: String,
}

impl SiteAssets {
    /// Theme CSS and scripts derived from settings. Favicon and fonts need
    /// I/O and are filled in by the pipeline.
    pub fn from_settings(settings: &Settings) -> Self {
        let theme = &settings.theme;
        let dark_mode = theme.theme_features.enable_dark_mode;
        let css = format!(
            "{}\n\n{}\n\n{}",
            settings::generate_color_css(&theme.theme_colors, dark_mode),
            settings::generate_theme_css(theme),
            CSS_STATIC
        );
        Self {
            favicon_link: None,
            svg_favicon: false,
            fonts_css: None,
            css: cssmin(&css),
            dark_mode_js: dark_mode.then(|| jsmin(DARK_MODE_JS)),
            global_js: jsmin(GLOBAL_JS),
        }
    }
}

/// Google Fonts CSS API URL for the selected font, if any.
pub fn google_fonts_url(settings: &Settings) -> Option<String> {
    let typography = &settings.theme.theme_typography;
    typography.google_font().map(|font| {
        format!(
            "https://fonts.googleapis.com/css2?family={}:wght@{}&display=swap",
            format_google_font_name(font),
            typography.font_weight
        )
    })
}

pub struct RenderContext<'a> {
    pub settings: &'a Settings,
    pub assets: &'a SiteAssets,
    /// Four-digit year for the footer copyright.
    pub year: String,
}

/// Head metadata of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMeta {
    pub title: String,
    pub description: Option<String>,
    /// Site-relative URL, starting with `/`.
    pub url: String,
    pub no_index: bool,
}

impl PageMeta {
    pub fn home(settings: &Settings) -> Self {
        let meta = &settings.metadata;
        Self {
            title: meta
                .seo
                .site_title
                .clone()
                .unwrap_or_else(|| meta.site_title.clone()),
            description: meta
                .seo
                .site_description
                .clone()
                .or_else(|| meta.site_description.clone()),
            url: "/".to_string(),
            no_index: meta.seo.no_index,
        }
    }

    pub fn project(settings: &Settings, project: &Project, url: &str) -> Self {
        let seo = project.seo.as_ref();
        Self {
            title: seo.and_then(|s| s.title.clone()).unwrap_or_else(|| {
                format!("{} | {}", project.title, settings.metadata.site_title)
            }),
            description: seo
                .and_then(|s| s.description.clone())
                .or_else(|| project.description.clone())
                .or_else(|| PageMeta::home(settings).description),
            url: url.to_string(),
            no_index: settings.metadata.seo.no_index || project.no_index(),
        }
    }
}

/// Absolute URL of a site-relative path.
pub fn absolute_url(site_url: &str, path: &str) -> String {
    format!("{}{}", site_url.trim_end_matches('/'), path)
}

/// One tile of the project grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridItem {
    pub title: String,
    pub url: String,
    pub year: Option<i64>,
    /// Picture markup of the cover image.
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeView {
    pub grid: Vec<GridItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FigureView {
    pub picture: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectView {
    pub figures: Vec<FigureView>,
    pub more: Vec<GridItem>,
}

// ============================================================================
// Base document
// ============================================================================

fn base_document(ctx: &RenderContext, meta: &PageMeta, layout: Layout, content: Markup) -> Markup {
    let settings = ctx.settings;
    let site = &settings.metadata;
    let canonical = absolute_url(&site.site_url, &meta.url);
    html! {
        (DOCTYPE)
        html lang=(settings.i18n.site_language) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (meta.title) }
                @if let Some(description) = &meta.description {
                    meta name="description" content=(description);
                    meta property="og:description" content=(description);
                }
                @if meta.no_index {
                    meta name="robots" content="noindex";
                }
                link rel="canonical" href=(canonical);
                meta property="og:title" content=(meta.title);
                meta property="og:url" content=(canonical);
                @if let Some(link) = &ctx.assets.favicon_link {
                    (PreEscaped(link))
                }
                @if ctx.assets.svg_favicon {
                    link rel="icon" href="/favicon.svg" type="image/svg+xml";
                }
                @if let Some(fonts) = &ctx.assets.fonts_css {
                    style { (PreEscaped(fonts)) }
                }
                style { (PreEscaped(&ctx.assets.css)) }
                @if let Some(js) = &ctx.assets.dark_mode_js {
                    script { (PreEscaped(js)) }
                }
                @if let Some(id) = &site.site_ga4_id {
                    (analytics(id))
                }
            }
            body class=(layout.body_class()) {
                (site_header(ctx))
                main { (content) }
                (site_footer(ctx))
                script { (PreEscaped(&ctx.assets.global_js)) }
            }
        }
    }
}

fn analytics(id: &str) -> Markup {
    let bootstrap = format!(
        "window.dataLayer=window.dataLayer||[];function gtag(){{dataLayer.push(arguments);}}gtag('js',new Date());gtag('config','{}');",
        id.replace(['\'', '\\', '<'], "")
    );
    html! {
        script async src={ "https://www.googletagmanager.com/gtag/js?id=" (encode_url(id)) } {}
        script { (PreEscaped(bootstrap)) }
    }
}

fn site_header(ctx: &RenderContext) -> Markup {
    let meta = &ctx.settings.metadata;
    html! {
        header.site-header {
            div {
                p.site-title { a href="/" { (meta.site_title) } }
                @if let Some(subtitle) = &meta.site_subtitle_1 {
                    p.site-subtitle { (subtitle) }
                }
                @if let Some(subtitle) = &meta.site_subtitle_2 {
                    p.site-subtitle { (subtitle) }
                }
            }
            @if ctx.settings.theme.theme_features.enable_dark_mode {
                label.dark-toggle-label {
                    input.dark-toggle type="checkbox" aria-label="Dark mode";
                    span { "Dark" }
                }
            }
        }
    }
}

fn site_footer(ctx: &RenderContext) -> Markup {
    let meta = &ctx.settings.metadata;
    let social_label = ctx
        .settings
        .i18n
        .site_social_title
        .as_deref()
        .unwrap_or("Social");
    html! {
        footer.site-footer {
            @if let Some(email) = &meta.site_email {
                a href={ "mailto:" (email) } { (email) }
            }
            @if let Some(url) = &meta.site_social_url {
                a href=(url) rel="me" { (social_label) }
            }
            span { "© " (ctx.year) " " (meta.site_title) }
        }
    }
}

// ============================================================================
// Layouts
// ============================================================================

fn grid(items: &[GridItem], show_titles: bool, show_year: bool) -> Markup {
    html! {
        ul.project-grid {
            @for item in items {
                li {
                    a href=(item.url) {
                        @if let Some(picture) = &item.picture {
                            (PreEscaped(picture))
                        }
                        @if show_titles {
                            p.grid-title {
                                (item.title)
                                @if let (true, Some(year)) = (show_year, item.year) {
                                    " " span.grid-year { (year) }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn render_home(ctx: &RenderContext, view: &HomeView) -> Markup {
    let features = &ctx.settings.theme.theme_features;
    let meta = PageMeta::home(ctx.settings);
    let content = html! {
        @if let Some(description) = &ctx.settings.metadata.site_description {
            div.site-description {
                (PreEscaped(render_using_markdown(description)))
            }
        }
        (grid(&view.grid, features.show_project_grid_titles, features.show_project_year))
    };
    base_document(ctx, &meta, Layout::Home, content)
}

fn share_links(ctx: &RenderContext, title: &str, url: &str) -> Markup {
    let absolute = absolute_url(&ctx.settings.metadata.site_url, url);
    let encoded = encode_url(&absolute);
    let encoded_title = encode_url(title);
    html! {
        ul.share-links {
            li { a href={ "mailto:?subject=" (encoded_title) "&body=" (encoded) } { "Email" } }
            li {
                a href={ "https://twitter.com/intent/tweet?url=" (encoded) "&text=" (encoded_title) }
                    target="_blank" rel="noopener" { "Share" }
            }
        }
    }
}

pub fn render_project(
    ctx: &RenderContext,
    project: &Project,
    url: &str,
    view: &ProjectView,
) -> Markup {
    let features = &ctx.settings.theme.theme_features;
    let meta = PageMeta::project(ctx.settings, project, url);
    let content = html! {
        article {
            header.project-header {
                h1 { (project.title) }
                @if let (true, Some(year)) = (features.show_project_year, project.year) {
                    p.project-year { (year) }
                }
                @if let Some(description) = &project.description {
                    div.project-description {
                        (PreEscaped(render_using_markdown(description)))
                    }
                }
            }
            div.project-images {
                @for figure in &view.figures {
                    figure {
                        (PreEscaped(&figure.picture))
                        @if let Some(caption) = &figure.caption {
                            figcaption { (caption) }
                        }
                    }
                }
            }
            @if !project.body.trim().is_empty() {
                div.project-body {
                    (PreEscaped(render_using_markdown(&project.body)))
                }
            }
            (share_links(ctx, &project.title, url))
        }
        @if !view.more.is_empty() {
            aside.more-projects {
                h2 { "More projects" }
                (grid(&view.more, true, features.show_project_year))
            }
        }
    };
    base_document(ctx, &meta, Layout::Project, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ProjectSeo;
    use crate::settings::parse_settings;

    fn settings(extra: &str) -> Settings {
        parse_settings(&format!(
            "metadata:\n  site_url: https://www.johndoe.com/\n  site_title: John Doe\n  site_description: Photographs of *places*\n{extra}"
        ))
        .unwrap()
    }

    fn ctx<'a>(settings: &'a Settings, assets: &'a SiteAssets) -> RenderContext<'a> {
        RenderContext {
            settings,
            assets,
            year: "2024".to_string(),
        }
    }

    fn project() -> Project {
        Project {
            title: "Salt Flats".into(),
            description: Some("Long *exposures*".into()),
            year: Some(2021),
            body: "Shot on **film**.".into(),
            file_slug: "salt-flats".into(),
            ..Default::default()
        }
    }

    fn item(title: &str) -> GridItem {
        GridItem {
            title: title.into(),
            url: format!("/projects/{}/", title.to_lowercase()),
            year: Some(2020),
            picture: Some(format!("<picture data-for=\"{title}\"></picture>")),
        }
    }

    // =========================================================================
    // Base document
    // =========================================================================

    #[test]
    fn base_document_includes_doctype_and_language() {
        let s = settings("i18n:\n  site_language: de\n");
        let assets = SiteAssets::from_settings(&s);
        let html = render_home(&ctx(&s, &assets), &HomeView::default()).into_string();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<html lang="de">"#));
        assert!(html.contains(r#"<body class="layout-home">"#));
    }

    #[test]
    fn svg_icon_link_follows_the_copied_file() {
        let s = settings("  site_icon_svg: /assets/icons/other.svg\n");
        let assets = SiteAssets::default();
        let html = render_home(&ctx(&s, &assets), &HomeView::default()).into_string();
        assert!(!html.contains("/favicon.svg"));
    }

    #[test]
    fn head_uses_seo_overrides() {
        let s = settings(
            "  seo:\n    site_title: JD Photography\n    site_description: Portfolio\n    no_index: true\n",
        );
        let assets = SiteAssets::default();
        let html = render_home(&ctx(&s, &assets), &HomeView::default()).into_string();
        assert!(html.contains("<title>JD Photography</title>"));
        assert!(html.contains(r#"<meta name="description" content="Portfolio">"#));
        assert!(html.contains(r#"<meta name="robots" content="noindex">"#));
        assert!(html.contains(r#"<link rel="canonical" href="https://www.johndoe.com/">"#));
    }

    #[test]
    fn head_inlines_fragments() {
        let s = settings("  site_icon_svg: /assets/icons/favicon.svg\n  site_ga4_id: G-ABC123\n");
        let assets = SiteAssets {
            favicon_link: Some(r#"<link rel="icon" href="/favicon-48.png" type="image/png">"#.into()),
            svg_favicon: true,
            fonts_css: Some("@font-face{font-family:Inter}".into()),
            ..SiteAssets::from_settings(&s)
        };
        let html = render_home(&ctx(&s, &assets), &HomeView::default()).into_string();
        assert!(html.contains(r#"<link rel="icon" href="/favicon-48.png" type="image/png">"#));
        assert!(html.contains(r#"<link rel="icon" href="/favicon.svg" type="image/svg+xml">"#));
        assert!(html.contains("<style>@font-face{font-family:Inter}</style>"));
        assert!(html.contains("gtag/js?id=G-ABC123"));
        assert!(html.contains("gtag('config','G-ABC123')"));
    }

    #[test]
    fn dark_mode_adds_script_and_toggle() {
        let off = settings("");
        let assets = SiteAssets::from_settings(&off);
        assert!(assets.dark_mode_js.is_none());
        let html = render_home(&ctx(&off, &assets), &HomeView::default()).into_string();
        assert!(!html.contains("dark-toggle"));

        let on = settings("theme:\n  theme_features:\n    enable_dark_mode: true\n");
        let assets = SiteAssets::from_settings(&on);
        assert!(assets.css.contains(":root[dark]"));
        let html = render_home(&ctx(&on, &assets), &HomeView::default()).into_string();
        assert!(html.contains("halide-color-scheme"));
        assert!(html.contains(r#"class="dark-toggle""#));
    }

    #[test]
    fn footer_has_contact_and_year() {
        let s = settings(
            "  site_email: hi@johndoe.com\n  site_social_url: https://instagram.com/jd\ni18n:\n  site_social_title: Instagram\n",
        );
        let assets = SiteAssets::default();
        let html = render_home(&ctx(&s, &assets), &HomeView::default()).into_string();
        assert!(html.contains(r#"<a href="mailto:hi@johndoe.com">hi@johndoe.com</a>"#));
        assert!(html.contains(r#"<a href="https://instagram.com/jd" rel="me">Instagram</a>"#));
        assert!(html.contains("© 2024 John Doe"));
    }

    #[test]
    fn google_fonts_url_only_for_web_fonts() {
        assert_eq!(google_fonts_url(&settings("")), None);
        let s = settings("theme:\n  theme_typography:\n    font: EB Garamond\n    font_weight: 500\n");
        assert_eq!(
            google_fonts_url(&s).as_deref(),
            Some("https://fonts.googleapis.com/css2?family=EB+Garamond:wght@500&display=swap")
        );
    }

    // =========================================================================
    // Home
    // =========================================================================

    #[test]
    fn home_renders_description_and_grid() {
        let s = settings("");
        let assets = SiteAssets::default();
        let view = HomeView {
            grid: vec![item("Dunes"), item("Ice")],
        };
        let html = render_home(&ctx(&s, &assets), &view).into_string();
        assert!(html.contains("Photographs of <em>places</em>"));
        let dunes = html.find(r#"<a href="/projects/dunes/">"#).unwrap();
        let ice = html.find(r#"<a href="/projects/ice/">"#).unwrap();
        assert!(dunes < ice);
        assert!(html.contains(r#"<picture data-for="Dunes"></picture>"#));
        assert!(html.contains(r#"<p class="grid-title">Dunes <span class="grid-year">2020</span></p>"#));
    }

    #[test]
    fn home_can_hide_titles() {
        let s = settings("theme:\n  theme_features:\n    show_project_grid_titles: false\n");
        let assets = SiteAssets::default();
        let view = HomeView {
            grid: vec![item("Dunes")],
        };
        let html = render_home(&ctx(&s, &assets), &view).into_string();
        assert!(!html.contains("grid-title"));
    }

    // =========================================================================
    // Project
    // =========================================================================

    #[test]
    fn project_page_structure() {
        let s = settings("");
        let assets = SiteAssets::default();
        let view = ProjectView {
            figures: vec![
                FigureView {
                    picture: "<picture id=\"one\"></picture>".into(),
                    caption: Some("Dawn <east>".into()),
                },
                FigureView {
                    picture: "<picture id=\"two\"></picture>".into(),
                    caption: None,
                },
            ],
            more: vec![item("Ice")],
        };
        let html = render_project(&ctx(&s, &assets), &project(), "/projects/salt-flats/", &view)
            .into_string();

        assert!(html.contains("<title>Salt Flats | John Doe</title>"));
        assert!(html.contains(r#"<meta name="description" content="Long *exposures*">"#));
        assert!(html.contains(r#"<body class="layout-project">"#));
        assert!(html.contains("<h1>Salt Flats</h1>"));
        assert!(html.contains(r#"<p class="project-year">2021</p>"#));
        assert!(html.contains("Long <em>exposures</em>"));
        assert!(html.contains("Shot on <strong>film</strong>."));
        assert!(html.find(r#"id="one""#).unwrap() < html.find(r#"id="two""#).unwrap());
        assert!(html.contains("<figcaption>Dawn &lt;east&gt;</figcaption>"));
        assert!(html.contains("More projects"));
        assert!(html.contains(
            "https://twitter.com/intent/tweet?url=https%3A%2F%2Fwww.johndoe.com%2Fprojects%2Fsalt-flats%2F"
        ));
    }

    #[test]
    fn project_seo_and_noindex() {
        let s = settings("");
        let assets = SiteAssets::default();
        let mut p = project();
        p.seo = Some(ProjectSeo {
            title: Some("Salt".into()),
            description: Some("Bolivia".into()),
            no_index: true,
        });
        let html = render_project(&ctx(&s, &assets), &p, "/salt/", &ProjectView::default())
            .into_string();
        assert!(html.contains("<title>Salt</title>"));
        assert!(html.contains(r#"content="Bolivia""#));
        assert!(html.contains(r#"<meta name="robots" content="noindex">"#));
        assert!(html.contains(r#"<link rel="canonical" href="https://www.johndoe.com/salt/">"#));
        assert!(!html.contains("More projects"));
    }

    #[test]
    fn project_year_hidden_by_setting() {
        let s = settings("theme:\n  theme_features:\n    show_project_year: false\n");
        let assets = SiteAssets::default();
        let html = render_project(
            &ctx(&s, &assets),
            &project(),
            "/projects/salt-flats/",
            &ProjectView::default(),
        )
        .into_string();
        assert!(!html.contains("project-year"));
    }

    #[test]
    fn maud_escapes_titles() {
        let s = settings("");
        let assets = SiteAssets::default();
        let mut p = project();
        p.title = "<script>alert(1)</script>".into();
        let html = render_project(&ctx(&s, &assets), &p, "/x/", &ProjectView::default())
            .into_string();
        assert!(html.contains("<h1>&lt;script&gt;alert(1)&lt;/script&gt;</h1>"));
    }
}

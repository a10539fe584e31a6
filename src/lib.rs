//! # Halide
//!
//! A static site builder for photography portfolios. Projects are markdown
//! files with YAML front matter, site-wide settings are one YAML document
//! edited through a git-backed CMS, and the output is plain HTML with
//! responsive images.
//!
//! # Architecture
//!
//! ```text
//! projects/*.md ─┐
//!                ├─► collection ─► pages (maud) ─► minify ─► _site/
//! settings.yaml ─┘                    │
//!                                     ├─► shortcodes ─► imaging (encode cache)
//!                                     └─► shortcodes ─► fetch (HTTP cache)
//! ```
//!
//! One build loads everything, orders the project collection, renders the
//! home page and every published project concurrently, and writes minified
//! HTML. Image variants are content-addressed and cached across builds;
//! remote fetches (Google Fonts CSS, remote images) go through a disk cache
//! with per-request expiry.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`content`] | Project documents: front matter parsing and loading |
//! | [`settings`] | The settings document, its defaults, theme CSS |
//! | [`schema`] | The CMS schema as a typed table, and save-time validation |
//! | [`computed`] | Derived permalink and visibility per project |
//! | [`collection`] | The ordered `projects` collection |
//! | [`filters`] | Template filters: limits, slugs, dates, markdown |
//! | [`minify`] | CSS/JS filters and the HTML output transform |
//! | [`shortcodes`] | Favicon, responsive `<picture>`, Google Fonts CSS |
//! | [`imaging`] | Responsive variant generation over a pluggable backend |
//! | [`cache`] | Content-addressed encode cache manifest |
//! | [`fetch`] | Remote fetch with a disk cache |
//! | [`render`] | Page layouts |
//! | [`pipeline`] | The build, end to end |
//! | [`config`] | `halide.toml` loading and the runtime environment |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Settings Travel Explicitly
//!
//! Layouts receive the settings document through [`render::RenderContext`]
//! rather than reading a global data cascade. Every value a page depends on
//! is visible in its function signature.
//!
//! ## The Schema Is Data
//!
//! The CMS field declarations live in [`schema`] as static tables. The same
//! table drives the `schema` command, the `validate` command and the checks
//! the build runs before it trusts a document.
//!
//! ## Position Sorts Descending
//!
//! The editor describes `position` as "a lower value pushes the position up",
//! but published sites are ordered with the higher value first. The
//! collection keeps the published behavior; see [`collection`].

pub mod cache;
pub mod collection;
pub mod computed;
pub mod config;
pub mod content;
pub mod fetch;
pub mod filters;
pub mod imaging;
pub mod minify;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod schema;
pub mod settings;
pub mod shortcodes;

#[cfg(test)]
pub(crate) mod test_helpers;

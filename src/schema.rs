//! Content schema shared with the CMS editing surface.
//!
//! The schema is a static table: each collection lists its fields with a
//! type, label, editor description and validation rule. The editor renders
//! its forms from the same declarations, so the table is the contract for
//! what a saved document may contain.
//!
//! [`validate_document`] applies the save rules to a raw YAML document:
//! required fields, value types, and numeric ranges. Violations are reported
//! all at once and block the save (or the build); values are never clamped.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    #[serde(rename = "string")]
    Text,
    Number,
    Boolean,
    Datetime,
    Image,
    RichText,
    Object,
    /// A list of objects, each validated against the nested fields.
    ObjectList,
}

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum Validation {
    Range { min: i64, max: i64 },
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'static str,
    pub required: bool,
    /// Hidden from the editor form but still part of the document.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub options: &'static [SelectOption],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub fields: &'static [FieldSpec],
}

const fn field(
    kind: FieldType,
    name: &'static str,
    label: &'static str,
    description: &'static str,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind,
        description,
        required: false,
        hidden: false,
        validation: None,
        options: &[],
        fields: &[],
    }
}

impl FieldSpec {
    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    const fn range(mut self, min: i64, max: i64) -> Self {
        self.validation = Some(Validation::Range { min, max });
        self
    }

    const fn nested(mut self, fields: &'static [FieldSpec]) -> Self {
        self.fields = fields;
        self
    }

    const fn options(mut self, options: &'static [SelectOption]) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Md,
    Yaml,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub label: &'static str,
    /// Directory relative to the project root.
    pub path: &'static str,
    pub format: DocumentFormat,
    /// Restricts the collection to a single file stem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_include: Option<&'static str>,
    pub allow_create: bool,
    pub allow_delete: bool,
    pub fields: &'static [FieldSpec],
}

use FieldType::*;

// =============================================================================
// Projects
// =============================================================================

const PROJECT_IMAGE_FIELDS: &[FieldSpec] = &[
    field(
        Image,
        "src",
        "Image",
        "Upload an image in JPEG or PNG format with a minimum width of 2000 pixels",
    ),
    field(
        Text,
        "caption",
        "Caption",
        "Add a descriptive image caption, used for the image alt text",
    ),
];

const PROJECT_SEO_FIELDS: &[FieldSpec] = &[
    field(
        Text,
        "title",
        "SEO Title",
        "Add a different title for SEO purposes (the <title> tag). Defaults to project title",
    ),
    field(
        Text,
        "description",
        "Meta Description",
        "Add a meta description for SEO purposes. Defaults to project short description",
    ),
    field(
        Boolean,
        "no_index",
        "Prevent Indexing",
        "Warning: Adds a <meta> noindex tag to this project to discourage search engines from indexing it. Use with care!",
    ),
];

const PROJECT_FIELDS: &[FieldSpec] = &[
    field(
        Boolean,
        "draft",
        "Draft",
        "If this is checked the project will not be published",
    ),
    field(Text, "title", "Title", "The project's title").required(),
    field(
        RichText,
        "description",
        "Description",
        "The project's short description",
    ),
    field(
        Number,
        "year",
        "Year",
        "The year the project was realized e.g. 2023",
    ),
    field(ObjectList, "images", "Images", "").nested(PROJECT_IMAGE_FIELDS),
    field(
        Datetime,
        "date",
        "Publish Date",
        "The published date or today's date (for internal use only)",
    )
    .hidden(),
    field(Object, "seo", "SEO", "").nested(PROJECT_SEO_FIELDS),
    field(
        RichText,
        "body",
        "Additional Description",
        "The project's optional additional description, shown under images",
    ),
    field(
        Number,
        "position",
        "Project Position",
        "Adjust this project's position in the project list, as a number between 0 and 999. A lower value pushes the position up.",
    )
    .range(0, 999),
];

pub static PROJECT: CollectionSpec = CollectionSpec {
    name: "project",
    label: "Projects",
    path: "projects",
    format: DocumentFormat::Md,
    match_include: None,
    allow_create: true,
    allow_delete: true,
    fields: PROJECT_FIELDS,
};

// =============================================================================
// Settings
// =============================================================================

const SITE_SEO_FIELDS: &[FieldSpec] = &[
    field(
        Text,
        "site_title",
        "Site SEO Title",
        "The website title used for SEO purposes i.e. the <title> tag and social sharing only.",
    ),
    field(
        Text,
        "site_description",
        "Site SEO Description",
        "The website description used for the <meta> description tag and social sharing. Maximum 160 characters.",
    ),
    field(
        Boolean,
        "no_index",
        "Block Site Indexing",
        "Warning: Adds a <meta> noindex tag to EVERY page of your website. Overrides per-project settings. Use with care!",
    ),
];

const METADATA_FIELDS: &[FieldSpec] = &[
    field(
        Text,
        "site_url",
        "Site URL",
        "Your site's full production URL including https:// and without a trailing slash e.g. https://www.johndoe.com",
    )
    .required(),
    field(
        Text,
        "site_title",
        "Site Title",
        "The website title, name, or brand e.g. John Doe",
    )
    .required(),
    field(
        Text,
        "site_subtitle_1",
        "Site Subtitle",
        "Optional text shown after the website title, often used for a job title e.g. Photographer",
    ),
    field(
        Text,
        "site_subtitle_2",
        "Additional Site Subtitle",
        "Optional text shown after the site subtitle, often used to show a location e.g. New York, NY",
    ),
    field(
        RichText,
        "site_description",
        "Site Description",
        "Your website's description, shown on the home page only. Keep it short and sweet!",
    ),
    field(
        Text,
        "site_email",
        "Site Email",
        "Your website's contact email address, visible in the site footer.",
    ),
    field(
        Text,
        "site_social_url",
        "Site Social URL",
        "Your primary social media profile URL, visible in the site footer e.g. https://instagram.com/johndoe",
    ),
    field(
        Image,
        "site_icon_svg",
        "Site Favicon SVG",
        "An optional site bookmark/favicon icon in SVG format.",
    ),
    field(
        Image,
        "site_icon_png",
        "Site Favicon PNG",
        "An optional site bookmark/favicon icon in PNG format. Your image should be 260x260 pixels or more for optimal results.",
    ),
    field(
        Text,
        "site_ga4_id",
        "Google Analytics ID",
        "Add a valid GA4 property ID here to enable Google Analytics on your site e.g. G-1234567",
    ),
    field(Object, "seo", "Site SEO", "").nested(SITE_SEO_FIELDS),
];

const THEME_LAYOUT_FIELDS: &[FieldSpec] = &[field(
    Number,
    "space_scale",
    "Space Scale",
    "The percentage scale used to calculate your site's margins, padding, and line height. Default: 100",
)];

const THEME_COLOR_FIELDS: &[FieldSpec] = &[
    field(
        Text,
        "background",
        "Background Color",
        "The site background color, also used for light mode. Default: #FFFFFF",
    ),
    field(
        Text,
        "text",
        "Text Color",
        "The site text color, also used for light mode. Default: #101010",
    ),
    field(
        Text,
        "link",
        "Link Color",
        "The site link text color, also used for light mode. Default: #101010",
    ),
    field(
        Text,
        "background_dark",
        "Dark Mode Background Color",
        "The site's dark mode background color. Default: #101010",
    ),
    field(
        Text,
        "text_dark",
        "Dark Mode Text Color",
        "The site's dark mode text color. Default: #F1F1F1",
    ),
    field(
        Text,
        "link_dark",
        "Dark Mode Link Color",
        "The site's dark mode link text color. Default: #F1F1F1",
    ),
];

const FONT_OPTIONS: &[SelectOption] = &[
    SelectOption { value: "system", label: "System Font (default)" },
    SelectOption { value: "Bodoni Moda", label: "Bodoni Moda" },
    SelectOption { value: "DM Sans", label: "DM Sans" },
    SelectOption { value: "EB Garamond", label: "EB Garamond" },
    SelectOption { value: "Fraunces", label: "Fraunces" },
    SelectOption { value: "Inter", label: "Inter" },
    SelectOption { value: "Overpass Mono", label: "Overpass Mono" },
    SelectOption { value: "Public Sans", label: "Public Sans" },
    SelectOption { value: "Space Grotesk", label: "Space Grotesk" },
    SelectOption { value: "Unbounded", label: "Unbounded" },
    SelectOption { value: "Work Sans", label: "Work Sans" },
];

const THEME_TYPOGRAPHY_FIELDS: &[FieldSpec] = &[
    field(
        Text,
        "font",
        "Font",
        "Your site's body font. Select a Google Font or the default system font from the dropdown",
    )
    .options(FONT_OPTIONS),
    field(
        Number,
        "font_weight",
        "Font Weight",
        "The site's body font weight. Values range from 100 to 900. Default: 420",
    ),
    field(
        Number,
        "font_scale",
        "Font Size Scale",
        "The percentage scale used to adjust your site's font size. Default: 100",
    ),
    field(
        Number,
        "line_height_scale",
        "Line Height Scale",
        "The percentage scale used to adjust your site font's line height (vertical spacing). Default: 100",
    ),
];

const THEME_FEATURE_FIELDS: &[FieldSpec] = &[
    field(
        Boolean,
        "enable_dark_mode",
        "Enable Dark Mode",
        "Enable the dark mode toggle for your site",
    ),
    field(
        Number,
        "item_output_limit",
        "Max. Project Grid Items",
        "The maximum number of project grid items displayed. Default: 48",
    ),
    field(
        Number,
        "transition_duration",
        "Transition Duration",
        "The length in milliseconds of site animations and transitions. Default: 300",
    ),
    field(
        Boolean,
        "show_project_year",
        "Show Project Year",
        "Show the project year on your site's project pages. Default: true",
    ),
    field(
        Boolean,
        "show_project_grid_titles",
        "Show Grid Titles",
        "Show project titles in your site's project lists. Default: true",
    ),
];

const THEME_FIELDS: &[FieldSpec] = &[
    field(Object, "theme_layout", "Layout", "").nested(THEME_LAYOUT_FIELDS),
    field(Object, "theme_colors", "Colors", "").nested(THEME_COLOR_FIELDS),
    field(Object, "theme_typography", "Typography", "").nested(THEME_TYPOGRAPHY_FIELDS),
    field(Object, "theme_features", "Advanced", "").nested(THEME_FEATURE_FIELDS),
];

const AVIF_FIELDS: &[FieldSpec] = &[
    field(Boolean, "enabled", "Enabled", "Enable AVIF Images?"),
    field(
        Number,
        "quality",
        "AVIF Image Quality",
        "Controls AVIF image compression, from 1-100. A lower value means smaller file sizes but lower image quality. Default: 80",
    )
    .range(1, 100),
];

const WEBP_FIELDS: &[FieldSpec] = &[
    field(Boolean, "enabled", "Enabled", "Enable WebP Images?"),
    field(
        Number,
        "quality",
        "WebP Image Quality",
        "Controls WebP image compression, from 1-100. A lower value means smaller file sizes but lower image quality. Default: 80",
    )
    .range(1, 100),
];

const JPEG_FIELDS: &[FieldSpec] = &[
    field(
        Boolean,
        "enabled",
        "JPEG Enabled",
        "JPEG Images must be enabled.",
    )
    .hidden(),
    field(
        Number,
        "quality",
        "JPEG Image Quality",
        "Controls JPEG image compression, from 1-100. A lower value means smaller file sizes but lower image quality. Default: 80",
    )
    .range(1, 100),
];

const IMAGE_FIELDS: &[FieldSpec] = &[
    field(Object, "avif", "AVIF Settings", "").nested(AVIF_FIELDS),
    field(Object, "webp", "WebP Settings", "").nested(WEBP_FIELDS),
    field(Object, "jpeg", "JPEG Settings", "").nested(JPEG_FIELDS),
];

const I18N_FIELDS: &[FieldSpec] = &[
    field(
        Text,
        "site_language",
        "Site Language",
        "Your site's ISO 639-1 two character language code. Default: en",
    ),
    field(
        Text,
        "site_social_title",
        "Footer Social Title",
        "The title used for footer social profile link text e.g. Instagram",
    ),
];

const SETTINGS_FIELDS: &[FieldSpec] = &[
    field(Object, "metadata", "Metadata", "").nested(METADATA_FIELDS),
    field(Object, "theme", "Theme", "").nested(THEME_FIELDS),
    field(
        Object,
        "images",
        "Images",
        "Configure responsive image formats and quality settings",
    )
    .nested(IMAGE_FIELDS),
    field(Object, "i18n", "Locale & Translation", "").nested(I18N_FIELDS),
];

pub static SETTINGS: CollectionSpec = CollectionSpec {
    name: "settings",
    label: "Settings",
    path: "_data",
    format: DocumentFormat::Yaml,
    match_include: Some("settings"),
    allow_create: false,
    allow_delete: false,
    fields: SETTINGS_FIELDS,
};

/// Every collection the editor knows about.
pub fn collections() -> [&'static CollectionSpec; 2] {
    [&PROJECT, &SETTINGS]
}

/// Filename the editor proposes for a new project: lowercased title with
/// spaces replaced by dashes.
pub fn project_filename(title: &str) -> String {
    format!("{}.md", title.to_lowercase().replace(' ', "-"))
}

// =============================================================================
// Validation
// =============================================================================

/// A single rule violation, addressed by dotted field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", join_violations(.0))]
pub struct SchemaViolations(pub Vec<Violation>);

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check a raw document against a collection's field rules.
///
/// Keys the schema does not declare are allowed (layout and permalink
/// overrides live next to the editable fields).
pub fn validate_document(
    collection: &CollectionSpec,
    document: &serde_yaml::Value,
) -> Result<(), SchemaViolations> {
    let mut violations = Vec::new();
    match document {
        serde_yaml::Value::Mapping(_) | serde_yaml::Value::Null => {
            validate_fields(collection.fields, document, "", &mut violations);
        }
        _ => violations.push(Violation {
            path: collection.name.to_string(),
            message: "document must be a mapping".to_string(),
        }),
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaViolations(violations))
    }
}

fn validate_fields(
    fields: &[FieldSpec],
    object: &serde_yaml::Value,
    prefix: &str,
    out: &mut Vec<Violation>,
) {
    for spec in fields {
        let path = if prefix.is_empty() {
            spec.name.to_string()
        } else {
            format!("{prefix}.{}", spec.name)
        };
        let value = object.get(spec.name).unwrap_or(&serde_yaml::Value::Null);
        validate_field(spec, value, &path, out);
    }
}

fn validate_field(spec: &FieldSpec, value: &serde_yaml::Value, path: &str, out: &mut Vec<Violation>) {
    use serde_yaml::Value;

    let mut violation = |message: String| {
        out.push(Violation {
            path: path.to_string(),
            message,
        })
    };

    let is_blank = match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    };
    if is_blank {
        if spec.required {
            violation("is required".to_string());
        }
        // An absent object still owes its required members.
        if spec.kind == Object {
            validate_fields(spec.fields, &Value::Null, path, out);
        }
        return;
    }

    match spec.kind {
        Text | Image | RichText | Datetime => {
            if !value.is_string() {
                violation(format!("expected {}", kind_name(spec.kind)));
            }
        }
        Boolean => {
            if !value.is_bool() {
                violation("expected a boolean".to_string());
            }
        }
        Number => match value.as_f64() {
            None => violation("expected a number".to_string()),
            Some(n) => {
                if let Some(Validation::Range { min, max }) = spec.validation
                    && (n < min as f64 || n > max as f64)
                {
                    violation(format!("must be between {min} and {max}"));
                }
            }
        },
        Object => {
            if value.is_mapping() {
                validate_fields(spec.fields, value, path, out);
            } else {
                violation("expected an object".to_string());
            }
        }
        ObjectList => match value.as_sequence() {
            Some(items) => {
                for (idx, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{idx}]");
                    if item.is_mapping() {
                        validate_fields(spec.fields, item, &item_path, out);
                    } else {
                        out.push(Violation {
                            path: item_path,
                            message: "expected an object".to_string(),
                        });
                    }
                }
            }
            None => violation("expected a list".to_string()),
        },
    }
}

fn kind_name(kind: FieldType) -> &'static str {
    match kind {
        Text => "a string",
        Image => "an image path",
        RichText => "rich text",
        Datetime => "a date",
        Number => "a number",
        Boolean => "a boolean",
        Object => "an object",
        ObjectList => "a list",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> serde_yaml::Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn paths(result: Result<(), SchemaViolations>) -> Vec<String> {
        result
            .unwrap_err()
            .0
            .into_iter()
            .map(|v| v.path)
            .collect()
    }

    #[test]
    fn valid_project_passes() {
        let doc = yaml(
            r#"
title: Dunes
draft: false
year: 2023
position: 10
images:
  - src: /assets/uploads/dune.jpg
    caption: Dune at dawn
seo:
  no_index: false
permalink: false
"#,
        );
        assert!(validate_document(&PROJECT, &doc).is_ok());
    }

    #[test]
    fn project_title_is_required() {
        let doc = yaml("draft: true\n");
        assert_eq!(paths(validate_document(&PROJECT, &doc)), vec!["title"]);
        let doc = yaml("title: '  '\n");
        assert_eq!(paths(validate_document(&PROJECT, &doc)), vec!["title"]);
    }

    #[test]
    fn position_bounds_are_inclusive() {
        for ok in [0, 500, 999] {
            let doc = yaml(&format!("title: A\nposition: {ok}\n"));
            assert!(validate_document(&PROJECT, &doc).is_ok(), "{ok}");
        }
        for bad in ["-1", "1000", "999.5"] {
            let doc = yaml(&format!("title: A\nposition: {bad}\n"));
            assert_eq!(
                paths(validate_document(&PROJECT, &doc)),
                vec!["position"],
                "{bad}"
            );
        }
    }

    #[test]
    fn type_mismatches_are_reported() {
        let doc = yaml("title: A\nyear: soon\ndraft: maybe\nimages: nope\n");
        assert_eq!(
            paths(validate_document(&PROJECT, &doc)),
            vec!["draft", "year", "images"]
        );
    }

    #[test]
    fn list_items_are_addressed_by_index() {
        let doc = yaml("title: A\nimages:\n  - src: a.jpg\n  - caption: 3\n  - plain\n");
        assert_eq!(
            paths(validate_document(&PROJECT, &doc)),
            vec!["images[1].caption", "images[2]"]
        );
    }

    #[test]
    fn settings_quality_range() {
        let doc = yaml(
            r#"
metadata: { site_url: "https://a.b", site_title: A }
images:
  avif: { enabled: true, quality: 0 }
  webp: { enabled: true, quality: 100 }
  jpeg: { quality: 101 }
"#,
        );
        assert_eq!(
            paths(validate_document(&SETTINGS, &doc)),
            vec!["images.avif.quality", "images.jpeg.quality"]
        );
    }

    #[test]
    fn settings_required_metadata() {
        let doc = yaml("theme: {}\n");
        assert_eq!(
            paths(validate_document(&SETTINGS, &doc)),
            vec!["metadata.site_url", "metadata.site_title"]
        );
    }

    #[test]
    fn empty_settings_document_reports_nested_required_fields() {
        for doc in [yaml("metadata:\n"), yaml("~")] {
            assert_eq!(
                paths(validate_document(&SETTINGS, &doc)),
                vec!["metadata.site_url", "metadata.site_title"]
            );
        }
    }

    #[test]
    fn non_mapping_document_rejected() {
        let doc = yaml("- a\n- b\n");
        assert!(validate_document(&SETTINGS, &doc).is_err());
    }

    #[test]
    fn violations_display_joined() {
        let err = SchemaViolations(vec![
            Violation {
                path: "a".into(),
                message: "is required".into(),
            },
            Violation {
                path: "b.c".into(),
                message: "must be between 1 and 100".into(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "a: is required; b.c: must be between 1 and 100"
        );
    }

    #[test]
    fn settings_collection_cannot_be_created_or_deleted() {
        assert!(!SETTINGS.allow_create);
        assert!(!SETTINGS.allow_delete);
        assert_eq!(SETTINGS.match_include, Some("settings"));
        assert!(PROJECT.allow_create && PROJECT.allow_delete);
    }

    #[test]
    fn schema_serializes_for_editor() {
        let json = serde_json::to_value(collections()).unwrap();
        assert_eq!(json[0]["name"], "project");
        let position = json[0]["fields"]
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["name"] == "position")
            .unwrap();
        assert_eq!(position["validation"]["rule"], "range");
        assert_eq!(position["validation"]["max"], 999);
        let title = json[0]["fields"]
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["name"] == "title")
            .unwrap();
        assert_eq!(title["type"], "string");
        assert_eq!(title["required"], true);
        assert_eq!(json[1]["format"], "yaml");
    }

    #[test]
    fn project_filename_from_title() {
        assert_eq!(project_filename("Desert Light"), "desert-light.md");
    }
}

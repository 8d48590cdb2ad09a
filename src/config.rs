//! Loading and validating site configuration files.
//!
//! A config file is JSON (or YAML, picked by extension) in one of two shapes:
//!
//! ```json
//! { "site_name": "shop", "container_class": "card", "fields": { ... } }
//! ```
//!
//! or the nested layout with separate scraper and export sections:
//!
//! ```json
//! {
//!   "site_name": "shop",
//!   "scraper_settings": { "container_class": "card", "fields": { ... } },
//!   "export_settings": { "format": "json", "directory": "", "filename_template": "{site_name}_{timestamp}.{format}" }
//! }
//! ```
//!
//! Loading is eager: the file is converted into typed [`SiteConfig`] values
//! and structurally validated up front, so a bad config fails the run with
//! a single [`ScrapeError::Config`] before any URL is fetched.

use crate::error::{Result, ScrapeError};
use crate::models::{
    ExportSettings, ExtractKind, METADATA_FIELDS, PathStep, ScrapeConfig, SiteConfig,
};
use chrono::Local;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

pub const DEFAULT_SITE_NAME: &str = "default_site";

/// Serialization format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// `.yaml`/`.yml` are YAML; anything else is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }

    fn parse<T: DeserializeOwned>(self, text: &str) -> std::result::Result<T, String> {
        match self {
            ConfigFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct ShapeProbe {
    #[serde(default)]
    scraper_settings: Option<IgnoredAny>,
}

#[derive(Deserialize)]
struct NestedFile {
    #[serde(default)]
    site_name: Option<String>,
    scraper_settings: ScrapeConfig,
    #[serde(default)]
    export_settings: Option<ExportSettings>,
}

#[derive(Deserialize)]
struct FlatFile {
    #[serde(default)]
    site_name: Option<String>,
    #[serde(default)]
    export_settings: Option<ExportSettings>,
}

/// Parse config text into a [`SiteConfig`] without structural validation.
///
/// Missing keys, wrong types, unknown step types and duplicate field names
/// are all reported here as [`ScrapeError::Config`].
pub fn parse_site_config(text: &str, format: ConfigFormat) -> Result<SiteConfig> {
    let probe: ShapeProbe = format.parse(text).map_err(ScrapeError::Config)?;

    let (site_name, scraper, export) = if probe.scraper_settings.is_some() {
        let nested: NestedFile = format.parse(text).map_err(ScrapeError::Config)?;
        (nested.site_name, nested.scraper_settings, nested.export_settings)
    } else {
        let flat: FlatFile = format.parse(text).map_err(ScrapeError::Config)?;
        let scraper: ScrapeConfig = format.parse(text).map_err(ScrapeError::Config)?;
        (flat.site_name, scraper, flat.export_settings)
    };

    Ok(SiteConfig {
        site_name: site_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
        scraper,
        export: export.unwrap_or_default(),
    })
}

/// Read, parse and validate a config file.
///
/// Fatal validation issues abort with [`ScrapeError::Config`]; an empty
/// field set is only logged as a warning.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_site_config(path: &Path) -> Result<SiteConfig> {
    let (site, report) = load_unchecked(path).await?;

    for issue in report.issues.iter().filter(|issue| !issue.kind.is_fatal()) {
        warn!(issue = %issue, "Config warning");
    }
    if report.has_errors() {
        let summary = report
            .issues
            .iter()
            .filter(|issue| issue.kind.is_fatal())
            .map(|issue| issue.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ScrapeError::Config(format!("{}: {summary}", path.display())));
    }

    check_export(&site.export)?;

    info!(
        site_name = %site.site_name,
        container_class = %site.scraper.container_class,
        fields = site.scraper.fields.len(),
        "Loaded configuration"
    );
    Ok(site)
}

/// Read and parse a config file, returning the validation report alongside
/// instead of acting on it.
pub async fn load_unchecked(path: &Path) -> Result<(SiteConfig, ValidationReport)> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| ScrapeError::Config(format!("cannot read {}: {e}", path.display())))?;
    let site = parse_site_config(&text, ConfigFormat::from_path(path))
        .map_err(|e| ScrapeError::Config(format!("{}: {e}", path.display())))?;
    let report = validate_config(&site.scraper);
    Ok((site, report))
}

/// Only JSON export is implemented.
pub fn check_export(export: &ExportSettings) -> Result<()> {
    if !export.format.eq_ignore_ascii_case("json") {
        return Err(ScrapeError::Config(format!(
            "unsupported export format `{}`",
            export.format
        )));
    }
    Ok(())
}

/// What is wrong with one part of a config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum IssueKind {
    EmptyContainerClass,
    InvalidContainerClass { class: String },
    InvalidContainerTag { tag: String },
    NoFields,
    ReservedName,
    EmptyPath,
    EmptyTag { step: usize },
    InvalidTag { step: usize, tag: String },
    EmptyClass { step: usize },
    InvalidClass { step: usize, class: String },
    InvalidAttribute { name: String },
}

impl IssueKind {
    /// Everything except a missing field set prevents a run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, IssueKind::NoFields)
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::EmptyContainerClass => write!(f, "container_class is empty"),
            IssueKind::InvalidContainerClass { class } => {
                write!(f, "container_class `{class}` must be a single class name")
            }
            IssueKind::InvalidContainerTag { tag } => {
                write!(f, "container_tag `{tag}` is not an element name")
            }
            IssueKind::NoFields => write!(f, "no fields defined"),
            IssueKind::ReservedName => write!(f, "name is reserved for a metadata column"),
            IssueKind::EmptyPath => write!(f, "path is empty"),
            IssueKind::EmptyTag { step } => write!(f, "step {step}: tag is empty"),
            IssueKind::InvalidTag { step, tag } => write!(f, "step {step}: invalid tag `{tag}`"),
            IssueKind::EmptyClass { step } => write!(f, "step {step}: class is empty"),
            IssueKind::InvalidClass { step, class } => {
                write!(f, "step {step}: class `{class}` must be a single class name")
            }
            IssueKind::InvalidAttribute { name } => {
                write!(f, "extract names an invalid attribute `{name}`")
            }
        }
    }
}

/// One validation finding. `field` is `None` for config-level issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: Option<String>,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "field `{field}`: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|issue| issue.kind.is_fatal())
    }

    /// Issues reported against a given field name.
    #[cfg(test)]
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a IssueKind> {
        self.issues
            .iter()
            .filter(move |issue| issue.field.as_deref() == Some(field))
            .map(|issue| &issue.kind)
    }

    fn push(&mut self, field: Option<&str>, kind: IssueKind) {
        self.issues.push(ValidationIssue {
            field: field.map(str::to_string),
            kind,
        });
    }
}

/// Structural check of a scrape config. Never touches the network.
pub fn validate_config(config: &ScrapeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    let container = config.container_class.trim();
    if container.is_empty() {
        report.push(None, IssueKind::EmptyContainerClass);
    } else if container.contains(char::is_whitespace) {
        report.push(
            None,
            IssueKind::InvalidContainerClass {
                class: config.container_class.clone(),
            },
        );
    }

    if let Some(tag) = &config.container_tag {
        if !is_valid_tag_name(tag) {
            report.push(None, IssueKind::InvalidContainerTag { tag: tag.clone() });
        }
    }

    if config.fields.is_empty() {
        report.push(None, IssueKind::NoFields);
    }

    for (name, spec) in &config.fields {
        let field = Some(name.as_str());
        if METADATA_FIELDS.contains(&name.as_str()) {
            report.push(field, IssueKind::ReservedName);
        }
        if spec.path.is_empty() {
            report.push(field, IssueKind::EmptyPath);
        }

        for (step, path_step) in spec.path.iter().enumerate() {
            let tag = path_step.tag();
            if tag.trim().is_empty() {
                report.push(field, IssueKind::EmptyTag { step });
            } else if !is_valid_tag_name(tag) {
                report.push(
                    field,
                    IssueKind::InvalidTag {
                        step,
                        tag: tag.to_string(),
                    },
                );
            }

            if let Some(class) = path_step.class() {
                if class.trim().is_empty() {
                    report.push(field, IssueKind::EmptyClass { step });
                } else if class.contains(char::is_whitespace) {
                    report.push(
                        field,
                        IssueKind::InvalidClass {
                            step,
                            class: class.to_string(),
                        },
                    );
                }
            }
        }

        if let ExtractKind::Attr(attr) = &spec.extract {
            let bad_char = |c: char| c.is_whitespace() || "\"'<>/=".contains(c);
            if attr.is_empty() || attr.contains(bad_char) {
                report.push(field, IssueKind::InvalidAttribute { name: attr.clone() });
            }
        }
    }

    report
}

fn is_valid_tag_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}

/// A starter config covering the common title / price / link layout.
pub fn base_template() -> Result<serde_json::Value> {
    let scraper = ScrapeConfig::new("product-container")
        .with_field(
            "titulo",
            vec![PathStep::find_class("h3", "product-title")],
            ExtractKind::Text,
        )
        .with_field(
            "precio",
            vec![PathStep::find_class("span", "price")],
            ExtractKind::Text,
        )
        .with_field("enlace", vec![PathStep::find("a")], ExtractKind::Href);

    let mut template = serde_json::to_value(&scraper)?;
    if let Some(object) = template.as_object_mut() {
        object.insert("site_name".to_string(), "ejemplo.com".into());
        object.insert(
            "metadata".to_string(),
            serde_json::json!({
                "created_at": Local::now().to_rfc3339(),
                "description": "Base scraping configuration",
                "version": "1.0"
            }),
        );
    }
    Ok(template)
}

/// Write [`base_template`] to `path`, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_template(path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(&base_template()?)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, text)
        .await
        .map_err(|source| ScrapeError::OutputWrite {
            path: path.to_path_buf(),
            source,
        })?;
    info!("Wrote config template");
    Ok(())
}

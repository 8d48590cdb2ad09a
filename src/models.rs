//! Data models for site configurations and extracted records.
//!
//! This module defines the core data structures used throughout the application:
//! - [`PathStep`] and [`ExtractKind`]: the declarative extraction language
//! - [`FieldSpec`] and [`ScrapeConfig`]: what to extract from each container
//! - [`ExportSettings`] and [`SiteConfig`]: how a run names and places its output
//! - [`Record`], [`PageResult`] and [`ConfigPreview`]: what comes out
//!
//! Field declaration order matters: records list their values in the order
//! the fields were declared in the config file, so output is deterministic.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One traversal instruction, applied to the subtree of the current node.
///
/// In config files a step is an object tagged by `type`:
///
/// ```json
/// {"type": "find", "tag": "h6"}
/// {"type": "find_all", "tag": "span", "class": "price", "index": 1}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathStep {
    /// First descendant matching `tag` (and `class`, when given).
    Find {
        tag: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<String>,
    },
    /// The `index`-th (0-based) descendant matching `tag` and `class`.
    #[serde(alias = "findall", alias = "findAll")]
    FindAll {
        tag: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<String>,
        #[serde(default)]
        index: usize,
    },
}

impl PathStep {
    pub fn find(tag: &str) -> Self {
        PathStep::Find {
            tag: tag.to_string(),
            class: None,
        }
    }

    pub fn find_class(tag: &str, class: &str) -> Self {
        PathStep::Find {
            tag: tag.to_string(),
            class: Some(class.to_string()),
        }
    }

    #[cfg(test)]
    pub fn find_all(tag: &str, index: usize) -> Self {
        PathStep::FindAll {
            tag: tag.to_string(),
            class: None,
            index,
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            PathStep::Find { tag, .. } | PathStep::FindAll { tag, .. } => tag,
        }
    }

    pub fn class(&self) -> Option<&str> {
        match self {
            PathStep::Find { class, .. } | PathStep::FindAll { class, .. } => class.as_deref(),
        }
    }
}

/// How a located element becomes a scalar value.
///
/// Serialized as a plain string: `"text"`, `"href"`, `"src"`, or any other
/// string naming an attribute. `"attr:NAME"` spells out an attribute whose
/// name collides with one of the keywords.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExtractKind {
    #[default]
    Text,
    Href,
    Src,
    Attr(String),
}

impl From<String> for ExtractKind {
    fn from(raw: String) -> Self {
        if let Some(name) = raw.strip_prefix("attr:") {
            return ExtractKind::Attr(name.to_string());
        }
        match raw.to_ascii_lowercase().as_str() {
            "text" => ExtractKind::Text,
            "href" => ExtractKind::Href,
            "src" => ExtractKind::Src,
            _ => ExtractKind::Attr(raw),
        }
    }
}

impl From<ExtractKind> for String {
    fn from(kind: ExtractKind) -> Self {
        match kind {
            ExtractKind::Text => "text".to_string(),
            ExtractKind::Href => "href".to_string(),
            ExtractKind::Src => "src".to_string(),
            ExtractKind::Attr(name) => match name.to_ascii_lowercase().as_str() {
                "text" | "href" | "src" => format!("attr:{name}"),
                _ => name,
            },
        }
    }
}

impl ExtractKind {
    /// Whether the extracted value is a link that may need resolving
    /// against the page URL.
    pub fn is_link(&self) -> bool {
        matches!(self, ExtractKind::Href | ExtractKind::Src)
    }
}

/// Where a field lives inside a container and how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(default)]
    pub path: Vec<PathStep>,
    #[serde(default)]
    pub extract: ExtractKind,
}

/// The per-site extraction settings.
///
/// Accepts the `container_class` + `fields` pair plus a few optional knobs.
/// Unknown keys are ignored so the same object can carry `site_name`,
/// `metadata` and similar annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Name recorded in the `_config_used` metadata column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub container_class: String,
    /// Restricts containers to one element name when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_tag: Option<String>,
    #[serde(
        deserialize_with = "deserialize_fields",
        serialize_with = "serialize_fields"
    )]
    pub fields: Vec<(String, FieldSpec)>,
    #[serde(default = "default_true")]
    pub resolve_links: bool,
    #[serde(default)]
    pub skip_empty_records: bool,
}

fn default_true() -> bool {
    true
}

impl ScrapeConfig {
    pub fn new(container_class: &str) -> Self {
        Self {
            name: None,
            container_class: container_class.to_string(),
            container_tag: None,
            fields: Vec::new(),
            resolve_links: true,
            skip_empty_records: false,
        }
    }

    /// Builder-style helper, mostly for tests and templates.
    pub fn with_field(mut self, name: &str, path: Vec<PathStep>, extract: ExtractKind) -> Self {
        self.fields.push((name.to_string(), FieldSpec { path, extract }));
        self
    }
}

/// Deserialize a JSON/YAML object into an ordered list of fields,
/// rejecting duplicate names instead of letting the last one win.
fn deserialize_fields<'de, D>(deserializer: D) -> Result<Vec<(String, FieldSpec)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FieldsVisitor;

    impl<'de> Visitor<'de> for FieldsVisitor {
        type Value = Vec<(String, FieldSpec)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of field name to field spec")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut fields: Vec<(String, FieldSpec)> = Vec::new();
            while let Some((name, spec)) = map.next_entry::<String, FieldSpec>()? {
                if fields.iter().any(|(existing, _)| *existing == name) {
                    return Err(serde::de::Error::custom(format!("duplicate field `{name}`")));
                }
                fields.push((name, spec));
            }
            Ok(fields)
        }
    }

    deserializer.deserialize_map(FieldsVisitor)
}

#[allow(clippy::ptr_arg)]
fn serialize_fields<S>(fields: &Vec<(String, FieldSpec)>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(fields.len()))?;
    for (name, spec) in fields {
        map.serialize_entry(name, spec)?;
    }
    map.end()
}

/// Output naming for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default = "default_format")]
    pub format: String,
    /// Subdirectory of the output directory; empty means the directory itself.
    #[serde(default)]
    pub directory: String,
    #[serde(default = "default_filename_template")]
    pub filename_template: String,
}

fn default_format() -> String {
    "json".to_string()
}

fn default_filename_template() -> String {
    "{site_name}_{timestamp}.{format}".to_string()
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: String::new(),
            filename_template: default_filename_template(),
        }
    }
}

/// Everything loaded from one config file. Immutable for the run.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub site_name: String,
    pub scraper: ScrapeConfig,
    pub export: ExportSettings,
}

impl SiteConfig {
    /// Value of the `_config_used` column.
    pub fn config_label(&self) -> &str {
        self.scraper
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(if self.site_name.is_empty() {
                "default_config"
            } else {
                self.site_name.as_str()
            })
    }
}

pub const SOURCE_URL_FIELD: &str = "_source_url";
pub const SCRAPED_AT_FIELD: &str = "_scraped_at";
pub const CONFIG_USED_FIELD: &str = "_config_used";

/// Columns appended to every record a run produces. Configs may not declare
/// fields with these names.
pub const METADATA_FIELDS: [&str; 3] = [SOURCE_URL_FIELD, SCRAPED_AT_FIELD, CONFIG_USED_FIELD];

/// One extracted row: field name to value, `None` when extraction missed.
///
/// Serializes as a JSON object whose keys keep declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    values: Vec<(String, Option<String>)>,
}

impl Record {
    pub fn from_values(values: Vec<(String, Option<String>)>) -> Self {
        Self { values }
    }

    /// `None` if the field does not exist, `Some(None)` if it was a miss.
    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<Option<&str>> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when no field produced a value.
    pub fn is_all_null(&self) -> bool {
        self.iter().all(|(_, value)| value.is_none())
    }

    pub fn into_values(self) -> Vec<(String, Option<String>)> {
        self.values
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Outcome of fetching one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum FetchStatus {
    Ok,
    Failed(String),
}

/// All records extracted from one URL.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    pub url: String,
    #[serde(flatten)]
    pub status: FetchStatus,
    pub containers_found: usize,
    pub records: Vec<Record>,
}

impl PageResult {
    pub fn failed(url: &str, error: String) -> Self {
        Self {
            url: url.to_string(),
            status: FetchStatus::Failed(error),
            containers_found: 0,
            records: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == FetchStatus::Ok
    }
}

/// Result of trying a config against a single URL.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPreview {
    pub success: bool,
    pub url: String,
    pub config_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub containers_found: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_products: Option<usize>,
    pub sample_products: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

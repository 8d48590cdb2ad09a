//! Product classification of a finished output file.
//!
//! Matches each record's name field against a catalogue of known products
//! and their alternative spellings, and tags the record with the matching
//! product id. Names are compared after [`normalize_name`], so case and
//! whitespace differences between sites do not matter.
//!
//! The catalogue is a JSON list:
//!
//! ```json
//! [{"id": 17, "alternative_names": ["Nike Air Max 90", "AIR MAX 90 NIKE"]}]
//! ```

use crate::error::{Result, ScrapeError};
use crate::utils::normalize_name;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

pub const PRODUCT_ID_FIELD: &str = "product_id";

#[derive(Debug, Clone, Deserialize)]
pub struct KnownProduct {
    pub id: Value,
    #[serde(default)]
    pub alternative_names: Vec<String>,
}

/// Normalized alternative name to product id.
pub fn build_name_index(products: &[KnownProduct]) -> HashMap<String, Value> {
    let mut index = HashMap::new();
    for product in products {
        for name in &product.alternative_names {
            index.insert(normalize_name(name), product.id.clone());
        }
    }
    index
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyStats {
    pub matched: usize,
    pub unmatched: usize,
}

/// Set `product_id` on every record object: the matching id, or `""`.
///
/// Records without a string `name_field` count as unmatched; entries that
/// are not JSON objects are left alone.
pub fn classify_records(
    records: &mut [Value],
    index: &HashMap<String, Value>,
    name_field: &str,
) -> ClassifyStats {
    let mut stats = ClassifyStats::default();
    for record in records.iter_mut() {
        let Some(object) = record.as_object_mut() else {
            continue;
        };
        let id = object
            .get(name_field)
            .and_then(Value::as_str)
            .and_then(|name| index.get(&normalize_name(name)))
            .cloned();
        match id {
            Some(id) => {
                stats.matched += 1;
                object.insert(PRODUCT_ID_FIELD.to_string(), id);
            }
            None => {
                stats.unmatched += 1;
                object.insert(PRODUCT_ID_FIELD.to_string(), Value::String(String::new()));
            }
        }
    }
    stats
}

/// Classify the records in `file` in place.
#[instrument(
    level = "info",
    skip_all,
    fields(file = %file.display(), names = %names_file.display())
)]
pub async fn classify_file(
    file: &Path,
    names_file: &Path,
    name_field: &str,
) -> Result<ClassifyStats> {
    let catalogue: Vec<KnownProduct> =
        serde_json::from_str(&fs::read_to_string(names_file).await?)?;
    let index = build_name_index(&catalogue);
    info!(products = catalogue.len(), names = index.len(), "Loaded alternative names");

    let mut records: Vec<Value> = serde_json::from_str(&fs::read_to_string(file).await?)?;
    let stats = classify_records(&mut records, &index, name_field);
    if stats.matched == 0 && !records.is_empty() {
        warn!(name_field, "No record matched a known product");
    }

    let json = serde_json::to_string_pretty(&records)?;
    fs::write(file, json)
        .await
        .map_err(|source| ScrapeError::OutputWrite {
            path: file.to_path_buf(),
            source,
        })?;
    info!(matched = stats.matched, unmatched = stats.unmatched, "Classified records");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalogue() -> Vec<KnownProduct> {
        serde_json::from_value(json!([
            {"id": 1, "alternative_names": ["Nike Air Max 90", "AIR  MAX 90"]},
            {"id": "adi-7", "alternative_names": ["Adidas Samba OG"]}
        ]))
        .unwrap()
    }

    #[test]
    fn test_index_uses_normalized_names() {
        let index = build_name_index(&catalogue());
        assert_eq!(index.get("air max 90"), Some(&json!(1)));
        assert_eq!(index.get("adidas samba og"), Some(&json!("adi-7")));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_classify_records() {
        let index = build_name_index(&catalogue());
        let mut records = vec![
            json!({"Name": "  nike air   MAX 90 ", "Precio": "$10"}),
            json!({"Name": "Adidas Samba OG"}),
            json!({"Name": "Unknown Shoe"}),
            json!({"Name": null}),
            json!({"Precio": "$5"}),
        ];
        let stats = classify_records(&mut records, &index, "Name");
        assert_eq!(stats, ClassifyStats { matched: 2, unmatched: 3 });
        assert_eq!(records[0]["product_id"], json!(1));
        assert_eq!(records[1]["product_id"], json!("adi-7"));
        assert_eq!(records[2]["product_id"], json!(""));
        assert_eq!(records[3]["product_id"], json!(""));
        assert_eq!(records[4]["product_id"], json!(""));
    }

    #[tokio::test]
    async fn test_classify_file_rewrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let names = dir.path().join("alternative_names.json");
        let output = dir.path().join("run.json");
        std::fs::write(&names, serde_json::to_string(&json!([
            {"id": 3, "alternative_names": ["Vans Old Skool"]}
        ])).unwrap()).unwrap();
        std::fs::write(&output, r#"[{"Name": "VANS old skool", "_source_url": "https://x.test/"}]"#).unwrap();

        let stats = classify_file(&output, &names, "Name").await.unwrap();
        assert_eq!(stats.matched, 1);

        let value: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(value[0]["product_id"], json!(3));
        assert_eq!(value[0]["_source_url"], json!("https://x.test/"));
    }
}

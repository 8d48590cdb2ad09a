//! Summary statistics over an output file.
//!
//! Reports how often each field was actually filled, brand and source
//! breakdowns, and an optional price summary. A value counts as present when
//! it is neither `null` nor an empty string.

use crate::error::Result;
use crate::models::SOURCE_URL_FIELD;
use chrono::Local;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

static PRICE_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\d.,]").expect("price pattern is valid"));

/// Parse a scraped price such as `"$1,234.56"`, `"1.234,56 €"` or `"1234,56"`.
///
/// When both `.` and `,` appear, the one that comes last is the decimal
/// separator. A lone `,` followed by at most two digits is a decimal comma,
/// otherwise it separates thousands.
pub fn clean_price(raw: &str) -> Option<f64> {
    let cleaned = PRICE_NOISE.replace_all(raw, "");
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) => {
            let parts: Vec<&str> = cleaned.split(',').collect();
            if parts.len() == 2 && parts[1].len() <= 2 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        _ => cleaned.into_owned(),
    };
    normalized.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCompletion {
    pub total: usize,
    pub with_data: usize,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSummary {
    pub field: String,
    pub parsed: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordStats {
    pub total_products: usize,
    pub fields_found: Map<String, Value>,
    /// Brand name to count, most frequent first.
    pub brands: Map<String, Value>,
    pub sources: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prices: Option<PriceSummary>,
    pub extraction_time: String,
}

fn present(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Compute [`RecordStats`] over record objects.
pub fn generate_stats(
    records: &[Value],
    brand_field: &str,
    price_field: Option<&str>,
) -> RecordStats {
    let objects: Vec<&Map<String, Value>> =
        records.iter().filter_map(Value::as_object).collect();
    let total = objects.len();

    let mut fields_found = Map::new();
    for field in objects.iter().flat_map(|o| o.keys()).unique() {
        let with_data = objects.iter().filter(|o| present(o.get(field)).is_some()).count();
        let completion = FieldCompletion {
            total,
            with_data,
            completion_rate: round2(with_data as f64 / total as f64 * 100.0),
        };
        fields_found.insert(
            field.clone(),
            serde_json::to_value(completion).unwrap_or(Value::Null),
        );
    }

    let brands = objects
        .iter()
        .filter_map(|o| present(o.get(brand_field)))
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .map(|(brand, count)| (brand.to_string(), Value::from(count)))
        .collect();

    let sources = objects
        .iter()
        .filter_map(|o| present(o.get(SOURCE_URL_FIELD)))
        .map(str::to_string)
        .counts()
        .into_iter()
        .collect();

    let prices = price_field.and_then(|field| {
        let values: Vec<f64> = objects
            .iter()
            .filter_map(|o| present(o.get(field)))
            .filter_map(clean_price)
            .collect();
        let (min, max) = values.iter().copied().minmax().into_option()?;
        Some(PriceSummary {
            field: field.to_string(),
            parsed: values.len(),
            min,
            max,
            mean: round2(values.iter().sum::<f64>() / values.len() as f64),
        })
    });

    RecordStats {
        total_products: total,
        fields_found,
        brands,
        sources,
        prices,
        extraction_time: Local::now().to_rfc3339(),
    }
}

/// Read an output file and compute its statistics.
pub async fn stats_for_file(
    path: &Path,
    brand_field: &str,
    price_field: Option<&str>,
) -> Result<RecordStats> {
    let records: Vec<Value> = serde_json::from_str(&fs::read_to_string(path).await?)?;
    Ok(generate_stats(&records, brand_field, price_field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_price_formats() {
        assert_eq!(clean_price("$1,234.56"), Some(1234.56));
        assert_eq!(clean_price("1.234,56 €"), Some(1234.56));
        assert_eq!(clean_price("S/ 1234,5"), Some(1234.5));
        assert_eq!(clean_price("1,234"), Some(1234.0));
        assert_eq!(clean_price("99"), Some(99.0));
        assert_eq!(clean_price("abc"), None);
        assert_eq!(clean_price(""), None);
    }

    fn sample() -> Vec<Value> {
        vec![
            json!({"Marca": "Nike", "Precio": "$100.00", "_source_url": "https://a.test/1"}),
            json!({"Marca": "Adidas", "Precio": null, "_source_url": "https://a.test/1"}),
            json!({"Marca": "Nike", "Precio": "$50", "_source_url": "https://a.test/2"}),
            json!({"Marca": null, "Precio": "", "_source_url": "https://a.test/2"}),
        ]
    }

    #[test]
    fn test_field_completion() {
        let stats = generate_stats(&sample(), "Marca", None);
        assert_eq!(stats.total_products, 4);
        assert_eq!(
            stats.fields_found["Marca"],
            json!({"total": 4, "with_data": 3, "completion_rate": 75.0})
        );
        assert_eq!(
            stats.fields_found["Precio"],
            json!({"total": 4, "with_data": 2, "completion_rate": 50.0})
        );
        let keys: Vec<&String> = stats.fields_found.keys().collect();
        assert_eq!(keys, vec!["Marca", "Precio", "_source_url"]);
    }

    #[test]
    fn test_brands_sorted_by_count() {
        let stats = generate_stats(&sample(), "Marca", None);
        let brands: Vec<(&String, &Value)> = stats.brands.iter().collect();
        assert_eq!(brands[0], (&"Nike".to_string(), &json!(2)));
        assert_eq!(brands[1], (&"Adidas".to_string(), &json!(1)));
        assert!(stats.prices.is_none());
    }

    #[test]
    fn test_sources_and_prices() {
        let stats = generate_stats(&sample(), "Marca", Some("Precio"));
        assert_eq!(stats.sources.get("https://a.test/1"), Some(&2));
        assert_eq!(stats.sources.get("https://a.test/2"), Some(&2));
        let prices = stats.prices.unwrap();
        assert_eq!(prices.parsed, 2);
        assert_eq!(prices.min, 50.0);
        assert_eq!(prices.max, 100.0);
        assert_eq!(prices.mean, 75.0);
    }

    #[test]
    fn test_empty_input() {
        let stats = generate_stats(&[], "Marca", Some("Precio"));
        assert_eq!(stats.total_products, 0);
        assert!(stats.fields_found.is_empty());
        assert!(stats.brands.is_empty());
        assert!(stats.prices.is_none());
    }
}

//! Record Builder: one [`Record`] per container on the page.

use super::field::extract;
use super::resolve::{element_matches, resolve};
use crate::models::{Record, ScrapeConfig};
use scraper::{ElementRef, Html};

/// All elements whose class list contains `config.container_class`
/// (and whose name equals `config.container_tag`, when set), in document
/// order.
pub fn find_containers<'a>(
    document: &'a Html,
    config: &'a ScrapeConfig,
) -> impl Iterator<Item = ElementRef<'a>> + use<'a> {
    let class = config.container_class.trim();
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |el| {
            let element = el.value();
            let tag_ok = config
                .container_tag
                .as_deref()
                .is_none_or(|tag| element_matches(element, tag, None));
            tag_ok && element.classes().any(|c| c == class)
        })
}

/// Extract every configured field from one container.
///
/// Fields appear in declaration order. A field whose path does not resolve
/// is `None`; the rest of the record is unaffected.
pub fn build_record(container: ElementRef<'_>, config: &ScrapeConfig) -> Record {
    let values = config
        .fields
        .iter()
        .map(|(name, spec)| {
            let node = resolve(container, &spec.path);
            (name.clone(), extract(node, &spec.extract))
        })
        .collect();
    Record::from_values(values)
}

/// Build the records for a whole page.
///
/// No container on the page yields an empty list. With
/// `skip_empty_records` set, records where every field missed are dropped.
pub fn build(document: &Html, config: &ScrapeConfig) -> Vec<Record> {
    find_containers(document, config)
        .map(|container| build_record(container, config))
        .filter(|record| !(config.skip_empty_records && record.is_all_null()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractKind, PathStep};

    const CARDS: &str = r#"
        <html><body>
            <div class="grid">
                <div class="card">
                    <header><h6>BrandX</h6></header>
                    <h3 class="title">  Runner 1 </h3>
                    <a href="/p/1">View</a>
                    <span class="price">$10</span>
                </div>
                <article class="card featured">
                    <header><h6>BrandX</h6></header>
                    <h3 class="title">Runner 2</h3>
                    <a href="/p/2">View</a>
                </article>
            </div>
            <div class="cardigan"><header><h6>Not a card</h6></header></div>
        </body></html>
    "#;

    fn marca_config() -> ScrapeConfig {
        ScrapeConfig::new("card").with_field(
            "Marca",
            vec![PathStep::find("header"), PathStep::find("h6")],
            ExtractKind::Text,
        )
    }

    #[test]
    fn test_two_cards_yield_two_records() {
        let doc = Html::parse_document(CARDS);
        let records = build(&doc, &marca_config());
        let json = serde_json::to_value(&records).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"Marca": "BrandX"}, {"Marca": "BrandX"}])
        );
    }

    #[test]
    fn test_missing_field_is_null_without_affecting_others() {
        let doc = Html::parse_document(CARDS);
        let config = marca_config()
            .with_field(
                "Precio",
                vec![PathStep::find_class("span", "price")],
                ExtractKind::Text,
            )
            .with_field("Link", vec![PathStep::find("a")], ExtractKind::Href);
        let records = build(&doc, &config);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].get("Precio"), Some(Some("$10")));
        assert_eq!(records[1].get("Precio"), Some(None));
        assert_eq!(records[1].get("Marca"), Some(Some("BrandX")));
        assert_eq!(records[1].get("Link"), Some(Some("/p/2")));
    }

    #[test]
    fn test_fields_follow_declaration_order() {
        let doc = Html::parse_document(CARDS);
        let config = ScrapeConfig::new("card")
            .with_field("z_link", vec![PathStep::find("a")], ExtractKind::Href)
            .with_field("a_title", vec![PathStep::find("h3")], ExtractKind::Text);
        let records = build(&doc, &config);
        let names: Vec<&str> = records[0].iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["z_link", "a_title"]);
        assert_eq!(records[0].get("a_title"), Some(Some("Runner 1")));
    }

    #[test]
    fn test_container_class_is_list_membership() {
        let doc = Html::parse_document(CARDS);
        let config = ScrapeConfig::new("featured")
            .with_field("title", vec![PathStep::find("h3")], ExtractKind::Text);
        let records = build(&doc, &config);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("title"), Some(Some("Runner 2")));
    }

    #[test]
    fn test_container_tag_restricts_containers() {
        let doc = Html::parse_document(CARDS);
        let mut config = marca_config();
        config.container_tag = Some("DIV".to_string());
        assert_eq!(find_containers(&doc, &config).count(), 1);
    }

    #[test]
    fn test_no_containers_yields_empty() {
        let doc = Html::parse_document("<html><body><p>nothing here</p></body></html>");
        assert!(build(&doc, &marca_config()).is_empty());
    }

    #[test]
    fn test_empty_field_set_yields_empty_records() {
        let doc = Html::parse_document(CARDS);
        let records = build(&doc, &ScrapeConfig::new("card"));
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(Record::is_empty));
    }

    #[test]
    fn test_skip_empty_records() {
        let doc = Html::parse_document(CARDS);
        let mut config = ScrapeConfig::new("card").with_field(
            "Precio",
            vec![PathStep::find_class("span", "price")],
            ExtractKind::Text,
        );
        assert_eq!(build(&doc, &config).len(), 2);
        config.skip_empty_records = true;
        assert_eq!(build(&doc, &config).len(), 1);
    }

    #[test]
    fn test_build_is_idempotent() {
        let doc = Html::parse_document(CARDS);
        let config = marca_config()
            .with_field("Link", vec![PathStep::find("a")], ExtractKind::Href)
            .with_field("Missing", vec![PathStep::find("table")], ExtractKind::Text);
        assert_eq!(build(&doc, &config), build(&doc, &config));
    }
}

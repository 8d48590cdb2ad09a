//! Field Extractor: turns a resolved element into a scalar value.

use crate::models::ExtractKind;
use scraper::ElementRef;

/// Elements whose text is never rendered.
const HIDDEN_TEXT_PARENTS: [&str; 2] = ["script", "style"];

/// Extract a value from `node` according to `kind`.
///
/// A missing node yields `None`, which surfaces as `null` in the record
/// without affecting the other fields.
pub fn extract(node: Option<ElementRef<'_>>, kind: &ExtractKind) -> Option<String> {
    let node = node?;
    match kind {
        ExtractKind::Text => Some(visible_text(node)),
        ExtractKind::Href => attribute(node, "href"),
        ExtractKind::Src => attribute(node, "src"),
        ExtractKind::Attr(name) => attribute(node, name),
    }
}

/// Concatenated descendant text, trimmed at both ends.
pub fn visible_text(node: ElementRef<'_>) -> String {
    let mut text = String::new();
    for child in node.descendants() {
        let Some(fragment) = child.value().as_text() else {
            continue;
        };
        let hidden = child
            .parent()
            .and_then(ElementRef::wrap)
            .is_some_and(|parent| HIDDEN_TEXT_PARENTS.contains(&parent.value().name()));
        if !hidden {
            text.push_str(fragment);
        }
    }
    text.trim().to_string()
}

fn attribute(node: ElementRef<'_>, name: &str) -> Option<String> {
    node.value().attr(name).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        let selector = Selector::parse(css).unwrap();
        doc.select(&selector).next().unwrap()
    }

    #[test]
    fn test_text_is_trimmed() {
        let doc = Html::parse_fragment("<span>  Nike  </span>");
        let span = first(&doc, "span");
        assert_eq!(extract(Some(span), &ExtractKind::Text), Some("Nike".to_string()));
    }

    #[test]
    fn test_text_concatenates_descendants() {
        let doc = Html::parse_fragment("<h3>\n  <b>Air</b> Max <i>90</i>\n</h3>");
        let h3 = first(&doc, "h3");
        assert_eq!(
            extract(Some(h3), &ExtractKind::Text),
            Some("Air Max 90".to_string())
        );
    }

    #[test]
    fn test_text_skips_script_and_style() {
        let doc = Html::parse_document(
            "<div id='x'>Price<script>var p = 1;</script><style>.a{}</style> 10</div>",
        );
        let div = first(&doc, "#x");
        assert_eq!(
            extract(Some(div), &ExtractKind::Text),
            Some("Price 10".to_string())
        );
    }

    #[test]
    fn test_href_present_and_absent() {
        let doc = Html::parse_fragment(r#"<a href="/p/1">x</a><span>no link</span>"#);
        let a = first(&doc, "a");
        let span = first(&doc, "span");
        assert_eq!(extract(Some(a), &ExtractKind::Href), Some("/p/1".to_string()));
        assert_eq!(extract(Some(span), &ExtractKind::Href), None);
    }

    #[test]
    fn test_src_and_named_attribute() {
        let doc = Html::parse_fragment(r#"<img src="/img/1.jpg" alt="Shoe" data-sku="A-1">"#);
        let img = first(&doc, "img");
        assert_eq!(extract(Some(img), &ExtractKind::Src), Some("/img/1.jpg".to_string()));
        assert_eq!(
            extract(Some(img), &ExtractKind::Attr("data-sku".to_string())),
            Some("A-1".to_string())
        );
        assert_eq!(extract(Some(img), &ExtractKind::Attr("title".to_string())), None);
    }

    #[test]
    fn test_missing_node_is_null_for_every_kind() {
        for kind in [
            ExtractKind::Text,
            ExtractKind::Href,
            ExtractKind::Src,
            ExtractKind::Attr("alt".to_string()),
        ] {
            assert_eq!(extract(None, &kind), None);
        }
    }

    #[test]
    fn test_empty_attribute_is_kept() {
        let doc = Html::parse_fragment(r#"<a href="">x</a>"#);
        let a = first(&doc, "a");
        assert_eq!(extract(Some(a), &ExtractKind::Href), Some(String::new()));
    }
}

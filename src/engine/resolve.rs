//! Path Resolver.
//!
//! Interprets an ordered list of [`PathStep`]s against an element. Each step
//! searches the *descendants* of the current element (depth-first, document
//! order, the element itself excluded) and the match becomes the root of the
//! next step. The first step that finds nothing short-circuits the whole path.

use crate::models::PathStep;
use scraper::{ElementRef, node::Element};

/// Resolve `steps` starting at `root`.
///
/// An empty step list resolves to `root` itself.
///
/// # Returns
///
/// The element reached by the last step, or `None` as soon as any step
/// finds no match (or a `find_all` index is out of bounds).
pub fn resolve<'a>(root: ElementRef<'a>, steps: &[PathStep]) -> Option<ElementRef<'a>> {
    steps
        .iter()
        .try_fold(root, |current, step| apply_step(current, step))
}

fn apply_step<'a>(current: ElementRef<'a>, step: &PathStep) -> Option<ElementRef<'a>> {
    match step {
        PathStep::Find { tag, class } => {
            matching_descendants(current, tag, class.as_deref()).next()
        }
        PathStep::FindAll { tag, class, index } => {
            matching_descendants(current, tag, class.as_deref()).nth(*index)
        }
    }
}

/// All descendants of `root` in document order that match `tag` and, when
/// given, `class`.
pub fn matching_descendants<'a, 'b>(
    root: ElementRef<'a>,
    tag: &'b str,
    class: Option<&'b str>,
) -> impl Iterator<Item = ElementRef<'a>> + use<'a, 'b> {
    root.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(move |el| element_matches(el.value(), tag, class))
}

/// Tag names compare ASCII case-insensitively; `class` matches when it is
/// one of the element's classes. No class means tag-only matching.
pub fn element_matches(element: &Element, tag: &str, class: Option<&str>) -> bool {
    element.name().eq_ignore_ascii_case(tag)
        && class.is_none_or(|wanted| element.classes().any(|c| c == wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const FIXTURE: &str = r#"
        <html><body>
            <div id="root">
                <section class="intro lead">
                    <p id="p1">first</p>
                    <p id="p2" class="note">second</p>
                </section>
                <ul>
                    <li id="li1" class="item">one</li>
                    <li id="li2">two</li>
                    <li id="li3" class="item sale">three</li>
                </ul>
                <p id="p3" class="note">third</p>
            </div>
        </body></html>
    "#;

    fn id_of(el: Option<ElementRef<'_>>) -> Option<&str> {
        el.and_then(|e| e.value().attr("id"))
    }

    fn root(doc: &Html) -> ElementRef<'_> {
        doc.root_element()
    }

    #[test]
    fn test_empty_path_resolves_to_root() {
        let doc = Html::parse_document(FIXTURE);
        let resolved = resolve(root(&doc), &[]).unwrap();
        assert_eq!(resolved.id(), root(&doc).id());
    }

    #[test]
    fn test_find_returns_first_in_document_order() {
        let doc = Html::parse_document(FIXTURE);
        assert_eq!(id_of(resolve(root(&doc), &[PathStep::find("p")])), Some("p1"));
        assert_eq!(id_of(resolve(root(&doc), &[PathStep::find("li")])), Some("li1"));
        assert_eq!(
            id_of(resolve(root(&doc), &[PathStep::find_class("p", "note")])),
            Some("p2")
        );
    }

    #[test]
    fn test_find_all_returns_nth_match() {
        let doc = Html::parse_document(FIXTURE);
        let expected = ["p1", "p2", "p3"];
        for (i, id) in expected.iter().enumerate() {
            assert_eq!(
                id_of(resolve(root(&doc), &[PathStep::find_all("p", i)])),
                Some(*id)
            );
        }
        assert!(resolve(root(&doc), &[PathStep::find_all("p", 3)]).is_none());
    }

    #[test]
    fn test_find_all_with_class() {
        let doc = Html::parse_document(FIXTURE);
        let step = |index| PathStep::FindAll {
            tag: "li".to_string(),
            class: Some("item".to_string()),
            index,
        };
        assert_eq!(id_of(resolve(root(&doc), &[step(0)])), Some("li1"));
        assert_eq!(id_of(resolve(root(&doc), &[step(1)])), Some("li3"));
        assert!(resolve(root(&doc), &[step(2)]).is_none());
    }

    #[test]
    fn test_class_matches_any_entry_of_class_list() {
        let doc = Html::parse_document(FIXTURE);
        assert!(resolve(root(&doc), &[PathStep::find_class("section", "lead")]).is_some());
        assert!(resolve(root(&doc), &[PathStep::find_class("section", "intro")]).is_some());
        assert_eq!(
            id_of(resolve(root(&doc), &[PathStep::find_class("li", "sale")])),
            Some("li3")
        );
        assert!(resolve(root(&doc), &[PathStep::find_class("section", "intro lead")]).is_none());
    }

    #[test]
    fn test_tag_matching_is_case_insensitive() {
        let doc = Html::parse_document(FIXTURE);
        let upper = resolve(root(&doc), &[PathStep::find("DIV")]).map(|e| e.id());
        let lower = resolve(root(&doc), &[PathStep::find("div")]).map(|e| e.id());
        assert!(upper.is_some());
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_steps_search_within_previous_match() {
        let doc = Html::parse_document(FIXTURE);
        let path = [PathStep::find("section"), PathStep::find_all("p", 1)];
        assert_eq!(id_of(resolve(root(&doc), &path)), Some("p2"));

        // p3 is outside the section, so a third p does not exist in its subtree.
        let path = [PathStep::find("section"), PathStep::find_all("p", 2)];
        assert!(resolve(root(&doc), &path).is_none());
    }

    #[test]
    fn test_missing_step_short_circuits() {
        let doc = Html::parse_document(FIXTURE);
        let path = [PathStep::find("table"), PathStep::find("p")];
        assert!(resolve(root(&doc), &path).is_none());

        let path = [PathStep::find("ul"), PathStep::find("p")];
        assert!(resolve(root(&doc), &path).is_none());
    }

    #[test]
    fn test_find_excludes_current_element() {
        let doc = Html::parse_document(FIXTURE);
        let path = [PathStep::find("section"), PathStep::find("section")];
        assert!(resolve(root(&doc), &path).is_none());
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let doc = Html::parse_document(FIXTURE);
        let path = [PathStep::find("ul"), PathStep::find_all("li", 2)];
        let first = resolve(root(&doc), &path).map(|e| e.id());
        let second = resolve(root(&doc), &path).map(|e| e.id());
        assert_eq!(first, second);
    }
}

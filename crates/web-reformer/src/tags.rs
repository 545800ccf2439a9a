//! Attribute-tagged listings of arbitrary elements.

use scraper::{ElementRef, Html};

use crate::document::elements;
use crate::types::{TagRecord, INNER_HTML_KEY, INNER_TEXT_KEY, OUTER_HTML_KEY, TAG_NAME_KEY};

const RESERVED_KEYS: [&str; 4] = [TAG_NAME_KEY, INNER_HTML_KEY, OUTER_HTML_KEY, INNER_TEXT_KEY];

/// Collect every element named exactly `tag_name`, in document order.
///
/// Matching is case-sensitive against the parser's element names, which are
/// lowercase for HTML elements.
pub fn collect_tags(document: &Html, tag_name: &str) -> Vec<TagRecord> {
    elements(document)
        .filter(|el| el.value().name() == tag_name)
        .map(tag_record)
        .collect()
}

fn tag_record(el: ElementRef<'_>) -> TagRecord {
    let mut record = TagRecord::new();
    record.insert(INNER_HTML_KEY.to_string(), el.inner_html());
    record.insert(OUTER_HTML_KEY.to_string(), el.html());
    record.insert(INNER_TEXT_KEY.to_string(), el.text().collect());
    record.insert(TAG_NAME_KEY.to_string(), el.value().name().to_string());

    // Attributes go last so they override reserved keys of the same name.
    for (name, value) in el.value().attrs() {
        record.insert(record_key(name), value.to_string());
    }
    record
}

/// Attribute names arrive lowercased from the parser while reserved keys are
/// camel-cased, so a collision is detected ignoring ASCII case.
fn record_key(attr_name: &str) -> String {
    RESERVED_KEYS
        .iter()
        .find(|key| key.eq_ignore_ascii_case(attr_name))
        .map_or_else(|| attr_name.to_string(), |key| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn test_reserved_keys() {
        let d = doc(r#"<p>Go <a href="/x" class="nav">to <b>x</b></a></p>"#);
        let links = collect_tags(&d, "a");
        assert_eq!(links.len(), 1);
        let a = &links[0];
        assert_eq!(a[TAG_NAME_KEY], "a");
        assert_eq!(a[INNER_HTML_KEY], "to <b>x</b>");
        assert!(a[OUTER_HTML_KEY].starts_with("<a "));
        assert!(a[OUTER_HTML_KEY].ends_with(">to <b>x</b></a>"));
        assert_eq!(a[INNER_TEXT_KEY], "to x");
        assert_eq!(a["href"], "/x");
        assert_eq!(a["class"], "nav");
    }

    #[test]
    fn test_attribute_overrides_reserved_key() {
        let d = doc(r#"<a href="h" innerHTML="z">text</a>"#);
        let a = &collect_tags(&d, "a")[0];
        assert_eq!(a[INNER_HTML_KEY], "z");
        assert_eq!(a[INNER_TEXT_KEY], "text");
        assert_eq!(a[TAG_NAME_KEY], "a");
        assert!(a[OUTER_HTML_KEY].ends_with(">text</a>"));
        assert!(!a.contains_key("innerhtml"));
    }

    #[test]
    fn test_tag_name_attribute_override() {
        let d = doc(r#"<img tagName="picture" src="p.png">"#);
        let img = &collect_tags(&d, "img")[0];
        assert_eq!(img[TAG_NAME_KEY], "picture");
        assert_eq!(img["src"], "p.png");
    }

    #[test]
    fn test_document_order() {
        let d = doc(r#"<img src="1"><div><img src="2"></div><img src="3">"#);
        let srcs: Vec<_> = collect_tags(&d, "img")
            .into_iter()
            .map(|r| r["src"].clone())
            .collect();
        assert_eq!(srcs, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_name_match_is_exact() {
        let d = doc(r#"<IMG src="1"><image src="2">"#);
        assert_eq!(collect_tags(&d, "IMG").len(), 0);
        assert_eq!(collect_tags(&d, "im").len(), 0);
        // html5ever lowercases tag names and rewrites <image> to <img>.
        assert_eq!(collect_tags(&d, "img").len(), 2);
    }

    #[test]
    fn test_no_matches() {
        let d = doc("<p>nothing here</p>");
        assert!(collect_tags(&d, "table").is_empty());
    }
}

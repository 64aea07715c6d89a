//! Raw markup extraction

use scraper::ElementRef;

use crate::value::Value;

/// Serialise the element's children as markup. Text nodes are escaped by
/// the serialiser. With `include_tag` the element's own tags are kept.
pub(super) fn serialize<'a>(element: ElementRef<'_>, include_tag: bool) -> Value<'a> {
    if include_tag {
        Value::Text(element.html())
    } else {
        Value::Text(element.inner_html())
    }
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
    fn test_inner_markup() {
        let doc = Html::parse_document(
            "<table><tr><th>key</th><td>value</td></tr></table>",
        );
        let value = serialize(first(&doc, "table tr"), false);
        assert_eq!(value.as_str(), Some("<th>key</th><td>value</td>"));
    }

    #[test]
    fn test_leading_text_is_escaped() {
        let doc = Html::parse_document("<p>a &lt; b <b>bold</b> tail</p>");
        let value = serialize(first(&doc, "p"), false);
        assert_eq!(value.as_str(), Some("a &lt; b <b>bold</b> tail"));
    }

    #[test]
    fn test_include_tag() {
        let doc = Html::parse_document(r#"<div class="x"><i>hi</i></div>"#);
        let value = serialize(first(&doc, "div.x"), true);
        assert_eq!(value.as_str(), Some(r#"<div class="x"><i>hi</i></div>"#));
    }
}

//! DOM Capability Module
//!
//! Small lookup surface over a parsed page: `find`, `find_all`, `text`,
//! `attribute`. The review extractor only sees these, never the browser.

use scraper::{ElementRef, Html, Selector};

/// A page source parsed once for extraction.
pub struct PageDocument {
    html: Html,
}

impl PageDocument {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    pub fn find(&self, selector: &Selector) -> Option<Node<'_>> {
        self.html.select(selector).next().map(Node)
    }

    pub fn find_all(&self, selector: &Selector) -> Vec<Node<'_>> {
        self.html.select(selector).map(Node).collect()
    }
}

#[derive(Clone, Copy)]
pub struct Node<'a>(ElementRef<'a>);

impl<'a> Node<'a> {
    pub fn find(&self, selector: &Selector) -> Option<Node<'a>> {
        self.0.select(selector).next().map(Node)
    }

    pub fn find_all(&self, selector: &Selector) -> Vec<Node<'a>> {
        self.0.select(selector).map(Node).collect()
    }

    /// Text content with whitespace runs collapsed to single spaces.
    pub fn text(&self) -> String {
        self.0
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Trimmed text, `None` when empty.
    pub fn non_empty_text(&self) -> Option<String> {
        let text = self.text();
        (!text.is_empty()).then_some(text)
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0
            .value()
            .attr(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_collapses_whitespace() {
        let doc = PageDocument::parse("<div class='a'>  Hello\n   <b>big</b>\tworld </div>");
        let sel = Selector::parse("div.a").unwrap();
        assert_eq!(doc.find(&sel).unwrap().text(), "Hello big world");
    }

    #[test]
    fn test_attribute_and_nested_find() {
        let doc = PageDocument::parse(
            r#"<ul><li id="r1"><span title=" 4.0 ">x</span></li><li id="r2"></li></ul>"#,
        );
        let li = Selector::parse("li").unwrap();
        let span = Selector::parse("span").unwrap();
        let nodes = doc.find_all(&li);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].attribute("id").as_deref(), Some("r1"));
        assert_eq!(
            nodes[0].find(&span).and_then(|n| n.attribute("title")).as_deref(),
            Some("4.0")
        );
        assert!(nodes[1].find(&span).is_none());
        assert!(nodes[1].non_empty_text().is_none());
    }
}

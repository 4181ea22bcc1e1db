//! Owned element trees decoded from protocol fragments.
//!
//! The backend emits bare sibling elements. The framer wraps them in a
//! synthetic root, parses the result with `roxmltree` and converts the
//! borrowed tree into [`Element`] values so messages can outlive the read
//! buffer.

use std::collections::BTreeMap;

/// Name of the synthetic root wrapped around every framed message.
pub const SYNTHETIC_ROOT: &str = "doc";

/// An owned XML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    /// Creates an element with no attributes, text or children.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds or replaces an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Replaces the element's direct text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Appends a child element.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Parses a complete document and returns its root element.
    ///
    /// # Errors
    ///
    /// Returns the parser error when the text is not well-formed XML.
    pub fn parse_document(text: &str) -> Result<Self, roxmltree::Error> {
        let document = roxmltree::Document::parse(text)?;
        Ok(Self::from_node(document.root_element()))
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let mut element = Self::new(node.tag_name().name());
        for attribute in node.attributes() {
            element
                .attributes
                .insert(attribute.name().to_owned(), attribute.value().to_owned());
        }
        for child in node.children() {
            if child.is_element() {
                element.children.push(Self::from_node(child));
            } else if child.is_text()
                && let Some(text) = child.text()
            {
                element.text.push_str(text);
            }
        }
        element
    }

    /// Local tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up an attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attributes sorted by name.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns `true` when the attribute is present and spelled `true`.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.attribute(name)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    /// Concatenated direct text content.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Child elements in document order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// First child with the given tag name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All children with the given tag name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_direct_text() {
        let root = Element::parse_document(
            "<doc><out>hello <b>bold</b>world</out><idle/></doc>",
        )
        .unwrap();
        assert_eq!(root.name(), SYNTHETIC_ROOT);
        assert_eq!(root.children().len(), 2);
        let out = root.child("out").unwrap();
        assert_eq!(out.text(), "hello world");
        assert_eq!(out.child("b").unwrap().text(), "bold");
    }

    #[test]
    fn decodes_entities_in_text_and_attributes() {
        let root =
            Element::parse_document(r#"<doc><title name="a &amp; b">1 &lt; 2</title></doc>"#)
                .unwrap();
        let title = root.child("title").unwrap();
        assert_eq!(title.attribute("name"), Some("a & b"));
        assert_eq!(title.text(), "1 < 2");
    }

    #[test]
    fn flag_accepts_only_true() {
        let element = Element::new("cmd_param")
            .with_attribute("available", "TRUE")
            .with_attribute("hidden", "yes");
        assert!(element.flag("available"));
        assert!(!element.flag("hidden"));
        assert!(!element.flag("missing"));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(Element::parse_document("<doc><out></doc>").is_err());
    }
}

//! Minimal markup tree produced by template sets.
//!
//! Nodes serialize deterministically: attributes keep insertion order and
//! nothing depends on hashing or time.

const VOID_ELEMENTS: &[&str] = &["area", "br", "col", "hr", "img", "input", "link", "meta", "source"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Text content, escaped on output
    Text(String),
    /// Trusted markup emitted verbatim (rendered Markdown, doctype, theme output)
    Raw(String),
    /// Children without a wrapping element
    Fragment(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn element(tag: impl Into<String>) -> Element {
        Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Node {
        Node::Text(text.into())
    }

    pub fn raw(markup: impl Into<String>) -> Node {
        Node::Raw(markup.into())
    }

    /// A full HTML document: doctype followed by the root element.
    pub fn document(root: Element) -> Node {
        Node::Fragment(vec![Node::raw("<!DOCTYPE html>\n"), root.into()])
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Node::Element(element) => element.write_html(out),
            Node::Text(text) => out.push_str(&html_escape::encode_text(text)),
            Node::Raw(markup) => out.push_str(markup),
            Node::Fragment(children) => children.iter().for_each(|c| c.write_html(out)),
        }
    }

    /// Depth-first search for the first element with the given tag.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        match self {
            Node::Element(element) if element.tag == tag => Some(element),
            Node::Element(element) => element.children.iter().find_map(|c| c.find(tag)),
            Node::Fragment(children) => children.iter().find_map(|c| c.find(tag)),
            Node::Text(_) | Node::Raw(_) => None,
        }
    }

    /// Concatenated text of this node and its descendants, raw markup excluded.
    pub fn text_content(&self) -> String {
        match self {
            Node::Text(text) => text.clone(),
            Node::Raw(_) => String::new(),
            Node::Element(element) => element.children.iter().map(Node::text_content).collect(),
            Node::Fragment(children) => children.iter().map(Node::text_content).collect(),
        }
    }
}

impl Element {
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value)
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.child(Node::Text(text.into()))
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(value));
            out.push('"');
        }
        out.push('>');

        if VOID_ELEMENTS.contains(&self.tag.as_str()) {
            return;
        }

        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

use clap::ValueEnum;
use std::borrow::Cow;

/// The flavors of HTML we can write. The dialect is the only thing that differs between them: each one builds
/// sections, anchors and void elements its own way.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, ValueEnum)]
pub enum Dialect {
    #[default]
    Html4,
    Xhtml,
    Html5,
}

/// How an element lays out its tags relative to newlines.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Layout {
    /// `<tag>`, newline, children, `</tag>`, newline.
    Block,
    /// `<tag>`, children, `</tag>`, newline.
    Line,
    /// `<tag>`, children, `</tag>`.
    Inline,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HtmlNode {
    Element(HtmlElement),
    /// Text, which gets escaped when written.
    Text(String),
    /// Markup that's written as-is.
    Raw(String),
    Comment(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HtmlElement {
    pub tag: &'static str,
    pub layout: Layout,
    pub attrs: Vec<(&'static str, String)>,
    pub children: Vec<HtmlNode>,
}

const VOID_TAGS: [&str; 3] = ["hr", "img", "br"];

impl HtmlElement {
    pub fn new(tag: &'static str, layout: Layout) -> Self {
        Self {
            tag,
            layout,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn block(tag: &'static str) -> Self {
        Self::new(tag, Layout::Block)
    }

    pub fn line(tag: &'static str) -> Self {
        Self::new(tag, Layout::Line)
    }

    pub fn inline(tag: &'static str) -> Self {
        Self::new(tag, Layout::Inline)
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set_attr(&mut self, name: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing_value)) => *existing_value = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Sets an attribute only if there's a value for it.
    pub fn attr_opt(mut self, name: &'static str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.set_attr(name, value);
        }
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn push(&mut self, child: HtmlNode) {
        self.children.push(child);
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = HtmlNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn into_node(self) -> HtmlNode {
        HtmlNode::Element(self)
    }
}

impl HtmlNode {
    pub fn text(value: impl Into<String>) -> Self {
        HtmlNode::Text(value.into())
    }
}

impl Dialect {
    /// The container for a heading and everything under it.
    pub fn section(self, level: u32) -> HtmlElement {
        match self {
            Dialect::Html4 | Dialect::Xhtml => HtmlElement::block("div").attr("class", format!("section h{level}")),
            Dialect::Html5 => HtmlElement::block("section").attr("class", format!("h{level}")),
        }
    }

    /// An anchor that both names a location and links to it.
    pub fn anchor(self, name: &str) -> HtmlElement {
        let target = match self {
            Dialect::Html4 | Dialect::Xhtml => "name",
            Dialect::Html5 => "id",
        };
        HtmlElement::inline("a").attr(target, name).attr("href", format!("#{name}"))
    }

    fn void_close(self) -> &'static str {
        match self {
            Dialect::Html4 | Dialect::Html5 => ">",
            Dialect::Xhtml => " />",
        }
    }

    pub fn serialize(self, nodes: &[HtmlNode]) -> String {
        let mut out = String::new();
        for node in nodes {
            self.write_node(&mut out, node);
        }
        out
    }

    fn write_node(self, out: &mut String, node: &HtmlNode) {
        match node {
            HtmlNode::Element(element) => self.write_element(out, element),
            HtmlNode::Text(text) => out.push_str(&escape(text)),
            HtmlNode::Raw(raw) => out.push_str(raw),
            HtmlNode::Comment(comment) => {
                out.push_str("<!-- ");
                out.push_str(comment);
                out.push_str(" -->\n");
            }
        }
    }

    fn write_element(self, out: &mut String, element: &HtmlElement) {
        out.push('<');
        out.push_str(element.tag);
        for (name, value) in &element.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value));
            out.push('"');
        }
        if VOID_TAGS.contains(&element.tag) {
            out.push_str(self.void_close());
            if element.layout != Layout::Inline {
                out.push('\n');
            }
            return;
        }
        out.push('>');
        if element.layout == Layout::Block {
            out.push('\n');
        }
        for child in &element.children {
            self.write_node(out, child);
        }
        out.push_str("</");
        out.push_str(element.tag);
        out.push('>');
        if element.layout != Layout::Inline {
            out.push('\n');
        }
    }
}

/// Escapes `&`, `"`, `<` and `>`.
pub fn escape(text: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(text)
}

use crate::wiki_elem::tree::*;
use fancy_regex::Regex;
use lazy_static::lazy_static;

/// Every delimiter the tokenizer knows about, longest first.
///
/// The ordering matters: `'''` has to win over `''`, and `||` over `|`.
const DELIMITERS: [&str; 11] = ["'''", "''", "[[", "]]", "{{", "}}", "==", "``", "||", "|", ":"];

lazy_static! {
    static ref IMAGE_SUFFIX: Regex =
        Regex::new(r"(?i)\.(?:png|jpe?g|gif|bmp|tiff?|svg|webp)$").expect("internal error");
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum RawToken<'a> {
    Delim(&'static str),
    Text(&'a str),
}

/// Splits a line into delimiter and text tokens.
fn tokenize(line: &str) -> Vec<RawToken<'_>> {
    let mut tokens = Vec::with_capacity(8); // a guess, but most lines have few delimiters
    let mut text_start = 0;
    let mut pos = 0;
    let bytes = line.as_bytes();
    while pos < bytes.len() {
        // All the delimiters are ASCII, so matching them at a byte position can never split a char.
        match DELIMITERS.iter().find(|delim| bytes[pos..].starts_with(delim.as_bytes())) {
            Some(delim) => {
                if text_start < pos {
                    tokens.push(RawToken::Text(&line[text_start..pos]));
                }
                tokens.push(RawToken::Delim(delim));
                pos += delim.len();
                text_start = pos;
            }
            None => pos += 1,
        }
    }
    if text_start < line.len() {
        tokens.push(RawToken::Text(&line[text_start..]));
    }
    tokens
}

fn kind_for_head(token: &str) -> Option<InlineKind> {
    match token {
        "[[" => Some(InlineKind::Link),
        "''" => Some(InlineKind::Em),
        "'''" => Some(InlineKind::Strong),
        "==" => Some(InlineKind::Del),
        "``" => Some(InlineKind::Literal),
        "{{" => Some(InlineKind::Plugin),
        _ => None,
    }
}

fn kind_for_tail(token: &str) -> Option<InlineKind> {
    match token {
        "]]" => Some(InlineKind::Link),
        "''" => Some(InlineKind::Em),
        "'''" => Some(InlineKind::Strong),
        "==" => Some(InlineKind::Del),
        "``" => Some(InlineKind::Literal),
        "}}" => Some(InlineKind::Plugin),
        _ => None,
    }
}

fn separator(token: &str) -> Option<Separator> {
    match token {
        "|" => Some(Separator::Link),
        "||" => Some(Separator::Table),
        ":" => Some(Separator::Desc),
        _ => None,
    }
}

/// Parses a single line of inline markup.
///
/// Parsing never fails. Mismatched closing tokens demote the spans they cross back to text, and spans still open at
/// the end of the line are left in the tree as (unterminated) nodes.
pub struct InlineParser {
    /// The open spans. `stack[0]` is always the [`InlineKind::Plain`] root.
    stack: Vec<InlineTree>,
}

impl InlineParser {
    pub fn parse(line: &str) -> InlineTree {
        let mut parser = Self {
            stack: vec![InlineTree::inline(InlineKind::Plain)],
        };
        for token in tokenize(line) {
            match token {
                RawToken::Text(text) => parser.current().push_text(text),
                RawToken::Delim(delim) => parser.handle_delimiter(delim),
            }
        }
        parser.finish()
    }

    fn current(&mut self) -> &mut InlineTree {
        self.stack.last_mut().expect("inline stack always has a root")
    }

    fn current_kind(&self) -> InlineKind {
        self.stack.last().map_or(InlineKind::Plain, InlineTree::kind)
    }

    fn handle_delimiter(&mut self, delim: &'static str) {
        let current_kind = self.current_kind();
        // Literal and plugin spans are opaque: only their own tail means anything inside them.
        if matches!(current_kind, InlineKind::Literal | InlineKind::Plugin) {
            if delim == current_kind.tail() {
                self.close_current();
            } else {
                self.current().push_text(delim);
            }
            return;
        }
        if let Some(sep) = separator(delim) {
            self.current().push_leaf(InlineToken::Sep(sep));
            return;
        }
        if let Some(kind) = kind_for_tail(delim) {
            if current_kind == kind {
                self.close_current();
                return;
            }
            if let Some(open_at) = self.stack.iter().rposition(|node| node.kind() == kind) {
                if open_at > 0 {
                    while self.stack.len() > open_at + 1 {
                        self.demote_current();
                    }
                    self.close_current();
                    return;
                }
            }
        }
        match kind_for_head(delim) {
            Some(kind) => self.stack.push(InlineTree::inline(kind)),
            None => self.current().push_text(delim), // a stray `]]` or `}}`
        }
    }

    fn close_current(&mut self) {
        let closed = self.stack.pop().expect("inline stack always has a root");
        self.current().push_node(closed);
    }

    /// Turns the innermost open span back into text: its head token, followed by whatever it had collected.
    fn demote_current(&mut self) {
        let demoted = self.stack.pop().expect("inline stack always has a root");
        let parent = self.current();
        parent.push_text(demoted.kind().head());
        for child in demoted.children {
            parent.push(child);
        }
    }

    fn finish(mut self) -> InlineTree {
        while self.stack.len() > 1 {
            self.close_current();
        }
        self.stack.pop().expect("inline stack always has a root")
    }
}

/// The caption and destination of a [`InlineKind::Link`] node.
#[derive(Debug, PartialEq)]
pub struct LinkParts<'a> {
    /// The inlines before the `|` separator, or `None` if there was no separator.
    pub caption: Option<&'a [InlineElem]>,
    pub destination: String,
    pub is_image: bool,
}

impl LinkParts<'_> {
    pub fn has_destination(&self) -> bool {
        !self.destination.is_empty()
    }
}

/// Splits a link node into its caption and destination, and classifies it as an image or not.
///
/// A link with no destination gets reported as a diagnostic, but is still returned; callers render its caption as
/// text.
pub fn split_link(node: &InlineTree) -> LinkParts<'_> {
    let sep_at = node
        .children
        .iter()
        .position(|child| matches!(child, Tree::Leaf(Leaf { data: InlineToken::Sep(Separator::Link), .. })));
    let (caption, dest_elems) = match sep_at {
        Some(idx) => (Some(&node.children[..idx]), &node.children[idx + 1..]),
        None => (None, &node.children[..]),
    };
    let mut destination = String::new();
    for elem in dest_elems {
        match elem {
            Tree::Leaf(leaf) => destination.push_str(leaf.data.as_str()),
            Tree::Node(inner) => {
                destination.push_str(inner.kind().head());
                destination.push_str(&inner.to_source());
                destination.push_str(inner.kind().tail());
            }
        }
    }
    let destination = destination.trim().to_string();
    if destination.is_empty() {
        log::warn!("link has no destination: [[{}]]", node.to_source());
    }
    let is_image = IMAGE_SUFFIX.is_match(&destination).unwrap_or(false);
    LinkParts {
        caption,
        destination,
        is_image,
    }
}

/// Splits a definition's inlines at the first `:` separator into the term and (if there was a separator) the
/// description.
pub fn split_desc(tree: &InlineTree) -> (&[InlineElem], Option<&[InlineElem]>) {
    let sep_at = tree
        .children
        .iter()
        .position(|child| matches!(child, Tree::Leaf(Leaf { data: InlineToken::Sep(Separator::Desc), .. })));
    match sep_at {
        Some(idx) => (&tree.children[..idx], Some(&tree.children[idx + 1..])),
        None => (&tree.children[..], None),
    }
}

/// Concatenates the text of some inline elements, dropping span markup.
pub fn plain_text_of(elems: &[InlineElem]) -> String {
    let mut out = String::new();
    for elem in elems {
        match elem {
            Tree::Leaf(leaf) => out.push_str(leaf.data.as_str()),
            Tree::Node(node) => out.push_str(&node.to_plain_text()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::utils_for_test::*;
    use crate::wiki_elem::inline_tree;

    #[test]
    fn tokenize_longest_match() {
        assert_eq!(
            tokenize("'''a''b"),
            vec![
                RawToken::Delim("'''"),
                RawToken::Text("a"),
                RawToken::Delim("''"),
                RawToken::Text("b"),
            ]
        );
        assert_eq!(
            tokenize("x||y|z"),
            vec![
                RawToken::Text("x"),
                RawToken::Delim("||"),
                RawToken::Text("y"),
                RawToken::Delim("|"),
                RawToken::Text("z"),
            ]
        );
    }

    #[test]
    fn tokenize_five_quotes() {
        assert_eq!(tokenize("'''''"), vec![RawToken::Delim("'''"), RawToken::Delim("''")]);
    }

    #[test]
    fn tokenize_multibyte_text() {
        assert_eq!(
            tokenize("日本''語''"),
            vec![
                RawToken::Text("日本"),
                RawToken::Delim("''"),
                RawToken::Text("語"),
                RawToken::Delim("''"),
            ]
        );
    }

    #[test]
    fn plain_text() {
        let tree = InlineParser::parse("hello world");
        assert_eq!(tree, inline_tree!["hello world"]);
    }

    #[test]
    fn balanced_spans() {
        let tree = InlineParser::parse("a ''em'' '''strong''' ==del== b");
        assert_eq!(
            tree,
            inline_tree!["a ", em["em"], " ", strong["strong"], " ", del["del"], " b"]
        );
    }

    #[test]
    fn nested_spans() {
        let tree = InlineParser::parse("''a '''b''' c''");
        assert_eq!(tree, inline_tree![em["a ", strong["b"], " c"]]);
    }

    #[test]
    fn link_with_caption() {
        let tree = InlineParser::parse("[[caption|http://example.com/]]");
        assert_eq!(
            tree,
            inline_tree![link["caption", sep_link, "http", sep_desc, "//example.com/"]]
        );
        unwrap!(&tree.children[0], Tree::Node(link));
        let parts = split_link(link);
        assert_eq!(parts.destination, "http://example.com/");
        assert!(!parts.is_image);
        assert_eq!(parts.caption.map(|c| c.len()), Some(1));
    }

    #[test]
    fn link_without_caption() {
        let tree = InlineParser::parse("[[FrontPage]]");
        unwrap!(&tree.children[0], Tree::Node(link));
        let parts = split_link(link);
        assert_eq!(parts.caption, None);
        assert_eq!(parts.destination, "FrontPage");
    }

    #[test]
    fn image_link() {
        let tree = InlineParser::parse("[[logo|/img/Logo.PNG]]");
        unwrap!(&tree.children[0], Tree::Node(link));
        assert!(split_link(link).is_image);
    }

    #[test]
    fn link_missing_destination() {
        let tree = InlineParser::parse("[[caption|]]");
        unwrap!(&tree.children[0], Tree::Node(link));
        let parts = split_link(link);
        assert!(!parts.has_destination());
        assert!(!parts.is_image);
    }

    #[test]
    fn emphasis_inside_link_caption() {
        let tree = InlineParser::parse("[[''big'' deal|page]]");
        assert_eq!(tree, inline_tree![link[em["big"], " deal", sep_link, "page"]]);
    }

    /// `''em '''strong'' text'''`: the `''` closes the emphasis, demoting the strong that it crosses.
    #[test]
    fn mismatched_close_demotes_intervening() {
        let tree = InlineParser::parse("''em '''strong'' text'''");
        assert_eq!(tree, inline_tree![em["em ", "'''", "strong"], " text", strong[]]);
        assert_eq!(tree.to_plain_text(), "em '''strong text");
    }

    #[test]
    fn demotion_crosses_several_spans() {
        let tree = InlineParser::parse("==a ''b [[c== d");
        assert_eq!(tree, inline_tree![del["a ", "''", "b ", "[[", "c"], " d"]);
    }

    #[test]
    fn unterminated_plugin_stays_open() {
        let tree = InlineParser::parse("before {{plugin");
        assert_eq!(tree, inline_tree!["before ", plugin["plugin"]]);
    }

    #[test]
    fn plugin_contents_are_opaque() {
        let tree = InlineParser::parse("{{anchor(top, ''x'')}}");
        assert_eq!(tree, inline_tree![plugin["anchor(top, ", "''", "x", "''", ")"]]);
    }

    #[test]
    fn literal_contents_are_opaque() {
        let tree = InlineParser::parse("``[[not a link]]``");
        assert_eq!(tree, inline_tree![literal["[[", "not a link", "]]"]]);
    }

    #[test]
    fn stray_tails_are_text() {
        let tree = InlineParser::parse("a]] b}}");
        assert_eq!(tree, inline_tree!["a", "]]", " b", "}}"]);
    }

    #[test]
    fn separators_outside_links() {
        let tree = InlineParser::parse("term:desc");
        assert_eq!(tree, inline_tree!["term", sep_desc, "desc"]);
        assert_eq!(tree.to_plain_text(), "term:desc");
    }

    #[test]
    fn all_characters_survive() {
        for line in [
            "''em '''strong'' text'''",
            "[[a|b",
            "==x ''y== z''",
            "{{co2}} and ``code`` and [[link]]",
            "''''''",
            "]] {{ ]] ``",
            "a:b||c|d",
        ] {
            let tree = InlineParser::parse(line);
            let source = tree.to_source();
            assert!(
                source.starts_with(line),
                "expected {source:?} to reproduce {line:?} (plus any unterminated tails)"
            );
        }
    }

    #[test]
    fn balanced_lines_round_trip() {
        for line in ["''a'' '''b''' ==c== ``d`` {{e}} [[f|g]]", "plain", "''x [[y|z]] x''"] {
            assert_eq!(InlineParser::parse(line).to_source(), line);
        }
    }

    #[test]
    fn desc_term_and_description() {
        let tree = InlineParser::parse("term:the ''desc'': more");
        let (term, desc) = split_desc(&tree);
        assert_eq!(plain_text_of(term), "term");
        assert_eq!(desc.map(plain_text_of), Some("the desc: more".to_string()));

        let tree = InlineParser::parse("only a term");
        assert_eq!(split_desc(&tree), (&tree.children[..], None));
    }

    #[test]
    fn empty_line() {
        assert_eq!(InlineParser::parse(""), inline_tree![]);
    }
}

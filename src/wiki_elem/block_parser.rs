use crate::wiki_elem::autolink::AutoLink;
use crate::wiki_elem::inline_parser::InlineParser;
use crate::wiki_elem::tree::*;
use derive_builder::Builder;
use std::mem;

/// Options that affect how raw lines become a [`BlockTree`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Builder)]
#[builder(default)]
pub struct ParseOptions {
    /// The autolink pass run over the lines before they're classified.
    pub auto_link: AutoLink,
}

/// Parses wiki markup into a [`BlockTree`].
///
/// The parser itself only holds configuration; each call to [`BlockParser::parse`] builds its tree from scratch, and
/// never modifies its input.
#[derive(Clone, Debug, Default)]
pub struct BlockParser {
    options: ParseOptions,
}

impl BlockParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parses a whole document. Line endings (`\n` or `\r\n`) are stripped.
    pub fn parse_str(&self, text: &str) -> BlockTree {
        let lines: Vec<&str> = text.lines().collect();
        self.parse(&lines)
    }

    pub fn parse<S: AsRef<str>>(&self, lines: &[S]) -> BlockTree {
        let lines = self.options.auto_link.apply_to_lines(lines);
        let mut builder = TreeBuilder::new();
        let mut lines = lines.iter();
        while let Some(line) = lines.next() {
            match classify(line) {
                Line::Leaf(leaf) => builder.push_leaf(leaf),
                Line::Blank => builder.end_block(),
                Line::Decorator(decorator) => builder.decorate(decorator),
                Line::VerbatimOpen(code_lang) => {
                    builder.open_verbatim_block(code_lang);
                    for raw in lines.by_ref() {
                        if raw.trim_end() == ">>>" {
                            break;
                        }
                        builder.push_verbatim_line(raw);
                    }
                    builder.close_verbatim_block();
                }
            }
        }
        builder.finish()
    }
}

/// Assembles already-built leaves into a tree, with the same nesting rules as parsing.
pub fn assemble(leaves: impl IntoIterator<Item = BlockLeaf>) -> BlockTree {
    let mut builder = TreeBuilder::new();
    for leaf in leaves {
        builder.push_leaf(leaf);
    }
    builder.finish()
}

/// A classified input line.
#[derive(Debug, PartialEq)]
enum Line {
    Leaf(BlockLeaf),
    /// A blank (or whitespace-only) line, which ends the current block.
    Blank,
    Decorator(Decorator),
    /// `<<<`, with its optional language word.
    VerbatimOpen(Option<String>),
}

#[derive(Debug, PartialEq)]
enum Decorator {
    Attrs(Decorators),
    Begin(String),
    End(String),
}

fn classify(line: &str) -> Line {
    if let Some(rest) = line.strip_prefix("<<<") {
        let lang = rest.trim();
        return Line::VerbatimOpen((!lang.is_empty()).then(|| lang.to_string()));
    }
    if line.trim().is_empty() {
        return Line::Blank;
    }
    if let Some(rest) = line.strip_prefix(':') {
        return Line::Leaf(inline_leaf(BlockKind::Desc, rest));
    }
    if line.starts_with([' ', '\t']) {
        // Both markers are one byte.
        return Line::Leaf(raw_leaf(BlockKind::Verbatim, &line[1..]));
    }
    if let Some(rest) = line.strip_prefix("\"\"") {
        return Line::Leaf(inline_leaf(BlockKind::Quote, rest));
    }
    if let Some(rest) = line.strip_prefix("||") {
        let rest = rest.trim_end();
        let rest = rest.strip_suffix("||").unwrap_or(rest);
        return Line::Leaf(inline_leaf(BlockKind::Table, rest));
    }
    if let Some(rest) = line.strip_prefix("//@") {
        return match parse_decorator(rest) {
            Some(decorator) => Line::Decorator(decorator),
            None => {
                log::warn!("unrecognized decorator, treating it as a comment: //@{rest}");
                Line::Leaf(raw_leaf(BlockKind::CommentOut, line))
            }
        };
    }
    if let Some(rest) = line.strip_prefix("//") {
        return Line::Leaf(raw_leaf(BlockKind::CommentOut, rest));
    }
    for (marker, kind) in [('!', BlockKind::Heading), ('*', BlockKind::List), ('#', BlockKind::Enum)] {
        if line.starts_with(marker) {
            return Line::Leaf(leveled_leaf(kind, marker, line));
        }
    }
    if line.trim_end() == "----" {
        return Line::Leaf(BlockLeaf {
            kind: BlockKind::Hr,
            level: None,
            node_id: None,
            content: LeafContent::Empty,
        });
    }
    Line::Leaf(inline_leaf(BlockKind::Paragraph, line))
}

fn inline_leaf(kind: BlockKind, content: &str) -> BlockLeaf {
    BlockLeaf {
        kind,
        level: None,
        node_id: None,
        content: LeafContent::Inline(InlineParser::parse(content)),
    }
}

fn raw_leaf(kind: BlockKind, content: &str) -> BlockLeaf {
    BlockLeaf {
        kind,
        level: None,
        node_id: None,
        content: LeafContent::Raw(content.to_string()),
    }
}

fn leveled_leaf(kind: BlockKind, marker: char, line: &str) -> BlockLeaf {
    let content = line.trim_start_matches(marker);
    // The marker is ASCII, so the byte count is the char count.
    let level = (line.len() - content.len()) as u32;
    let (node_id, content) = split_node_id(content.trim_start());
    BlockLeaf {
        kind,
        level: Some(level),
        node_id,
        content: LeafContent::Inline(InlineParser::parse(content)),
    }
}

/// Splits an `[id]` prefix off of a leveled leaf's content. A `[[` is a link, not an id.
fn split_node_id(content: &str) -> (Option<String>, &str) {
    if content.starts_with("[[") {
        return (None, content);
    }
    let Some(rest) = content.strip_prefix('[') else {
        return (None, content);
    };
    match rest.split_once(']') {
        Some((id, after)) if !id.is_empty() && !id.contains(char::is_whitespace) => {
            (Some(id.to_string()), after.trim_start())
        }
        _ => (None, content),
    }
}

/// Parses the text after `//@`: `class[x]`, `id[x]`, `code[x]`, `begin[x]`, `end[x]` or `summary: text`.
fn parse_decorator(text: &str) -> Option<Decorator> {
    let name_end = text.find(|c: char| !c.is_ascii_alphanumeric() && c != '_').unwrap_or(text.len());
    let (name, rest) = text.split_at(name_end);
    let rest = rest.trim_end();
    let arg = if let Some(bracketed) = rest.strip_prefix('[') {
        bracketed.strip_suffix(']')?.trim()
    } else if let Some(after_colon) = rest.strip_prefix(':') {
        after_colon.trim()
    } else {
        return None;
    };
    let arg = arg.to_string();
    let mut attrs = Decorators::default();
    match name {
        "class" => attrs.class = Some(arg),
        "id" => attrs.id = Some(arg),
        "summary" => attrs.summary = Some(arg),
        "code" => attrs.code_lang = Some(arg),
        "begin" => return Some(Decorator::Begin(arg)),
        "end" => return Some(Decorator::End(arg)),
        _ => return None,
    }
    Some(Decorator::Attrs(attrs))
}

/// The stack machine that assembles leaves into nodes.
///
/// `stack[0]` is the document root and is never popped. Every other entry is a node that's still accepting children;
/// popping it attaches it to the entry below.
struct TreeBuilder {
    stack: Vec<BlockTree>,
    pending_decorators: Decorators,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![BlockTree::document()],
            pending_decorators: Decorators::default(),
        }
    }

    fn top(&mut self) -> &mut BlockTree {
        self.stack.last_mut().expect("block stack always has a root")
    }

    fn pop(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(closed) = self.stack.pop() else {
            return;
        };
        self.top().push_node(closed);
    }

    fn pop_while_breakable(&mut self, breaker: Option<&BlockLeaf>) {
        while self.stack.last().is_some_and(|top| is_breakable(top, breaker)) {
            self.pop();
        }
    }

    fn push_leaf(&mut self, mut leaf: BlockLeaf) {
        self.pop_while_breakable(Some(&leaf));

        let top = self.top();
        let continues_top = leaf.kind != BlockKind::Heading
            && top.block_kind() == Some(leaf.kind)
            && top.level() == leaf.level;
        // Decorators always start a new block; they never apply to one that's already open.
        let decorated = !self.pending_decorators.is_empty();
        if continues_top && decorated {
            self.pop();
        }
        if !continues_top || decorated {
            let mut node = BlockTree::block(leaf.kind, leaf.level);
            if leaf.kind == BlockKind::Heading {
                node.data.node_id = leaf.node_id.take();
            }
            self.stack.push(node);
        }
        let decorators = mem::take(&mut self.pending_decorators);
        let top = self.top();
        top.data.decorators.merge(decorators);
        top.push_leaf(leaf);
    }

    fn end_block(&mut self) {
        self.pop_while_breakable(None);
    }

    fn decorate(&mut self, decorator: Decorator) {
        match decorator {
            Decorator::Attrs(attrs) => self.pending_decorators.merge(attrs),
            Decorator::Begin(name) => log::debug!("ignoring section begin decorator: {name}"),
            Decorator::End(name) => log::debug!("ignoring section end decorator: {name}"),
        }
    }

    fn open_verbatim_block(&mut self, code_lang: Option<String>) {
        let verbatim_leaf = BlockLeaf {
            kind: BlockKind::Verbatim,
            level: None,
            node_id: None,
            content: LeafContent::Empty,
        };
        // A block never continues a previous verbatim node, even though a verbatim leaf wouldn't break one.
        while self
            .stack
            .last()
            .is_some_and(|top| is_breakable(top, Some(&verbatim_leaf)) || top.block_kind() == Some(BlockKind::Verbatim))
        {
            self.pop();
        }
        let mut node = BlockTree::block(BlockKind::Verbatim, None);
        node.data.decorators.code_lang = code_lang;
        node.data.decorators.merge(mem::take(&mut self.pending_decorators));
        self.stack.push(node);
    }

    fn push_verbatim_line(&mut self, line: &str) {
        self.top().push_leaf(raw_leaf(BlockKind::Verbatim, line));
    }

    fn close_verbatim_block(&mut self) {
        self.pop();
    }

    fn finish(mut self) -> BlockTree {
        if !self.pending_decorators.is_empty() {
            log::debug!("dropping decorators at end of document: {:?}", self.pending_decorators);
        }
        while self.stack.len() > 1 {
            self.pop();
        }
        self.stack.pop().unwrap_or_else(BlockTree::document)
    }
}

/// Whether `node` has to be closed before `breaker` can be attached. A `None` breaker is a blank line.
fn is_breakable(node: &BlockTree, breaker: Option<&BlockLeaf>) -> bool {
    let Some(kind) = node.block_kind() else {
        return false;
    };
    let level = node.level().unwrap_or(1);
    match kind {
        BlockKind::Heading => breaker.is_some_and(|leaf| leaf.kind == BlockKind::Heading && level >= leaf.level_or_1()),
        BlockKind::List | BlockKind::Enum => match breaker {
            None => true,
            Some(leaf) if !leaf.kind.is_list_type() => true,
            Some(leaf) => {
                let breaker_level = leaf.level_or_1();
                breaker_level < level || (breaker_level == level && leaf.kind != kind)
            }
        },
        _ => breaker.map_or(true, |leaf| leaf.kind != kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::utils_for_test::*;
    use crate::wiki_elem::{block_outline, inline_tree};
    use indoc::indoc;

    fn check(wiki: &str, expect: &str) {
        let tree = BlockParser::new().parse_str(wiki);
        assert_eq!(block_outline(&tree), expect);
    }

    #[test]
    fn empty_input() {
        let tree = BlockParser::new().parse_str("");
        assert_eq!(tree, BlockTree::document());
        let no_lines: [&str; 0] = [];
        assert!(BlockParser::new().parse(&no_lines).is_empty());
    }

    #[test]
    fn heading_then_paragraph() {
        check(
            "!heading\n\nparagraph text.\n",
            indoc! {r#"
                Heading 1
                  - heading
                  Paragraph
                    - paragraph text.
            "#},
        );
    }

    #[test]
    fn nested_list() {
        check(
            "*item1\n**item2\n*item3\n",
            indoc! {r#"
                List 1
                  - item1
                  List 2
                    - item2
                  - item3
            "#},
        );
    }

    #[test]
    fn heading_nesting() {
        check(
            indoc! {r#"
                !one
                !!two
                !!!three
                !!two again
                !one again"#},
            indoc! {r#"
                Heading 1
                  - one
                  Heading 2
                    - two
                    Heading 3
                      - three
                  Heading 2
                    - two again
                Heading 1
                  - one again
            "#},
        );
    }

    #[test]
    fn heading_survives_blank_lines_and_other_blocks() {
        check(
            indoc! {r#"
                !top

                para
                *item

                ""quoted"#},
            indoc! {r#"
                Heading 1
                  - top
                  Paragraph
                    - para
                  List 1
                    - item
                  Quote
                    - quoted
            "#},
        );
    }

    #[test]
    fn deeper_heading_first() {
        check(
            "!!!deep\n!shallow",
            indoc! {r#"
                Heading 3
                  - deep
                Heading 1
                  - shallow
            "#},
        );
    }

    #[test]
    fn list_pops_several_levels() {
        check(
            indoc! {r#"
                *a
                **b
                ***c
                ***d
                *e"#},
            indoc! {r#"
                List 1
                  - a
                  List 2
                    - b
                    List 3
                      - c
                      - d
                  - e
            "#},
        );
    }

    #[test]
    fn list_family_switch_at_same_level() {
        check(
            "*bullet\n#number\n##sub\n*bullet again",
            indoc! {r#"
                List 1
                  - bullet
                Enum 1
                  - number
                  Enum 2
                    - sub
                List 1
                  - bullet again
            "#},
        );
    }

    #[test]
    fn list_skips_a_level() {
        check(
            "*a\n***c\n*b",
            indoc! {r#"
                List 1
                  - a
                  List 3
                    - c
                  - b
            "#},
        );
    }

    #[test]
    fn bullet_then_enum_at_same_level() {
        check(
            "*a\n#b",
            indoc! {r#"
                List 1
                  - a
                Enum 1
                  - b
            "#},
        );
    }

    #[test]
    fn enum_nested_in_list() {
        check(
            "*bullet\n##number",
            indoc! {r#"
                List 1
                  - bullet
                  Enum 2
                    - number
            "#},
        );
    }

    #[test]
    fn list_broken_by_paragraph_and_blank() {
        check(
            "*a\ntext\n*b\n\n*c",
            indoc! {r#"
                List 1
                  - a
                Paragraph
                  - text
                List 1
                  - b
                List 1
                  - c
            "#},
        );
    }

    #[test]
    fn paragraph_lines_merge() {
        check(
            "one\ntwo\n\nthree",
            indoc! {r#"
                Paragraph
                  - one
                  - two
                Paragraph
                  - three
            "#},
        );
    }

    #[test]
    fn simple_kinds_break_each_other() {
        check(
            indoc! {r#"
                ""quote
                :term:desc
                ||a||b||
                //comment
                ----
                para"#},
            indoc! {r#"
                Quote
                  - quote
                Desc
                  - term:desc
                Table
                  - a||b
                CommentOut
                  - comment
                Hr
                  -
                Paragraph
                  - para
            "#},
        );
    }

    #[test]
    fn table_row_separators() {
        let tree = BlockParser::new().parse_str("||!h1||!h2\n||a||b||");
        unwrap!(&tree.children[0], Tree::Node(table));
        assert_eq!(table.block_kind(), Some(BlockKind::Table));
        unwrap!(&table.children[1], Tree::Leaf(row));
        unwrap!(row.data.inline(), Some(inline));
        assert_eq!(inline, &inline_tree!["a", sep_table, "b"]);
    }

    #[test]
    fn verbatim_lines() {
        check(
            " code\n\tmore\n  indented\n",
            indoc! {r#"
                Verbatim
                  - code
                  - more
                  -  indented
            "#},
        );
    }

    #[test]
    fn verbatim_block_keeps_blank_lines_and_markup() {
        check(
            indoc! {r#"
                <<< ruby
                !not a heading

                ''not em''
                >>>
                after"#},
            indoc! {r#"
                Verbatim lang=ruby
                  - !not a heading
                  -
                  - ''not em''
                Paragraph
                  - after
            "#},
        );
    }

    #[test]
    fn verbatim_block_runs_to_end_of_input() {
        check(
            "para\n<<<\nline\n",
            indoc! {r#"
                Paragraph
                  - para
                Verbatim
                  - line
            "#},
        );
    }

    #[test]
    fn verbatim_block_never_continues_verbatim_lines() {
        check(
            " one\n<<<\ntwo\n>>>",
            indoc! {r#"
                Verbatim
                  - one
                Verbatim
                  - two
            "#},
        );
    }

    #[test]
    fn verbatim_block_inside_section_and_list() {
        check(
            "!sec\n*item\n<<<\ncode\n>>>",
            indoc! {r#"
                Heading 1
                  - sec
                  List 1
                    - item
                  Verbatim
                    - code
            "#},
        );
    }

    #[test]
    fn node_ids() {
        check(
            "![intro] Introduction\n*[first] item\n#[[link]]",
            indoc! {r#"
                Heading 1 #intro
                  - Introduction
                  List 1
                    - [first] item
                  Enum 1
                    - [[link]]
            "#},
        );
    }

    #[test]
    fn node_id_needs_closing_bracket() {
        check(
            "![oops heading",
            indoc! {r#"
                Heading 1
                  - [oops heading
            "#},
        );
    }

    #[test]
    fn decorators_attach_to_next_node() {
        check(
            indoc! {r#"
                //@class[note]
                //@summary: the summary
                ||a||b
                //@begin[side]
                //@id[p1]
                para
                //@end[side]
                //@code[rust]
                <<<
                fn main() {}
                >>>"#},
            indoc! {r#"
                Table class=note summary=the summary
                  - a||b
                Paragraph id=p1
                  - para
                Verbatim lang=rust
                  - fn main() {}
            "#},
        );
    }

    #[test]
    fn decorators_start_a_new_block() {
        check(
            "para1\n//@class[x]\npara2\n*a\n//@id[l2]\n*b",
            indoc! {r#"
                Paragraph
                  - para1
                Paragraph class=x
                  - para2
                List 1
                  - a
                List 1 id=l2
                  - b
            "#},
        );
    }

    #[test]
    fn unknown_decorator_is_a_comment() {
        check(
            "//@frobnicate[x]",
            indoc! {r#"
                CommentOut
                  - //@frobnicate[x]
            "#},
        );
    }

    #[test]
    fn whitespace_only_line_is_blank() {
        check(
            "one\n   \ntwo",
            indoc! {r#"
                Paragraph
                  - one
                Paragraph
                  - two
            "#},
        );
    }

    #[test]
    fn hr_allows_trailing_whitespace_only() {
        check(
            "----  \n-----",
            indoc! {r#"
                Hr
                  -
                Paragraph
                  - -----
            "#},
        );
    }

    #[test]
    fn crlf_line_endings() {
        check(
            "!title\r\ntext\r\n",
            indoc! {r#"
                Heading 1
                  - title
                  Paragraph
                    - text
            "#},
        );
    }

    #[test]
    fn depths_follow_nesting() {
        let tree = BlockParser::new().parse_str("!a\n*b\n**c");
        unwrap!(&tree.children[0], Tree::Node(heading));
        assert_eq!(heading.depth, 1);
        unwrap!(&heading.children[1], Tree::Node(list));
        assert_eq!(list.depth, 2);
        unwrap!(&list.children[1], Tree::Node(sub_list));
        assert_eq!(sub_list.depth, 3);
        assert_eq!(sub_list.children[0].depth(), 4);
    }

    #[test]
    fn autolink_runs_before_parsing() {
        let options = ParseOptionsBuilder::default().auto_link(AutoLink::Url).build().unwrap();
        let tree = BlockParser::with_options(options).parse_str("see http://example.com\n http://verbatim.example");
        assert_eq!(
            block_outline(&tree),
            indoc! {r#"
                Paragraph
                  - see [[http://example.com]]
                Verbatim
                  - http://verbatim.example
            "#}
        );
    }

    #[test]
    fn parsing_does_not_depend_on_previous_calls() {
        let parser = BlockParser::new();
        let first = parser.parse_str("*a\n**b");
        let second = parser.parse_str("*a\n**b");
        assert_eq!(first, second);
    }
}

#[cfg(test)]
pub(crate) use test_utils::*;

#[cfg(test)]
mod test_utils {
    use crate::wiki_elem::*;
    use std::fmt::Write;

    /// Builds a `Vec<InlineElem>`, like `inline_elems!["text", sep_link, em["inner"], link["a", sep_link, "b"]]`.
    macro_rules! inline_elems {
        // Empty case
        [] => {
            Vec::<crate::wiki_elem::InlineElem>::new()
        };

        // String literal (optionally followed by more content)
        [$text:literal $(, $($rest:tt)*)?] => {
            {
                #[allow(unused_mut)]
                let mut result = vec![crate::wiki_elem::InlineElem::Leaf(crate::wiki_elem::Leaf::new(
                    crate::wiki_elem::InlineToken::text($text),
                ))];
                $(result.extend(crate::wiki_elem::inline_elems![$($rest)*]);)?
                result
            }
        };

        // Separators
        [sep_link $(, $($rest:tt)*)?] => {
            crate::wiki_elem::inline_elems!(@sep Link $(, $($rest)*)?)
        };
        [sep_table $(, $($rest:tt)*)?] => {
            crate::wiki_elem::inline_elems!(@sep Table $(, $($rest)*)?)
        };
        [sep_desc $(, $($rest:tt)*)?] => {
            crate::wiki_elem::inline_elems!(@sep Desc $(, $($rest)*)?)
        };
        (@sep $which:ident $(, $($rest:tt)*)?) => {
            {
                #[allow(unused_mut)]
                let mut result = vec![crate::wiki_elem::InlineElem::Leaf(crate::wiki_elem::Leaf::new(
                    crate::wiki_elem::InlineToken::Sep(crate::wiki_elem::Separator::$which),
                ))];
                $(result.extend(crate::wiki_elem::inline_elems![$($rest)*]);)?
                result
            }
        };

        // Spans, like `em[...]` (optionally followed by more content)
        [$span:ident[$($content:tt)*] $(, $($rest:tt)*)?] => {
            {
                let mut node = crate::wiki_elem::InlineTree::inline(crate::wiki_elem::inline_kind!($span));
                for child in crate::wiki_elem::inline_elems![$($content)*] {
                    node.push(child);
                }
                #[allow(unused_mut)]
                let mut result = vec![crate::wiki_elem::InlineElem::Node(node)];
                $(result.extend(crate::wiki_elem::inline_elems![$($rest)*]);)?
                result
            }
        };
    }
    pub(crate) use inline_elems;

    macro_rules! inline_kind {
        (link) => {
            crate::wiki_elem::InlineKind::Link
        };
        (em) => {
            crate::wiki_elem::InlineKind::Em
        };
        (strong) => {
            crate::wiki_elem::InlineKind::Strong
        };
        (del) => {
            crate::wiki_elem::InlineKind::Del
        };
        (literal) => {
            crate::wiki_elem::InlineKind::Literal
        };
        (plugin) => {
            crate::wiki_elem::InlineKind::Plugin
        };
    }
    pub(crate) use inline_kind;

    /// Builds a whole inline tree: a [`InlineKind::Plain`] root holding [`inline_elems!`].
    macro_rules! inline_tree {
        [$($content:tt)*] => {
            {
                let mut root = crate::wiki_elem::InlineTree::inline(crate::wiki_elem::InlineKind::Plain);
                for child in crate::wiki_elem::inline_elems![$($content)*] {
                    root.push(child);
                }
                root
            }
        };
    }
    pub(crate) use inline_tree;

    /// Renders a block tree as an indented outline, for compact test expectations.
    ///
    /// Each node is a line like `Heading 1 #intro class=note`, and each leaf is a `- ` line with its content as source
    /// text. Children are indented two spaces under their parent. The document root itself isn't shown.
    pub fn block_outline(tree: &BlockTree) -> String {
        let mut out = String::new();
        for child in &tree.children {
            write_outline(&mut out, child);
        }
        out
    }

    fn write_outline(out: &mut String, elem: &BlockElem) {
        out.push_str(&"  ".repeat(elem.depth().saturating_sub(1)));
        match elem {
            Tree::Node(node) => {
                match node.data.kind {
                    NodeKind::Document => out.push_str("Document"),
                    NodeKind::Block(kind) => write!(out, "{kind:?}").unwrap(),
                }
                if let Some(level) = node.data.level {
                    write!(out, " {level}").unwrap();
                }
                if let Some(id) = &node.data.node_id {
                    write!(out, " #{id}").unwrap();
                }
                let decorators = &node.data.decorators;
                for (name, value) in [
                    ("class", &decorators.class),
                    ("id", &decorators.id),
                    ("summary", &decorators.summary),
                    ("lang", &decorators.code_lang),
                ] {
                    if let Some(value) = value {
                        write!(out, " {name}={value}").unwrap();
                    }
                }
                out.push('\n');
                for child in &node.children {
                    write_outline(out, child);
                }
            }
            Tree::Leaf(leaf) => {
                out.push('-');
                let text = match &leaf.data.content {
                    LeafContent::Inline(inline) => inline.to_source(),
                    LeafContent::Raw(raw) => raw.clone(),
                    LeafContent::Empty => String::new(),
                };
                if let Some(id) = &leaf.data.node_id {
                    write!(out, " [{id}]").unwrap();
                }
                if !text.is_empty() {
                    out.push(' ');
                    out.push_str(&text);
                }
                out.push('\n');
            }
        }
    }
}

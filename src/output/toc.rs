use crate::wiki_elem::*;
use std::ops::RangeInclusive;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocOptions {
    /// The heading levels to include. The first level in the range becomes the top level of the list.
    pub levels: RangeInclusive<u32>,
}

impl Default for TocOptions {
    fn default() -> Self {
        Self { levels: 2..=3 }
    }
}

/// Builds a table of contents for `tree`: a nested list of links to every heading that has an id and a level in
/// range, in document order.
///
/// The result is an ordinary block tree, so any formatter can render it. `tree` isn't modified; the headings' text
/// gets copied into the links.
pub fn build(tree: &BlockTree, options: &TocOptions) -> BlockTree {
    let mut entries = Vec::new();
    collect_entries(tree, options, &mut entries);
    assemble(entries)
}

fn collect_entries(node: &BlockTree, options: &TocOptions, out: &mut Vec<BlockLeaf>) {
    for child in &node.children {
        let Tree::Node(child) = child else {
            continue;
        };
        if child.block_kind() == Some(BlockKind::Heading) {
            if let Some(entry) = toc_entry(child, options) {
                out.push(entry);
            }
        }
        collect_entries(child, options, out);
    }
}

fn toc_entry(heading: &BlockTree, options: &TocOptions) -> Option<BlockLeaf> {
    let id = heading.data.node_id.as_ref()?;
    let level = heading.level()?;
    if !options.levels.contains(&level) {
        return None;
    }
    let caption = heading.children.iter().find_map(|child| match child {
        Tree::Leaf(leaf) if leaf.data.kind == BlockKind::Heading => leaf.data.inline(),
        _ => None,
    });

    // A bare `|` in the heading text must stay caption text, not become the link's separator.
    let mut link = InlineTree::inline(InlineKind::Link);
    if let Some(caption) = caption {
        for elem in &caption.children {
            match elem {
                Tree::Leaf(Leaf {
                    data: InlineToken::Sep(Separator::Link),
                    ..
                }) => link.push_text("|"),
                _ => link.push(elem.clone()),
            }
        }
    }
    link.push_leaf(InlineToken::Sep(Separator::Link));
    link.push_text(format!("#{id}"));
    let mut content = InlineTree::inline(InlineKind::Plain);
    content.push_node(link);

    Some(BlockLeaf {
        kind: BlockKind::List,
        level: Some(level - options.levels.start() + 1),
        node_id: None,
        content: LeafContent::Inline(content),
    })
}

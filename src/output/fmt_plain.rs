use crate::output::table_grid::{parse_rows, Grid, GridSlot, MalformedPolicy};
use crate::output::{DispatchTable, FnFormatter, Format, FormatError, FormatOptions, OnBlockLeaf, OnBlockNode, OnInlineNode};
use crate::plugin;
use crate::util::str_utils::prefix_lines;
use crate::wiki_elem::*;
use derive_builder::Builder;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash, Builder)]
#[builder(default)]
pub struct PlainOptions {
    /// Keep link destinations and show deleted text, instead of dropping them.
    pub verbose: bool,
    /// Fail on tables whose rows don't fit the grid, instead of skipping the extra cells.
    pub strict: bool,
}

/// Writes plain text: one line per leaf, with lists marked and indented, and tables as tab-separated grids.
#[derive(Clone)]
pub struct PlainFormatter {
    options: PlainOptions,
    table: DispatchTable<PlainFormatter>,
}

type Rendered = Result<String, FormatError>;

impl PlainFormatter {
    pub fn new(options: PlainOptions) -> Self {
        let table = if options.verbose {
            verbose_table()
        } else {
            base_table()
        };
        Self { options, table }
    }

    pub fn options(&self) -> &PlainOptions {
        &self.options
    }

    fn text_of(&self, elems: &[InlineElem]) -> Rendered {
        let mut out = String::new();
        for elem in elems {
            out.push_str(&self.visited_result(elem.into())?);
        }
        Ok(out)
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new(PlainOptions::default())
    }
}

impl Format for PlainFormatter {
    type Rendered = String;

    fn table(&self) -> &DispatchTable<Self> {
        &self.table
    }

    fn serialize(&self, rendered: String) -> String {
        let trimmed = rendered.trim_end_matches('\n');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}\n")
        }
    }

    /// Ignores the options, since plain text has no links to add.
    fn apply_options(&mut self, _options: &FormatOptions) {}
}

fn base_table() -> DispatchTable<PlainFormatter> {
    use BlockKind::*;
    DispatchTable::new(FnFormatter(concat_children))
        .with_all(
            [
                ElemTag::Document,
                ElemTag::BlockNode(Heading),
                ElemTag::BlockNode(Paragraph),
                ElemTag::BlockNode(Desc),
                ElemTag::BlockNode(Verbatim),
                ElemTag::BlockNode(Hr),
            ],
            OnBlockNode(blocks),
        )
        .with_all([ElemTag::BlockNode(List), ElemTag::BlockNode(Enum)], OnBlockNode(list))
        .with(ElemTag::BlockNode(Quote), OnBlockNode(quote))
        .with(ElemTag::BlockNode(Table), OnBlockNode(table))
        .with_all(
            [ElemTag::BlockNode(CommentOut), ElemTag::BlockLeaf(CommentOut)],
            FnFormatter(nothing),
        )
        .with(ElemTag::BlockLeaf(Verbatim), OnBlockLeaf(raw_line))
        .with(ElemTag::BlockLeaf(Desc), OnBlockLeaf(desc_entry))
        .with(ElemTag::BlockLeaf(Hr), OnBlockLeaf(hr))
        .with(ElemTag::InlineLeaf, FnFormatter(inline_text))
        .with(ElemTag::InlineNode(InlineKind::Literal), OnInlineNode(literal))
        .with(ElemTag::InlineNode(InlineKind::Del), FnFormatter(nothing))
        .with(ElemTag::InlineNode(InlineKind::Link), OnInlineNode(link))
        .with(ElemTag::InlineNode(InlineKind::Plugin), OnInlineNode(plugin_call))
}

fn verbose_table() -> DispatchTable<PlainFormatter> {
    base_table()
        .with(ElemTag::InlineNode(InlineKind::Del), OnInlineNode(verbose_del))
        .with(ElemTag::InlineNode(InlineKind::Link), OnInlineNode(verbose_link))
}

fn concat_children(elem: ElemRef<'_>, fmt: &PlainFormatter) -> Rendered {
    Ok(fmt.visit_children(elem)?.concat())
}

fn nothing(_: ElemRef<'_>, _: &PlainFormatter) -> Rendered {
    Ok(String::new())
}

/// Joins a container's children: consecutive leaves are lines of one block, and anything next to a node is separated
/// by a blank line.
fn blocks(node: &BlockTree, fmt: &PlainFormatter) -> Rendered {
    let mut out = String::new();
    let mut previous_was_leaf = None;
    for child in &node.children {
        let rendered = fmt.visited_result(child.into())?;
        if rendered.is_empty() {
            continue;
        }
        let is_leaf = matches!(child, Tree::Leaf(_));
        if let Some(previous_was_leaf) = previous_was_leaf {
            out.push_str(if previous_was_leaf && is_leaf { "\n" } else { "\n\n" });
        }
        out.push_str(&rendered);
        previous_was_leaf = Some(is_leaf);
    }
    Ok(out)
}

/// Items are indented two spaces per level. Enum items are numbered within their own list.
fn list(node: &BlockTree, fmt: &PlainFormatter) -> Rendered {
    let mut lines = Vec::with_capacity(node.children.len());
    let mut number = 0;
    for child in &node.children {
        let rendered = fmt.visited_result(child.into())?;
        match child {
            Tree::Leaf(leaf) => {
                number += 1;
                let indent = "  ".repeat(leaf.data.level_or_1().saturating_sub(1) as usize);
                let marker = match leaf.data.kind {
                    BlockKind::Enum => format!("{number}. "),
                    _ => "* ".to_string(),
                };
                lines.push(format!("{indent}{marker}{rendered}"));
            }
            Tree::Node(_) if !rendered.is_empty() => lines.push(rendered),
            Tree::Node(_) => {}
        }
    }
    Ok(lines.join("\n"))
}

fn quote(node: &BlockTree, fmt: &PlainFormatter) -> Rendered {
    Ok(prefix_lines(&blocks(node, fmt)?, "  "))
}

fn table(node: &BlockTree, fmt: &PlainFormatter) -> Rendered {
    let rows = parse_rows(node);
    let policy = if fmt.options.strict {
        MalformedPolicy::Fail
    } else {
        MalformedPolicy::Warn
    };
    let grid = Grid::layout(&rows, policy)?;
    let mut lines = Vec::with_capacity(grid.rows.len());
    for row in &grid.rows {
        let mut cells = Vec::with_capacity(grid.columns);
        for slot in row {
            cells.push(match slot {
                GridSlot::Cell(cell) => fmt.visited_result(ElemRef::Inline(&cell.content))?.trim().to_string(),
                GridSlot::ColSpan => "==".to_string(),
                GridSlot::RowSpan => "||".to_string(),
                GridSlot::Empty => String::new(),
            });
        }
        lines.push(cells.join("\t"));
    }
    Ok(lines.join("\n"))
}

fn raw_line(leaf: &BlockLeaf, _: &PlainFormatter) -> Rendered {
    match &leaf.content {
        LeafContent::Raw(text) => Ok(text.clone()),
        LeafContent::Inline(inline) => Ok(inline.to_plain_text()),
        LeafContent::Empty => Ok(String::new()),
    }
}

fn desc_entry(leaf: &BlockLeaf, fmt: &PlainFormatter) -> Rendered {
    let Some(inline) = leaf.inline() else {
        return Ok(String::new());
    };
    let (term, description) = split_desc(inline);
    let mut out = fmt.text_of(term)?;
    if let Some(description) = description {
        out.push_str(":\t");
        out.push_str(&fmt.text_of(description)?);
    }
    Ok(out)
}

fn hr(_: &BlockLeaf, _: &PlainFormatter) -> Rendered {
    Ok("----".to_string())
}

fn inline_text(elem: ElemRef<'_>, _: &PlainFormatter) -> Rendered {
    match elem {
        ElemRef::InlineLeaf(token) => Ok(token.as_str().to_string()),
        _ => Ok(String::new()),
    }
}

fn literal(node: &InlineTree, _: &PlainFormatter) -> Rendered {
    Ok(node.to_source())
}

fn link(node: &InlineTree, fmt: &PlainFormatter) -> Rendered {
    let parts = split_link(node);
    match parts.caption {
        Some(caption) if !caption.is_empty() => fmt.text_of(caption),
        _ => Ok(parts.destination),
    }
}

fn verbose_link(node: &InlineTree, fmt: &PlainFormatter) -> Rendered {
    let parts = split_link(node);
    match parts.caption {
        Some(caption) if !caption.is_empty() && parts.has_destination() => {
            Ok(format!("{} ({})", fmt.text_of(caption)?, parts.destination))
        }
        Some(caption) if !caption.is_empty() => fmt.text_of(caption),
        _ => Ok(parts.destination),
    }
}

fn verbose_del(node: &InlineTree, fmt: &PlainFormatter) -> Rendered {
    Ok(format!("[deleted:{}]", fmt.text_of(&node.children)?))
}

fn plugin_call(node: &InlineTree, _: &PlainFormatter) -> Rendered {
    Ok(plugin::to_plain_text(&plugin::apply(&node.to_source())))
}

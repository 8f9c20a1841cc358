use crate::output::fmt_html::HtmlFormatter;
use crate::output::html::{escape, Dialect};
use crate::output::table_grid::{is_pipe_conformant, parse_rows, Grid, GridSlot, MalformedPolicy};
use crate::output::{DispatchTable, FnFormatter, Format, FormatError, FormatOptions, OnBlockLeaf, OnBlockNode, OnInlineNode};
use crate::util::str_utils::{hanging_indent, join_non_empty, pad_to, prefix_lines};
use crate::wiki_elem::*;
use derive_builder::Builder;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash, Builder)]
#[builder(default)]
pub struct MdWriterOptions {
    /// Write GitHub-Flavored Markdown: `~~strikethrough~~` and pipe tables.
    pub gfm: bool,
    /// Fail on GFM tables that can't be pipe tables, instead of embedding them as HTML.
    pub strict: bool,
    /// Write every GFM table as a pipe table, leaving spanned positions empty.
    pub force_pipe_tables: bool,
}

/// Writes Markdown. Anything Markdown has no syntax for (definition lists, tables outside of GFM, plugin markup) is
/// embedded as XHTML.
#[derive(Clone)]
pub struct MdFormatter {
    options: MdWriterOptions,
    html: HtmlFormatter,
    table: DispatchTable<MdFormatter>,
}

type Rendered = Result<String, FormatError>;

impl MdFormatter {
    pub fn new(options: MdWriterOptions) -> Self {
        let table = if options.gfm { gfm_table() } else { base_table() };
        Self {
            options,
            html: HtmlFormatter::new(Dialect::Xhtml),
            table,
        }
    }

    pub fn options(&self) -> &MdWriterOptions {
        &self.options
    }

    fn text_of(&self, elems: &[InlineElem]) -> Rendered {
        let mut out = String::new();
        for elem in elems {
            out.push_str(&self.visited_result(elem.into())?);
        }
        Ok(out)
    }

    fn embedded_html(&self, elem: ElemRef<'_>) -> Rendered {
        let nodes = self.html.visited_result(elem)?;
        Ok(self.html.serialize(nodes).trim_end().to_string())
    }
}

impl Default for MdFormatter {
    fn default() -> Self {
        Self::new(MdWriterOptions::default())
    }
}

impl Format for MdFormatter {
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

    /// Ignores the options: verbatim text becomes fenced code, which can't hold links, and the embedded HTML never
    /// contains verbatim text.
    fn apply_options(&mut self, _options: &FormatOptions) {}
}

fn base_table() -> DispatchTable<MdFormatter> {
    use BlockKind::*;
    DispatchTable::new(FnFormatter(concat_children))
        .with_all(
            [
                ElemTag::Document,
                ElemTag::BlockNode(Hr),
            ],
            OnBlockNode(blocks),
        )
        .with(ElemTag::BlockNode(Heading), OnBlockNode(section))
        .with(ElemTag::BlockLeaf(Heading), OnBlockLeaf(heading))
        .with(ElemTag::BlockNode(Paragraph), OnBlockNode(lines))
        .with(ElemTag::BlockNode(Quote), OnBlockNode(quote))
        .with_all([ElemTag::BlockNode(List), ElemTag::BlockNode(Enum)], OnBlockNode(list))
        .with(ElemTag::BlockNode(Verbatim), OnBlockNode(fenced))
        .with_all(
            [ElemTag::BlockNode(Desc), ElemTag::BlockNode(Table)],
            FnFormatter(embedded_html),
        )
        .with_all(
            [ElemTag::BlockNode(CommentOut), ElemTag::BlockLeaf(CommentOut)],
            FnFormatter(nothing),
        )
        .with(ElemTag::BlockLeaf(Verbatim), OnBlockLeaf(raw_line))
        .with(ElemTag::BlockLeaf(Hr), OnBlockLeaf(hr))
        .with(ElemTag::InlineLeaf, FnFormatter(inline_text))
        .with(ElemTag::InlineNode(InlineKind::Em), OnInlineNode(em))
        .with(ElemTag::InlineNode(InlineKind::Strong), OnInlineNode(strong))
        .with(ElemTag::InlineNode(InlineKind::Del), FnFormatter(embedded_html))
        .with(ElemTag::InlineNode(InlineKind::Literal), OnInlineNode(literal))
        .with(ElemTag::InlineNode(InlineKind::Link), OnInlineNode(link))
        .with(ElemTag::InlineNode(InlineKind::Plugin), FnFormatter(embedded_html))
}

fn gfm_table() -> DispatchTable<MdFormatter> {
    base_table()
        .with(ElemTag::BlockNode(BlockKind::Table), OnBlockNode(pipe_table))
        .with(ElemTag::InlineNode(InlineKind::Del), OnInlineNode(strikethrough))
}

fn concat_children(elem: ElemRef<'_>, fmt: &MdFormatter) -> Rendered {
    Ok(fmt.visit_children(elem)?.concat())
}

fn nothing(_: ElemRef<'_>, _: &MdFormatter) -> Rendered {
    Ok(String::new())
}

fn embedded_html(elem: ElemRef<'_>, fmt: &MdFormatter) -> Rendered {
    fmt.embedded_html(elem)
}

/// Every child is its own block, separated by a blank line.
fn blocks(node: &BlockTree, fmt: &MdFormatter) -> Rendered {
    let rendered = fmt.visit_children(ElemRef::Block(node))?;
    Ok(join_non_empty(rendered, "\n\n"))
}

/// Markdown headings can't carry an id, so a heading's id becomes an empty anchor on the line before it.
fn section(node: &BlockTree, fmt: &MdFormatter) -> Rendered {
    let body = blocks(node, fmt)?;
    match &node.data.node_id {
        Some(id) => Ok(format!("<a id=\"{}\"></a>\n{body}", escape(id))),
        None => Ok(body),
    }
}

fn lines(node: &BlockTree, fmt: &MdFormatter) -> Rendered {
    Ok(fmt.visit_children(ElemRef::Block(node))?.join("\n"))
}

fn heading(leaf: &BlockLeaf, fmt: &MdFormatter) -> Rendered {
    let level = leaf.level_or_1().clamp(1, 6) as usize;
    let text = fmt.visit_children(ElemRef::BlockLeaf(leaf))?.concat();
    Ok(format!("{} {text}", "#".repeat(level)))
}

fn quote(node: &BlockTree, fmt: &MdFormatter) -> Rendered {
    Ok(prefix_lines(&lines(node, fmt)?, "> "))
}

/// A nested list is indented to line up under the text of the item before it.
fn list(node: &BlockTree, fmt: &MdFormatter) -> Rendered {
    let mut items: Vec<String> = Vec::with_capacity(node.children.len());
    let mut number = 0;
    let mut indent = String::new();
    for child in &node.children {
        let rendered = fmt.visited_result(child.into())?;
        match child {
            Tree::Leaf(leaf) => {
                number += 1;
                let marker = match leaf.data.kind {
                    BlockKind::Enum => format!("{number}. "),
                    _ => "* ".to_string(),
                };
                indent = " ".repeat(marker.len());
                items.push(hanging_indent(&marker, &rendered));
            }
            Tree::Node(_) if rendered.is_empty() => {}
            Tree::Node(_) => match items.last_mut() {
                Some(item) => {
                    item.push('\n');
                    item.push_str(&prefix_lines(&rendered, &indent));
                }
                None => items.push(rendered),
            },
        }
    }
    Ok(items.join("\n"))
}

/// A fenced code block. The fence is longer than any run of backticks in the code.
fn fenced(node: &BlockTree, fmt: &MdFormatter) -> Rendered {
    let code = lines(node, fmt)?;
    let longest_run = code.split(|c| c != '`').map(str::len).max().unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    let lang = node.data.decorators.code_lang.as_deref().unwrap_or("");
    if code.is_empty() {
        Ok(format!("{fence}{lang}\n{fence}"))
    } else {
        Ok(format!("{fence}{lang}\n{code}\n{fence}"))
    }
}

fn raw_line(leaf: &BlockLeaf, _: &MdFormatter) -> Rendered {
    match &leaf.content {
        LeafContent::Raw(text) => Ok(text.clone()),
        LeafContent::Inline(inline) => Ok(inline.to_source()),
        LeafContent::Empty => Ok(String::new()),
    }
}

fn hr(_: &BlockLeaf, _: &MdFormatter) -> Rendered {
    Ok("----".to_string())
}

/// Writes a GFM pipe table when the table's shape allows it. Otherwise the table is embedded as XHTML, unless the
/// options call for an error or for flattening its spans.
fn pipe_table(node: &BlockTree, fmt: &MdFormatter) -> Rendered {
    let rows = parse_rows(node);
    if let Err(reason) = is_pipe_conformant(&rows) {
        if fmt.options.force_pipe_tables {
            log::debug!("flattening table into a pipe table: {reason}");
        } else if fmt.options.strict {
            return Err(FormatError::NonConformantTable { reason });
        } else {
            log::debug!("embedding table as HTML: {reason}");
            return fmt.embedded_html(ElemRef::Block(node));
        }
    }
    let grid = Grid::layout(&rows, MalformedPolicy::Warn)?;
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(grid.rows.len());
    for row in &grid.rows {
        let mut texts = Vec::with_capacity(grid.columns);
        for slot in row {
            texts.push(match slot {
                GridSlot::Cell(cell) => fmt
                    .visited_result(ElemRef::Inline(&cell.content))?
                    .trim()
                    .replace('|', "\\|"),
                GridSlot::ColSpan | GridSlot::RowSpan | GridSlot::Empty => String::new(),
            });
        }
        cells.push(texts);
    }
    Ok(write_pipe_rows(&cells, grid.columns))
}

fn write_pipe_rows(cells: &[Vec<String>], columns: usize) -> String {
    let mut widths = vec![1; columns];
    for row in cells {
        for (width, text) in widths.iter_mut().zip(row) {
            *width = (*width).max(text.chars().count());
        }
    }
    let mut out = String::new();
    for (idx, row) in cells.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push('|');
        for (text, width) in row.iter().zip(&widths) {
            out.push(' ');
            pad_to(&mut out, text, *width);
            out.push_str(" |");
        }
        if idx == 0 {
            out.push_str("\n|");
            for width in &widths {
                out.push_str(&"-".repeat(width + 2));
                out.push('|');
            }
        }
    }
    out
}

fn inline_text(elem: ElemRef<'_>, _: &MdFormatter) -> Rendered {
    match elem {
        ElemRef::InlineLeaf(token) => Ok(token.as_str().to_string()),
        _ => Ok(String::new()),
    }
}

fn em(node: &InlineTree, fmt: &MdFormatter) -> Rendered {
    Ok(format!("_{}_", fmt.text_of(&node.children)?))
}

fn strong(node: &InlineTree, fmt: &MdFormatter) -> Rendered {
    Ok(format!("**{}**", fmt.text_of(&node.children)?))
}

fn strikethrough(node: &InlineTree, fmt: &MdFormatter) -> Rendered {
    Ok(format!("~~{}~~", fmt.text_of(&node.children)?))
}

/// Code spans need more backticks than the code has in a row, and padding if the code starts or ends with one.
fn literal(node: &InlineTree, _: &MdFormatter) -> Rendered {
    let code = node.to_source();
    let longest_run = code.split(|c| c != '`').map(str::len).max().unwrap_or(0);
    let ticks = "`".repeat(longest_run + 1);
    if code.starts_with('`') || code.ends_with('`') {
        Ok(format!("{ticks} {code} {ticks}"))
    } else {
        Ok(format!("{ticks}{code}{ticks}"))
    }
}

fn link(node: &InlineTree, fmt: &MdFormatter) -> Rendered {
    let parts = split_link(node);
    let caption = match parts.caption {
        Some(caption) if !caption.is_empty() => Some(caption),
        _ => None,
    };
    if !parts.has_destination() {
        return match caption {
            Some(caption) => fmt.text_of(caption),
            None => Ok(String::new()),
        };
    }
    if parts.is_image {
        let alt = caption.map_or_else(|| parts.destination.clone(), plain_text_of);
        return Ok(format!("![{alt}]({})", parts.destination));
    }
    let text = match caption {
        Some(caption) => fmt.text_of(caption)?,
        None => parts.destination.clone(),
    };
    Ok(format!("[{text}]({})", parts.destination))
}

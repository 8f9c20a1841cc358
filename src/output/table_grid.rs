use crate::output::FormatError;
use crate::wiki_elem::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CellType {
    Header,
    Data,
}

/// One cell of a table row, with its leading modifiers (`!`, `^`, `>`) parsed off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableCell {
    pub cell_type: CellType,
    pub rowspan: usize,
    pub colspan: usize,
    /// The cell's inlines, under a [`InlineKind::Plain`] root.
    pub content: InlineTree,
}

impl TableCell {
    pub fn has_spans(&self) -> bool {
        self.rowspan > 1 || self.colspan > 1
    }

    fn from_inlines(elems: &[InlineElem]) -> Self {
        let mut cell = TableCell {
            cell_type: CellType::Data,
            rowspan: 1,
            colspan: 1,
            content: InlineTree::inline(InlineKind::Plain),
        };
        let mut elems = elems.iter();
        if let Some(first) = elems.next() {
            match first {
                Tree::Leaf(Leaf {
                    data: InlineToken::Text(text),
                    ..
                }) => {
                    let rest = cell.take_modifiers(text);
                    if !rest.is_empty() {
                        cell.content.push_text(rest);
                    }
                }
                other => cell.content.push(other.clone()),
            }
        }
        for elem in elems {
            cell.content.push(elem.clone());
        }
        cell
    }

    /// Applies the modifiers at the start of `text`, and returns what's left.
    fn take_modifiers<'a>(&mut self, text: &'a str) -> &'a str {
        let rest = text.trim_start_matches(['!', '^', '>']);
        for modifier in text[..text.len() - rest.len()].chars() {
            match modifier {
                '!' => self.cell_type = CellType::Header,
                '^' => self.rowspan += 1,
                _ => self.colspan += 1,
            }
        }
        rest
    }
}

/// Splits a table node's rows into cells.
pub fn parse_rows(table: &BlockTree) -> Vec<Vec<TableCell>> {
    table
        .children
        .iter()
        .filter_map(|child| match child {
            Tree::Leaf(leaf) => leaf.data.inline(),
            Tree::Node(_) => None,
        })
        .map(|row| {
            row.children
                .split(|elem| {
                    matches!(
                        elem,
                        Tree::Leaf(Leaf {
                            data: InlineToken::Sep(Separator::Table),
                            ..
                        })
                    )
                })
                .map(TableCell::from_inlines)
                .collect()
        })
        .collect()
}

/// Whether a table can be written as a GFM pipe table: the first row is all header cells, every other row is all data
/// cells, and no cell spans more than one row or column.
pub fn is_pipe_conformant(rows: &[Vec<TableCell>]) -> Result<(), &'static str> {
    let Some((header, body)) = rows.split_first() else {
        return Err("table has no rows");
    };
    if header.iter().any(|cell| cell.cell_type != CellType::Header) {
        return Err("first row has data cells");
    }
    if body.iter().flatten().any(|cell| cell.cell_type != CellType::Data) {
        return Err("header cells after the first row");
    }
    if rows.iter().flatten().any(TableCell::has_spans) {
        return Err("cells span several rows or columns");
    }
    Ok(())
}

/// What to do about a cell whose span runs into a slot that another cell already covers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Fail the whole format call.
    Fail,
    /// Log a warning, and leave the covered slots to the cell that got there first.
    Warn,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GridSlot<'a> {
    /// The top-left position of a cell.
    Cell(&'a TableCell),
    /// Covered by a cell to the left, in the same row.
    ColSpan,
    /// Covered by a cell in a row above.
    RowSpan,
    /// Not covered by anything, because its row was short.
    Empty,
}

/// A table laid out on a rectangular grid, with spans resolved.
#[derive(Debug, PartialEq, Eq)]
pub struct Grid<'a> {
    pub columns: usize,
    pub rows: Vec<Vec<GridSlot<'a>>>,
}

impl<'a> Grid<'a> {
    /// Lays out the rows. Each cell takes the first slot in its row that no rowspan from above covers. The widest
    /// row decides how many columns there are; shorter rows are padded with [`GridSlot::Empty`], and rowspans that
    /// run past the last row are clipped.
    pub fn layout(rows: &'a [Vec<TableCell>], policy: MalformedPolicy) -> Result<Self, FormatError> {
        let mut grid: Vec<Vec<Option<GridSlot<'a>>>> = vec![Vec::new(); rows.len()];

        for (row_idx, row) in rows.iter().enumerate() {
            let mut col = 0;
            for cell in row {
                while grid[row_idx].get(col).is_some_and(Option::is_some) {
                    col += 1;
                }
                let last_col = col + cell.colspan;
                let last_row = (row_idx + cell.rowspan).min(rows.len());
                for (r, grid_row) in grid.iter_mut().enumerate().take(last_row).skip(row_idx) {
                    if grid_row.len() < last_col {
                        grid_row.resize(last_col, None);
                    }
                    for (c, slot) in grid_row.iter_mut().enumerate().take(last_col).skip(col) {
                        if slot.is_some() {
                            let err = FormatError::MalformedTable { row: r, column: c };
                            match policy {
                                MalformedPolicy::Fail => return Err(err),
                                MalformedPolicy::Warn => {
                                    log::warn!("{err}; keeping the earlier cell");
                                    continue;
                                }
                            }
                        }
                        *slot = Some(match (r == row_idx, c == col) {
                            (true, true) => GridSlot::Cell(cell),
                            (true, false) => GridSlot::ColSpan,
                            (false, _) => GridSlot::RowSpan,
                        });
                    }
                }
                col = last_col;
            }
        }

        let columns = grid.iter().map(Vec::len).max().unwrap_or(0);
        let rows = grid
            .into_iter()
            .map(|mut row| {
                row.resize(columns, None);
                row.into_iter().map(|slot| slot.unwrap_or(GridSlot::Empty)).collect()
            })
            .collect();
        Ok(Self { columns, rows })
    }
}

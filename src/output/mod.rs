//! Formatters that render a parsed [`BlockTree`](crate::wiki_elem::BlockTree) as text.
//!
//! Every output format is a [`Format`]: a [`DispatchTable`] from element tags to rendering strategies. Related
//! formats share a base table, and override only the tags they treat differently.
mod dispatch;
mod fmt_html;
mod fmt_md;
mod fmt_plain;
mod html;
mod table_grid;
pub mod toc;

pub use dispatch::*;
pub use fmt_html::*;
pub use fmt_md::*;
pub use fmt_plain::*;
pub use html::{escape, Dialect, HtmlElement, HtmlNode, Layout};
pub use table_grid::{CellType, TableCell};

//! Converts Hiki-style wiki markup into HTML, Markdown and plain text.
//!
//! Conversion happens in two stages. [`wiki_elem::BlockParser`] turns the source into a tree of blocks, each holding
//! the inline tree of its line; then an [`output::Format`] renders that tree.
//!
//! ```
//! use hikifmt::output::{Dialect, Format, HtmlFormatter};
//! use hikifmt::wiki_elem::BlockParser;
//!
//! let tree = BlockParser::new().parse_str("''hello'' [[world|http://example.com/]]");
//! let html = HtmlFormatter::new(Dialect::Html5).format(&tree).unwrap();
//! assert_eq!(html, "<p>\n<em>hello</em> <a href=\"http://example.com/\">world</a>\n</p>\n");
//! ```
pub mod output;
pub mod plugin;
pub mod run;
mod util;
pub mod wiki_elem;

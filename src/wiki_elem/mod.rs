mod autolink;
mod block_parser;
mod inline_parser;
mod tree;

pub use autolink::*;
pub use block_parser::*;
pub use inline_parser::*;
pub use tree::*;

#[cfg(test)]
mod tree_test_utils;
#[cfg(test)]
pub(crate) use tree_test_utils::*;

use crate::wiki_elem::{BlockLeaf, BlockTree, ElemRef, ElemTag, InlineTree};
use derive_builder::Builder;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Renders one kind of element for a particular [`Format`].
///
/// Strategies typically build whatever container their element needs, and then fill it with
/// [`Format::visited_result`] for each child, which dispatches back through the format's table.
pub trait NodeFormatter<F: Format> {
    fn visit(&self, elem: ElemRef<'_>, fmt: &F) -> Result<F::Rendered, FormatError>;
}

/// Wraps a plain function as a [`NodeFormatter`].
pub struct FnFormatter<G>(pub G);

impl<F, G> NodeFormatter<F> for FnFormatter<G>
where
    F: Format,
    G: Fn(ElemRef<'_>, &F) -> Result<F::Rendered, FormatError>,
{
    fn visit(&self, elem: ElemRef<'_>, fmt: &F) -> Result<F::Rendered, FormatError> {
        (self.0)(elem, fmt)
    }
}

macro_rules! typed_formatters {
    ($($(#[$meta:meta])* $name:ident($variant:ident: $elem:ty);)*) => {
        $(
            $(#[$meta])*
            pub struct $name<G>(pub G);

            impl<F, G> NodeFormatter<F> for $name<G>
            where
                F: Format,
                G: Fn(&$elem, &F) -> Result<F::Rendered, FormatError>,
            {
                fn visit(&self, elem: ElemRef<'_>, fmt: &F) -> Result<F::Rendered, FormatError> {
                    match elem {
                        ElemRef::$variant(typed) => (self.0)(typed, fmt),
                        other => fmt.table().fallback().visit(other, fmt),
                    }
                }
            }
        )*
    };
}

typed_formatters! {
    /// A strategy for block nodes (including the document). Any other element goes to the table's fallback.
    OnBlockNode(Block: BlockTree);
    /// A strategy for block leaves.
    OnBlockLeaf(BlockLeaf: BlockLeaf);
    /// A strategy for inline nodes.
    OnInlineNode(Inline: InlineTree);
}

/// A mapping from element tags to the strategies that render them.
///
/// Output formats are built by cloning a base table and overriding just the tags they treat differently. Tags with no
/// entry go to the table's fallback strategy.
pub struct DispatchTable<F: Format> {
    strategies: HashMap<ElemTag, Rc<dyn NodeFormatter<F>>>,
    fallback: Rc<dyn NodeFormatter<F>>,
}

impl<F: Format> Clone for DispatchTable<F> {
    fn clone(&self) -> Self {
        Self {
            strategies: self.strategies.clone(),
            fallback: Rc::clone(&self.fallback),
        }
    }
}

impl<F: Format> DispatchTable<F> {
    pub fn new(fallback: impl NodeFormatter<F> + 'static) -> Self {
        Self {
            strategies: HashMap::new(),
            fallback: Rc::new(fallback),
        }
    }

    /// Sets (or replaces) the strategy for one tag.
    pub fn with(mut self, tag: ElemTag, strategy: impl NodeFormatter<F> + 'static) -> Self {
        self.strategies.insert(tag, Rc::new(strategy));
        self
    }

    /// Sets one shared strategy for several tags.
    pub fn with_all(mut self, tags: impl IntoIterator<Item = ElemTag>, strategy: impl NodeFormatter<F> + 'static) -> Self {
        let strategy: Rc<dyn NodeFormatter<F>> = Rc::new(strategy);
        for tag in tags {
            self.strategies.insert(tag, Rc::clone(&strategy));
        }
        self
    }

    pub fn with_fn<G>(self, tag: ElemTag, strategy: G) -> Self
    where
        G: Fn(ElemRef<'_>, &F) -> Result<F::Rendered, FormatError> + 'static,
    {
        self.with(tag, FnFormatter(strategy))
    }

    pub fn lookup(&self, tag: ElemTag) -> &dyn NodeFormatter<F> {
        match self.strategies.get(&tag) {
            Some(strategy) => strategy.as_ref(),
            None => self.fallback.as_ref(),
        }
    }

    pub fn fallback(&self) -> &dyn NodeFormatter<F> {
        self.fallback.as_ref()
    }

    pub fn has_override(&self, tag: ElemTag) -> bool {
        self.strategies.contains_key(&tag)
    }
}

/// An output format: a dispatch table, plus the type that its strategies render into.
pub trait Format: Clone + Sized {
    type Rendered;

    fn table(&self) -> &DispatchTable<Self>;

    /// Turns the rendering of a whole document into its final text.
    fn serialize(&self, rendered: Self::Rendered) -> String;

    /// Applies per-call options on top of this formatter's own defaults.
    fn apply_options(&mut self, options: &FormatOptions);

    /// Renders an element by looking up its own tag in this format's table.
    fn visited_result(&self, elem: ElemRef<'_>) -> Result<Self::Rendered, FormatError> {
        self.table().lookup(elem.tag()).visit(elem, self)
    }

    fn visit_children(&self, elem: ElemRef<'_>) -> Result<Vec<Self::Rendered>, FormatError> {
        elem.children().into_iter().map(|child| self.visited_result(child)).collect()
    }

    fn format(&self, tree: &BlockTree) -> Result<String, FormatError> {
        let rendered = self.visited_result(ElemRef::Block(tree))?;
        Ok(self.serialize(rendered))
    }

    /// Like [`Format::format`], but with per-call options. Options set here win over the formatter's defaults.
    fn format_with(&self, tree: &BlockTree, options: &FormatOptions) -> Result<String, FormatError> {
        let mut configured = self.clone();
        configured.apply_options(options);
        configured.format(tree)
    }
}

/// Per-call formatting options. Each unset field falls back to the formatter's own default.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash, Builder)]
#[builder(default)]
pub struct FormatOptions {
    /// Whether bare URLs in verbatim text become links, in formats that can show links there.
    #[builder(setter(strip_option))]
    pub auto_link_in_verbatim: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatError {
    /// Two table cells' spans cover the same slot. Both positions are zero-based.
    MalformedTable { row: usize, column: usize },
    /// A table can't be written as a GFM pipe table.
    NonConformantTable { reason: &'static str },
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::MalformedTable { row, column } => write!(
                f,
                "malformed table: cells overlap at row {}, column {}",
                row + 1,
                column + 1
            ),
            FormatError::NonConformantTable { reason } => {
                write!(f, "table can't be written as a pipe table: {reason}")
            }
        }
    }
}

impl std::error::Error for FormatError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki_elem::{BlockKind, BlockParser};

    /// A toy format that renders every element as its tag name, with children in parens.
    #[derive(Clone)]
    struct TagNames {
        table: DispatchTable<TagNames>,
    }

    fn tag_and_children(elem: ElemRef<'_>, fmt: &TagNames) -> Result<String, FormatError> {
        let children = fmt.visit_children(elem)?;
        if children.is_empty() {
            Ok(elem.tag().to_string())
        } else {
            Ok(format!("{}({})", elem.tag(), children.join(", ")))
        }
    }

    impl Format for TagNames {
        type Rendered = String;

        fn table(&self) -> &DispatchTable<Self> {
            &self.table
        }

        fn serialize(&self, rendered: String) -> String {
            rendered
        }

        fn apply_options(&mut self, _options: &FormatOptions) {}
    }

    fn base() -> DispatchTable<TagNames> {
        DispatchTable::new(FnFormatter(tag_and_children))
    }

    #[test]
    fn fallback_for_everything() {
        let fmt = TagNames { table: base() };
        let tree = BlockParser::new().parse_str("hi");
        assert_eq!(
            fmt.format(&tree).unwrap(),
            "document(Paragraph node(Paragraph leaf(inline Plain(inline text))))"
        );
    }

    #[test]
    fn cloned_table_overrides_only_its_own_tags() {
        let base_table = base();
        let derived = base_table
            .clone()
            .with_fn(ElemTag::BlockNode(BlockKind::Paragraph), |_, _| Ok("P".to_string()));
        assert!(derived.has_override(ElemTag::BlockNode(BlockKind::Paragraph)));
        assert!(!base_table.has_override(ElemTag::BlockNode(BlockKind::Paragraph)));

        let tree = BlockParser::new().parse_str("hi");
        assert_eq!(TagNames { table: derived }.format(&tree).unwrap(), "document(P)");
        assert_eq!(
            TagNames { table: base_table }.format(&tree).unwrap(),
            "document(Paragraph node(Paragraph leaf(inline Plain(inline text))))"
        );
    }

    fn always_x(_: ElemRef<'_>, _: &TagNames) -> Result<String, FormatError> {
        Ok("x".to_string())
    }

    #[test]
    fn shared_strategy_for_several_tags() {
        let table = base().with_all(
            [ElemTag::BlockNode(BlockKind::Paragraph), ElemTag::BlockNode(BlockKind::Quote)],
            FnFormatter(always_x),
        );
        let tree = BlockParser::new().parse_str("para\n\"\"quote");
        assert_eq!(TagNames { table }.format(&tree).unwrap(), "document(x, x)");
    }

    fn leaf_kind(leaf: &BlockLeaf, _: &TagNames) -> Result<String, FormatError> {
        Ok(format!("leaf:{:?}", leaf.kind))
    }

    #[test]
    fn typed_strategy_falls_back_on_other_elements() {
        let table = base().with_all(
            [ElemTag::BlockLeaf(BlockKind::Paragraph), ElemTag::Document],
            OnBlockLeaf(leaf_kind),
        );
        let tree = BlockParser::new().parse_str("hi");
        assert_eq!(
            TagNames { table }.format(&tree).unwrap(),
            "document(Paragraph node(leaf:Paragraph))"
        );
    }

    #[test]
    fn errors_propagate() {
        let table = base().with_fn(ElemTag::InlineLeaf, |_, _| {
            Err(FormatError::NonConformantTable { reason: "test" })
        });
        let tree = BlockParser::new().parse_str("hi");
        assert_eq!(
            TagNames { table }.format(&tree),
            Err(FormatError::NonConformantTable { reason: "test" })
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            FormatError::MalformedTable { row: 1, column: 2 }.to_string(),
            "malformed table: cells overlap at row 2, column 3"
        );
    }
}

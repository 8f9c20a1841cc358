use serde::Serialize;
use std::fmt::{Display, Formatter};

/// A generic tree element: either a [`Leaf`] or a [`Node`].
///
/// Both the inline and block layers use this shape. `N` is the data carried by nodes, and `L` the data carried by
/// leaves. Every element knows its `depth`, which is its distance from the root; the root has depth 0.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tree<N, L> {
    Leaf(Leaf<L>),
    Node(Node<N, L>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Leaf<L> {
    #[serde(skip)]
    pub depth: usize,
    #[serde(flatten)]
    pub data: L,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Node<N, L> {
    #[serde(skip)]
    pub depth: usize,
    #[serde(flatten)]
    pub data: N,
    pub children: Vec<Tree<N, L>>,
}

/// Double dispatch over a [`Tree`].
///
/// [`Tree::accept`] calls whichever of these matches the element.
pub trait Visitor<N, L> {
    type Output;

    fn visit_leaf(&mut self, leaf: &Leaf<L>) -> Self::Output;
    fn visit_node(&mut self, node: &Node<N, L>) -> Self::Output;
}

impl<N, L> Tree<N, L> {
    pub fn accept<V: Visitor<N, L>>(&self, visitor: &mut V) -> V::Output {
        match self {
            Tree::Leaf(leaf) => visitor.visit_leaf(leaf),
            Tree::Node(node) => visitor.visit_node(node),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Tree::Leaf(leaf) => leaf.depth,
            Tree::Node(node) => node.depth,
        }
    }

    fn set_depth(&mut self, depth: usize) {
        match self {
            Tree::Leaf(leaf) => leaf.depth = depth,
            Tree::Node(node) => node.set_depth(depth),
        }
    }
}

impl<L> Leaf<L> {
    pub fn new(data: L) -> Self {
        Self { depth: 0, data }
    }
}

impl<N, L> Node<N, L> {
    pub fn new(data: N) -> Self {
        Self {
            depth: 0,
            data,
            children: Vec::new(),
        }
    }

    /// Appends a child, assigning it (and its whole subtree) a depth one greater than this node's.
    pub fn push(&mut self, mut child: Tree<N, L>) {
        child.set_depth(self.depth + 1);
        self.children.push(child);
    }

    pub fn push_leaf(&mut self, data: L) {
        self.push(Tree::Leaf(Leaf::new(data)));
    }

    pub fn push_node(&mut self, node: Node<N, L>) {
        self.push(Tree::Node(node));
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn last_node_mut(&mut self) -> Option<&mut Node<N, L>> {
        match self.children.last_mut() {
            Some(Tree::Node(node)) => Some(node),
            _ => None,
        }
    }

    fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
        for child in &mut self.children {
            child.set_depth(depth + 1);
        }
    }
}

/// The structural tokens that the inline tokenizer keeps distinct from text.
///
/// Each one only means something in a particular context: `|` inside a link, `||` inside a table row, and `:` inside
/// a definition. Everywhere else they're rendered as their literal text.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Separator {
    Link,
    Table,
    Desc,
}

impl Separator {
    pub fn as_str(self) -> &'static str {
        match self {
            Separator::Link => "|",
            Separator::Table => "||",
            Separator::Desc => ":",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "token", content = "value")]
pub enum InlineToken {
    Text(String),
    Sep(Separator),
}

impl InlineToken {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            InlineToken::Text(text) => text,
            InlineToken::Sep(sep) => sep.as_str(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineKind {
    /// The root of every inline tree.
    Plain,
    Link,
    Em,
    Strong,
    Del,
    Literal,
    Plugin,
}

impl InlineKind {
    /// The token that opens a span of this kind. `Plain` has none, since it's never opened by markup.
    pub fn head(self) -> &'static str {
        match self {
            InlineKind::Plain => "",
            InlineKind::Link => "[[",
            InlineKind::Em => "''",
            InlineKind::Strong => "'''",
            InlineKind::Del => "==",
            InlineKind::Literal => "``",
            InlineKind::Plugin => "{{",
        }
    }

    pub fn tail(self) -> &'static str {
        match self {
            InlineKind::Plain => "",
            InlineKind::Link => "]]",
            InlineKind::Em => "''",
            InlineKind::Strong => "'''",
            InlineKind::Del => "==",
            InlineKind::Literal => "``",
            InlineKind::Plugin => "}}",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct InlineData {
    pub kind: InlineKind,
}

pub type InlineTree = Node<InlineData, InlineToken>;
pub type InlineElem = Tree<InlineData, InlineToken>;

impl InlineTree {
    pub fn inline(kind: InlineKind) -> Self {
        Node::new(InlineData { kind })
    }

    pub fn kind(&self) -> InlineKind {
        self.data.kind
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.push_leaf(InlineToken::Text(text.into()))
    }

    /// Concatenates all the text under this node, including the head and tail tokens of nested spans.
    ///
    /// For a line whose spans all got closed, this reproduces the line exactly. Spans left open at the end of a line
    /// get their tail written anyway.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            write_source(&mut out, child);
        }
        out
    }

    /// Concatenates just the text leaves, dropping span markup.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(&mut out, self);
        out
    }
}

fn write_source(out: &mut String, elem: &InlineElem) {
    match elem {
        Tree::Leaf(leaf) => out.push_str(leaf.data.as_str()),
        Tree::Node(node) => {
            out.push_str(node.kind().head());
            for child in &node.children {
                write_source(out, child);
            }
            out.push_str(node.kind().tail());
        }
    }
}

fn collect_text(out: &mut String, node: &InlineTree) {
    for child in &node.children {
        match child {
            Tree::Leaf(leaf) => out.push_str(leaf.data.as_str()),
            Tree::Node(node) => collect_text(out, node),
        }
    }
}

/// The kinds of block-level markup.
///
/// Each kind doubles as the tag for a leaf (one source line) and for the node that wraps consecutive leaves of that
/// kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Desc,
    Verbatim,
    Quote,
    Table,
    CommentOut,
    Hr,
    Heading,
    List,
    Enum,
}

impl BlockKind {
    /// Whether this kind's nesting is encoded by a repeated marker.
    pub fn is_leveled(self) -> bool {
        matches!(self, BlockKind::Heading | BlockKind::List | BlockKind::Enum)
    }

    pub fn is_list_type(self) -> bool {
        matches!(self, BlockKind::List | BlockKind::Enum)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Document,
    Block(BlockKind),
}

/// Block metadata from `//@` decorator lines.
#[derive(Clone, Default, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Decorators {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_lang: Option<String>,
}

impl Decorators {
    pub fn is_empty(&self) -> bool {
        self.class.is_none() && self.id.is_none() && self.summary.is_none() && self.code_lang.is_none()
    }

    /// Fills in any fields that are unset here from `other`.
    pub fn merge(&mut self, other: Decorators) {
        self.class = self.class.take().or(other.class);
        self.id = self.id.take().or(other.id);
        self.summary = self.summary.take().or(other.summary);
        self.code_lang = self.code_lang.take().or(other.code_lang);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BlockNodeData {
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Decorators::is_empty")]
    pub decorators: Decorators,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafContent {
    Inline(InlineTree),
    Raw(String),
    Empty,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BlockLeaf {
    pub kind: BlockKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub content: LeafContent,
}

impl BlockLeaf {
    pub fn inline(&self) -> Option<&InlineTree> {
        match &self.content {
            LeafContent::Inline(tree) => Some(tree),
            LeafContent::Raw(_) | LeafContent::Empty => None,
        }
    }

    pub fn level_or_1(&self) -> u32 {
        self.level.unwrap_or(1)
    }
}

pub type BlockTree = Node<BlockNodeData, BlockLeaf>;
pub type BlockElem = Tree<BlockNodeData, BlockLeaf>;

impl BlockTree {
    pub fn document() -> Self {
        Node::new(BlockNodeData {
            kind: NodeKind::Document,
            level: None,
            node_id: None,
            decorators: Decorators::default(),
        })
    }

    pub fn block(kind: BlockKind, level: Option<u32>) -> Self {
        Node::new(BlockNodeData {
            kind: NodeKind::Block(kind),
            level,
            node_id: None,
            decorators: Decorators::default(),
        })
    }

    pub fn block_kind(&self) -> Option<BlockKind> {
        match self.data.kind {
            NodeKind::Document => None,
            NodeKind::Block(kind) => Some(kind),
        }
    }

    pub fn level(&self) -> Option<u32> {
        self.data.level
    }
}

/// The tag that formatter dispatch tables are keyed by.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElemTag {
    Document,
    BlockNode(BlockKind),
    BlockLeaf(BlockKind),
    InlineNode(InlineKind),
    InlineLeaf,
}

/// A reference to any element of either tree layer.
///
/// The formatters walk block and inline trees with a single dispatch mechanism, so they need one type that can point
/// at any of them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ElemRef<'a> {
    Block(&'a BlockTree),
    BlockLeaf(&'a BlockLeaf),
    Inline(&'a InlineTree),
    InlineLeaf(&'a InlineToken),
}

impl<'a> ElemRef<'a> {
    pub fn tag(&self) -> ElemTag {
        match self {
            ElemRef::Block(node) => match node.data.kind {
                NodeKind::Document => ElemTag::Document,
                NodeKind::Block(kind) => ElemTag::BlockNode(kind),
            },
            ElemRef::BlockLeaf(leaf) => ElemTag::BlockLeaf(leaf.kind),
            ElemRef::Inline(node) => ElemTag::InlineNode(node.kind()),
            ElemRef::InlineLeaf(_) => ElemTag::InlineLeaf,
        }
    }

    /// The element's children. A block leaf's only child is the root of its inline tree, if it has one.
    pub fn children(&self) -> Vec<ElemRef<'a>> {
        match *self {
            ElemRef::Block(node) => node.children.iter().map(ElemRef::from).collect(),
            ElemRef::BlockLeaf(leaf) => leaf.inline().map(ElemRef::Inline).into_iter().collect(),
            ElemRef::Inline(node) => node.children.iter().map(ElemRef::from).collect(),
            ElemRef::InlineLeaf(_) => Vec::new(),
        }
    }
}

impl<'a> From<&'a BlockElem> for ElemRef<'a> {
    fn from(value: &'a BlockElem) -> Self {
        match value {
            Tree::Leaf(leaf) => ElemRef::BlockLeaf(&leaf.data),
            Tree::Node(node) => ElemRef::Block(node),
        }
    }
}

impl<'a> From<&'a InlineElem> for ElemRef<'a> {
    fn from(value: &'a InlineElem) -> Self {
        match value {
            Tree::Leaf(leaf) => ElemRef::InlineLeaf(&leaf.data),
            Tree::Node(node) => ElemRef::Inline(node),
        }
    }
}

impl Display for ElemTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ElemTag::Document => f.write_str("document"),
            ElemTag::BlockNode(kind) => write!(f, "{kind:?} node"),
            ElemTag::BlockLeaf(kind) => write!(f, "{kind:?} leaf"),
            ElemTag::InlineNode(kind) => write!(f, "inline {kind:?}"),
            ElemTag::InlineLeaf => f.write_str("inline text"),
        }
    }
}

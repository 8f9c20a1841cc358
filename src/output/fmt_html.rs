use crate::output::html::{Dialect, HtmlElement, HtmlNode};
use crate::output::table_grid::{parse_rows, CellType};
use crate::output::{
    DispatchTable, FnFormatter, Format, FormatError, FormatOptions, OnBlockLeaf, OnBlockNode, OnInlineNode,
};
use crate::plugin::{self, PluginElement, PluginOutput};
use crate::wiki_elem::*;

/// Writes HTML in one of the three [`Dialect`]s.
///
/// All three dialects share one dispatch table. The strategies ask the formatter's dialect for the few things that
/// differ (section containers, anchors and table summaries), and the dialect decides how void elements get closed when
/// the result is serialized.
#[derive(Clone)]
pub struct HtmlFormatter {
    dialect: Dialect,
    auto_link_in_verbatim: bool,
    table: DispatchTable<HtmlFormatter>,
}

type Rendered = Result<Vec<HtmlNode>, FormatError>;

impl HtmlFormatter {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            auto_link_in_verbatim: false,
            table: base_table(),
        }
    }

    /// Whether bare URLs in verbatim blocks become links.
    pub fn with_auto_link_in_verbatim(mut self, enabled: bool) -> Self {
        self.auto_link_in_verbatim = enabled;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn visit_all<'a>(&self, elems: impl IntoIterator<Item = ElemRef<'a>>) -> Rendered {
        let mut out = Vec::new();
        for elem in elems {
            out.extend(self.visited_result(elem)?);
        }
        Ok(out)
    }

    fn visit_inlines(&self, elems: &[InlineElem]) -> Rendered {
        self.visit_all(elems.iter().map(ElemRef::from))
    }

    fn plugin_nodes(&self, outputs: Vec<PluginOutput>) -> Vec<HtmlNode> {
        outputs
            .into_iter()
            .map(|output| match output {
                PluginOutput::Text(text) => HtmlNode::Text(text),
                PluginOutput::Raw(raw) => HtmlNode::Raw(raw),
                PluginOutput::Element { kind, children } => {
                    let element = match kind {
                        PluginElement::Sup => HtmlElement::inline("sup"),
                        PluginElement::Sub => HtmlElement::inline("sub"),
                        PluginElement::Anchor(name) => self.dialect.anchor(&name),
                        PluginElement::Span { class } => HtmlElement::inline("span").attr("class", class),
                    };
                    element.with_children(self.plugin_nodes(children)).into_node()
                }
            })
            .collect()
    }
}

impl Format for HtmlFormatter {
    type Rendered = Vec<HtmlNode>;

    fn table(&self) -> &DispatchTable<Self> {
        &self.table
    }

    fn serialize(&self, rendered: Vec<HtmlNode>) -> String {
        self.dialect.serialize(&rendered)
    }

    fn apply_options(&mut self, options: &FormatOptions) {
        if let Some(enabled) = options.auto_link_in_verbatim {
            self.auto_link_in_verbatim = enabled;
        }
    }
}

fn base_table() -> DispatchTable<HtmlFormatter> {
    use BlockKind::*;
    DispatchTable::new(FnFormatter(children))
        .with(ElemTag::BlockNode(Heading), OnBlockNode(section))
        .with(ElemTag::BlockLeaf(Heading), OnBlockLeaf(heading))
        .with(ElemTag::BlockNode(Paragraph), OnBlockNode(paragraph))
        .with_all(
            [ElemTag::BlockLeaf(Paragraph), ElemTag::BlockLeaf(Quote)],
            OnBlockLeaf(text_line),
        )
        .with(ElemTag::BlockNode(Quote), OnBlockNode(quote))
        .with_all([ElemTag::BlockNode(List), ElemTag::BlockNode(Enum)], OnBlockNode(list))
        .with(ElemTag::BlockNode(Desc), OnBlockNode(desc))
        .with(ElemTag::BlockLeaf(Desc), OnBlockLeaf(desc_entry))
        .with(ElemTag::BlockNode(Verbatim), OnBlockNode(verbatim))
        .with(ElemTag::BlockLeaf(Verbatim), OnBlockLeaf(verbatim_line))
        .with(ElemTag::BlockNode(Table), OnBlockNode(table))
        .with_all(
            [ElemTag::BlockNode(CommentOut), ElemTag::BlockLeaf(CommentOut)],
            FnFormatter(nothing),
        )
        .with(ElemTag::BlockLeaf(Hr), OnBlockLeaf(hr))
        .with(ElemTag::InlineLeaf, FnFormatter(inline_text))
        .with_all(
            [
                ElemTag::InlineNode(InlineKind::Em),
                ElemTag::InlineNode(InlineKind::Strong),
                ElemTag::InlineNode(InlineKind::Del),
            ],
            OnInlineNode(span),
        )
        .with(ElemTag::InlineNode(InlineKind::Literal), OnInlineNode(literal))
        .with(ElemTag::InlineNode(InlineKind::Link), OnInlineNode(link))
        .with(ElemTag::InlineNode(InlineKind::Plugin), OnInlineNode(plugin_call))
}

fn children(elem: ElemRef<'_>, fmt: &HtmlFormatter) -> Rendered {
    fmt.visit_all(elem.children())
}

fn nothing(_: ElemRef<'_>, _: &HtmlFormatter) -> Rendered {
    Ok(Vec::new())
}

/// Puts a block's `class` and `id` decorators on its outermost element. A decorator class is added to any class the
/// element already has.
fn decorate(element: &mut HtmlElement, decorators: &Decorators) {
    if let Some(class) = &decorators.class {
        let combined = match element.get_attr("class") {
            Some(existing) => format!("{existing} {class}"),
            None => class.clone(),
        };
        element.set_attr("class", combined);
    }
    if let Some(id) = &decorators.id {
        if element.get_attr("id").is_none() {
            element.set_attr("id", id.as_str());
        }
    }
}

fn section(node: &BlockTree, fmt: &HtmlFormatter) -> Rendered {
    let level = node.level().unwrap_or(1).clamp(1, 6);
    let mut section = fmt.dialect.section(level);
    decorate(&mut section, &node.data.decorators);
    for child in &node.children {
        let mut rendered = fmt.visited_result(child.into())?;
        if let (Tree::Leaf(_), Some(node_id)) = (child, &node.data.node_id) {
            if let Some(HtmlNode::Element(heading)) = rendered.first_mut() {
                heading.set_attr("id", node_id.as_str());
            }
        }
        section.children.extend(rendered);
    }
    section.push(HtmlNode::Comment(format!("end of section h{level}")));
    Ok(vec![section.into_node()])
}

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

fn heading(leaf: &BlockLeaf, fmt: &HtmlFormatter) -> Rendered {
    let level = leaf.level_or_1().clamp(1, 6) as usize;
    let heading = HtmlElement::line(HEADING_TAGS[level - 1]);
    let content = fmt.visit_all(ElemRef::BlockLeaf(leaf).children())?;
    Ok(vec![heading.with_children(content).into_node()])
}

fn paragraph(node: &BlockTree, fmt: &HtmlFormatter) -> Rendered {
    let mut p = HtmlElement::block("p");
    decorate(&mut p, &node.data.decorators);
    let content = fmt.visit_all(ElemRef::Block(node).children())?;
    Ok(vec![p.with_children(content).into_node()])
}

/// A leaf's inlines, as one line of text.
fn text_line(leaf: &BlockLeaf, fmt: &HtmlFormatter) -> Rendered {
    let mut out = fmt.visit_all(ElemRef::BlockLeaf(leaf).children())?;
    out.push(HtmlNode::text("\n"));
    Ok(out)
}

fn quote(node: &BlockTree, fmt: &HtmlFormatter) -> Rendered {
    let mut blockquote = HtmlElement::block("blockquote");
    decorate(&mut blockquote, &node.data.decorators);
    let lines = fmt.visit_all(ElemRef::Block(node).children())?;
    blockquote.push(HtmlElement::block("p").with_children(lines).into_node());
    Ok(vec![blockquote.into_node()])
}

/// Each leaf becomes an `li`. A nested list goes inside the `li` of the leaf before it.
fn list(node: &BlockTree, fmt: &HtmlFormatter) -> Rendered {
    let tag = match node.block_kind() {
        Some(BlockKind::Enum) => "ol",
        _ => "ul",
    };
    let mut list = HtmlElement::block(tag);
    decorate(&mut list, &node.data.decorators);

    let mut current: Option<HtmlElement> = None;
    for child in &node.children {
        let rendered = fmt.visited_result(child.into())?;
        match child {
            Tree::Leaf(leaf) => {
                if let Some(done) = current.take() {
                    list.push(done.into_node());
                }
                let mut item = HtmlElement::line("li")
                    .attr_opt("id", leaf.data.node_id.as_deref())
                    .with_children(rendered);
                item.push(HtmlNode::text("\n"));
                current = Some(item);
            }
            Tree::Node(_) => current
                .get_or_insert_with(|| HtmlElement::line("li"))
                .children
                .extend(rendered),
        }
    }
    if let Some(done) = current {
        list.push(done.into_node());
    }
    Ok(vec![list.into_node()])
}

fn desc(node: &BlockTree, fmt: &HtmlFormatter) -> Rendered {
    let mut dl = HtmlElement::block("dl");
    decorate(&mut dl, &node.data.decorators);
    let entries = fmt.visit_all(ElemRef::Block(node).children())?;
    Ok(vec![dl.with_children(entries).into_node()])
}

/// `term:description` becomes a `dt` and a `dd`. An empty term gets no `dt`.
fn desc_entry(leaf: &BlockLeaf, fmt: &HtmlFormatter) -> Rendered {
    let Some(inline) = leaf.inline() else {
        return Ok(Vec::new());
    };
    let (term, description) = split_desc(inline);
    let mut out = Vec::with_capacity(2);
    if !term.is_empty() {
        out.push(HtmlElement::line("dt").with_children(fmt.visit_inlines(term)?).into_node());
    }
    if let Some(description) = description {
        let dd = HtmlElement::line("dd").with_children(fmt.visit_inlines(description)?);
        out.push(dd.into_node());
    }
    Ok(out)
}

fn verbatim(node: &BlockTree, fmt: &HtmlFormatter) -> Rendered {
    let mut pre = HtmlElement::block("pre");
    if let Some(lang) = &node.data.decorators.code_lang {
        pre.set_attr("class", format!("language-{lang}"));
    }
    decorate(&mut pre, &node.data.decorators);
    let lines = fmt.visit_all(ElemRef::Block(node).children())?;
    Ok(vec![pre.with_children(lines).into_node()])
}

fn verbatim_line(leaf: &BlockLeaf, fmt: &HtmlFormatter) -> Rendered {
    let text = match &leaf.content {
        LeafContent::Raw(text) => text.as_str(),
        LeafContent::Inline(_) | LeafContent::Empty => "",
    };
    let mut out = Vec::new();
    if fmt.auto_link_in_verbatim {
        let mut last = 0;
        for url in find_urls(text) {
            if url.start > last {
                out.push(HtmlNode::text(&text[last..url.start]));
            }
            let url_text = &text[url.clone()];
            let a = HtmlElement::inline("a").attr("href", url_text);
            out.push(a.with_children([HtmlNode::text(url_text)]).into_node());
            last = url.end;
        }
        if last < text.len() {
            out.push(HtmlNode::text(&text[last..]));
        }
    } else if !text.is_empty() {
        out.push(HtmlNode::text(text));
    }
    out.push(HtmlNode::text("\n"));
    Ok(out)
}

fn table(node: &BlockTree, fmt: &HtmlFormatter) -> Rendered {
    let mut table = HtmlElement::block("table");
    decorate(&mut table, &node.data.decorators);
    if let Some(summary) = &node.data.decorators.summary {
        match fmt.dialect {
            Dialect::Html4 | Dialect::Xhtml => table.set_attr("summary", summary.as_str()),
            Dialect::Html5 => {
                let caption = HtmlElement::line("caption").with_children([HtmlNode::text(summary.as_str())]);
                table.push(caption.into_node());
            }
        }
    }
    for row in parse_rows(node) {
        let mut tr = HtmlElement::line("tr");
        for cell in &row {
            let tag = match cell.cell_type {
                CellType::Header => "th",
                CellType::Data => "td",
            };
            let mut td = HtmlElement::inline(tag);
            if cell.rowspan > 1 {
                td.set_attr("rowspan", cell.rowspan.to_string());
            }
            if cell.colspan > 1 {
                td.set_attr("colspan", cell.colspan.to_string());
            }
            let content = fmt.visited_result(ElemRef::Inline(&cell.content))?;
            tr.push(td.with_children(content).into_node());
        }
        table.push(tr.into_node());
    }
    Ok(vec![table.into_node()])
}

fn hr(_: &BlockLeaf, _: &HtmlFormatter) -> Rendered {
    Ok(vec![HtmlElement::line("hr").into_node()])
}

fn inline_text(elem: ElemRef<'_>, _: &HtmlFormatter) -> Rendered {
    match elem {
        ElemRef::InlineLeaf(token) => Ok(vec![HtmlNode::text(token.as_str())]),
        _ => Ok(Vec::new()),
    }
}

fn span(node: &InlineTree, fmt: &HtmlFormatter) -> Rendered {
    let tag = match node.kind() {
        InlineKind::Em => "em",
        InlineKind::Strong => "strong",
        _ => "del",
    };
    let content = fmt.visit_inlines(&node.children)?;
    Ok(vec![HtmlElement::inline(tag).with_children(content).into_node()])
}

/// Literal spans keep their contents' markup as text.
fn literal(node: &InlineTree, _: &HtmlFormatter) -> Rendered {
    let code = HtmlElement::inline("code").with_children([HtmlNode::Text(node.to_source())]);
    Ok(vec![code.into_node()])
}

fn link(node: &InlineTree, fmt: &HtmlFormatter) -> Rendered {
    let parts = split_link(node);
    let caption = match parts.caption {
        Some(caption) if !caption.is_empty() => Some(caption),
        _ => None,
    };
    if !parts.has_destination() {
        return match caption {
            Some(caption) => fmt.visit_inlines(caption),
            None => Ok(Vec::new()),
        };
    }
    if parts.is_image {
        let alt = caption.map_or_else(|| parts.destination.clone(), plain_text_of);
        let img = HtmlElement::inline("img")
            .attr("src", parts.destination.as_str())
            .attr("alt", alt);
        return Ok(vec![img.into_node()]);
    }
    let text = match caption {
        Some(caption) => fmt.visit_inlines(caption)?,
        None => vec![HtmlNode::text(parts.destination.as_str())],
    };
    let a = HtmlElement::inline("a").attr("href", parts.destination.as_str());
    Ok(vec![a.with_children(text).into_node()])
}

fn plugin_call(node: &InlineTree, fmt: &HtmlFormatter) -> Rendered {
    Ok(fmt.plugin_nodes(plugin::apply(&node.to_source())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn html(dialect: Dialect, wiki: &str) -> String {
        let tree = BlockParser::new().parse_str(wiki);
        HtmlFormatter::new(dialect).format(&tree).unwrap()
    }

    fn html4(wiki: &str) -> String {
        html(Dialect::Html4, wiki)
    }

    #[test]
    fn heading_and_paragraph() {
        assert_eq!(
            html4("!heading\nparagraph text."),
            indoc! {r#"
                <div class="section h1">
                <h1>heading</h1>
                <p>
                paragraph text.
                </p>
                <!-- end of section h1 -->
                </div>
            "#}
        );
    }

    #[test]
    fn html5_section() {
        assert_eq!(
            html(Dialect::Html5, "!!sub"),
            indoc! {r#"
                <section class="h2">
                <h2>sub</h2>
                <!-- end of section h2 -->
                </section>
            "#}
        );
    }

    #[test]
    fn heading_id_goes_on_the_heading() {
        assert_eq!(
            html4("//@class: intro\n![top]Top"),
            indoc! {r#"
                <div class="section h1 intro">
                <h1 id="top">Top</h1>
                <!-- end of section h1 -->
                </div>
            "#}
        );
    }

    #[test]
    fn nested_lists() {
        assert_eq!(
            html4("*item1\n**item2\n*item3"),
            indoc! {r#"
                <ul>
                <li>item1
                <ul>
                <li>item2
                </li>
                </ul>
                </li>
                <li>item3
                </li>
                </ul>
            "#}
        );
    }

    #[test]
    fn enum_list_with_item_id() {
        assert_eq!(
            html4("#[first]one\n#two"),
            indoc! {r#"
                <ol>
                <li id="first">one
                </li>
                <li>two
                </li>
                </ol>
            "#}
        );
    }

    #[test]
    fn inline_markup() {
        assert_eq!(
            html4("a ''em'' '''strong''' ==del== ``lit ''x''`` [[FrontPage]] [[cap|http://x.example/]]"),
            indoc! {r#"
                <p>
                a <em>em</em> <strong>strong</strong> <del>del</del> <code>lit ''x''</code> <a href="FrontPage">FrontPage</a> <a href="http://x.example/">cap</a>
                </p>
            "#}
        );
    }

    #[test]
    fn images_by_dialect() {
        assert_eq!(
            html(Dialect::Xhtml, "[[logo|http://x.example/a.png]]"),
            "<p>\n<img src=\"http://x.example/a.png\" alt=\"logo\" />\n</p>\n"
        );
        assert_eq!(
            html4("[[logo|http://x.example/a.png]]"),
            "<p>\n<img src=\"http://x.example/a.png\" alt=\"logo\">\n</p>\n"
        );
    }

    #[test]
    fn link_without_destination_is_its_caption() {
        assert_eq!(html4("[[just text|]]"), "<p>\njust text\n</p>\n");
    }

    #[test]
    fn escaping() {
        assert_eq!(html4("a < b & \"c\""), "<p>\na &lt; b &amp; &quot;c&quot;\n</p>\n");
    }

    #[test]
    fn description_list() {
        assert_eq!(
            html4(":term:the description\n::no term"),
            indoc! {r#"
                <dl>
                <dt>term</dt>
                <dd>the description</dd>
                <dd>no term</dd>
                </dl>
            "#}
        );
    }

    #[test]
    fn quote() {
        assert_eq!(
            html4("\"\"quoted\n\"\"more"),
            "<blockquote>\n<p>\nquoted\nmore\n</p>\n</blockquote>\n"
        );
    }

    #[test]
    fn verbatim_block_with_language() {
        let wiki = indoc! {r#"
            //@code: rust
            <<<
            fn main() {}
              <b>
            >>>
        "#};
        assert_eq!(
            html4(wiki),
            "<pre class=\"language-rust\">\nfn main() {}\n  &lt;b&gt;\n</pre>\n"
        );
    }

    #[test]
    fn verbatim_urls() {
        let tree = BlockParser::new().parse_str(" see http://x.example/ now");
        let fmt = HtmlFormatter::new(Dialect::Html4);
        assert_eq!(fmt.format(&tree).unwrap(), "<pre>\nsee http://x.example/ now\n</pre>\n");

        let linked = "<pre>\nsee <a href=\"http://x.example/\">http://x.example/</a> now\n</pre>\n";
        assert_eq!(fmt.clone().with_auto_link_in_verbatim(true).format(&tree).unwrap(), linked);
        let options = crate::output::FormatOptionsBuilder::default()
            .auto_link_in_verbatim(true)
            .build()
            .unwrap();
        assert_eq!(fmt.format_with(&tree, &options).unwrap(), linked);
    }

    #[test]
    fn tables() {
        assert_eq!(
            html4("//@summary: numbers\n||!a||>b\n||^c||d||e\n||f||g"),
            indoc! {r#"
                <table summary="numbers">
                <tr><th>a</th><td colspan="2">b</td></tr>
                <tr><td rowspan="2">c</td><td>d</td><td>e</td></tr>
                <tr><td>f</td><td>g</td></tr>
                </table>
            "#}
        );
        assert_eq!(
            html(Dialect::Html5, "//@summary: numbers\n||a"),
            "<table>\n<caption>numbers</caption>\n<tr><td>a</td></tr>\n</table>\n"
        );
    }

    #[test]
    fn hr_and_comments() {
        assert_eq!(html4("----\n// hidden"), "<hr>\n");
        assert_eq!(html(Dialect::Xhtml, "----"), "<hr />\n");
    }

    #[test]
    fn plugins() {
        assert_eq!(
            html4("{{sq(m)}} {{co2}} {{anchor(here,Here)}}"),
            "<p>\nm<sup>2</sup> CO<sub>2</sub> <a name=\"here\" href=\"#here\">Here</a>\n</p>\n"
        );
        assert_eq!(html4("{{html(<b>x</b>)}}"), "<p>\n<b>x</b>\n</p>\n");
        assert_eq!(
            html4("{{nope 1 < 2}}"),
            "<p>\n<span class=\"plugin\">nope 1 &lt; 2</span>\n</p>\n"
        );
    }

    #[test]
    fn decorators_on_paragraphs() {
        assert_eq!(
            html4("//@class: note\n//@id: n1\ntext"),
            "<p class=\"note\" id=\"n1\">\ntext\n</p>\n"
        );
    }
}

//! Markdown event stream to syntax tree
//!
//! pulldown-cmark produces a flat event stream. The converter needs whole
//! subtrees (a list item's nested content, a quote's paragraphs), so the
//! events are first folded into a small tree.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Inline content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link { url: String, children: Vec<Inline> },
    Image { url: String },
    InlineMath(String),
    DisplayMath(String),
    SoftBreak,
    HardBreak,
}

/// Block-level node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    /// `start` is set for ordered lists
    List { start: Option<u64>, items: Vec<ListItem> },
    CodeBlock { info: String, text: String },
    BlockQuote(Vec<Node>),
    Rule,
    /// The head is a flat cell list; each body row is a list of cells
    Table {
        head: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    Html(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListItem {
    /// Checkbox state of task list items
    pub task: Option<bool>,
    pub children: Vec<Node>,
}

/// Parse Markdown with the extensions the block schema can represent
pub fn parse(markdown: &str) -> Vec<Node> {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_MATH;
    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(markdown, options) {
        builder.process_event(event);
    }
    builder.finish()
}

/// Open block container
enum Frame {
    Root(Vec<Node>),
    Quote(Vec<Node>),
    List {
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    Item(ListItem),
    Table {
        head: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
        row: Vec<Vec<Inline>>,
    },
}

/// Block that collects inline content
#[derive(Clone, Copy)]
enum InlineTarget {
    Paragraph,
    /// Text of a tight list item, which has no paragraph events
    ItemText,
    Heading(u8),
    Cell,
}

enum InlineKind {
    Root(InlineTarget),
    Strong,
    Emphasis,
    Strikethrough,
    Link(String),
    /// Alt text is collected and discarded
    Image(String),
}

struct InlineFrame {
    kind: InlineKind,
    children: Vec<Inline>,
}

struct TreeBuilder {
    frames: Vec<Frame>,
    inlines: Vec<InlineFrame>,
    code: Option<(String, String)>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            frames: vec![Frame::Root(Vec::new())],
            inlines: Vec::new(),
            code: None,
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.handle_start_tag(tag),
            Event::End(tag_end) => self.handle_end_tag(tag_end),
            Event::Text(text) => {
                if let Some((_, ref mut code)) = self.code {
                    code.push_str(&text);
                } else {
                    self.push_inline(Inline::Text(text.to_string()));
                }
            }
            Event::Code(code) => self.push_inline(Inline::Code(code.to_string())),
            Event::InlineMath(math) => self.push_inline(Inline::InlineMath(math.to_string())),
            Event::DisplayMath(math) => self.push_inline(Inline::DisplayMath(math.to_string())),
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Html(html) => self.push_node(Node::Html(html.to_string())),
            Event::InlineHtml(html) => log::debug!("Dropping inline HTML {:?}", html),
            Event::Rule => self.push_node(Node::Rule),
            Event::TaskListMarker(checked) => self.mark_task(checked),
            Event::FootnoteReference(name) => log::debug!("Dropping footnote reference {}", name),
        }
    }

    fn handle_start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.open_inline(InlineTarget::Paragraph),
            Tag::Heading { level, .. } => self.open_inline(InlineTarget::Heading(level as u8)),
            Tag::BlockQuote(_) => self.open_frame(Frame::Quote(Vec::new())),
            Tag::CodeBlock(kind) => {
                self.close_item_text();
                let info = match kind {
                    CodeBlockKind::Fenced(info) => info.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some((info, String::new()));
            }
            Tag::List(start) => self.open_frame(Frame::List {
                start,
                items: Vec::new(),
            }),
            Tag::Item => self.open_frame(Frame::Item(ListItem::default())),
            Tag::Table(_) => self.open_frame(Frame::Table {
                head: Vec::new(),
                rows: Vec::new(),
                row: Vec::new(),
            }),
            Tag::TableCell => self.open_inline(InlineTarget::Cell),
            Tag::Emphasis => self.open_span(InlineKind::Emphasis),
            Tag::Strong => self.open_span(InlineKind::Strong),
            Tag::Strikethrough => self.open_span(InlineKind::Strikethrough),
            Tag::Link { dest_url, .. } => self.open_span(InlineKind::Link(dest_url.to_string())),
            Tag::Image { dest_url, .. } => self.open_span(InlineKind::Image(dest_url.to_string())),
            // Superscript, subscript, footnotes, definition lists and
            // metadata have no block schema counterpart; their text still
            // flows through as plain runs
            _ => {}
        }
    }

    fn handle_end_tag(&mut self, tag_end: TagEnd) {
        match tag_end {
            TagEnd::Paragraph | TagEnd::Heading(_) => self.close_inline(),
            TagEnd::TableCell => self.close_inline(),
            TagEnd::CodeBlock => {
                if let Some((info, text)) = self.code.take() {
                    self.push_node(Node::CodeBlock { info, text });
                }
            }
            TagEnd::BlockQuote(_) => {
                if let Some(Frame::Quote(children)) = self.pop_frame() {
                    self.push_node(Node::BlockQuote(children));
                }
            }
            TagEnd::List(_) => {
                if let Some(Frame::List { start, items }) = self.pop_frame() {
                    self.push_node(Node::List { start, items });
                }
            }
            TagEnd::Item => {
                self.close_item_text();
                if let Some(Frame::Item(item)) = self.pop_frame() {
                    if let Some(Frame::List { items, .. }) = self.frames.last_mut() {
                        items.push(item);
                    }
                }
            }
            TagEnd::TableHead => {
                if let Some(Frame::Table { head, row, .. }) = self.frames.last_mut() {
                    *head = std::mem::take(row);
                }
            }
            TagEnd::TableRow => {
                if let Some(Frame::Table { rows, row, .. }) = self.frames.last_mut() {
                    rows.push(std::mem::take(row));
                }
            }
            TagEnd::Table => {
                if let Some(Frame::Table { head, rows, .. }) = self.pop_frame() {
                    self.push_node(Node::Table { head, rows });
                }
            }
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::Image => self.close_span(),
            _ => {}
        }
    }

    fn open_frame(&mut self, frame: Frame) {
        self.close_item_text();
        self.frames.push(frame);
    }

    fn pop_frame(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    fn open_inline(&mut self, target: InlineTarget) {
        self.close_item_text();
        self.inlines.push(InlineFrame {
            kind: InlineKind::Root(target),
            children: Vec::new(),
        });
    }

    fn open_span(&mut self, kind: InlineKind) {
        self.ensure_inline_root();
        self.inlines.push(InlineFrame {
            kind,
            children: Vec::new(),
        });
    }

    fn close_span(&mut self) {
        let Some(frame) = self.inlines.pop() else {
            return;
        };
        let inline = match frame.kind {
            InlineKind::Strong => Inline::Strong(frame.children),
            InlineKind::Emphasis => Inline::Emphasis(frame.children),
            InlineKind::Strikethrough => Inline::Strikethrough(frame.children),
            InlineKind::Link(url) => Inline::Link {
                url,
                children: frame.children,
            },
            InlineKind::Image(url) => Inline::Image { url },
            InlineKind::Root(_) => {
                // Unbalanced stream; put the root back and ignore the end tag
                self.inlines.push(frame);
                return;
            }
        };
        self.push_inline(inline);
    }

    /// Close the innermost inline root and attach its block
    fn close_inline(&mut self) {
        // Spans left open by a malformed stream fold into their parents
        while matches!(self.inlines.last(), Some(frame) if !matches!(frame.kind, InlineKind::Root(_)))
        {
            self.close_span();
        }

        let Some(InlineFrame {
            kind: InlineKind::Root(target),
            children,
        }) = self.inlines.pop()
        else {
            return;
        };

        match target {
            InlineTarget::Paragraph | InlineTarget::ItemText => {
                self.push_node(Node::Paragraph(children))
            }
            InlineTarget::Heading(level) => self.push_node(Node::Heading {
                level,
                content: children,
            }),
            InlineTarget::Cell => {
                if let Some(Frame::Table { row, .. }) = self.frames.last_mut() {
                    row.push(children);
                }
            }
        }
    }

    /// Inline content outside any inline root belongs to a tight list item
    fn ensure_inline_root(&mut self) {
        if self.inlines.is_empty() {
            self.inlines.push(InlineFrame {
                kind: InlineKind::Root(InlineTarget::ItemText),
                children: Vec::new(),
            });
        }
    }

    fn close_item_text(&mut self) {
        let open = self
            .inlines
            .first()
            .is_some_and(|frame| matches!(frame.kind, InlineKind::Root(InlineTarget::ItemText)));
        if open {
            while self.inlines.len() > 1 {
                self.close_span();
            }
            self.close_inline();
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        self.ensure_inline_root();
        if let Some(frame) = self.inlines.last_mut() {
            frame.children.push(inline);
        }
    }

    fn push_node(&mut self, node: Node) {
        self.close_item_text();
        match self.frames.last_mut() {
            Some(Frame::Root(children)) | Some(Frame::Quote(children)) => children.push(node),
            Some(Frame::Item(item)) => item.children.push(node),
            _ => log::debug!("Dropping block outside a container: {:?}", node),
        }
    }

    fn mark_task(&mut self, checked: bool) {
        let item = self.frames.iter_mut().rev().find_map(|frame| match frame {
            Frame::Item(item) => Some(item),
            _ => None,
        });
        if let Some(item) = item {
            item.task = Some(checked);
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while !self.inlines.is_empty() {
            self.close_inline();
        }
        while self.frames.len() > 1 {
            match self.pop_frame() {
                Some(Frame::Quote(children)) => self.push_node(Node::BlockQuote(children)),
                Some(Frame::List { start, items }) => self.push_node(Node::List { start, items }),
                _ => {}
            }
        }
        match self.frames.pop() {
            Some(Frame::Root(children)) => children,
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn test_parse_heading_and_paragraph() {
        // Arrange
        let markdown = "# Title\n\nHello **world**";

        // Act
        let nodes = parse(markdown);

        // Assert
        assert_eq!(
            nodes,
            vec![
                Node::Heading {
                    level: 1,
                    content: vec![text("Title")]
                },
                Node::Paragraph(vec![text("Hello "), Inline::Strong(vec![text("world")])]),
            ]
        );
    }

    #[test]
    fn test_parse_tight_list_gets_implicit_paragraph() {
        let nodes = parse("- a\n- b\n    - c\n");

        let Node::List { start, items } = &nodes[0] else {
            panic!("expected list, got {:?}", nodes);
        };
        assert_eq!(*start, None);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].children, vec![Node::Paragraph(vec![text("a")])]);
        assert_eq!(items[1].children.len(), 2);
        assert!(matches!(items[1].children[1], Node::List { .. }));
    }

    #[test]
    fn test_parse_ordered_list_start() {
        let nodes = parse("3. x\n4. y\n");
        assert!(matches!(&nodes[0], Node::List { start: Some(3), items } if items.len() == 2));
    }

    #[test]
    fn test_parse_task_items() {
        let nodes = parse("- [x] done\n- [ ] open\n");
        let Node::List { items, .. } = &nodes[0] else {
            panic!("expected list");
        };
        assert_eq!(items[0].task, Some(true));
        assert_eq!(items[1].task, Some(false));
        assert_eq!(items[0].children, vec![Node::Paragraph(vec![text("done")])]);
    }

    #[test]
    fn test_parse_code_block() {
        let nodes = parse("```Rust\nfn main() {}\n```\n");
        assert_eq!(
            nodes,
            vec![Node::CodeBlock {
                info: "Rust".to_string(),
                text: "fn main() {}\n".to_string()
            }]
        );
    }

    #[test]
    fn test_parse_table_head_is_flat() {
        let nodes = parse("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert_eq!(
            nodes,
            vec![Node::Table {
                head: vec![vec![text("a")], vec![text("b")]],
                rows: vec![vec![vec![text("1")], vec![text("2")]]],
            }]
        );
    }

    #[test]
    fn test_parse_image_and_link() {
        let nodes = parse("see [docs](https://x.io) ![alt](./pic.png)");
        assert_eq!(
            nodes,
            vec![Node::Paragraph(vec![
                text("see "),
                Inline::Link {
                    url: "https://x.io".to_string(),
                    children: vec![text("docs")]
                },
                text(" "),
                Inline::Image {
                    url: "./pic.png".to_string()
                },
            ])]
        );
    }

    #[test]
    fn test_parse_quote_and_rule() {
        let nodes = parse("> quoted\n\n---\n");
        assert_eq!(
            nodes,
            vec![
                Node::BlockQuote(vec![Node::Paragraph(vec![text("quoted")])]),
                Node::Rule
            ]
        );
    }

    #[test]
    fn test_parse_math() {
        let nodes = parse("$$x^2$$\n");
        assert_eq!(
            nodes,
            vec![Node::Paragraph(vec![Inline::DisplayMath("x^2".to_string())])]
        );
    }
}

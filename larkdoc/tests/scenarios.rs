//! End-to-end conversion and rendering scenarios

use larkdoc::api::{BitableField, BitableRecord, TableFormat};
use larkdoc::model::{
    Block, BlockMap, FileBody, ImageBody, MentionUser, MergeInfo, TableBody, TableProperty,
    TextBlockStyle, TextBody, TextElement, TokenBody,
};
use larkdoc::render::{format_grid, reconstruct_grid};
use larkdoc::schema::BlockType;
use larkdoc::write::{write_markdown, MarkdownInput, SettlePolicy, WriteOptions};
use larkdoc::{
    convert_markdown, render_blocks, render_document, DocumentApi, MemoryStore, RenderOptions,
};
use std::path::PathBuf;
use std::time::Duration;

fn text_block(id: &str, block_type: BlockType, text: &str, style: Option<TextBlockStyle>) -> Block {
    let mut block = Block::new(id, block_type);
    block.parent_id = Some("doc".to_string());
    let elements = vec![TextElement::text(text)];
    block.set_text_body(match style {
        Some(style) => TextBody::with_style(elements, style),
        None => TextBody::new(elements),
    });
    block
}

fn page(children: &[&str]) -> Block {
    let mut page = Block::new("doc", BlockType::Page);
    page.set_text_body(TextBody::new(vec![TextElement::text("Doc")]));
    page.children = children.iter().map(|id| id.to_string()).collect();
    page
}

fn sequence(seq: &str) -> Option<TextBlockStyle> {
    Some(TextBlockStyle {
        sequence: Some(seq.to_string()),
        ..TextBlockStyle::default()
    })
}

#[test]
fn test_heading_and_bold_paragraph_convert() {
    // Arrange
    let markdown = "# Title\n\nHello **world**";

    // Act
    let conversion = convert_markdown(markdown);

    // Assert
    assert_eq!(conversion.blocks.len(), 2);
    assert_eq!(conversion.blocks[0].block_type, BlockType::Heading(1));
    assert_eq!(conversion.blocks[1].block_type, BlockType::Text);

    let elements = conversion.blocks[1].elements().unwrap();
    let text: String = elements.iter().map(TextElement::plain_text).collect();
    assert_eq!(text, "Hello world");
    for element in elements {
        let TextElement::TextRun(run) = element else {
            panic!("expected text runs");
        };
        assert_eq!(run.style().bold, run.content == "world");
    }
}

#[test]
fn test_merged_header_row_reconstructs_three_cells() {
    // Arrange
    let merge_info = [
        MergeInfo::new(1, 2),
        MergeInfo::new(1, 1),
        MergeInfo::new(1, 1),
        MergeInfo::new(1, 1),
    ];
    let cells = ["top".to_string(), "a".to_string(), "b".to_string()];

    // Act
    let grid = reconstruct_grid(2, 2, &merge_info, &cells);

    // Assert
    let origins: Vec<_> = grid
        .origins()
        .map(|(r, c, cell)| (r, c, cell.content.as_str(), cell.row_span, cell.col_span))
        .collect();
    assert_eq!(
        origins,
        vec![(0, 0, "top", 1, 2), (1, 0, "a", 1, 1), (1, 1, "b", 1, 1)]
    );
    assert_eq!(
        format_grid(&grid, TableFormat::Html),
        "<table>\n<tr><td colspan=\"2\">top</td></tr>\n<tr><td>a</td><td>b</td></tr>\n</table>"
    );
}

#[test]
fn test_merged_table_block_renders() {
    // Arrange
    let mut table = Block::new("tbl", BlockType::Table);
    table.parent_id = Some("doc".to_string());
    table.children = vec!["c1".into(), "c2".into(), "c3".into()];
    table.table = Some(TableBody {
        property: TableProperty {
            row_size: 2,
            column_size: 2,
            merge_info: vec![
                MergeInfo::new(1, 2),
                MergeInfo::new(1, 1),
                MergeInfo::new(1, 1),
                MergeInfo::new(1, 1),
            ],
            header_row: None,
        },
        cells: table.children.clone(),
    });
    let mut blocks = vec![page(&["tbl"]), table];
    for (cell, text) in [("c1", "top"), ("c2", "a"), ("c3", "b")] {
        let mut cell_block = Block::new(cell, BlockType::TableCell);
        cell_block.parent_id = Some("tbl".to_string());
        cell_block.children = vec![format!("{}t", cell)];
        let mut content = text_block(&format!("{}t", cell), BlockType::Text, text, None);
        content.parent_id = Some(cell.to_string());
        blocks.push(cell_block);
        blocks.push(content);
    }
    let map = BlockMap::from_blocks(blocks);

    // Act
    let markdown = render_blocks(&map, &MemoryStore::new(), &RenderOptions::default());

    // Assert
    assert_eq!(markdown, "# Doc\n\n| top |  |\n|---|---|\n| a | b |");
}

#[test]
fn test_auto_sequences_number_consecutively() {
    // Arrange
    let blocks = vec![
        page(&["o1", "o2", "o3"]),
        text_block("o1", BlockType::Ordered, "a", sequence("1")),
        text_block("o2", BlockType::Ordered, "b", sequence("auto")),
        text_block("o3", BlockType::Ordered, "c", None),
    ];

    // Act
    let markdown = render_blocks(
        &BlockMap::from_blocks(blocks),
        &MemoryStore::new(),
        &RenderOptions::default(),
    );

    // Assert
    assert_eq!(markdown, "# Doc\n\n1. a\n\n2. b\n\n3. c");
}

#[test]
fn test_local_and_remote_images_convert() {
    // Act
    let local = convert_markdown("![alt](./pic.png)");
    let remote = convert_markdown("![alt](https://host/pic.png)");

    // Assert
    assert_eq!(local.image_paths, vec!["./pic.png"]);
    assert_eq!(local.blocks.len(), 1);
    assert_eq!(local.blocks[0].block_type, BlockType::Image);

    assert!(remote.image_paths.is_empty());
    assert_eq!(remote.blocks.len(), 1);
    let text: String = remote.blocks[0]
        .elements()
        .unwrap()
        .iter()
        .map(TextElement::plain_text)
        .collect();
    assert_eq!(text, "![Image](https://host/pic.png)");
}

#[test]
fn test_markdown_survives_write_and_render() {
    // Arrange
    let markdown = "## Setup\n\n\
                    Intro with `code` and *emphasis*.\n\n\
                    - one\n    - nested\n- two\n\n\
                    1. first\n2. second\n\n\
                    ```rust\nfn main() {}\n```\n\n\
                    > quoted\n\n\
                    ---\n";
    let store = MemoryStore::new();
    let doc = store.create_document("Doc", None).unwrap();
    let options = WriteOptions {
        cell_fill_delay: Duration::ZERO,
        settle: SettlePolicy::immediate(),
        ..WriteOptions::default()
    };

    // Act
    write_markdown(&store, &doc, &MarkdownInput::Text(markdown.to_string()), &options).unwrap();
    let rendered = render_document(&store, &doc, &RenderOptions::default()).unwrap();

    // Assert
    assert_eq!(
        rendered,
        "# Doc\n\n\
         ## Setup\n\n\
         Intro with `code` and *emphasis*.\n\n\
         - one\n    - nested\n\n\
         - two\n\n\
         1. first\n\n\
         2. second\n\n\
         ```rust\nfn main() {}\n```\n\n\
         > quoted\n\n\
         ---"
    );
}

#[test]
fn test_block_ids_are_embedded() {
    let blocks = vec![page(&["t1"]), text_block("t1", BlockType::Text, "hi", None)];
    let options = RenderOptions {
        embed_block_ids: true,
        ..RenderOptions::default()
    };

    let markdown = render_blocks(&BlockMap::from_blocks(blocks), &MemoryStore::new(), &options);

    assert_eq!(markdown, "# Doc\n\n<!-- block:t1 -->\nhi\n<!-- /block -->");
}

#[test]
fn test_unreadable_document_fails_render() {
    let store = MemoryStore::new();
    assert!(store.list_document_blocks("nope").is_err());
    assert!(render_document(&store, "nope", &RenderOptions::default()).is_err());
}

#[test]
fn test_embedded_content_renders_through_store() {
    // Arrange
    let store = MemoryStore::new();
    store.add_user("ou_1", "Ann");
    store.add_media("boxcn1", "/tmp/export/assets/boxcn1.png");
    store.add_sheet("shtcn", "s1", vec![
        vec!["A".to_string(), "B".to_string()],
        vec!["1".to_string(), "2".to_string()],
    ]);
    let mut record = BitableRecord::default();
    record.fields.insert("Name".to_string(), serde_json::json!("row"));
    store.add_bitable(
        "bascn",
        "tblx",
        vec![BitableField {
            field_name: "Name".to_string(),
            ui_type: Some("Text".to_string()),
        }],
        vec![record],
    );
    store.add_file_url("boxfile", "https://files/report.pdf");

    let mut mention = Block::new("m", BlockType::Text);
    mention.set_text_body(TextBody::new(vec![
        TextElement::text("by "),
        TextElement::MentionUser(MentionUser {
            user_id: "ou_1".to_string(),
        }),
    ]));
    let mut image = Block::new("i", BlockType::Image);
    image.image = Some(ImageBody {
        token: Some("boxcn1".to_string()),
        ..ImageBody::default()
    });
    let mut sheet = Block::new("s", BlockType::Sheet);
    sheet.sheet = Some(TokenBody {
        token: "shtcn_s1".to_string(),
    });
    let mut bitable = Block::new("b", BlockType::Bitable);
    bitable.bitable = Some(TokenBody {
        token: "bascn_tblx".to_string(),
    });
    let mut file = Block::new("f", BlockType::File);
    file.file = Some(FileBody {
        token: "boxfile".to_string(),
        name: Some("report.pdf".to_string()),
    });
    let blocks = vec![page(&["m", "i", "s", "b", "f"]), mention, image, sheet, bitable, file];
    let options = RenderOptions {
        assets_dir: Some(PathBuf::from("/tmp/export/assets")),
        ..RenderOptions::default()
    };

    // Act
    let markdown = render_blocks(&BlockMap::from_blocks(blocks), &store, &options);

    // Assert
    assert_eq!(
        markdown,
        "# Doc\n\n\
         by @Ann\n\n\
         ![image](assets/boxcn1.png)\n\n\
         | A | B |\n|---|---|\n| 1 | 2 |\n\n\
         | Name |\n|---|\n| row |\n\n\
         📎 [report.pdf](https://files/report.pdf)"
    );
}

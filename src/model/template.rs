//! New-document template, per-type empty blocks, and block id generation.

use super::{
    Align, Block, BlockId, CalloutBlock, CalloutType, CodeBlock, Column, DividerBlock,
    DividerStyle, Document, EmbedBlock, EmbedType, HeadingBlock, HeadingLevel, HeadingStyle,
    ImageBlock, ImageStyle, LayoutBlock, ListBlock, ListItem, ListType, Metadata,
    ParagraphBlock, ParagraphStyle, QuoteBlock, TableBlock, Text, TextAlign,
};
use uuid::Uuid;

/// Produces block ids. `Random` is what editors use; `Sequential` keeps
/// fixtures and tests deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdGenerator {
    #[default]
    Random,
    Sequential { prefix: String, next: u64 },
}

impl IdGenerator {
    pub fn sequential(prefix: impl Into<String>) -> Self {
        IdGenerator::Sequential {
            prefix: prefix.into(),
            next: 1,
        }
    }

    pub fn next_id(&mut self) -> BlockId {
        match self {
            IdGenerator::Random => format!("block-{}", Uuid::new_v4().simple()),
            IdGenerator::Sequential { prefix, next } => {
                let id = format!("{prefix}-{next}");
                *next += 1;
                id
            }
        }
    }
}

/// The kinds of block an editor can create from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockTemplate {
    Paragraph,
    Heading,
    Divider,
    List,
    Checklist,
    Quote,
    Code,
    Callout,
    Table,
    Image,
    Layout,
    Embed,
}

impl BlockTemplate {
    pub const ALL: [BlockTemplate; 12] = [
        BlockTemplate::Paragraph,
        BlockTemplate::Heading,
        BlockTemplate::Divider,
        BlockTemplate::List,
        BlockTemplate::Checklist,
        BlockTemplate::Quote,
        BlockTemplate::Code,
        BlockTemplate::Callout,
        BlockTemplate::Table,
        BlockTemplate::Image,
        BlockTemplate::Layout,
        BlockTemplate::Embed,
    ];

    pub fn key(self) -> &'static str {
        match self {
            BlockTemplate::Paragraph => "paragraph",
            BlockTemplate::Heading => "heading",
            BlockTemplate::Divider => "divider",
            BlockTemplate::List => "list",
            BlockTemplate::Checklist => "checklist",
            BlockTemplate::Quote => "quote",
            BlockTemplate::Code => "code",
            BlockTemplate::Callout => "callout",
            BlockTemplate::Table => "table",
            BlockTemplate::Image => "image",
            BlockTemplate::Layout => "layout",
            BlockTemplate::Embed => "embed",
        }
    }

    /// Looks a template up by menu key; unrecognised keys fall back to a
    /// paragraph.
    pub fn from_key(key: &str) -> Self {
        BlockTemplate::ALL
            .into_iter()
            .find(|template| template.key() == key)
            .unwrap_or(BlockTemplate::Paragraph)
    }

    /// Builds the empty block for this template. Container templates draw
    /// the ids of their seeded children from `ids`.
    pub fn instantiate(self, id: BlockId, ids: &mut IdGenerator) -> Block {
        match self {
            BlockTemplate::Paragraph => empty_paragraph(id),
            BlockTemplate::Heading => Block::Heading(HeadingBlock {
                id,
                level: HeadingLevel(2),
                content: String::new(),
                anchor: None,
                style: Some(HeadingStyle {
                    align: Some(Align::Left),
                }),
            }),
            BlockTemplate::Divider => Block::Divider(DividerBlock {
                id,
                style: Some(DividerStyle::Solid),
            }),
            BlockTemplate::List => Block::List(ListBlock {
                id,
                list_type: ListType::Unordered,
                items: vec![ListItem::new("")],
            }),
            BlockTemplate::Checklist => Block::List(ListBlock {
                id,
                list_type: ListType::Checklist,
                items: vec![ListItem {
                    checked: Some(false),
                    ..ListItem::new("")
                }],
            }),
            BlockTemplate::Quote => Block::Quote(QuoteBlock {
                id,
                content: Text::default(),
                author: Some(String::new()),
                source: Some(String::new()),
            }),
            BlockTemplate::Code => Block::Code(CodeBlock {
                id,
                language: "javascript".to_string(),
                code: String::new(),
                caption: None,
                show_line_numbers: Some(true),
                highlight_lines: Some(Vec::new()),
            }),
            BlockTemplate::Callout => Block::Callout(CalloutBlock {
                id,
                callout_type: CalloutType::Info,
                title: Some("Note".to_string()),
                icon: Some("💡".to_string()),
                content: Text::default(),
            }),
            BlockTemplate::Table => Block::Table(TableBlock {
                id,
                caption: None,
                headers: vec!["Column 1".to_string(), "Column 2".to_string()],
                rows: vec![vec![String::new(), String::new()]],
                style: None,
            }),
            BlockTemplate::Image => Block::Image(ImageBlock {
                id,
                src: String::new(),
                alt: String::new(),
                caption: Some(String::new()),
                width: Some("100%".to_string()),
                style: Some(ImageStyle {
                    align: Some(Align::Center),
                    rounded: Some(false),
                }),
            }),
            BlockTemplate::Layout => Block::Layout(LayoutBlock {
                id,
                columns: vec![
                    Column {
                        width: "1fr".to_string(),
                        content: vec![empty_paragraph(ids.next_id())],
                    },
                    Column {
                        width: "1fr".to_string(),
                        content: vec![empty_paragraph(ids.next_id())],
                    },
                ],
                gap: None,
            }),
            BlockTemplate::Embed => Block::Embed(EmbedBlock {
                id,
                url: String::new(),
                embed_type: EmbedType::Video,
                caption: None,
                aspect_ratio: Some("16:9".to_string()),
            }),
        }
    }
}

fn empty_paragraph(id: BlockId) -> Block {
    Block::Paragraph(ParagraphBlock {
        id,
        content: Text::default(),
        style: Some(ParagraphStyle {
            align: Some(TextAlign::Left),
            indent: Some(0.0),
        }),
    })
}

impl Document {
    /// A fresh document seeded with a title heading and an empty paragraph.
    pub fn new_template(title: impl Into<String>, ids: &mut IdGenerator) -> Self {
        let title = title.into();
        let heading = Block::Heading(HeadingBlock {
            id: ids.next_id(),
            level: HeadingLevel(1),
            content: title.clone(),
            anchor: None,
            style: None,
        });
        let paragraph = Block::Paragraph(ParagraphBlock {
            id: ids.next_id(),
            content: Text::default(),
            style: None,
        });
        Document::new(
            Metadata {
                title,
                ..Metadata::default()
            },
            vec![heading, paragraph],
        )
    }
}

use nova_doc::model::{
    Align, Block, Borders, CalloutBlock, CalloutType, CodeBlock, Colors, Column, DividerBlock,
    DividerStyle, EmbedBlock, EmbedType, HeaderStyle, HeadingBlock, HeadingLevel, HeadingStyle,
    ImageBlock, ImageStyle, LayoutBlock, ListBlock, ListItem, ListType, ParagraphBlock,
    ParagraphStyle, QuoteBlock, Spacing, TableBlock, TableStyle, Text, TextAlign, TextSegment,
    Theme, Typography,
};
use nova_doc::{Document, FormatError, Metadata};
use proptest::collection::vec;
use proptest::option::of;
use proptest::prelude::*;
use serde_json::Value;

const SAMPLE: &str = include_str!("fixtures/sample.nova");

#[test]
fn test_fixture_round_trips() {
    let document = Document::parse(SAMPLE).unwrap();
    assert_eq!(document.content.len(), 12);
    assert_eq!(document.metadata.tags.as_deref().map(<[String]>::len), Some(2));

    let reparsed = Document::parse(&document.to_json_pretty()).unwrap();
    assert_eq!(reparsed, document);
    assert_eq!(Document::parse(&document.to_json()).unwrap(), document);
}

#[test]
fn test_unknown_block_survives_verbatim() {
    let original: Value = serde_json::from_str(SAMPLE).unwrap();
    let document = Document::parse(SAMPLE).unwrap();
    let exported = document.to_value();
    assert_eq!(exported["content"][11], original["content"][11]);
    assert_eq!(document.content[11].tag(), "chart");
}

#[test]
fn test_absent_optionals_are_omitted() {
    let document = Document::parse(SAMPLE).unwrap();
    let exported = document.to_value();
    let quote = &exported["content"][7];
    assert!(quote.get("style").is_none());
    let heading = &exported["content"][0];
    assert!(heading.get("style").is_none());
    assert!(exported["metadata"].get("updatedAt").is_none());
}

#[test]
fn test_deep_lookup_and_walk() {
    let document = Document::parse(SAMPLE).unwrap();
    assert!(document.block("review-note").is_some());
    assert!(document.block("right").is_some());
    assert!(document.block("nowhere").is_none());
    assert_eq!(document.walk_blocks().count(), 15);
}

#[test]
fn test_mixed_text_is_rejected() {
    let raw = r#"{
      "version": "1.0",
      "metadata": { "title": "Mixed" },
      "content": [{ "type": "paragraph", "id": "p", "content": ["plain", { "text": "seg" }] }]
    }"#;
    match Document::parse(raw) {
        Err(FormatError::MalformedBlock { id, .. }) => assert_eq!(id.as_deref(), Some("p")),
        other => panic!("Expected malformed block, got {other:?}"),
    }
}

fn text_strategy() -> impl Strategy<Value = Text> {
    prop_oneof![
        "[a-zA-Z0-9 ,.!?é]{0,24}".prop_map(Text::Plain),
        vec(
            ("[a-zA-Z ]{0,12}", any::<bool>(), any::<bool>(), of("[a-z]{1,8}")).prop_map(
                |(text, bold, italic, link)| {
                    let mut segment = TextSegment::new(text);
                    if bold {
                        segment = segment.bold();
                    }
                    if italic {
                        segment = segment.italic();
                    }
                    if let Some(host) = link {
                        segment = segment.linked(format!("https://{host}.example"));
                    }
                    segment
                },
            ),
            1..4,
        )
        .prop_map(Text::Segments),
    ]
}

fn word() -> impl Strategy<Value = String> {
    "[a-zA-Z ]{0,12}"
}

/// Eighths keep generated numbers exact in decimal form.
fn number() -> impl Strategy<Value = f64> {
    (0u32..400).prop_map(|n| f64::from(n) / 8.0)
}

fn align() -> impl Strategy<Value = Align> {
    prop_oneof![Just(Align::Left), Just(Align::Center), Just(Align::Right)]
}

fn list_type() -> impl Strategy<Value = ListType> {
    prop_oneof![
        Just(ListType::Ordered),
        Just(ListType::Unordered),
        Just(ListType::Checklist)
    ]
}

fn heading() -> impl Strategy<Value = Block> {
    (1u8..=6, word(), of(word()), of(of(align())))
        .prop_map(|(level, content, anchor, style)| {
            Block::Heading(HeadingBlock {
                id: String::new(),
                level: HeadingLevel::new(level).unwrap(),
                content,
                anchor,
                style: style.map(|align| HeadingStyle { align }),
            })
        })
}

fn paragraph() -> impl Strategy<Value = Block> {
    let text_align = prop_oneof![
        Just(TextAlign::Left),
        Just(TextAlign::Center),
        Just(TextAlign::Right),
        Just(TextAlign::Justify)
    ];
    (text_strategy(), of((of(text_align), of(number())))).prop_map(|(content, style)| {
        Block::Paragraph(ParagraphBlock {
            id: String::new(),
            content,
            style: style.map(|(align, indent)| ParagraphStyle { align, indent }),
        })
    })
}

fn table() -> impl Strategy<Value = Block> {
    let header_style = prop_oneof![
        Just(HeaderStyle::Row),
        Just(HeaderStyle::Column),
        Just(HeaderStyle::Both),
        Just(HeaderStyle::None)
    ];
    let borders = prop_oneof![
        Just(Borders::All),
        Just(Borders::None),
        Just(Borders::Horizontal),
        Just(Borders::Vertical)
    ];
    (
        of(word()),
        vec(word(), 0..4),
        vec(vec(word(), 0..4), 0..3),
        of((of(header_style), of(any::<bool>()), of(borders))),
    )
        .prop_map(|(caption, headers, rows, style)| {
            Block::Table(TableBlock {
                id: String::new(),
                caption,
                headers,
                rows,
                style: style.map(|(header_style, stripes, borders)| TableStyle {
                    header_style,
                    stripes,
                    borders,
                }),
            })
        })
}

fn code() -> impl Strategy<Value = Block> {
    (
        "[a-z]{1,8}",
        "[ -~\n]{0,40}",
        of(word()),
        of(any::<bool>()),
        of(vec(1u32..20, 0..4)),
    )
        .prop_map(|(language, code, caption, show_line_numbers, highlight_lines)| {
            Block::Code(CodeBlock {
                id: String::new(),
                language,
                code,
                caption,
                show_line_numbers,
                highlight_lines,
            })
        })
}

fn callout() -> impl Strategy<Value = Block> {
    let tone = prop_oneof![
        Just(CalloutType::Info),
        Just(CalloutType::Warning),
        Just(CalloutType::Success),
        Just(CalloutType::Error),
        Just(CalloutType::Note)
    ];
    (tone, of(word()), of("[!?*]{1,2}"), text_strategy()).prop_map(
        |(callout_type, title, icon, content)| {
            Block::Callout(CalloutBlock {
                id: String::new(),
                callout_type,
                title,
                icon,
                content,
            })
        },
    )
}

fn image() -> impl Strategy<Value = Block> {
    (
        "[a-z/]{0,16}",
        word(),
        of(word()),
        of("[0-9]{1,3}%"),
        of((of(align()), of(any::<bool>()))),
    )
        .prop_map(|(src, alt, caption, width, style)| {
            Block::Image(ImageBlock {
                id: String::new(),
                src,
                alt,
                caption,
                width,
                style: style.map(|(align, rounded)| ImageStyle { align, rounded }),
            })
        })
}

fn quote() -> impl Strategy<Value = Block> {
    (text_strategy(), of(word()), of(word())).prop_map(|(content, author, source)| {
        Block::Quote(QuoteBlock {
            id: String::new(),
            content,
            author,
            source,
        })
    })
}

fn divider() -> impl Strategy<Value = Block> {
    of(prop_oneof![
        Just(DividerStyle::Solid),
        Just(DividerStyle::Dashed),
        Just(DividerStyle::Dotted),
        Just(DividerStyle::Thick)
    ])
    .prop_map(|style| {
        Block::Divider(DividerBlock {
            id: String::new(),
            style,
        })
    })
}

fn embed() -> impl Strategy<Value = Block> {
    let embed_type = prop_oneof![
        Just(EmbedType::Video),
        Just(EmbedType::Tweet),
        Just(EmbedType::Iframe),
        Just(EmbedType::Audio)
    ];
    ("[a-z:/.]{0,20}", embed_type, of(word()), of("[1-9]:[1-9]")).prop_map(
        |(url, embed_type, caption, aspect_ratio)| {
            Block::Embed(EmbedBlock {
                id: String::new(),
                url,
                embed_type,
                caption,
                aspect_ratio,
            })
        },
    )
}

fn list(children: impl Strategy<Value = Vec<Block>>) -> impl Strategy<Value = Block> {
    (list_type(), vec((text_strategy(), of(children)), 1..4)).prop_map(|(list_type, items)| {
        Block::List(ListBlock {
            id: String::new(),
            list_type,
            items: items
                .into_iter()
                .map(|(content, children)| ListItem {
                    checked: (list_type == ListType::Checklist).then_some(false),
                    children,
                    ..ListItem::new(content)
                })
                .collect(),
        })
    })
}

fn layout(content: impl Strategy<Value = Vec<Block>>) -> impl Strategy<Value = Block> {
    (vec(("[1-3]fr", content), 0..3), of(number())).prop_map(|(columns, gap)| {
        Block::Layout(LayoutBlock {
            id: String::new(),
            columns: columns
                .into_iter()
                .map(|(width, content)| Column { width, content })
                .collect(),
            gap,
        })
    })
}

/// Any of the eleven block types, with list and layout nesting up to two
/// levels. Ids are left empty and assigned by [`renumber`].
fn any_block() -> impl Strategy<Value = Block> {
    let leaf = prop_oneof![
        heading().boxed(),
        paragraph().boxed(),
        list(Just(Vec::new())).boxed(),
        table().boxed(),
        code().boxed(),
        callout().boxed(),
        image().boxed(),
        quote().boxed(),
        divider().boxed(),
        layout(Just(Vec::new())).boxed(),
        embed().boxed(),
    ];
    leaf.prop_recursive(2, 24, 3, |inner| {
        prop_oneof![
            list(vec(inner.clone(), 0..3)),
            layout(vec(inner, 0..3)),
        ]
    })
}

fn renumber(blocks: &mut [Block], next: &mut usize) {
    for block in blocks {
        let id = format!("b{next}");
        *next += 1;
        match block {
            Block::Heading(b) => b.id = id,
            Block::Paragraph(b) => b.id = id,
            Block::Table(b) => b.id = id,
            Block::Code(b) => b.id = id,
            Block::Callout(b) => b.id = id,
            Block::Image(b) => b.id = id,
            Block::Quote(b) => b.id = id,
            Block::Divider(b) => b.id = id,
            Block::Embed(b) => b.id = id,
            Block::List(b) => {
                b.id = id;
                for item in &mut b.items {
                    if let Some(children) = &mut item.children {
                        renumber(children, next);
                    }
                }
            }
            Block::Layout(b) => {
                b.id = id;
                for column in &mut b.columns {
                    renumber(&mut column.content, next);
                }
            }
            Block::Unknown(_) => {}
        }
    }
}

fn metadata() -> impl Strategy<Value = Metadata> {
    (
        word(),
        of(word()),
        of(word()),
        of(Just("2024-01-15T10:00:00.000Z".to_string())),
        of(vec("[a-z]{1,6}", 0..3)),
        of("[a-z]{2}"),
    )
        .prop_map(|(title, description, author, stamp, tags, language)| Metadata {
            title,
            description,
            author,
            created_at: stamp.clone(),
            updated_at: stamp,
            tags,
            language,
        })
}

fn theme() -> impl Strategy<Value = Theme> {
    let typography = (of(word()), of(word()), of(word()), of(number()), of(number())).prop_map(
        |(font_family, heading_font_family, code_font_family, base_font_size, line_height)| {
            Typography {
                font_family,
                heading_font_family,
                code_font_family,
                base_font_size,
                line_height,
            }
        },
    );
    let colors = (of("#[0-9a-f]{6}"), of("#[0-9a-f]{6}"), of("#[0-9a-f]{6}"), of("#[0-9a-f]{6}"))
        .prop_map(|(primary, background, text, accent)| Colors {
            primary,
            background,
            text,
            accent,
        });
    let spacing = (of(number()), of(number())).prop_map(|(paragraph_spacing, section_spacing)| {
        Spacing {
            paragraph_spacing,
            section_spacing,
        }
    });
    ("[a-z]{1,10}", of(typography), of(colors), of(spacing)).prop_map(
        |(name, typography, colors, spacing)| Theme {
            name,
            typography,
            colors,
            spacing,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(proptest_config::cases()))]
    #[test]
    fn prop_parse_inverts_export(
        blocks in vec(any_block(), 0..8),
        metadata in metadata(),
        theme in of(theme()),
    ) {
        let mut content = blocks;
        renumber(&mut content, &mut 0);
        let mut document = Document::new(metadata, content);
        document.theme = theme;

        let reparsed = Document::parse(&document.to_json_pretty());
        prop_assert_eq!(&reparsed, &Ok(document.clone()));
        prop_assert_eq!(Document::parse(&document.to_json()), Ok(document));
    }
}

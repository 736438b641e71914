//! Render projection: turns blocks into presentation-ready [`Visual`] nodes.
//!
//! Each visual carries fully resolved presentation values. A block's own
//! style fields always win; [`RenderConfig`] (ambient defaults plus the
//! optional document [`Theme`]) only fills the gaps. Layout itself is left
//! to the presentation layer.

use crate::dispatch::{BlockHandler, Dispatched, Dispatcher, Position, UnknownBlockType};
use crate::model::{
    Align, Block, Borders, CalloutBlock, CalloutType, CodeBlock, DividerBlock, DividerStyle,
    Document, EmbedBlock, EmbedType, HeaderStyle, HeadingBlock, ImageBlock, LayoutBlock, Link,
    ListBlock, ListType, ParagraphBlock, QuoteBlock, TableBlock, Text, TextAlign, Theme,
    UnknownBlock,
};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AspectRatio {
    pub width: f64,
    pub height: f64,
}

impl AspectRatio {
    pub const WIDESCREEN: AspectRatio = AspectRatio {
        width: 16.0,
        height: 9.0,
    };

    /// Parses `"W:H"`; both sides must be positive numbers.
    pub fn parse(raw: &str) -> Option<Self> {
        let (width, height) = raw.split_once(':')?;
        let width: f64 = width.trim().parse().ok()?;
        let height: f64 = height.trim().parse().ok()?;
        (width > 0.0 && height > 0.0).then_some(AspectRatio { width, height })
    }

    /// Height as a percentage of width.
    pub fn padding_percent(self) -> f64 {
        self.height / self.width * 100.0
    }
}

/// Ambient rendering context, threaded explicitly through every render call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub theme: Option<Theme>,
    pub heading_align: Align,
    pub paragraph_align: TextAlign,
    pub image_align: Align,
    pub image_width: String,
    pub code_line_numbers: bool,
    pub table_header_style: HeaderStyle,
    pub table_stripes: bool,
    pub table_borders: Borders,
    pub divider_style: DividerStyle,
    pub layout_gap: f64,
    pub embed_aspect: AspectRatio,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theme: None,
            heading_align: Align::Left,
            paragraph_align: TextAlign::Left,
            image_align: Align::Center,
            image_width: "100%".to_string(),
            code_line_numbers: true,
            table_header_style: HeaderStyle::Row,
            table_stripes: false,
            table_borders: Borders::All,
            divider_style: DividerStyle::Solid,
            layout_gap: 2.0,
            embed_aspect: AspectRatio::WIDESCREEN,
        }
    }
}

impl RenderConfig {
    pub fn with_theme(theme: Option<Theme>) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    pub fn for_document(document: &Document) -> Self {
        Self::with_theme(document.theme.clone())
    }

    pub fn font_family(&self) -> Option<&str> {
        self.typography(|t| t.font_family.as_deref())
    }

    /// Heading font, falling back to the body font.
    pub fn heading_font_family(&self) -> Option<&str> {
        self.typography(|t| t.heading_font_family.as_deref())
            .or_else(|| self.font_family())
    }

    pub fn code_font_family(&self) -> Option<&str> {
        self.typography(|t| t.code_font_family.as_deref())
    }

    pub fn text_color(&self) -> Option<&str> {
        self.theme
            .as_ref()
            .and_then(|theme| theme.colors.as_ref())
            .and_then(|colors| colors.text.as_deref())
    }

    pub fn accent_color(&self) -> Option<&str> {
        self.theme
            .as_ref()
            .and_then(|theme| theme.colors.as_ref())
            .and_then(|colors| colors.accent.as_deref())
    }

    pub fn paragraph_spacing(&self) -> Option<f64> {
        self.theme
            .as_ref()
            .and_then(|theme| theme.spacing.as_ref())
            .and_then(|spacing| spacing.paragraph_spacing)
    }

    fn typography<'a>(
        &'a self,
        pick: impl Fn(&'a crate::model::Typography) -> Option<&'a str>,
    ) -> Option<&'a str> {
        self.theme
            .as_ref()
            .and_then(|theme| theme.typography.as_ref())
            .and_then(pick)
    }
}

/// One styled inline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub code: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

/// Inline runs for a text field; a raw string is a single unstyled run.
pub fn runs(text: &Text) -> Vec<Run> {
    match text {
        Text::Plain(text) => vec![Run {
            text: text.clone(),
            ..Run::default()
        }],
        Text::Segments(segments) => segments
            .iter()
            .map(|seg| Run {
                text: seg.text.clone(),
                bold: seg.bold.unwrap_or(false),
                italic: seg.italic.unwrap_or(false),
                underline: seg.underline.unwrap_or(false),
                strikethrough: seg.strikethrough.unwrap_or(false),
                code: seg.code.unwrap_or(false),
                color: seg.color.clone(),
                background: seg.background_color.clone(),
                link: seg.link.clone(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Marker {
    Number { value: usize },
    Bullet,
    Checkbox { checked: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualItem {
    pub marker: Marker,
    pub runs: Vec<Run>,
    pub children: Vec<Visual>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualColumn {
    pub width: String,
    pub children: Vec<Visual>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<usize>,
    pub text: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Visual {
    Heading {
        id: String,
        level: u8,
        text: String,
        anchor: Option<String>,
        align: Align,
        font_family: Option<String>,
    },
    Paragraph {
        id: String,
        runs: Vec<Run>,
        align: TextAlign,
        indent: f64,
        spacing: Option<f64>,
    },
    List {
        id: String,
        list_type: ListType,
        items: Vec<VisualItem>,
    },
    Table {
        id: String,
        caption: Option<String>,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        header_style: HeaderStyle,
        striped: bool,
        borders: Borders,
    },
    Code {
        id: String,
        language: String,
        caption: Option<String>,
        line_numbers: bool,
        lines: Vec<CodeLine>,
        font_family: Option<String>,
    },
    Callout {
        id: String,
        tone: CalloutType,
        icon: Option<String>,
        title: Option<String>,
        runs: Vec<Run>,
        accent: Option<String>,
    },
    Image {
        id: String,
        src: String,
        alt: String,
        caption: Option<String>,
        width: String,
        align: Align,
        rounded: bool,
    },
    Quote {
        id: String,
        runs: Vec<Run>,
        author: Option<String>,
        source: Option<String>,
    },
    Divider {
        id: String,
        style: DividerStyle,
    },
    Columns {
        id: String,
        gap: f64,
        columns: Vec<VisualColumn>,
    },
    Embed {
        id: String,
        src: String,
        embed_type: EmbedType,
        caption: Option<String>,
        aspect: AspectRatio,
        padding_percent: f64,
    },
}

/// Rewrites YouTube watch and short links to their embeddable form.
pub fn embed_src(url: &str, embed_type: EmbedType) -> String {
    if embed_type != EmbedType::Video {
        return url.to_string();
    }
    if url.contains("youtube.com/watch") {
        let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");
        let video_id = query
            .split(['&', '#'])
            .find_map(|pair| pair.strip_prefix("v="));
        if let Some(video_id) = video_id.filter(|id| !id.is_empty()) {
            return format!("https://www.youtube.com/embed/{video_id}");
        }
    } else if let Some((_, rest)) = url.split_once("youtu.be/") {
        let video_id = rest.split(['?', '#']).next().unwrap_or("");
        if !video_id.is_empty() {
            return format!("https://www.youtube.com/embed/{video_id}");
        }
    }
    url.to_string()
}

struct RenderHandler<'a> {
    config: &'a RenderConfig,
}

impl BlockHandler for RenderHandler<'_> {
    type Output = Option<Visual>;

    fn heading(&mut self, block: &HeadingBlock, _at: Position) -> Self::Output {
        Some(Visual::Heading {
            id: block.id.clone(),
            level: block.level.get(),
            text: block.content.clone(),
            anchor: block.anchor.clone(),
            align: block
                .style
                .as_ref()
                .and_then(|style| style.align)
                .unwrap_or(self.config.heading_align),
            font_family: self.config.heading_font_family().map(str::to_owned),
        })
    }

    fn paragraph(&mut self, block: &ParagraphBlock, _at: Position) -> Self::Output {
        let style = block.style.as_ref();
        Some(Visual::Paragraph {
            id: block.id.clone(),
            runs: runs(&block.content),
            align: style
                .and_then(|style| style.align)
                .unwrap_or(self.config.paragraph_align),
            indent: style.and_then(|style| style.indent).unwrap_or(0.0),
            spacing: self.config.paragraph_spacing(),
        })
    }

    fn list(&mut self, block: &ListBlock, _at: Position) -> Self::Output {
        let items = block
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| VisualItem {
                marker: match block.list_type {
                    ListType::Ordered => Marker::Number { value: index + 1 },
                    ListType::Unordered => Marker::Bullet,
                    ListType::Checklist => Marker::Checkbox {
                        checked: item.checked.unwrap_or(false),
                    },
                },
                runs: runs(&item.content),
                children: Vec::new(),
            })
            .collect();
        Some(Visual::List {
            id: block.id.clone(),
            list_type: block.list_type,
            items,
        })
    }

    fn table(&mut self, block: &TableBlock, _at: Position) -> Self::Output {
        let style = block.style.as_ref();
        Some(Visual::Table {
            id: block.id.clone(),
            caption: block.caption.clone(),
            headers: block.headers.clone(),
            rows: block.rows.clone(),
            header_style: style
                .and_then(|style| style.header_style)
                .unwrap_or(self.config.table_header_style),
            striped: style
                .and_then(|style| style.stripes)
                .unwrap_or(self.config.table_stripes),
            borders: style
                .and_then(|style| style.borders)
                .unwrap_or(self.config.table_borders),
        })
    }

    fn code(&mut self, block: &CodeBlock, _at: Position) -> Self::Output {
        let line_numbers = block
            .show_line_numbers
            .unwrap_or(self.config.code_line_numbers);
        let highlighted: BTreeSet<u32> = block
            .highlight_lines
            .iter()
            .flatten()
            .copied()
            .collect();
        let lines = block
            .code
            .split('\n')
            .enumerate()
            .map(|(index, text)| {
                let number = index + 1;
                CodeLine {
                    number: line_numbers.then_some(number),
                    text: text.to_string(),
                    highlighted: u32::try_from(number)
                        .map(|n| highlighted.contains(&n))
                        .unwrap_or(false),
                }
            })
            .collect();
        Some(Visual::Code {
            id: block.id.clone(),
            language: block.language.clone(),
            caption: block.caption.clone(),
            line_numbers,
            lines,
            font_family: self.config.code_font_family().map(str::to_owned),
        })
    }

    fn callout(&mut self, block: &CalloutBlock, _at: Position) -> Self::Output {
        Some(Visual::Callout {
            id: block.id.clone(),
            tone: block.callout_type,
            icon: block.icon.clone(),
            title: block.title.clone(),
            runs: runs(&block.content),
            accent: self.config.accent_color().map(str::to_owned),
        })
    }

    fn image(&mut self, block: &ImageBlock, _at: Position) -> Self::Output {
        let style = block.style.as_ref();
        Some(Visual::Image {
            id: block.id.clone(),
            src: block.src.clone(),
            alt: block.alt.clone(),
            caption: block.caption.clone().filter(|caption| !caption.is_empty()),
            width: block
                .width
                .clone()
                .unwrap_or_else(|| self.config.image_width.clone()),
            align: style
                .and_then(|style| style.align)
                .unwrap_or(self.config.image_align),
            rounded: style.and_then(|style| style.rounded).unwrap_or(false),
        })
    }

    fn quote(&mut self, block: &QuoteBlock, _at: Position) -> Self::Output {
        Some(Visual::Quote {
            id: block.id.clone(),
            runs: runs(&block.content),
            author: block.author.clone().filter(|author| !author.is_empty()),
            source: block.source.clone().filter(|source| !source.is_empty()),
        })
    }

    fn divider(&mut self, block: &DividerBlock, _at: Position) -> Self::Output {
        Some(Visual::Divider {
            id: block.id.clone(),
            style: block.style.unwrap_or(self.config.divider_style),
        })
    }

    fn layout(&mut self, block: &LayoutBlock, _at: Position) -> Self::Output {
        Some(Visual::Columns {
            id: block.id.clone(),
            gap: block.gap.unwrap_or(self.config.layout_gap),
            columns: block
                .columns
                .iter()
                .map(|column| VisualColumn {
                    width: column.width.clone(),
                    children: Vec::new(),
                })
                .collect(),
        })
    }

    fn embed(&mut self, block: &EmbedBlock, _at: Position) -> Self::Output {
        let aspect = block
            .aspect_ratio
            .as_deref()
            .and_then(AspectRatio::parse)
            .unwrap_or(self.config.embed_aspect);
        Some(Visual::Embed {
            id: block.id.clone(),
            src: embed_src(&block.url, block.embed_type),
            embed_type: block.embed_type,
            caption: block.caption.clone(),
            aspect,
            padding_percent: aspect.padding_percent(),
        })
    }

    fn unknown(&mut self, _block: &UnknownBlock, _at: Position) -> Self::Output {
        None
    }
}

/// Attaches nested projections to the slots of their container.
fn assemble(dispatched: Dispatched<Option<Visual>>) -> Option<Visual> {
    let Dispatched { value, groups } = dispatched;
    let mut visual = value?;
    let nested = groups
        .into_iter()
        .map(|group| group.into_iter().filter_map(assemble).collect::<Vec<_>>());
    match &mut visual {
        Visual::List { items, .. } => {
            for (item, children) in items.iter_mut().zip(nested) {
                item.children = children;
            }
        }
        Visual::Columns { columns, .. } => {
            for (column, children) in columns.iter_mut().zip(nested) {
                column.children = children;
            }
        }
        _ => {}
    }
    Some(visual)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendered {
    pub nodes: Vec<Visual>,
    /// Unknown tags met while rendering; those blocks produced no node.
    pub unknown: Vec<UnknownBlockType>,
}

pub fn render_blocks(blocks: &[Block], config: &RenderConfig) -> Rendered {
    let mut dispatcher = Dispatcher::deep();
    let mut handler = RenderHandler { config };
    let nodes = dispatcher
        .dispatch_all(blocks, &mut handler)
        .into_iter()
        .filter_map(assemble)
        .collect();
    Rendered {
        nodes,
        unknown: dispatcher.take_signals(),
    }
}

pub fn render_block(block: &Block, config: &RenderConfig) -> Option<Visual> {
    render_blocks(std::slice::from_ref(block), config)
        .nodes
        .into_iter()
        .next()
}

/// Renders a whole document. Build `config` with
/// [`RenderConfig::for_document`] to pick up the document's own theme.
pub fn render_document(document: &Document, config: &RenderConfig) -> Rendered {
    render_blocks(&document.content, config)
}

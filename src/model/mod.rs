//! Nova document model.
//!
//! A [`Document`] is a metadata record, an optional [`Theme`], and an ordered
//! sequence of [`Block`]s. Blocks form a closed tagged union keyed by the JSON
//! `type` field; tags this crate does not know are kept verbatim as
//! [`UnknownBlock`] so forward-compatible documents survive a load/save cycle.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub mod template;
pub mod validate;

pub use template::{BlockTemplate, IdGenerator};
pub use validate::FormatError;

/// Format version written by documents created in this crate.
pub const FORMAT_VERSION: &str = "1.0";

pub type BlockId = String;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub version: String,
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    pub content: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typography: Option<Typography>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Colors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<Spacing>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Colors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spacing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_spacing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_spacing: Option<f64>,
}

/// Inline text: either a raw string or a sequence of styled segments.
///
/// The two representations never mix inside one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Text {
    Plain(String),
    Segments(Vec<TextSegment>),
}

impl Text {
    pub fn plain(text: impl Into<String>) -> Self {
        Text::Plain(text.into())
    }

    /// Concatenated text with all formatting discarded.
    pub fn plain_text(&self) -> String {
        match self {
            Text::Plain(text) => text.clone(),
            Text::Segments(segments) => segments.iter().map(|seg| seg.text.as_str()).collect(),
        }
    }

    pub fn has_formatting(&self) -> bool {
        matches!(self, Text::Segments(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Text::Plain(text) => text.is_empty(),
            Text::Segments(segments) => segments.iter().all(|seg| seg.text.is_empty()),
        }
    }
}

impl Default for Text {
    fn default() -> Self {
        Text::Plain(String::new())
    }
}

impl From<&str> for Text {
    fn from(text: &str) -> Self {
        Text::Plain(text.to_string())
    }
}

impl From<String> for Text {
    fn from(text: String) -> Self {
        Text::Plain(text)
    }
}

impl From<Vec<TextSegment>> for Text {
    fn from(segments: Vec<TextSegment>) -> Self {
        Text::Segments(segments)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSegment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

impl TextSegment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = Some(true);
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = Some(true);
        self
    }

    pub fn linked(mut self, href: impl Into<String>) -> Self {
        self.link = Some(Link {
            href: href.into(),
            title: None,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

impl From<Align> for TextAlign {
    fn from(align: Align) -> Self {
        match align {
            Align::Left => TextAlign::Left,
            Align::Center => TextAlign::Center,
            Align::Right => TextAlign::Right,
        }
    }
}

/// Heading level, always within `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&level)
            .then_some(HeadingLevel(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        HeadingLevel::new(level).ok_or_else(|| format!("heading level {level} outside 1..=6"))
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> Self {
        level.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingBlock {
    pub id: BlockId,
    pub level: HeadingLevel,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<HeadingStyle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadingStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphBlock {
    pub id: BlockId,
    pub content: Text,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ParagraphStyle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Ordered,
    Unordered,
    Checklist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBlock {
    pub id: BlockId,
    pub list_type: ListType,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub content: Text,
    /// Only meaningful when the owning list is a checklist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Block>>,
}

impl ListItem {
    pub fn new(content: impl Into<Text>) -> Self {
        Self {
            content: content.into(),
            checked: None,
            children: None,
        }
    }

    pub fn children(&self) -> &[Block] {
        self.children.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderStyle {
    Row,
    Column,
    Both,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Borders {
    All,
    None,
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    pub id: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<TableStyle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_style: Option<HeaderStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borders: Option<Borders>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
    pub id: BlockId,
    pub language: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_line_numbers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_lines: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalloutType {
    Info,
    Warning,
    Success,
    Error,
    Note,
}

impl CalloutType {
    pub fn as_str(self) -> &'static str {
        match self {
            CalloutType::Info => "info",
            CalloutType::Warning => "warning",
            CalloutType::Success => "success",
            CalloutType::Error => "error",
            CalloutType::Note => "note",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalloutBlock {
    pub id: BlockId,
    pub callout_type: CalloutType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub content: Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub id: BlockId,
    pub src: String,
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ImageStyle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounded: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteBlock {
    pub id: BlockId,
    pub content: Text,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DividerStyle {
    Solid,
    Dashed,
    Dotted,
    Thick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividerBlock {
    pub id: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<DividerStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBlock {
    pub id: BlockId,
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub width: String,
    pub content: Vec<Block>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedType {
    Video,
    Tweet,
    Iframe,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedBlock {
    pub id: BlockId,
    pub url: String,
    pub embed_type: EmbedType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

/// A block whose tag this version does not recognise, kept as raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownBlock {
    pub tag: String,
    pub id: Option<BlockId>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading(HeadingBlock),
    Paragraph(ParagraphBlock),
    List(ListBlock),
    Table(TableBlock),
    Code(CodeBlock),
    Callout(CalloutBlock),
    Image(ImageBlock),
    Quote(QuoteBlock),
    Divider(DividerBlock),
    Layout(LayoutBlock),
    Embed(EmbedBlock),
    Unknown(UnknownBlock),
}

/// The eleven known block tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockKind {
    Heading,
    Paragraph,
    List,
    Table,
    Code,
    Callout,
    Image,
    Quote,
    Divider,
    Layout,
    Embed,
}

impl BlockKind {
    pub const ALL: [BlockKind; 11] = [
        BlockKind::Heading,
        BlockKind::Paragraph,
        BlockKind::List,
        BlockKind::Table,
        BlockKind::Code,
        BlockKind::Callout,
        BlockKind::Image,
        BlockKind::Quote,
        BlockKind::Divider,
        BlockKind::Layout,
        BlockKind::Embed,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            BlockKind::Heading => "heading",
            BlockKind::Paragraph => "paragraph",
            BlockKind::List => "list",
            BlockKind::Table => "table",
            BlockKind::Code => "code",
            BlockKind::Callout => "callout",
            BlockKind::Image => "image",
            BlockKind::Quote => "quote",
            BlockKind::Divider => "divider",
            BlockKind::Layout => "layout",
            BlockKind::Embed => "embed",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        BlockKind::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl Block {
    /// Block id; unknown blocks may lack one.
    pub fn id(&self) -> Option<&str> {
        match self {
            Block::Heading(b) => Some(&b.id),
            Block::Paragraph(b) => Some(&b.id),
            Block::List(b) => Some(&b.id),
            Block::Table(b) => Some(&b.id),
            Block::Code(b) => Some(&b.id),
            Block::Callout(b) => Some(&b.id),
            Block::Image(b) => Some(&b.id),
            Block::Quote(b) => Some(&b.id),
            Block::Divider(b) => Some(&b.id),
            Block::Layout(b) => Some(&b.id),
            Block::Embed(b) => Some(&b.id),
            Block::Unknown(b) => b.id.as_deref(),
        }
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id() == Some(id)
    }

    pub fn kind(&self) -> Option<BlockKind> {
        match self {
            Block::Heading(_) => Some(BlockKind::Heading),
            Block::Paragraph(_) => Some(BlockKind::Paragraph),
            Block::List(_) => Some(BlockKind::List),
            Block::Table(_) => Some(BlockKind::Table),
            Block::Code(_) => Some(BlockKind::Code),
            Block::Callout(_) => Some(BlockKind::Callout),
            Block::Image(_) => Some(BlockKind::Image),
            Block::Quote(_) => Some(BlockKind::Quote),
            Block::Divider(_) => Some(BlockKind::Divider),
            Block::Layout(_) => Some(BlockKind::Layout),
            Block::Embed(_) => Some(BlockKind::Embed),
            Block::Unknown(_) => None,
        }
    }

    /// The JSON `type` tag.
    pub fn tag(&self) -> &str {
        match self {
            Block::Unknown(b) => &b.tag,
            known => known.kind().map(BlockKind::tag).unwrap_or_default(),
        }
    }

    /// Nested block sequences owned by this block, in dispatch order:
    /// one group per list item, or one group per layout column.
    pub fn child_groups(&self) -> Vec<&[Block]> {
        match self {
            Block::List(list) => list.items.iter().map(ListItem::children).collect(),
            Block::Layout(layout) => layout
                .columns
                .iter()
                .map(|column| column.content.as_slice())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Block::Unknown(b) => b.raw.clone(),
            known => serde_json::to_value(known).unwrap_or(Value::Null),
        }
    }

    /// Decodes one block from JSON; tags outside the known set become
    /// [`Block::Unknown`].
    pub fn from_value(value: Value) -> Result<Block, serde_json::Error> {
        let Some(tag) = value.get("type").and_then(Value::as_str) else {
            return Err(serde_json::Error::custom("block is missing a string `type`"));
        };
        let block = match BlockKind::from_tag(tag) {
            Some(BlockKind::Heading) => Block::Heading(serde_json::from_value(value)?),
            Some(BlockKind::Paragraph) => Block::Paragraph(serde_json::from_value(value)?),
            Some(BlockKind::List) => Block::List(serde_json::from_value(value)?),
            Some(BlockKind::Table) => Block::Table(serde_json::from_value(value)?),
            Some(BlockKind::Code) => Block::Code(serde_json::from_value(value)?),
            Some(BlockKind::Callout) => Block::Callout(serde_json::from_value(value)?),
            Some(BlockKind::Image) => Block::Image(serde_json::from_value(value)?),
            Some(BlockKind::Quote) => Block::Quote(serde_json::from_value(value)?),
            Some(BlockKind::Divider) => Block::Divider(serde_json::from_value(value)?),
            Some(BlockKind::Layout) => Block::Layout(serde_json::from_value(value)?),
            Some(BlockKind::Embed) => Block::Embed(serde_json::from_value(value)?),
            None => {
                let tag = tag.to_string();
                let id = match value.get("id") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(id)) => Some(id.clone()),
                    Some(_) => return Err(serde_json::Error::custom("block `id` is not a string")),
                };
                Block::Unknown(UnknownBlock {
                    tag,
                    id,
                    raw: value,
                })
            }
        };
        Ok(block)
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedRef<'a> {
    Heading(&'a HeadingBlock),
    Paragraph(&'a ParagraphBlock),
    List(&'a ListBlock),
    Table(&'a TableBlock),
    Code(&'a CodeBlock),
    Callout(&'a CalloutBlock),
    Image(&'a ImageBlock),
    Quote(&'a QuoteBlock),
    Divider(&'a DividerBlock),
    Layout(&'a LayoutBlock),
    Embed(&'a EmbedBlock),
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tagged = match self {
            Block::Heading(b) => TaggedRef::Heading(b),
            Block::Paragraph(b) => TaggedRef::Paragraph(b),
            Block::List(b) => TaggedRef::List(b),
            Block::Table(b) => TaggedRef::Table(b),
            Block::Code(b) => TaggedRef::Code(b),
            Block::Callout(b) => TaggedRef::Callout(b),
            Block::Image(b) => TaggedRef::Image(b),
            Block::Quote(b) => TaggedRef::Quote(b),
            Block::Divider(b) => TaggedRef::Divider(b),
            Block::Layout(b) => TaggedRef::Layout(b),
            Block::Embed(b) => TaggedRef::Embed(b),
            Block::Unknown(b) => return b.raw.serialize(serializer),
        };
        tagged.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Block::from_value(value).map_err(D::Error::custom)
    }
}

/// Depth-first (pre-order) iterator over blocks and all their descendants.
pub struct BlockWalk<'a> {
    stack: Vec<&'a Block>,
}

impl<'a> BlockWalk<'a> {
    pub fn new(blocks: &'a [Block]) -> Self {
        Self {
            stack: blocks.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for BlockWalk<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.stack.pop()?;
        for group in block.child_groups().into_iter().rev() {
            self.stack.extend(group.iter().rev());
        }
        Some(block)
    }
}

pub fn walk_blocks(blocks: &[Block]) -> BlockWalk<'_> {
    BlockWalk::new(blocks)
}

impl Document {
    pub fn new(metadata: Metadata, content: Vec<Block>) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            metadata,
            theme: None,
            content,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        validate::parse(raw)
    }

    pub fn from_value(value: Value) -> Result<Self, FormatError> {
        validate::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Pretty JSON with 2-space indentation.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Every block in reading order, nested descendants included.
    pub fn walk_blocks(&self) -> BlockWalk<'_> {
        BlockWalk::new(&self.content)
    }

    /// Finds a block by id anywhere in the tree.
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.walk_blocks().find(|block| block.has_id(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_plain_and_segments() {
        let plain = Text::plain("Hello world");
        assert_eq!(plain.plain_text(), "Hello world");
        assert!(!plain.has_formatting());

        let segments = Text::Segments(vec![
            TextSegment::new("Hello ").bold(),
            TextSegment::new("world").italic(),
        ]);
        assert_eq!(segments.plain_text(), "Hello world");
        assert!(segments.has_formatting());
    }

    #[test]
    fn test_text_is_empty() {
        assert!(Text::default().is_empty());
        assert!(Text::Segments(vec![TextSegment::new(""), TextSegment::new("")]).is_empty());
        assert!(!Text::Segments(vec![TextSegment::new(""), TextSegment::new("x")]).is_empty());
        assert!(!Text::plain(" ").is_empty());
    }

    #[test]
    fn test_text_deserializes_either_form() {
        let plain: Text = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(plain, Text::plain("abc"));

        let segments: Text =
            serde_json::from_value(json!([{ "text": "a", "bold": true }, { "text": "b" }]))
                .unwrap();
        assert_eq!(segments.plain_text(), "ab");

        assert!(serde_json::from_value::<Text>(json!(["a", { "text": "b" }])).is_err());
    }

    #[test]
    fn test_heading_level_bounds() {
        assert!(HeadingLevel::new(0).is_none());
        assert!(HeadingLevel::new(7).is_none());
        assert_eq!(HeadingLevel::new(3).map(HeadingLevel::get), Some(3));
        assert!(serde_json::from_value::<HeadingLevel>(json!(9)).is_err());
    }

    #[test]
    fn test_block_serializes_type_tag() {
        let block = Block::Divider(DividerBlock {
            id: "d1".into(),
            style: Some(DividerStyle::Dashed),
        });
        assert_eq!(
            block.to_value(),
            json!({ "type": "divider", "id": "d1", "style": "dashed" })
        );
    }

    #[test]
    fn test_unknown_block_preserved_verbatim() {
        let raw = json!({ "type": "chart", "id": "c1", "series": [1, 2, 3] });
        let block = Block::from_value(raw.clone()).unwrap();
        match &block {
            Block::Unknown(unknown) => {
                assert_eq!(unknown.tag, "chart");
                assert_eq!(unknown.id.as_deref(), Some("c1"));
            }
            other => panic!("Expected unknown block, got {other:?}"),
        }
        assert_eq!(block.tag(), "chart");
        assert_eq!(block.to_value(), raw);
    }

    #[test]
    fn test_block_without_type_is_rejected() {
        assert!(Block::from_value(json!({ "id": "x" })).is_err());
        assert!(Block::from_value(json!({ "id": "x", "type": 3 })).is_err());
    }

    #[test]
    fn test_walk_is_preorder() {
        let block: Block = serde_json::from_value(json!({
            "type": "list",
            "id": "l",
            "listType": "unordered",
            "items": [
                { "content": "a", "children": [{ "type": "divider", "id": "d1" }] },
                { "content": "b", "children": [{ "type": "divider", "id": "d2" }] }
            ]
        }))
        .unwrap();
        let tail: Block = serde_json::from_value(json!({ "type": "divider", "id": "d3" })).unwrap();
        let blocks = vec![block, tail];
        let ids: Vec<_> = walk_blocks(&blocks).filter_map(Block::id).collect();
        assert_eq!(ids, vec!["l", "d1", "d2", "d3"]);
    }

    #[test]
    fn test_block_kind_tags_round_trip() {
        for kind in BlockKind::ALL {
            assert_eq!(BlockKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(BlockKind::from_tag("chart"), None);
    }
}

//! Chunk projection: flattens a document into retrieval units.
//!
//! The first chunk always describes the document metadata. After it comes
//! one chunk per top-level block that carries text. Only top-level blocks
//! are chunked: list-item children and layout columns are never visited,
//! so their text does not appear in any chunk.

use crate::dispatch::{BlockHandler, Dispatcher, Position, UnknownBlockType};
use crate::model::{
    CalloutBlock, CodeBlock, DividerBlock, Document, EmbedBlock, HeadingBlock, ImageBlock,
    LayoutBlock, ListBlock, ParagraphBlock, QuoteBlock, TableBlock, UnknownBlock,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use unicode_segmentation::UnicodeSegmentation;

pub const METADATA_CHUNK_ID: &str = "metadata";

/// Approximate token count: one token per four characters, rounded up.
///
/// Counts Unicode scalar values, not bytes. This is a heuristic, not a
/// tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,
    /// Human-readable kind, e.g. `Heading Level 2` or `Code Block`.
    pub label: String,
    /// Block tag, or `metadata` for the leading chunk.
    pub block_type: String,
    pub content: String,
    pub tokens: usize,
    pub metadata: Map<String, Value>,
}

impl Chunk {
    fn new(id: &str, label: impl Into<String>, block_type: &str, content: String) -> Self {
        Self {
            id: id.to_string(),
            label: label.into(),
            block_type: block_type.to_string(),
            tokens: estimate_tokens(&content),
            content,
            metadata: Map::new(),
        }
    }

    /// The first `max` graphemes of the content, with `...` appended when
    /// anything was cut.
    pub fn preview(&self, max: usize) -> String {
        let mut graphemes = self.content.graphemes(true);
        let head: String = graphemes.by_ref().take(max).collect();
        if graphemes.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkStats {
    pub count: usize,
    pub total_tokens: usize,
    pub average_tokens: usize,
}

impl ChunkStats {
    pub fn of(chunks: &[Chunk]) -> Self {
        let count = chunks.len();
        let total_tokens: usize = chunks.iter().map(|chunk| chunk.tokens).sum();
        let average_tokens = if count == 0 {
            0
        } else {
            (total_tokens + count / 2) / count
        };
        Self {
            count,
            total_tokens,
            average_tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Grapheme budget for [`Chunk::preview`] callers.
    pub preview_len: usize,
    pub include_metadata: bool,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            preview_len: 200,
            include_metadata: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub chunks: Vec<Chunk>,
    pub unknown: Vec<UnknownBlockType>,
}

impl Extraction {
    pub fn stats(&self) -> ChunkStats {
        ChunkStats::of(&self.chunks)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChunkExtractor {
    config: ChunkConfig,
}

impl ChunkExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    pub fn extract(&self, document: &Document) -> Extraction {
        let mut chunks = Vec::with_capacity(document.content.len() + 1);
        if self.config.include_metadata {
            chunks.push(metadata_chunk(document));
        }

        let mut dispatcher = Dispatcher::shallow();
        let mut handler = ChunkHandler {
            document_title: &document.metadata.title,
        };
        chunks.extend(
            dispatcher
                .dispatch_all(&document.content, &mut handler)
                .into_iter()
                .filter_map(|dispatched| dispatched.value),
        );

        tracing::debug!(
            title = %document.metadata.title,
            chunks = chunks.len(),
            "extracted chunks"
        );
        Extraction {
            chunks,
            unknown: dispatcher.take_signals(),
        }
    }
}

pub fn extract_chunks(document: &Document) -> Vec<Chunk> {
    ChunkExtractor::new().extract(document).chunks
}

fn metadata_chunk(document: &Document) -> Chunk {
    let meta = &document.metadata;
    let content = format!(
        "Title: {}\nAuthor: {}\nDescription: {}",
        meta.title,
        meta.author.as_deref().unwrap_or("Unknown"),
        meta.description.as_deref().unwrap_or("None"),
    );
    let tags = match meta.tags.as_deref() {
        Some(tags) if !tags.is_empty() => tags.join(", "),
        _ => "none".to_string(),
    };
    let mut chunk = Chunk::new(METADATA_CHUNK_ID, "Document Metadata", "metadata", content);
    chunk.metadata.insert("type".into(), json!("metadata"));
    chunk.metadata.insert("title".into(), json!(meta.title));
    chunk.metadata.insert("author".into(), json!(meta.author));
    chunk.metadata.insert("tags".into(), json!(tags));
    chunk
}

struct ChunkHandler<'a> {
    document_title: &'a str,
}

impl ChunkHandler<'_> {
    fn chunk(
        &self,
        id: &str,
        label: impl Into<String>,
        block_type: &str,
        content: String,
        at: Position,
        extra: impl IntoIterator<Item = (&'static str, Value)>,
    ) -> Option<Chunk> {
        let mut chunk = Chunk::new(id, label, block_type, content);
        chunk
            .metadata
            .insert("documentTitle".into(), json!(self.document_title));
        chunk.metadata.insert("blockIndex".into(), json!(at.index));
        chunk.metadata.insert("blockId".into(), json!(id));
        for (key, value) in extra {
            chunk.metadata.insert(key.to_string(), value);
        }
        Some(chunk)
    }
}

impl BlockHandler for ChunkHandler<'_> {
    type Output = Option<Chunk>;

    fn heading(&mut self, block: &HeadingBlock, at: Position) -> Self::Output {
        self.chunk(
            &block.id,
            format!("Heading Level {}", block.level.get()),
            "heading",
            block.content.clone(),
            at,
            [
                ("level", json!(block.level.get())),
                ("anchor", json!(block.anchor)),
            ],
        )
    }

    fn paragraph(&mut self, block: &ParagraphBlock, at: Position) -> Self::Output {
        self.chunk(
            &block.id,
            "Paragraph",
            "paragraph",
            block.content.plain_text(),
            at,
            [("hasFormatting", json!(block.content.has_formatting()))],
        )
    }

    fn list(&mut self, block: &ListBlock, at: Position) -> Self::Output {
        let content = block
            .items
            .iter()
            .map(|item| item.content.plain_text())
            .collect::<Vec<_>>()
            .join("\n");
        self.chunk(
            &block.id,
            "List",
            "list",
            content,
            at,
            [
                ("listType", json!(block.list_type)),
                ("itemCount", json!(block.items.len())),
            ],
        )
    }

    fn table(&mut self, block: &TableBlock, at: Position) -> Self::Output {
        let content = format!(
            "Table: {}\nHeaders: {}\n{} rows",
            block.caption.as_deref().unwrap_or("Untitled"),
            block.headers.join(", "),
            block.rows.len(),
        );
        self.chunk(
            &block.id,
            "Table",
            "table",
            content,
            at,
            [
                ("caption", json!(block.caption)),
                ("rowCount", json!(block.rows.len())),
                ("columnCount", json!(block.headers.len())),
            ],
        )
    }

    fn code(&mut self, block: &CodeBlock, at: Position) -> Self::Output {
        let content = format!(
            "{}\n\n{}",
            block.caption.as_deref().unwrap_or("Code"),
            block.code
        );
        self.chunk(
            &block.id,
            "Code Block",
            "code",
            content,
            at,
            [
                ("language", json!(block.language)),
                ("caption", json!(block.caption)),
            ],
        )
    }

    fn callout(&mut self, block: &CalloutBlock, at: Position) -> Self::Output {
        let body = block.content.plain_text();
        let content = match block.title.as_deref() {
            Some(title) => format!("{title}: {body}"),
            None => body,
        };
        self.chunk(
            &block.id,
            "Callout",
            "callout",
            content,
            at,
            [
                ("calloutType", json!(block.callout_type)),
                ("title", json!(block.title)),
            ],
        )
    }

    fn image(&mut self, _block: &ImageBlock, _at: Position) -> Self::Output {
        None
    }

    fn quote(&mut self, block: &QuoteBlock, at: Position) -> Self::Output {
        let author = block
            .author
            .as_deref()
            .filter(|author| !author.is_empty())
            .unwrap_or("Unknown");
        let content = format!("\"{}\" - {author}", block.content.plain_text());
        self.chunk(
            &block.id,
            "Quote",
            "quote",
            content,
            at,
            [
                ("author", json!(block.author)),
                ("source", json!(block.source)),
            ],
        )
    }

    fn divider(&mut self, _block: &DividerBlock, _at: Position) -> Self::Output {
        None
    }

    fn layout(&mut self, _block: &LayoutBlock, _at: Position) -> Self::Output {
        None
    }

    fn embed(&mut self, _block: &EmbedBlock, _at: Position) -> Self::Output {
        None
    }

    fn unknown(&mut self, _block: &UnknownBlock, _at: Position) -> Self::Output {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(content: Value) -> Document {
        Document::from_value(json!({
            "version": "1.0",
            "metadata": { "title": "Guide", "author": "Ada", "tags": ["a", "b"] },
            "content": content
        }))
        .unwrap()
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("Hello world"), 3);
        assert_eq!(estimate_tokens("ééééé"), 2);
    }

    #[test]
    fn test_metadata_chunk_first() {
        let doc = document(json!([]));
        let chunks = extract_chunks(&doc);
        assert_eq!(chunks.len(), 1);
        let meta = &chunks[0];
        assert_eq!(meta.id, "metadata");
        assert_eq!(meta.label, "Document Metadata");
        assert_eq!(meta.content, "Title: Guide\nAuthor: Ada\nDescription: None");
        assert_eq!(meta.metadata["tags"], json!("a, b"));
        assert_eq!(meta.metadata["type"], json!("metadata"));
    }

    #[test]
    fn test_block_rules() {
        let doc = document(json!([
            { "type": "code", "id": "c", "language": "rust", "code": "fn x() {}" },
            { "type": "callout", "id": "n", "calloutType": "warning", "content": "careful" },
            { "type": "callout", "id": "t", "calloutType": "info", "title": "Tip", "content": [{ "text": "read" }] },
            { "type": "quote", "id": "q", "content": "To be" },
            { "type": "list", "id": "l", "listType": "ordered", "items": [{ "content": "one" }, { "content": [{ "text": "two", "bold": true }] }] },
            { "type": "table", "id": "tb", "headers": ["a", "b"], "rows": [["1", "2"], ["3", "4"]] },
            { "type": "divider", "id": "d" },
            { "type": "image", "id": "i", "src": "x.png", "alt": "x" },
            { "type": "embed", "id": "e", "url": "https://example.com", "embedType": "iframe" }
        ]));
        let chunks = extract_chunks(&doc);
        let contents: Vec<&str> = chunks[1..].iter().map(|c| c.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "Code\n\nfn x() {}",
                "careful",
                "Tip: read",
                "\"To be\" - Unknown",
                "one\ntwo",
                "Table: Untitled\nHeaders: a, b\n2 rows",
            ]
        );
        let table = &chunks[6];
        assert_eq!(table.metadata["rowCount"], json!(2));
        assert_eq!(table.metadata["columnCount"], json!(2));
        assert_eq!(table.metadata["caption"], Value::Null);
        assert_eq!(table.metadata["blockIndex"], json!(5));
        assert_eq!(chunks[5].metadata["listType"], json!("ordered"));
    }

    #[test]
    fn test_unknown_blocks_signalled_and_skipped() {
        let doc = document(json!([{ "type": "poll", "id": "p" }]));
        let extraction = ChunkExtractor::new().extract(&doc);
        assert_eq!(extraction.chunks.len(), 1);
        assert_eq!(extraction.unknown[0].tag, "poll");
    }

    #[test]
    fn test_metadata_chunk_can_be_disabled() {
        let doc = document(json!([{ "type": "heading", "id": "h", "level": 1, "content": "Hi" }]));
        let extraction = ChunkExtractor::with_config(ChunkConfig {
            include_metadata: false,
            ..ChunkConfig::default()
        })
        .extract(&doc);
        assert_eq!(extraction.chunks.len(), 1);
        assert_eq!(extraction.chunks[0].label, "Heading Level 1");
    }

    #[test]
    fn test_preview_is_grapheme_safe() {
        let mut chunk = Chunk::new("x", "Paragraph", "paragraph", "e\u{301}e\u{301}e\u{301}".into());
        assert_eq!(chunk.preview(2), "e\u{301}e\u{301}...");
        assert_eq!(chunk.preview(3), chunk.content);
        chunk.content = String::new();
        assert_eq!(chunk.preview(0), "");
    }

    #[test]
    fn test_stats() {
        let doc = document(json!([{ "type": "paragraph", "id": "p", "content": "Hello world" }]));
        let stats = ChunkExtractor::new().extract(&doc).stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_tokens, chunks_tokens(&doc));
        assert_eq!(ChunkStats::of(&[]).average_tokens, 0);
    }

    fn chunks_tokens(doc: &Document) -> usize {
        extract_chunks(doc).iter().map(|c| c.tokens).sum()
    }
}

//! nova-doc: the Nova structured document format and its engine.
//!
//! A Nova document is metadata, an optional theme and an ordered tree of
//! typed blocks. This crate provides:
//!
//! - **Document model** - typed blocks, validation on import, lossless JSON export
//! - **Block dispatch** - one exhaustive, tag-driven traversal shared by every projection
//! - **Render projection** - presentation-ready nodes with theme fallback
//! - **Chunk projection** - retrieval chunks with a token estimate
//! - **Editor** - insert/update/delete/move as commands over a pure reducer
//! - **Storage** - a checksummed local document store (optional)
//!
//! # Quick Start
//!
//! ```rust
//! use nova_doc::{Document, Editor, IdGenerator, BlockTemplate, extract_chunks};
//!
//! let doc = Document::new_template("Hello", &mut IdGenerator::default());
//! let mut editor = Editor::from_document(&doc);
//! editor.insert_new(None, BlockTemplate::Callout);
//!
//! let next = editor.commit_now(&doc);
//! let chunks = extract_chunks(&next);
//! assert_eq!(chunks[0].id, "metadata");
//! ```
//!
//! # Features
//!
//! - `storage` - Enables the local document store (on by default)

// Document model, validation and templates
pub mod model;

// Exhaustive block traversal
pub mod dispatch;

// Dispatch consumers
pub mod chunk;
pub mod render;

// Interactive editing
pub mod editor;

// File import/export
pub mod io;

// Optional: local document store
#[cfg(feature = "storage")]
pub mod storage;

pub use model::{
    Align, Block, BlockId, BlockKind, BlockTemplate, Document, FORMAT_VERSION, FormatError,
    IdGenerator, ListItem, ListType, Metadata, Text, TextSegment, Theme, UnknownBlock,
};

pub use dispatch::{BlockHandler, Dispatched, Dispatcher, Position, UnknownBlockType, dispatch};

pub use chunk::{
    Chunk, ChunkConfig, ChunkExtractor, ChunkStats, Extraction, estimate_tokens, extract_chunks,
};

pub use render::{RenderConfig, Rendered, Visual, render_block, render_document};

pub use editor::{
    BlockPatch, Command, Direction, Editor, InvariantViolation, NoOpReason, Outcome,
    SharedEditor, reduce,
};

pub use io::{IoError, download_file_name, read_document, write_document};

#[cfg(feature = "storage")]
pub use storage::{DocumentStore, StoreError, StoredDocument};

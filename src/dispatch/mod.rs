//! Exhaustive, tag-driven traversal over blocks.
//!
//! A [`BlockHandler`] supplies one case per known tag plus `unknown`. The
//! [`Dispatcher`] walks a block depth-first: the block's own case runs
//! first, then (in deep mode) every list item's `children` in item order, or
//! every layout column's `content` in column order. Results come back as a
//! [`Dispatched`] tree that mirrors the containment, so consumers decide
//! whether and how nested projections are attached.
//!
//! Unknown tags are a soft failure: the handler's `unknown` case runs, an
//! [`UnknownBlockType`] signal is recorded, and traversal carries on.

use crate::model::{
    Block, CalloutBlock, CodeBlock, DividerBlock, EmbedBlock, HeadingBlock, ImageBlock,
    LayoutBlock, ListBlock, ParagraphBlock, QuoteBlock, TableBlock, UnknownBlock,
};
use serde::Serialize;

/// Where a block sits relative to the sequence it was dispatched from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// 0 for blocks handed to the dispatcher directly, +1 per container.
    pub depth: usize,
    /// Index within the owning sequence.
    pub index: usize,
}

impl Position {
    pub fn top(index: usize) -> Self {
        Self { depth: 0, index }
    }

    fn nested(self, index: usize) -> Self {
        Self {
            depth: self.depth + 1,
            index,
        }
    }
}

pub trait BlockHandler {
    type Output;

    fn heading(&mut self, block: &HeadingBlock, at: Position) -> Self::Output;
    fn paragraph(&mut self, block: &ParagraphBlock, at: Position) -> Self::Output;
    fn list(&mut self, block: &ListBlock, at: Position) -> Self::Output;
    fn table(&mut self, block: &TableBlock, at: Position) -> Self::Output;
    fn code(&mut self, block: &CodeBlock, at: Position) -> Self::Output;
    fn callout(&mut self, block: &CalloutBlock, at: Position) -> Self::Output;
    fn image(&mut self, block: &ImageBlock, at: Position) -> Self::Output;
    fn quote(&mut self, block: &QuoteBlock, at: Position) -> Self::Output;
    fn divider(&mut self, block: &DividerBlock, at: Position) -> Self::Output;
    fn layout(&mut self, block: &LayoutBlock, at: Position) -> Self::Output;
    fn embed(&mut self, block: &EmbedBlock, at: Position) -> Self::Output;
    /// Fallback for tags outside the known set.
    fn unknown(&mut self, block: &UnknownBlock, at: Position) -> Self::Output;
}

/// Non-fatal signal raised when dispatch meets an unrecognised tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownBlockType {
    pub tag: String,
    pub id: Option<String>,
    pub depth: usize,
}

/// Result of dispatching one block: its own projection plus one group per
/// list item or layout column, each group holding the nested results.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched<R> {
    pub value: R,
    pub groups: Vec<Vec<Dispatched<R>>>,
}

impl<R> Dispatched<R> {
    pub fn leaf(value: R) -> Self {
        Self {
            value,
            groups: Vec::new(),
        }
    }

    /// Own value followed by every nested value, depth-first.
    pub fn flatten(self) -> Vec<R> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<R>) {
        out.push(self.value);
        for group in self.groups {
            for child in group {
                child.flatten_into(out);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Only the blocks handed in; containers are not entered.
    Shallow,
    /// Descend into list-item children and layout columns.
    Deep,
}

#[derive(Debug)]
pub struct Dispatcher {
    depth: Depth,
    signals: Vec<UnknownBlockType>,
}

impl Dispatcher {
    pub fn new(depth: Depth) -> Self {
        Self {
            depth,
            signals: Vec::new(),
        }
    }

    pub fn deep() -> Self {
        Self::new(Depth::Deep)
    }

    pub fn shallow() -> Self {
        Self::new(Depth::Shallow)
    }

    pub fn dispatch<H: BlockHandler>(
        &mut self,
        block: &Block,
        handler: &mut H,
    ) -> Dispatched<H::Output> {
        self.visit(block, handler, Position::default())
    }

    pub fn dispatch_all<H: BlockHandler>(
        &mut self,
        blocks: &[Block],
        handler: &mut H,
    ) -> Vec<Dispatched<H::Output>> {
        blocks
            .iter()
            .enumerate()
            .map(|(index, block)| self.visit(block, handler, Position::top(index)))
            .collect()
    }

    /// Unknown-tag signals recorded so far, in encounter order.
    pub fn signals(&self) -> &[UnknownBlockType] {
        &self.signals
    }

    pub fn take_signals(&mut self) -> Vec<UnknownBlockType> {
        std::mem::take(&mut self.signals)
    }

    fn visit<H: BlockHandler>(
        &mut self,
        block: &Block,
        handler: &mut H,
        at: Position,
    ) -> Dispatched<H::Output> {
        let value = match block {
            Block::Heading(b) => handler.heading(b, at),
            Block::Paragraph(b) => handler.paragraph(b, at),
            Block::List(b) => handler.list(b, at),
            Block::Table(b) => handler.table(b, at),
            Block::Code(b) => handler.code(b, at),
            Block::Callout(b) => handler.callout(b, at),
            Block::Image(b) => handler.image(b, at),
            Block::Quote(b) => handler.quote(b, at),
            Block::Divider(b) => handler.divider(b, at),
            Block::Layout(b) => handler.layout(b, at),
            Block::Embed(b) => handler.embed(b, at),
            Block::Unknown(b) => {
                self.record_unknown(b, at);
                handler.unknown(b, at)
            }
        };

        if self.depth == Depth::Shallow {
            return Dispatched::leaf(value);
        }
        let mut groups = Vec::new();
        for group in block.child_groups() {
            let mut results = Vec::with_capacity(group.len());
            for (index, child) in group.iter().enumerate() {
                results.push(self.visit(child, handler, at.nested(index)));
            }
            groups.push(results);
        }

        Dispatched { value, groups }
    }

    fn record_unknown(&mut self, block: &UnknownBlock, at: Position) {
        tracing::warn!(
            block_type = %block.tag,
            block_id = block.id.as_deref().unwrap_or("<none>"),
            depth = at.depth,
            "unknown block type; projecting as empty"
        );
        self.signals.push(UnknownBlockType {
            tag: block.tag.clone(),
            id: block.id.clone(),
            depth: at.depth,
        });
    }
}

/// Deep dispatch of a single block; unknown-tag signals are only logged.
pub fn dispatch<H: BlockHandler>(block: &Block, handler: &mut H) -> Dispatched<H::Output> {
    Dispatcher::deep().dispatch(block, handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Records `tag:id@depth` for every visit.
    #[derive(Default)]
    struct Trace {
        seen: Vec<String>,
    }

    impl Trace {
        fn note(&mut self, tag: &str, id: &str, at: Position) -> String {
            let entry = format!("{tag}:{id}@{}", at.depth);
            self.seen.push(entry.clone());
            entry
        }
    }

    impl BlockHandler for Trace {
        type Output = String;

        fn heading(&mut self, b: &HeadingBlock, at: Position) -> String {
            self.note("heading", &b.id, at)
        }
        fn paragraph(&mut self, b: &ParagraphBlock, at: Position) -> String {
            self.note("paragraph", &b.id, at)
        }
        fn list(&mut self, b: &ListBlock, at: Position) -> String {
            self.note("list", &b.id, at)
        }
        fn table(&mut self, b: &TableBlock, at: Position) -> String {
            self.note("table", &b.id, at)
        }
        fn code(&mut self, b: &CodeBlock, at: Position) -> String {
            self.note("code", &b.id, at)
        }
        fn callout(&mut self, b: &CalloutBlock, at: Position) -> String {
            self.note("callout", &b.id, at)
        }
        fn image(&mut self, b: &ImageBlock, at: Position) -> String {
            self.note("image", &b.id, at)
        }
        fn quote(&mut self, b: &QuoteBlock, at: Position) -> String {
            self.note("quote", &b.id, at)
        }
        fn divider(&mut self, b: &DividerBlock, at: Position) -> String {
            self.note("divider", &b.id, at)
        }
        fn layout(&mut self, b: &LayoutBlock, at: Position) -> String {
            self.note("layout", &b.id, at)
        }
        fn embed(&mut self, b: &EmbedBlock, at: Position) -> String {
            self.note("embed", &b.id, at)
        }
        fn unknown(&mut self, b: &UnknownBlock, at: Position) -> String {
            self.note(&b.tag, b.id.as_deref().unwrap_or("?"), at)
        }
    }

    fn nested_block() -> Block {
        serde_json::from_value(json!({
            "type": "list",
            "id": "list",
            "listType": "unordered",
            "items": [
                {
                    "content": "first",
                    "children": [{
                        "type": "layout",
                        "id": "cols",
                        "columns": [
                            { "width": "1fr", "content": [{ "type": "paragraph", "id": "left", "content": "l" }] },
                            { "width": "1fr", "content": [{ "type": "sparkle", "id": "right" }] }
                        ]
                    }]
                },
                { "content": "second", "children": [{ "type": "divider", "id": "rule" }] }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_deep_dispatch_is_depth_first() {
        let block = nested_block();
        let mut trace = Trace::default();
        let mut dispatcher = Dispatcher::deep();
        let result = dispatcher.dispatch(&block, &mut trace);

        assert_eq!(
            trace.seen,
            vec![
                "list:list@0",
                "layout:cols@1",
                "paragraph:left@2",
                "sparkle:right@2",
                "divider:rule@1",
            ]
        );
        assert_eq!(result.groups.len(), 2);
        assert_eq!(result.groups[0][0].groups.len(), 2);
        assert_eq!(result.flatten(), trace.seen);
    }

    #[test]
    fn test_shallow_dispatch_does_not_descend() {
        let block = nested_block();
        let mut trace = Trace::default();
        let result = Dispatcher::shallow().dispatch(&block, &mut trace);
        assert_eq!(trace.seen, vec!["list:list@0"]);
        assert!(result.groups.is_empty());
    }

    #[test]
    fn test_unknown_tag_is_signalled_not_fatal() {
        let block = nested_block();
        let mut dispatcher = Dispatcher::deep();
        dispatcher.dispatch(&block, &mut Trace::default());
        assert_eq!(
            dispatcher.signals(),
            &[UnknownBlockType {
                tag: "sparkle".into(),
                id: Some("right".into()),
                depth: 2,
            }]
        );
        assert_eq!(dispatcher.take_signals().len(), 1);
        assert!(dispatcher.signals().is_empty());
    }

    #[test]
    fn test_dispatch_all_positions() {
        let blocks: Vec<Block> = serde_json::from_value(json!([
            { "type": "divider", "id": "a" },
            { "type": "divider", "id": "b" }
        ]))
        .unwrap();
        let mut positions = Vec::new();
        struct Positions<'a>(&'a mut Vec<Position>);
        impl BlockHandler for Positions<'_> {
            type Output = ();
            fn heading(&mut self, _: &HeadingBlock, at: Position) {
                self.0.push(at)
            }
            fn paragraph(&mut self, _: &ParagraphBlock, at: Position) {
                self.0.push(at)
            }
            fn list(&mut self, _: &ListBlock, at: Position) {
                self.0.push(at)
            }
            fn table(&mut self, _: &TableBlock, at: Position) {
                self.0.push(at)
            }
            fn code(&mut self, _: &CodeBlock, at: Position) {
                self.0.push(at)
            }
            fn callout(&mut self, _: &CalloutBlock, at: Position) {
                self.0.push(at)
            }
            fn image(&mut self, _: &ImageBlock, at: Position) {
                self.0.push(at)
            }
            fn quote(&mut self, _: &QuoteBlock, at: Position) {
                self.0.push(at)
            }
            fn divider(&mut self, _: &DividerBlock, at: Position) {
                self.0.push(at)
            }
            fn layout(&mut self, _: &LayoutBlock, at: Position) {
                self.0.push(at)
            }
            fn embed(&mut self, _: &EmbedBlock, at: Position) {
                self.0.push(at)
            }
            fn unknown(&mut self, _: &UnknownBlock, at: Position) {
                self.0.push(at)
            }
        }
        Dispatcher::deep().dispatch_all(&blocks, &mut Positions(&mut positions));
        assert_eq!(positions, vec![Position::top(0), Position::top(1)]);
    }
}

//! Shared editing session.
//!
//! Mutations take the write lock, so only one runs at a time; projections
//! take the read lock and may run alongside each other but never alongside
//! a mutation.

use super::{Command, Editor, Outcome};
use crate::chunk::{ChunkExtractor, Extraction};
use crate::model::Document;
use crate::render::{RenderConfig, Rendered, render_document};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct Session {
    base: Document,
    editor: Editor,
}

#[derive(Debug, Clone)]
pub struct SharedEditor {
    inner: Arc<RwLock<Session>>,
}

impl SharedEditor {
    pub fn new(document: Document) -> Self {
        Self::with_editor(Editor::from_document(&document), document)
    }

    /// Uses a preconfigured editor; `base` supplies metadata and theme.
    pub fn with_editor(editor: Editor, base: Document) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Session { base, editor })),
        }
    }

    // Mutations are swapped in only once they complete, so a poisoned lock
    // still guards consistent state.
    fn read_guard(&self) -> RwLockReadGuard<'_, Session> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn apply(&self, command: Command) -> Outcome {
        self.write_guard().editor.apply(command)
    }

    /// Runs several editor calls under one write lock. They work on a copy
    /// that replaces the editor only when `f` returns; if `f` panics none of
    /// its calls take effect.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Editor) -> R) -> R {
        let mut session = self.write_guard();
        let mut draft = session.editor.clone();
        let result = f(&mut draft);
        session.editor = draft;
        result
    }

    pub fn read<R>(&self, f: impl FnOnce(&Editor) -> R) -> R {
        f(&self.read_guard().editor)
    }

    /// Current document without touching `updatedAt`.
    pub fn document(&self) -> Document {
        let session = self.read_guard();
        session.editor.to_document(&session.base)
    }

    pub fn chunks(&self) -> Extraction {
        let session = self.read_guard();
        ChunkExtractor::new().extract(&session.editor.to_document(&session.base))
    }

    pub fn render(&self) -> Rendered {
        let session = self.read_guard();
        let document = session.editor.to_document(&session.base);
        render_document(&document, &RenderConfig::for_document(&document))
    }

    /// Stamps `updatedAt`, makes the result the new base and returns it.
    pub fn commit_now(&self) -> Document {
        let mut session = self.write_guard();
        let committed = session.editor.commit_now(&session.base);
        session.base = committed.clone();
        committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockTemplate, IdGenerator};
    use std::thread;

    #[test]
    fn test_concurrent_inserts_are_serialised() {
        let document = Document::new_template("Shared", &mut IdGenerator::sequential("s"));
        let shared = SharedEditor::new(document);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        shared.edit(|editor| editor.insert_new(None, BlockTemplate::Divider));
                        let _ = shared.chunks();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.read(|editor| editor.blocks().len()), 42);
    }

    #[test]
    fn test_commit_updates_base() {
        let document = Document::new_template("Shared", &mut IdGenerator::sequential("s"));
        let shared = SharedEditor::new(document);
        let committed = shared.commit_now();
        assert!(committed.metadata.updated_at.is_some());
        assert_eq!(shared.document().metadata.updated_at, committed.metadata.updated_at);
        assert_eq!(shared.render().nodes.len(), 2);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let shared = SharedEditor::new(Document::new_template(
            "P",
            &mut IdGenerator::sequential("p"),
        ));
        let poisoner = shared.clone();
        let _ = thread::spawn(move || {
            poisoner.edit(|editor| {
                if !editor.blocks().is_empty() {
                    panic!("boom");
                }
            });
        })
        .join();
        assert_eq!(shared.read(|editor| editor.blocks().len()), 2);
    }

    #[test]
    fn test_edit_is_all_or_nothing() {
        let shared = SharedEditor::new(Document::new_template(
            "P",
            &mut IdGenerator::sequential("p"),
        ));
        let before = shared.read(Editor::snapshot);
        let poisoner = shared.clone();
        let _ = thread::spawn(move || {
            poisoner.edit(|editor| {
                editor.insert_new(None, BlockTemplate::Divider);
                editor.delete("p-1");
                if editor.blocks().len() == 2 {
                    panic!("boom");
                }
            });
        })
        .join();

        assert_eq!(shared.read(Editor::snapshot), before);
        shared.edit(|editor| editor.delete("p-2"));
        assert_eq!(shared.document().content.len(), 1);
    }
}

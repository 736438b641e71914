//! Editable tree engine.
//!
//! Mutations are expressed as [`Command`]s and applied by the pure
//! [`reduce`] function, which always builds a complete new top-level
//! sequence before anything is swapped in. [`Editor`] owns the current
//! sequence plus the advisory focus and layers the list-item helpers on top
//! of `Update`.
//!
//! Top-level deletion may empty the document, while list-item deletion can
//! never leave a list without items.

pub mod session;

use crate::model::validate::{self, audit};
use crate::model::{
    Block, BlockId, BlockTemplate, Document, FormatError, IdGenerator, ListBlock, ListItem,
    ListType, Text, walk_blocks,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

pub use session::SharedEditor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Partial field set merged onto a block by [`Command::Update`].
///
/// Keys are wire names (`listType`, `showLineNumbers`). `id` and `type`
/// are ignored; a `null` value removes the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockPatch {
    fields: Map<String, Value>,
}

impl BlockPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn clear(self, key: impl Into<String>) -> Self {
        self.set(key, Value::Null)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn merge_into(&self, target: &mut Map<String, Value>) {
        for (key, value) in &self.fields {
            if key == "id" || key == "type" {
                continue;
            }
            if value.is_null() {
                target.remove(key);
            } else {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

impl TryFrom<Value> for BlockPatch {
    type Error = InvariantViolation;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(InvariantViolation::MalformedPatch(format!(
                "patch must be a JSON object, got {other}"
            ))),
        }
    }
}

impl From<Map<String, Value>> for BlockPatch {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `anchor: None` prepends.
    InsertAfter { anchor: Option<BlockId>, block: Block },
    Update { id: BlockId, patch: BlockPatch },
    Delete { id: BlockId },
    Move { id: BlockId, direction: Direction },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoOpReason {
    AnchorNotFound(BlockId),
    BlockNotFound(BlockId),
    AtBoundary,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("a list must keep at least one item")]
    EmptyList,
    #[error("block id `{0}` is already in use")]
    DuplicateId(BlockId),
    #[error("patch does not produce a valid block: {0}")]
    MalformedPatch(String),
    #[error("block is not a list")]
    NotAList,
    #[error("list is not a checklist")]
    NotAChecklist,
    #[error("list item index out of range")]
    ItemOutOfRange,
}

impl From<FormatError> for InvariantViolation {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::DuplicateBlockId(id) => InvariantViolation::DuplicateId(id),
            FormatError::EmptyList { .. } => InvariantViolation::EmptyList,
            other => InvariantViolation::MalformedPatch(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Unchanged(NoOpReason),
    Refused(InvariantViolation),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

fn position(blocks: &[Block], id: &str) -> Option<usize> {
    blocks.iter().position(|block| block.has_id(id))
}

fn unchanged(blocks: &[Block], reason: NoOpReason) -> (Vec<Block>, Outcome) {
    tracing::debug!(?reason, "command left the document unchanged");
    (blocks.to_vec(), Outcome::Unchanged(reason))
}

fn refused(blocks: &[Block], violation: InvariantViolation) -> (Vec<Block>, Outcome) {
    tracing::debug!(%violation, "command refused");
    (blocks.to_vec(), Outcome::Refused(violation))
}

/// Keeps `candidate` only if it still satisfies the tree invariants.
fn checked(blocks: &[Block], candidate: Vec<Block>) -> (Vec<Block>, Outcome) {
    match audit(&candidate) {
        Ok(()) => (candidate, Outcome::Applied),
        Err(err) => refused(blocks, err.into()),
    }
}

fn merged(block: &Block, patch: &BlockPatch) -> Result<Block, InvariantViolation> {
    let mut value = block.to_value();
    let Some(fields) = value.as_object_mut() else {
        return Err(InvariantViolation::MalformedPatch(
            "block is not a JSON object".to_string(),
        ));
    };
    patch.merge_into(fields);
    validate::parse_block(value).map_err(InvariantViolation::from)
}

/// Applies one command to a top-level sequence, returning the next sequence
/// and what happened. The input is never modified; on anything but
/// `Applied` the returned sequence equals the input.
pub fn reduce(blocks: &[Block], command: Command) -> (Vec<Block>, Outcome) {
    match command {
        Command::InsertAfter { anchor, block } => {
            let at = match anchor {
                None => 0,
                Some(anchor) => match position(blocks, &anchor) {
                    Some(index) => index + 1,
                    None => return unchanged(blocks, NoOpReason::AnchorNotFound(anchor)),
                },
            };
            let mut next = Vec::with_capacity(blocks.len() + 1);
            next.extend_from_slice(&blocks[..at]);
            next.push(block);
            next.extend_from_slice(&blocks[at..]);
            checked(blocks, next)
        }
        Command::Update { id, patch } => {
            let Some(index) = position(blocks, &id) else {
                return unchanged(blocks, NoOpReason::BlockNotFound(id));
            };
            match merged(&blocks[index], &patch) {
                Ok(updated) => {
                    let mut next = blocks.to_vec();
                    next[index] = updated;
                    checked(blocks, next)
                }
                Err(violation) => refused(blocks, violation),
            }
        }
        Command::Delete { id } => {
            let Some(index) = position(blocks, &id) else {
                return unchanged(blocks, NoOpReason::BlockNotFound(id));
            };
            let mut next = blocks.to_vec();
            next.remove(index);
            (next, Outcome::Applied)
        }
        Command::Move { id, direction } => {
            let Some(index) = position(blocks, &id) else {
                return unchanged(blocks, NoOpReason::BlockNotFound(id));
            };
            let neighbour = match direction {
                Direction::Up => index.checked_sub(1),
                Direction::Down => Some(index + 1).filter(|&n| n < blocks.len()),
            };
            let Some(neighbour) = neighbour else {
                return unchanged(blocks, NoOpReason::AtBoundary);
            };
            let mut next = blocks.to_vec();
            next.swap(index, neighbour);
            (next, Outcome::Applied)
        }
    }
}

/// Interactive editing state: the top-level sequence and the focused block.
#[derive(Debug, Clone, Default)]
pub struct Editor {
    blocks: Vec<Block>,
    focused: Option<BlockId>,
    ids: IdGenerator,
}

impl Editor {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Self::default()
        }
    }

    pub fn from_document(document: &Document) -> Self {
        Self::new(document.content.clone())
    }

    pub fn with_ids(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Copy of the current sequence, for callers that want to undo.
    pub fn snapshot(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    pub fn restore(&mut self, snapshot: Vec<Block>) {
        self.blocks = snapshot;
        self.drop_stale_focus();
    }

    pub fn apply(&mut self, command: Command) -> Outcome {
        let (next, outcome) = reduce(&self.blocks, command);
        if outcome.is_applied() {
            self.blocks = next;
            self.drop_stale_focus();
        }
        outcome
    }

    pub fn insert_after(&mut self, anchor: Option<&str>, block: Block) -> Outcome {
        self.apply(Command::InsertAfter {
            anchor: anchor.map(str::to_owned),
            block,
        })
    }

    pub fn update(&mut self, id: &str, patch: BlockPatch) -> Outcome {
        self.apply(Command::Update {
            id: id.to_string(),
            patch,
        })
    }

    pub fn delete(&mut self, id: &str) -> Outcome {
        self.apply(Command::Delete { id: id.to_string() })
    }

    pub fn move_block(&mut self, id: &str, direction: Direction) -> Outcome {
        self.apply(Command::Move {
            id: id.to_string(),
            direction,
        })
    }

    /// Inserts a fresh block built from `template` and focuses it. Returns
    /// the new id, or `None` when the anchor does not exist.
    pub fn insert_new(&mut self, anchor: Option<&str>, template: BlockTemplate) -> Option<BlockId> {
        let id = self.ids.next_id();
        let block = template.instantiate(id.clone(), &mut self.ids);
        if self.insert_after(anchor, block).is_applied() {
            self.focused = Some(id.clone());
            Some(id)
        } else {
            None
        }
    }

    pub fn delete_list_item(&mut self, list_id: &str, index: usize) -> Outcome {
        self.edit_list(list_id, |list| {
            if index >= list.items.len() {
                return Err(InvariantViolation::ItemOutOfRange);
            }
            if list.items.len() == 1 {
                return Err(InvariantViolation::EmptyList);
            }
            list.items.remove(index);
            Ok(())
        })
    }

    pub fn insert_list_item(&mut self, list_id: &str, after: usize, content: Text) -> Outcome {
        self.edit_list(list_id, |list| {
            if after >= list.items.len() {
                return Err(InvariantViolation::ItemOutOfRange);
            }
            let checked = (list.list_type == ListType::Checklist).then_some(false);
            list.items.insert(
                after + 1,
                ListItem {
                    checked,
                    ..ListItem::new(content)
                },
            );
            Ok(())
        })
    }

    pub fn toggle_checked(&mut self, list_id: &str, index: usize) -> Outcome {
        self.edit_list(list_id, |list| {
            if list.list_type != ListType::Checklist {
                return Err(InvariantViolation::NotAChecklist);
            }
            let item = list
                .items
                .get_mut(index)
                .ok_or(InvariantViolation::ItemOutOfRange)?;
            item.checked = Some(!item.checked.unwrap_or(false));
            Ok(())
        })
    }

    /// Switches the list kind. Checklists gain an explicit `checked` on
    /// every item; other kinds drop it.
    pub fn set_list_type(&mut self, list_id: &str, list_type: ListType) -> Outcome {
        self.edit_list(list_id, |list| {
            list.list_type = list_type;
            for item in &mut list.items {
                item.checked = match list_type {
                    ListType::Checklist => Some(item.checked.unwrap_or(false)),
                    _ => None,
                };
            }
            Ok(())
        })
    }

    /// Runs `edit` on a copy of a top-level list and routes the result
    /// through `Update` on the list's `items` and `listType` fields.
    fn edit_list(
        &mut self,
        list_id: &str,
        edit: impl FnOnce(&mut ListBlock) -> Result<(), InvariantViolation>,
    ) -> Outcome {
        let Some(block) = self.blocks.iter().find(|block| block.has_id(list_id)) else {
            return Outcome::Unchanged(NoOpReason::BlockNotFound(list_id.to_string()));
        };
        let Block::List(list) = block else {
            return Outcome::Refused(InvariantViolation::NotAList);
        };
        let mut list = list.clone();
        if let Err(violation) = edit(&mut list) {
            tracing::debug!(list = list_id, %violation, "list edit refused");
            return Outcome::Refused(violation);
        }
        let patch = match (
            serde_json::to_value(&list.items),
            serde_json::to_value(list.list_type),
        ) {
            (Ok(items), Ok(list_type)) => BlockPatch::new()
                .set("items", items)
                .set("listType", list_type),
            (Err(err), _) | (_, Err(err)) => {
                return Outcome::Refused(InvariantViolation::MalformedPatch(err.to_string()));
            }
        };
        self.update(list_id, patch)
    }

    /// Focuses a block anywhere in the tree; unknown ids leave focus alone.
    pub fn focus(&mut self, id: &str) -> bool {
        let exists = walk_blocks(&self.blocks).any(|block| block.has_id(id));
        if exists {
            self.focused = Some(id.to_string());
        }
        exists
    }

    pub fn blur(&mut self) {
        self.focused = None;
    }

    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    fn drop_stale_focus(&mut self) {
        if let Some(id) = self.focused.as_deref()
            && !walk_blocks(&self.blocks).any(|block| block.has_id(id))
        {
            self.focused = None;
        }
    }

    /// `base` with this editor's content, other fields untouched.
    pub fn to_document(&self, base: &Document) -> Document {
        Document {
            content: self.blocks.clone(),
            ..base.clone()
        }
    }

    /// The next saved document: current content with `updatedAt` set.
    pub fn commit(&self, base: &Document, updated_at: DateTime<Utc>) -> Document {
        let mut document = self.to_document(base);
        document.metadata.updated_at =
            Some(updated_at.to_rfc3339_opts(SecondsFormat::Millis, true));
        document
    }

    pub fn commit_now(&self, base: &Document) -> Document {
        self.commit(base, Utc::now())
    }
}

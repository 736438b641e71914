//! A naive, simple oracle editor for differential testing.
//!
//! Blocks are kept as raw JSON values and every command is applied with
//! plain loops and full rescans. Updated blocks are re-decoded with
//! `nova_doc::Block::from_value`; everything else is done independently.
use nova_doc::editor::{Command, Direction};
use nova_doc::Block;
use serde_json::Value;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Oracle {
    blocks: Vec<Value>,
}

impl Oracle {
    pub fn new(blocks: Vec<Value>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Value] {
        &self.blocks
    }

    pub fn ids(&self) -> Vec<String> {
        self.blocks
            .iter()
            .filter_map(|block| block.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    /// Applies a command. Returns whether the blocks changed.
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::InsertAfter { anchor, block } => {
                let mut at = None;
                match anchor {
                    None => at = Some(0),
                    Some(anchor) => {
                        for (index, existing) in self.blocks.iter().enumerate() {
                            if id_of(existing) == Some(anchor.as_str()) {
                                at = Some(index + 1);
                                break;
                            }
                        }
                    }
                }
                let Some(at) = at else {
                    return false;
                };
                let mut next = self.blocks.clone();
                next.insert(at, block.to_value());
                self.accept(next)
            }
            Command::Update { id, patch } => {
                let mut next = self.blocks.clone();
                let mut found = false;
                for block in next.iter_mut() {
                    if id_of(block) != Some(id.as_str()) {
                        continue;
                    }
                    found = true;
                    if let Some(object) = block.as_object_mut() {
                        for (key, value) in patch.fields() {
                            if key == "id" || key == "type" {
                                continue;
                            }
                            if value.is_null() {
                                object.remove(key);
                            } else {
                                object.insert(key.clone(), value.clone());
                            }
                        }
                    }
                    match Block::from_value(block.clone()) {
                        Ok(parsed) => *block = parsed.to_value(),
                        Err(_) => return false,
                    }
                    break;
                }
                if !found {
                    return false;
                }
                self.accept(next)
            }
            Command::Delete { id } => {
                let before = self.blocks.len();
                let mut next = Vec::new();
                let mut removed = false;
                for block in self.blocks.drain(..) {
                    if !removed && id_of(&block) == Some(id.as_str()) {
                        removed = true;
                    } else {
                        next.push(block);
                    }
                }
                self.blocks = next;
                self.blocks.len() != before
            }
            Command::Move { id, direction } => {
                let mut index = None;
                for (i, block) in self.blocks.iter().enumerate() {
                    if id_of(block) == Some(id.as_str()) {
                        index = Some(i);
                        break;
                    }
                }
                let Some(index) = index else {
                    return false;
                };
                match direction {
                    Direction::Up => {
                        if index == 0 {
                            return false;
                        }
                        self.blocks.swap(index, index - 1);
                    }
                    Direction::Down => {
                        if index + 1 >= self.blocks.len() {
                            return false;
                        }
                        self.blocks.swap(index, index + 1);
                    }
                }
                true
            }
        }
    }

    fn accept(&mut self, next: Vec<Value>) -> bool {
        let mut ids = Vec::new();
        for block in &next {
            if !collect(block, &mut ids) {
                return false;
            }
        }
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                if ids[i] == ids[j] {
                    return false;
                }
            }
        }
        self.blocks = next;
        true
    }
}

fn id_of(block: &Value) -> Option<&str> {
    block.get("id").and_then(Value::as_str)
}

/// Collects ids depth-first; returns false on an empty list.
fn collect(block: &Value, ids: &mut Vec<String>) -> bool {
    if let Some(id) = id_of(block) {
        ids.push(id.to_string());
    }
    let tag = block.get("type").and_then(Value::as_str);
    if tag == Some("list") {
        let items = block.get("items").and_then(Value::as_array);
        let Some(items) = items else {
            return false;
        };
        if items.is_empty() {
            return false;
        }
        for item in items {
            if let Some(children) = item.get("children").and_then(Value::as_array) {
                for child in children {
                    if !collect(child, ids) {
                        return false;
                    }
                }
            }
        }
    }
    if tag == Some("layout")
        && let Some(columns) = block.get("columns").and_then(Value::as_array)
    {
        for column in columns {
            if let Some(content) = column.get("content").and_then(Value::as_array) {
                for child in content {
                    if !collect(child, ids) {
                        return false;
                    }
                }
            }
        }
    }
    true
}

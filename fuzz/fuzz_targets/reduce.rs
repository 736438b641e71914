#![no_main]

use libfuzzer_sys::fuzz_target;
use nova_doc::editor::{BlockPatch, Command, Direction, reduce};
use nova_doc::model::validate::audit;
use nova_doc::{Block, BlockTemplate, IdGenerator};
use serde_json::json;

fuzz_target!(|data: &[u8]| {
    let mut ids = IdGenerator::sequential("f");
    let mut blocks: Vec<Block> = Vec::new();
    for chunk in data.chunks(3) {
        if chunk.len() < 3 {
            break;
        }
        let target = if blocks.is_empty() {
            "missing".to_string()
        } else {
            blocks[chunk[1] as usize % blocks.len()]
                .id()
                .unwrap_or("missing")
                .to_string()
        };
        let command = match chunk[0] % 5 {
            0 => {
                let template = BlockTemplate::ALL[chunk[2] as usize % BlockTemplate::ALL.len()];
                let id = ids.next_id();
                Command::InsertAfter {
                    anchor: (chunk[2] % 2 == 0).then_some(target),
                    block: template.instantiate(id, &mut ids),
                }
            }
            1 => Command::Delete { id: target },
            2 => Command::Move {
                id: target,
                direction: if chunk[2] % 2 == 0 { Direction::Up } else { Direction::Down },
            },
            3 => Command::Update {
                id: target,
                patch: BlockPatch::new().set("items", json!([])),
            },
            _ => Command::Update {
                id: target,
                patch: BlockPatch::new().set("content", "fuzz").clear("style"),
            },
        };
        let (next, _) = reduce(&blocks, command);
        assert!(audit(&next).is_ok());
        blocks = next;
    }
});

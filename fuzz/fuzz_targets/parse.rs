#![no_main]

use libfuzzer_sys::fuzz_target;
use nova_doc::render::RenderConfig;
use nova_doc::{Document, extract_chunks, render_document};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    if let Ok(doc) = Document::parse(&input) {
        let reparsed = Document::parse(&doc.to_json()).ok();
        assert_eq!(reparsed.as_ref(), Some(&doc));
        let _ = extract_chunks(&doc);
        let _ = render_document(&doc, &RenderConfig::for_document(&doc));
    }
});

//! Fuzz target for runtime output extraction and sanitization.
//!
//! Arbitrary runtime text, wrapped in the response shapes runtimes return,
//! must never panic and must either be rejected as corrupted or come back
//! trimmed with collapsed whitespace.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lingua_core::engine::format::extract_output;
use lingua_core::engine::{ErrorKind, OutputSanitizer};
use lingua_core::ModelFamily;
use serde_json::json;

#[derive(Arbitrary, Debug)]
enum Shape {
    Bare,
    Generated,
    Translation,
    Nested,
}

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    text: &'a str,
    shape: Shape,
    language_pair: bool,
}

fuzz_target!(|input: Input<'_>| {
    let raw = match input.shape {
        Shape::Bare => json!(input.text),
        Shape::Generated => json!([{ "generated_text": input.text }]),
        Shape::Translation => json!({ "translation_text": input.text, "score": 0.5 }),
        Shape::Nested => json!([[input.text]]),
    };
    let family = if input.language_pair {
        ModelFamily::LanguagePair
    } else {
        ModelFamily::Seq2Seq
    };

    let extracted = match extract_output(&family, &raw) {
        Ok(extracted) => extracted,
        Err(e) => {
            assert_eq!(e.kind(), ErrorKind::CorruptedOutput);
            return;
        }
    };

    let sanitizer = OutputSanitizer::new();
    let cleaned = sanitizer.clean(&extracted.text);
    assert!(
        cleaned.len() <= extracted.text.len() * 3 + 16,
        "cleaned output unexpectedly large"
    );
    assert_eq!(cleaned, cleaned.trim());
    assert!(!cleaned.contains("  "));

    match sanitizer.sanitize(&extracted.text) {
        Ok(text) => {
            assert!(!text.is_empty());
            assert!(text.chars().any(char::is_alphabetic));
        }
        Err(e) => assert_eq!(e.kind(), ErrorKind::CorruptedOutput),
    }
});

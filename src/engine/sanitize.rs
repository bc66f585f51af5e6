//! Output sanitization and corruption detection for Lingua CORE.
//!
//! Strips runtime control tokens, normalizes to NFC, collapses whitespace,
//! then rejects outputs matching known failure shapes. The heuristics are a
//! best-effort guard against broken models; they are not exhaustive.

use std::sync::OnceLock;

use aho_corasick::AhoCorasick;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::error::TranslationError;

/// Special tokens emitted by common tokenizers, removed outright.
const CONTROL_TOKENS: &[&str] = &[
    "<pad>",
    "</s>",
    "<s>",
    "<unk>",
    "<mask>",
    "<|endoftext|>",
    "<|end|>",
    "[PAD]",
    "[UNK]",
    "[CLS]",
    "[SEP]",
    "[MASK]",
];

/// A single-token run this long is a decoding loop, not a translation.
const MAX_TOKEN_REPEATS: usize = 8;

/// Why an output was classified as corrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    Empty,
    PunctuationOnly,
    NoAlphabetic,
    DegenerateRepetition,
}

impl Corruption {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Empty => "output is empty",
            Self::PunctuationOnly => "output contains only punctuation or whitespace",
            Self::NoAlphabetic => "output contains no alphabetic characters",
            Self::DegenerateRepetition => "output is a degenerate token repetition",
        }
    }
}

fn language_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // `__fr__` (fairseq/m2m) and `fra_Latn` (FLORES) prefixes echoed by the decoder
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?:__[a-z]{2,3}__|[a-z]{3}_[A-Z][a-z]{3})(?:\s+|$)")
            .expect("valid language tag pattern")
    })
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

/// Cleans raw runtime text into caller-facing text.
pub struct OutputSanitizer {
    control_tokens: AhoCorasick,
}

impl OutputSanitizer {
    pub fn new() -> Self {
        let control_tokens =
            AhoCorasick::new(CONTROL_TOKENS).expect("valid control token set");
        Self { control_tokens }
    }

    /// Strip and normalize, then reject corrupted output.
    pub fn sanitize(&self, raw: &str) -> Result<String, TranslationError> {
        let cleaned = self.clean(raw);
        match detect_corruption(&cleaned) {
            Some(corruption) => Err(TranslationError::corrupted(corruption.reason())),
            None => Ok(cleaned),
        }
    }

    /// Remove control tokens and sub-word markers, collapse whitespace.
    pub fn clean(&self, raw: &str) -> String {
        let replacements = vec![" "; CONTROL_TOKENS.len()];
        let text = self.control_tokens.replace_all(raw, replacements.as_slice());

        // SentencePiece word boundary, BPE continuation, WordPiece continuation
        let text = text.replace('\u{2581}', " ").replace("@@ ", "").replace(" ##", "");
        let text = language_tag_pattern().replace(&text, "");
        let text: String = text.nfc().collect();

        whitespace_pattern().replace_all(&text, " ").trim().to_string()
    }
}

impl Default for OutputSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify already-cleaned text. `None` means the output looks usable.
pub fn detect_corruption(text: &str) -> Option<Corruption> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(Corruption::Empty);
    }
    if !trimmed.chars().any(char::is_alphanumeric) {
        return Some(Corruption::PunctuationOnly);
    }
    if !trimmed.chars().any(char::is_alphabetic) {
        return Some(Corruption::NoAlphabetic);
    }
    if is_degenerate_repetition(trimmed) {
        return Some(Corruption::DegenerateRepetition);
    }
    None
}

/// `n n n`-style single-character loops, or any token repeated back-to-back
/// `MAX_TOKEN_REPEATS` times.
fn is_degenerate_repetition(text: &str) -> bool {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() >= 3
        && tokens.iter().all(|t| t.chars().count() == 1)
        && tokens.iter().all(|t| *t == tokens[0])
    {
        return true;
    }

    let mut run = 1;
    for pair in tokens.windows(2) {
        if pair[0] == pair[1] {
            run += 1;
            if run >= MAX_TOKEN_REPEATS {
                return true;
            }
        } else {
            run = 1;
        }
    }
    false
}

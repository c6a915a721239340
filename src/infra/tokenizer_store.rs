// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds a word-level vocabulary from the training sentences,
// writes it as a HuggingFace tokenizer JSON and loads it back,
// so training and prediction map words to the same ids.
//
// Fixed ids:
//   0 → [PAD]   (also the padding value of every sequence)
//   1 → [UNK]
//   2.. → corpus words, most frequent first
//
// Because ids are assigned by descending frequency, low ids are
// the most common words. SentiMLLM relies on this when it picks
// lexicon words as measurement operators.
//
// Reference: tokenizers crate (WordLevel model, Whitespace pre-tokenizer)

use anyhow::{Context, Result};
use std::{collections::HashMap, path::PathBuf};
use tokenizers::Tokenizer;

use crate::data::dataset::EncodedSample;

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;
const FIRST_WORD_ID: usize = 2;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    /// Load existing tokenizer or build a new one from texts
    pub fn load_or_build(
        &self,
        texts:          &[String],
        max_vocab_size: usize,
        min_frequency:  usize,
    ) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building new tokenizer (max_vocab_size={})", max_vocab_size);
            self.build_and_save(texts, max_vocab_size, min_frequency)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    /// Count words, keep the most frequent, and write a WordLevel
    /// tokenizer JSON that `Tokenizer::from_file` understands.
    fn build_and_save(
        &self,
        texts:          &[String],
        max_vocab_size: usize,
        min_frequency:  usize,
    ) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let words = rank_words(texts, max_vocab_size.saturating_sub(FIRST_WORD_ID), min_frequency);

        let mut vocab = serde_json::json!({
            "[PAD]": PAD_ID,
            "[UNK]": UNK_ID,
        });
        for (i, word) in words.iter().enumerate() {
            vocab[word.as_str()] = serde_json::json!(FIRST_WORD_ID + i);
        }

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": PAD_ID, "content": "[PAD]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": UNK_ID, "content": "[UNK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": false,
                "strip_accents": false,
                "lowercase": true
            },
            "pre_tokenizer": {
                "type": "Whitespace"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON to '{}'", path.display()))?;

        tracing::info!(
            "Tokenizer built with {} entries, saved to '{}'",
            words.len() + FIRST_WORD_ID,
            path.display()
        );

        self.load()
    }
}

/// Split text the way the written normalizer and Whitespace
/// pre-tokenizer do (`\w+|[^\w\s]+`): control characters
/// dropped, lower-cased, accents kept.
pub fn pre_tokenize(text: &str) -> Vec<String> {
    let mut pieces  = Vec::new();
    let mut current = String::new();
    let mut current_is_word = false;

    for c in text.to_lowercase().chars() {
        if c == '\u{fffd}' || (c.is_control() && !c.is_whitespace()) {
            continue;
        }
        if c.is_whitespace() {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            continue;
        }
        let is_word = c.is_alphanumeric() || c == '_';
        if !current.is_empty() && is_word != current_is_word {
            pieces.push(std::mem::take(&mut current));
        }
        current_is_word = is_word;
        current.push(c);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Words ordered by descending frequency, ties broken alphabetically
/// so the vocabulary is deterministic.
fn rank_words(texts: &[String], limit: usize, min_frequency: usize) -> Vec<String> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for piece in pre_tokenize(text) {
            *freq.entry(piece).or_insert(0) += 1;
        }
    }

    let mut words: Vec<(String, usize)> = freq
        .into_iter()
        .filter(|(w, n)| *n >= min_frequency && w != "[pad]" && w != "[unk]")
        .collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(limit);
    words.into_iter().map(|(w, _)| w).collect()
}

/// Tokenise one sentence and pad/truncate it to `max_len`.
pub fn encode_padded(
    tokenizer: &Tokenizer,
    text:      &str,
    label:     usize,
    max_len:   usize,
) -> Result<EncodedSample> {
    let enc = tokenizer
        .encode(text, false)
        .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
    Ok(EncodedSample::new(enc.get_ids().to_vec(), label, max_len, PAD_ID))
}

/// Vocabulary including the special tokens, and its size
/// (one past the largest id).
pub fn vocabulary(tokenizer: &Tokenizer) -> (HashMap<String, u32>, usize) {
    let vocab = tokenizer.get_vocab(true);
    let size  = vocab.values().copied().max().map(|m| m as usize + 1).unwrap_or(FIRST_WORD_ID);
    (vocab, size)
}

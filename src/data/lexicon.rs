// ============================================================
// Layer 4 — Sentiment Lexicon
// ============================================================
// Loads a word → polarity mapping and aligns it with the
// tokenizer vocabulary. The aligned vector (one float per
// vocabulary id, +1 / -1 / 0) is what the models receive.
//
// File format: one entry per line, word first, polarity last,
// separated by whitespace, tabs or a comma:
//
//   ; comment lines start with ';' or '#'
//   excellent   positive
//   awful,-1
//   superb      0.875
//
// Words are lower-cased to match the tokenizer's normalizer.

use anyhow::{Context, Result};
use std::{collections::HashMap, fs, path::Path};

use crate::domain::polarity::Polarity;

#[derive(Debug, Clone, Default)]
pub struct SentimentLexicon {
    words: HashMap<String, Polarity>,
}

impl SentimentLexicon {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Polarity)>,
        S: Into<String>,
    {
        let words = pairs
            .into_iter()
            .map(|(w, p)| (w.into().to_lowercase(), p))
            .filter(|(_, p)| !p.is_neutral())
            .collect();
        Self { words }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read lexicon '{}'", path.display()))?;
        let lexicon = Self::parse(&text);
        tracing::info!(
            "Lexicon '{}': {} positive, {} negative words",
            path.display(),
            lexicon.count(Polarity::Positive),
            lexicon.count(Polarity::Negative),
        );
        Ok(lexicon)
    }

    /// Parse lexicon text. Unparseable lines are skipped.
    pub fn parse(text: &str) -> Self {
        let mut pairs = Vec::new();
        let mut skipped = 0usize;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|f| !f.is_empty())
                .collect();
            let (Some(word), Some(label)) = (fields.first(), fields.last()) else { continue };
            if fields.len() < 2 {
                skipped += 1;
                continue;
            }
            match label.parse::<Polarity>() {
                Ok(p) => pairs.push((word.to_string(), p)),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!("Skipped {} unparseable lexicon lines", skipped);
        }
        Self::from_pairs(pairs)
    }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }

    pub fn polarity(&self, word: &str) -> Polarity {
        self.words.get(word).copied().unwrap_or(Polarity::Neutral)
    }

    pub fn count(&self, polarity: Polarity) -> usize {
        self.words.values().filter(|&&p| p == polarity).count()
    }

    /// One value per vocabulary id: +1, -1, or 0 when the word is
    /// not in the lexicon (or the id has no word).
    pub fn align(&self, vocab: &HashMap<String, u32>, vocab_size: usize) -> Vec<f32> {
        let mut aligned = vec![0.0f32; vocab_size];
        for (word, &id) in vocab {
            if let Some(slot) = aligned.get_mut(id as usize) {
                *slot = self.polarity(word).as_f32();
            }
        }
        let covered = aligned.iter().filter(|v| **v != 0.0).count();
        tracing::debug!("Lexicon covers {}/{} vocabulary words", covered, vocab_size);
        aligned
    }
}

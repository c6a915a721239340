// ============================================================
// Layer 4 — Sentence Preprocessor
// ============================================================
// Cleans raw review/sentence text before tokenisation.
//
// Sentiment corpora scraped from the web often contain:
//   - HTML line breaks ("<br />") left over from review pages
//   - Typographic quotes and apostrophes (’ “ ”)
//   - Non-breaking and zero-width spaces
//   - Tabs, newlines and runs of spaces
//
// Each sample becomes a single line with single spaces, so the
// tokenizer's whitespace pre-tokenizer sees clean word boundaries.
// Lower-casing is left to the tokenizer's normalizer.
//
// Cleaning steps (applied in order):
//   1. Replace HTML line breaks with a space
//   2. Map typographic punctuation to ASCII
//   3. Replace control / invisible characters with a space
//   4. Collapse all whitespace runs into one space and trim
//
// Reference: Rust Book §8 (Strings in Rust)

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean one sentence. Always returns a single line.
    pub fn clean(&self, text: &str) -> String {
        // ── Step 1: HTML breaks ───────────────────────────────────────────────
        let step1 = text
            .replace("<br />", " ")
            .replace("<br/>", " ")
            .replace("<br>", " ");

        // ── Step 2 + 3: character normalisation ───────────────────────────────
        let step2: String = step1
            .chars()
            .map(|c| match c {
                '\u{2018}' | '\u{2019}' | '`' => '\'',
                '\u{201C}' | '\u{201D}'       => '"',
                '\u{2013}' | '\u{2014}'       => '-',
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                c if c.is_control() => ' ',
                c => c,
            })
            .collect();

        // ── Step 4: collapse whitespace ───────────────────────────────────────
        step2.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Clean a batch of sentences, preserving order.
    pub fn clean_all<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        texts.into_iter().map(|t| self.clean(t)).collect()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace_and_newlines() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  a   fine\n\nfilm\t "), "a fine film");
    }

    #[test]
    fn test_strips_html_breaks() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("loved it.<br /><br />would watch again"), "loved it. would watch again");
    }

    #[test]
    fn test_normalises_quotes() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("it\u{2019}s \u{201C}fine\u{201D}"), "it's \"fine\"");
    }

    #[test]
    fn test_removes_control_chars() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello\x01world"), "hello world");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
    }
}

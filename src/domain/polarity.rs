// ============================================================
// Layer 3 — Polarity Domain Type
// ============================================================
// Sentiment lexicons annotate words as positive or negative.
// Lexicon files in the wild use several spellings:
//
//   good      positive
//   bad       negative
//   happy     +1
//   awful     -1
//   superb    0.875      (scored lexicons: only the sign matters)
//
// Polarity turns all of them into one of three values that the
// models consume as floats: +1, -1, or 0 for "not in lexicon".

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Polarity {
    /// Value used in the aligned lexicon tensor
    pub fn as_f32(self) -> f32 {
        match self {
            Polarity::Positive => 1.0,
            Polarity::Negative => -1.0,
            Polarity::Neutral  => 0.0,
        }
    }

    pub fn from_score(score: f32) -> Self {
        if score > 0.0 {
            Polarity::Positive
        } else if score < 0.0 {
            Polarity::Negative
        } else {
            Polarity::Neutral
        }
    }

    pub fn is_neutral(self) -> bool {
        self == Polarity::Neutral
    }
}

impl FromStr for Polarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" | "pos" | "+" => Ok(Polarity::Positive),
            "negative" | "neg" | "-" => Ok(Polarity::Negative),
            "neutral" | "none"       => Ok(Polarity::Neutral),
            other => other
                .parse::<f32>()
                .map(Polarity::from_score)
                .map_err(|_| format!("unrecognised polarity '{other}'")),
        }
    }
}

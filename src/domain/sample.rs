// ============================================================
// Layer 3 — TextSample / Prediction Domain Types
// ============================================================
// A TextSample is one labelled sentence from the corpus.
// Labels are class indices: 0 = negative, 1 = positive.

use serde::{Deserialize, Serialize};

/// Number of output classes of every classifier in this crate
pub const NUM_CLASSES: usize = 2;

/// A raw labelled sentence, before cleaning and tokenisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSample {
    /// Class index in `0..NUM_CLASSES`
    pub label: usize,

    /// The sentence as it appears in the corpus file
    pub text: String,
}

impl TextSample {
    pub fn new(label: usize, text: impl Into<String>) -> Self {
        Self { label, text: text.into() }
    }
}

/// The output of a classifier for one sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Arg-max class
    pub label: usize,

    /// Softmax probabilities, one per class
    pub probabilities: Vec<f32>,
}

impl Prediction {
    /// Build a prediction from class probabilities.
    /// Ties go to the lower class index.
    pub fn from_probabilities(probabilities: Vec<f32>) -> Self {
        let label = probabilities
            .iter()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |best, (i, &p)| {
                if p > best.1 { (i, p) } else { best }
            })
            .0;
        Self { label, probabilities }
    }

    /// Probability assigned to the predicted class
    pub fn confidence(&self) -> f32 {
        self.probabilities.get(self.label).copied().unwrap_or(0.0)
    }

    pub fn label_name(&self) -> &'static str {
        if self.label == 1 { "positive" } else { "negative" }
    }
}

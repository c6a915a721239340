// ============================================================
// Layer 4 — Word Vector Lookup Table
// ============================================================
// The complex embedding of SentiMLLM is initialised from real
// word vectors: magnitude → amplitude, sign → phase (0 or π).
//
// Vectors come from a GloVe-format text file, one word per line:
//
//   the 0.418 0.24968 -0.41242 0.1217 ...
//   movie 0.38251 0.14821 0.60601 -0.51533 ...
//
// Only words present in the tokenizer vocabulary are kept.
// Rows for vocabulary words the file does not cover are drawn
// uniformly from [-0.05, 0.05) with a seeded RNG; row 0 ([PAD])
// is all zeros so padding has no amplitude.

use anyhow::{bail, Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::infra::tokenizer_store::PAD_ID;

const RANDOM_INIT_RANGE: f32 = 0.05;

/// Dense `[rows, dim]` matrix of word vectors, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    rows:   usize,
    dim:    usize,
    values: Vec<f32>,
}

impl LookupTable {
    pub fn new(rows: usize, dim: usize, values: Vec<f32>) -> Result<Self> {
        if values.len() != rows * dim {
            bail!("Lookup table needs {} values for [{rows}, {dim}], got {}", rows * dim, values.len());
        }
        Ok(Self { rows, dim, values })
    }

    /// Random table used when no pretrained vectors are configured.
    pub fn random(rows: usize, dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut values: Vec<f32> = (0..rows * dim)
            .map(|_| rng.gen_range(-RANDOM_INIT_RANGE..RANDOM_INIT_RANGE))
            .collect();
        zero_row(&mut values, dim, PAD_ID as usize);
        Self { rows, dim, values }
    }

    pub fn rows(&self) -> usize { self.rows }

    pub fn dim(&self) -> usize { self.dim }

    pub fn values(&self) -> &[f32] { &self.values }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.values[index * self.dim..(index + 1) * self.dim]
    }
}

fn zero_row(values: &mut [f32], dim: usize, row: usize) {
    if let Some(slice) = values.get_mut(row * dim..(row + 1) * dim) {
        slice.iter_mut().for_each(|v| *v = 0.0);
    }
}

/// Load GloVe vectors for the words of `vocab`.
///
/// `dim` fixes the expected vector width; with `None` it is taken
/// from the first usable line. Lines of a different width are skipped.
pub fn load_glove(
    path:       &Path,
    vocab:      &HashMap<String, u32>,
    vocab_size: usize,
    dim:        Option<usize>,
    seed:       u64,
) -> Result<LookupTable> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open embedding file '{}'", path.display()))?;

    let mut dim = dim;
    let mut found: HashMap<u32, Vec<f32>> = HashMap::new();
    let mut skipped = 0usize;

    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("Cannot read '{}'", path.display()))?;
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else { continue };
        let Some(&id) = vocab.get(word) else { continue };

        let vector: Result<Vec<f32>, _> = parts.map(str::parse::<f32>).collect();
        let Ok(vector) = vector else {
            skipped += 1;
            continue;
        };
        match dim {
            Some(d) if d != vector.len() => {
                skipped += 1;
                continue;
            }
            None if vector.is_empty() => continue,
            None => dim = Some(vector.len()),
            _ => {}
        }
        found.insert(id, vector);
    }

    let Some(dim) = dim else {
        bail!("No vocabulary word found in '{}'", path.display());
    };
    if skipped > 0 {
        tracing::warn!("Skipped {} malformed or mis-sized vectors in '{}'", skipped, path.display());
    }

    let mut table = LookupTable::random(vocab_size, dim, seed);
    for (id, vector) in &found {
        let id = *id as usize;
        if id < vocab_size && id != PAD_ID as usize {
            table.values[id * dim..(id + 1) * dim].copy_from_slice(vector);
        }
    }

    tracing::info!(
        "Embeddings: {}/{} vocabulary words covered by '{}' (dim={})",
        found.len(),
        vocab_size,
        path.display(),
        dim
    );
    Ok(table)
}

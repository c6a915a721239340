// ============================================================
// Layer 4 — Train/Held-out Splitter
// ============================================================
// When a corpus ships without a test file, the training file is
// shuffled and split so the model is still evaluated on unseen
// sentences.
//
// The shuffle is seeded from the experiment seed so a rerun
// produces the same split.
//
// Reference: rand crate documentation (SliceRandom, StdRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, held_out).
///
/// # Example
/// ```ignore
/// let (train, test) = split_train_val(all_samples, 0.9, 9999);
/// ```
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).floor() as usize;
    // at least one held-out row whenever there are two or more
    let split_at = if total > 1 { split_at.min(total - 1) } else { split_at.min(total) };

    let held_out = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} held-out ({}% / {}%)",
        samples.len(),
        held_out.len(),
        (samples.len()  * 100) / total.max(1),
        (held_out.len() * 100) / total.max(1),
    );

    (samples, held_out)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val)      = split_train_val(items, 0.9, 1);
        assert_eq!(train.len(), 90);
        assert_eq!(val.len(),   10);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, val)      = split_train_val(items, 0.7, 2);
        let mut all: Vec<usize> = train.into_iter().chain(val).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_val((0..20).collect::<Vec<usize>>(), 0.5, 42);
        let b = split_train_val((0..20).collect::<Vec<usize>>(), 0.5, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_small_corpus_keeps_a_held_out_row() {
        let (train, val) = split_train_val((0..5).collect::<Vec<usize>>(), 0.9, 1);
        assert_eq!((train.len(), val.len()), (4, 1));

        let (train, val) = split_train_val((0..3).collect::<Vec<usize>>(), 1.0, 1);
        assert_eq!((train.len(), val.len()), (2, 1));

        let (train, val) = split_train_val(vec![7usize], 0.9, 1);
        assert_eq!((train, val.len()), (Vec::<usize>::new(), 1));
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, val)      = split_train_val(items, 0.8, 0);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }
}

// ============================================================
// Layer 5 — Measurement Pooling / Feature Fusion
// ============================================================
// The measurement layer yields probabilities of shape
// [batch, seq_len, units, 1]. Each pooling branch reduces them
// to [batch, F, 1]; branches are concatenated along F and the
// result is flattened into the classifier input [batch, ΣF].
//
//   branch        reduces          F
//   ───────────   ──────────────   ─────────────
//   max           sequence (max)   units
//   average       sequence (mean)  units
//   none          nothing          seq_len·units
//   max_col       units (max)      seq_len
//   average_col   units (mean)     seq_len
//
// Configured as a comma-separated list, e.g. "max,average_col".
// An unknown name falls back to `none` with a warning.

use burn::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pooling {
    Max,
    Average,
    Flatten,
    MaxCol,
    AverageCol,
}

impl Pooling {
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "max"         => Pooling::Max,
            "average"     => Pooling::Average,
            "none"        => Pooling::Flatten,
            "max_col"     => Pooling::MaxCol,
            "average_col" => Pooling::AverageCol,
            other => {
                tracing::warn!("Unknown pooling type '{}', using the flatten layer", other);
                Pooling::Flatten
            }
        }
    }

    /// Never empty: an empty string yields a single flatten branch.
    pub fn parse_list(list: &str) -> Vec<Self> {
        list.split(',').map(Self::parse).collect()
    }

    pub fn feature_count(self, seq_len: usize, units: usize) -> usize {
        match self {
            Pooling::Max | Pooling::Average       => units,
            Pooling::Flatten                      => seq_len * units,
            Pooling::MaxCol | Pooling::AverageCol => seq_len,
        }
    }

    /// `[b, s, u, 1]` → `[b, F, 1]`
    pub fn apply<B: Backend>(self, probs: Tensor<B, 4>) -> Tensor<B, 3> {
        let [batch, seq_len, units, last] = probs.dims();
        match self {
            Pooling::Max        => probs.max_dim(1).reshape([batch, units, last]),
            Pooling::Average    => probs.mean_dim(1).reshape([batch, units, last]),
            Pooling::Flatten    => probs.flatten::<3>(1, 2),
            Pooling::MaxCol     => probs.max_dim(2).reshape([batch, seq_len, last]),
            Pooling::AverageCol => probs.mean_dim(2).reshape([batch, seq_len, last]),
        }
    }
}

/// Total classifier input width for a list of branches
pub fn fused_feature_count(pools: &[Pooling], seq_len: usize, units: usize) -> usize {
    pools.iter().map(|p| p.feature_count(seq_len, units)).sum()
}

/// Apply every branch and fuse: `[b, s, u, 1]` → `[b, ΣF]`
pub fn fuse<B: Backend>(pools: &[Pooling], probs: Tensor<B, 4>) -> Tensor<B, 2> {
    let features: Vec<Tensor<B, 3>> = pools.iter().map(|p| p.apply(probs.clone())).collect();
    Tensor::cat(features, 1).flatten::<2>(1, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TB = NdArray;

    fn probs() -> Tensor<TB, 4> {
        // batch 1, seq 2, units 3
        Tensor::from_data(
            TensorData::new(vec![1.0f32, 5.0, 3.0, 4.0, 2.0, 6.0], [1, 2, 3, 1]),
            &Default::default(),
        )
    }

    fn values(t: Tensor<TB, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_parse_list_with_fallback() {
        assert_eq!(Pooling::parse_list("max, average_col"), vec![Pooling::Max, Pooling::AverageCol]);
        assert_eq!(Pooling::parse_list("median"), vec![Pooling::Flatten]);
        assert_eq!(Pooling::parse_list(""), vec![Pooling::Flatten]);
    }

    #[test]
    fn test_feature_counts() {
        let pools = Pooling::parse_list("max,average,none,max_col,average_col");
        assert_eq!(fused_feature_count(&pools, 10, 4), 4 + 4 + 40 + 10 + 10);
    }

    #[test]
    fn test_each_branch() {
        assert_eq!(values(fuse(&[Pooling::Max], probs())), vec![4.0, 5.0, 6.0]);
        assert_eq!(values(fuse(&[Pooling::Average], probs())), vec![2.5, 3.5, 4.5]);
        assert_eq!(values(fuse(&[Pooling::Flatten], probs())), vec![1.0, 5.0, 3.0, 4.0, 2.0, 6.0]);
        assert_eq!(values(fuse(&[Pooling::MaxCol], probs())), vec![5.0, 6.0]);
        assert_eq!(values(fuse(&[Pooling::AverageCol], probs())), vec![3.0, 4.0]);
    }

    #[test]
    fn test_branches_are_concatenated_in_order() {
        let fused = fuse(&[Pooling::MaxCol, Pooling::Max], probs());
        assert_eq!(fused.dims(), [1, 5]);
        assert_eq!(values(fused), vec![5.0, 6.0, 4.0, 5.0, 6.0]);
    }
}

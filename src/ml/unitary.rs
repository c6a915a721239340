// ============================================================
// Layer 5 — Unitary Optimiser
// ============================================================
// Updates the [d, d, 2] kernels of the projection measurements
// while keeping them unitary (Cayley transform on the manifold):
//
//   G = ∂L/∂W                 (complex, from the [.., 2] layout)
//   A = G·W† − W·G†           (skew-Hermitian)
//   W ← (I + η/2·A)⁻¹ (I − η/2·A) W
//
// The Cayley factor of a skew-Hermitian matrix is unitary, so W
// stays unitary up to float rounding. Any tensor that is not a
// square complex kernel gets a plain gradient step.
//
// Reference: Wisdom et al. (2016) Full-Capacity Unitary RNNs

use burn::{
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, LearningRate, SimpleOptimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use nalgebra::DMatrix;
use num_complex::Complex64;

/// Square complex matrix from the interleaved row-major
/// `[d, d, 2]` (re, im) layout
pub fn from_interleaved(dim: usize, data: &[f32]) -> Option<DMatrix<Complex64>> {
    (data.len() == dim * dim * 2).then(|| {
        DMatrix::from_row_iterator(
            dim,
            dim,
            data.chunks_exact(2).map(|c| Complex64::new(c[0] as f64, c[1] as f64)),
        )
    })
}

pub fn to_interleaved(m: &DMatrix<Complex64>) -> Vec<f32> {
    let mut out = Vec::with_capacity(m.len() * 2);
    for row in m.row_iter() {
        for v in row.iter() {
            out.push(v.re as f32);
            out.push(v.im as f32);
        }
    }
    out
}

/// One Cayley step. None when the system cannot be solved.
pub fn cayley_step(
    weight: &DMatrix<Complex64>,
    grad:   &DMatrix<Complex64>,
    lr:     f64,
) -> Option<DMatrix<Complex64>> {
    let skew = grad * weight.adjoint() - weight * grad.adjoint();
    let half = skew.map(|v| v * (lr / 2.0));
    let identity = DMatrix::<Complex64>::identity(weight.nrows(), weight.ncols());

    let rhs = (&identity - &half) * weight;
    (identity + half).lu().solve(&rhs)
}

/// Stateless: every step only needs the current weight and gradient.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitaryOptimizer;

impl UnitaryOptimizer {
    /// Wrap for use on modules, like the optimiser configs do
    pub fn init<B: AutodiffBackend, M: AutodiffModule<B>>() -> OptimizerAdaptor<Self, M, B> {
        OptimizerAdaptor::from(Self)
    }

    fn unitary_update<B: Backend, const D: usize>(
        lr:     LearningRate,
        tensor: &Tensor<B, D>,
        grad:   &Tensor<B, D>,
    ) -> Option<Tensor<B, D>> {
        let dims = tensor.dims();
        if D != 3 || dims[0] != dims[1] || dims[2] != 2 {
            return None;
        }
        let dim = dims[0];

        let weight = tensor.clone().into_data().convert::<f32>().to_vec::<f32>().ok()?;
        let grad   = grad.clone().into_data().convert::<f32>().to_vec::<f32>().ok()?;
        let weight = from_interleaved(dim, &weight)?;
        let grad   = from_interleaved(dim, &grad)?;

        let updated = cayley_step(&weight, &grad, lr)?;
        Some(Tensor::from_data(
            TensorData::new(to_interleaved(&updated), dims),
            &tensor.device(),
        ))
    }
}

impl<B: Backend> SimpleOptimizer<B> for UnitaryOptimizer {
    type State<const D: usize> = ();

    fn step<const D: usize>(
        &self,
        lr:     LearningRate,
        tensor: Tensor<B, D>,
        grad:   Tensor<B, D>,
        _state: Option<Self::State<D>>,
    ) -> (Tensor<B, D>, Option<Self::State<D>>) {
        match Self::unitary_update(lr, &tensor, &grad) {
            Some(updated) => (updated, None),
            None => {
                tracing::debug!("Plain gradient step for tensor {:?}", tensor.dims());
                (tensor - grad.mul_scalar(lr), None)
            }
        }
    }

    fn to_device<const D: usize>(state: Self::State<D>, _device: &B::Device) -> Self::State<D> {
        state
    }
}

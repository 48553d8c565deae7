//! Gradient clipping by the joint norm of every parameter.
//!
//! Burn's optimizer-level clipping looks at one parameter tensor at a time, so
//! a model with many tensors can step well past the ceiling. These helpers
//! treat all gradients of a module as one vector.

use burn::module::{AutodiffModule, ModuleVisitor, ParamId};
use burn::optim::GradientsParams;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::error::Result;
use crate::util::scalar;

struct SquaredNorm<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    sum: Option<Tensor<B::InnerBackend, 1>>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            let squared = grad.powf_scalar(2.0).sum();
            self.sum = Some(match self.sum.take() {
                Some(sum) => sum + squared,
                None => squared,
            });
        }
    }
}

struct Rescale<'a> {
    grads: &'a mut GradientsParams,
    factor: f32,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads
                .register::<B::InnerBackend, D>(id, grad.mul_scalar(self.factor));
        }
    }
}

/// L2 norm of all gradients of `module` taken together.
pub fn global_grad_norm<B, M>(module: &M, grads: &GradientsParams) -> Result<f32>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut visitor = SquaredNorm::<B> { grads, sum: None };
    module.visit(&mut visitor);
    match visitor.sum {
        Some(sum) => Ok(scalar(sum)?.sqrt()),
        None => Ok(0.0),
    }
}

/// Scale every gradient by `max_norm / norm` when the joint norm exceeds
/// `max_norm`. Returns the norm before clipping.
pub fn clip_global_norm<B, M>(module: &M, grads: &mut GradientsParams, max_norm: f32) -> Result<f32>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let norm = global_grad_norm::<B, M>(module, grads)?;
    if norm.is_finite() && norm > max_norm {
        let mut visitor = Rescale {
            grads,
            factor: max_norm / norm,
        };
        module.visit(&mut visitor);
    }
    Ok(norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::float_tensor;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::Param;

    type AD = Autodiff<NdArray>;

    #[derive(Module, Debug)]
    struct TwoParams<B: Backend> {
        a: Param<Tensor<B, 1>>,
        b: Param<Tensor<B, 1>>,
    }

    /// Module whose gradients are `scale * [1, 0]` and `scale * [0, 1]`.
    fn grads_of(scale: f32) -> (TwoParams<AD>, GradientsParams) {
        let device = Default::default();
        let model = TwoParams {
            a: Param::from_tensor(Tensor::<AD, 1>::zeros([2], &device)),
            b: Param::from_tensor(Tensor::<AD, 1>::zeros([2], &device)),
        };
        let wa = float_tensor::<AD, 1>(vec![scale, 0.0], [2], &device);
        let wb = float_tensor::<AD, 1>(vec![0.0, scale], [2], &device);
        let loss = (model.a.val() * wa).sum() + (model.b.val() * wb).sum();
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        (model, grads)
    }

    #[test]
    fn test_joint_norm_over_tensors() {
        let (model, grads) = grads_of(0.9);
        let norm = global_grad_norm::<AD, _>(&model, &grads).unwrap();
        assert!((norm - 0.9 * 2f32.sqrt()).abs() < 1e-5, "{}", norm);
    }

    #[test]
    fn test_clipping_bounds_joint_norm() {
        // Each tensor alone is under the ceiling; together they are not.
        let (model, mut grads) = grads_of(0.9);
        let before = clip_global_norm::<AD, _>(&model, &mut grads, 1.0).unwrap();
        assert!(before > 1.27);

        let after = global_grad_norm::<AD, _>(&model, &grads).unwrap();
        assert!(after <= 1.0 + 1e-5, "{}", after);
        assert!((after - 1.0).abs() < 1e-4, "{}", after);

        let ga = crate::util::to_vec(grads.get::<NdArray, 1>(model.a.id).unwrap()).unwrap();
        assert!((ga[0] - 0.9 / before).abs() < 1e-5, "{:?}", ga);
        assert_eq!(ga[1], 0.0);
    }

    #[test]
    fn test_small_gradients_untouched() {
        let (model, mut grads) = grads_of(0.5);
        clip_global_norm::<AD, _>(&model, &mut grads, 1.0).unwrap();
        let gb = crate::util::to_vec(grads.get::<NdArray, 1>(model.b.id).unwrap()).unwrap();
        assert_eq!(gb, vec![0.0, 0.5]);
    }
}

//! Host/device tensor conversion helpers.

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::error::{NeuralTerraError, Result};

/// Copy a float tensor to the host.
pub fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| NeuralTerraError::InvalidData(format!("{:?}", e)))
}

/// Read a single-element tensor.
pub fn scalar<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<f32> {
    to_vec(tensor)?
        .first()
        .copied()
        .ok_or_else(|| NeuralTerraError::InvalidData("empty tensor".to_string()))
}

/// Build a float tensor from host values.
pub fn float_tensor<B: Backend, const D: usize>(
    values: Vec<f32>,
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D> {
    Tensor::from_data(TensorData::new(values, shape), device)
}

/// Build an integer index tensor from host values.
pub fn index_tensor<B: Backend, const D: usize>(
    values: Vec<i64>,
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D, Int> {
    Tensor::from_data(TensorData::new(values, shape), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_roundtrip() {
        let device = Default::default();
        let t = float_tensor::<TestBackend, 2>(vec![1.0, 2.0, 3.0, 4.0], [2, 2], &device);
        assert_eq!(to_vec(t.clone()).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(scalar(t.sum()).unwrap(), 10.0);
    }

    #[test]
    fn test_index_tensor() {
        let device = Default::default();
        let idx = index_tensor::<TestBackend, 1>(vec![2, 0], [2], &device);
        let t = float_tensor::<TestBackend, 1>(vec![5.0, 6.0, 7.0], [3], &device);
        assert_eq!(to_vec(t.select(0, idx)).unwrap(), vec![7.0, 5.0]);
    }
}

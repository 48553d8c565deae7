//! MLP (Multi-Layer Perceptron) building block.

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Configuration for an MLP.
#[derive(Config, Debug)]
pub struct MlpConfig {
    /// Input dimension.
    pub input_dim: usize,
    /// Output dimension.
    pub output_dim: usize,
    /// Hidden layer dimensions.
    #[config(default = "vec![]")]
    pub hidden_dims: Vec<usize>,
    /// Dropout probability.
    #[config(default = 0.0)]
    pub dropout: f64,
    /// Whether to apply activation to the final layer.
    #[config(default = false)]
    pub final_activation: bool,
}

impl MlpConfig {
    /// Initialize the MLP.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Mlp<B> {
        let mut layers = Vec::new();
        let mut in_dim = self.input_dim;

        for &out_dim in &self.hidden_dims {
            layers.push(LinearConfig::new(in_dim, out_dim).init(device));
            in_dim = out_dim;
        }

        let output = LinearConfig::new(in_dim, self.output_dim).init(device);

        let dropout = if self.dropout > 0.0 {
            Some(DropoutConfig::new(self.dropout).init())
        } else {
            None
        };

        Mlp {
            layers,
            output,
            activation: Relu::new(),
            dropout,
            output_activation: self.final_activation.then(Relu::new),
        }
    }
}

/// Multi-Layer Perceptron module.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    layers: Vec<Linear<B>>,
    output: Linear<B>,
    activation: Relu,
    dropout: Option<Dropout>,
    output_activation: Option<Relu>,
}

impl<B: Backend> Mlp<B> {
    /// Forward pass.
    ///
    /// Input shape: [batch, input_dim]
    /// Output shape: [batch, output_dim]
    pub fn forward(&self, mut x: Tensor<B, 2>) -> Tensor<B, 2> {
        for layer in &self.layers {
            x = layer.forward(x);
            x = self.activation.forward(x);
            if let Some(ref dropout) = self.dropout {
                x = dropout.forward(x);
            }
        }

        x = self.output.forward(x);

        match &self.output_activation {
            Some(act) => act.forward(x),
            None => x,
        }
    }

    /// Output dimension.
    pub fn output_dim(&self) -> usize {
        self.output.weight.dims()[1]
    }
}

//! Factorization Machine (FM) layer.
//!
//! Computes a linear term plus all second-order feature interactions in
//! `O(width * factor_dim)` using the sum-of-squares identity:
//!
//! ```text
//! y = bias + x·w + 0.5 * Σ_f [ (Σ_i x_i V_if)^2 - Σ_i (x_i V_if)^2 ]
//! ```
//!
//! Inside DeepFM the input `x` is the flattened embedded representation, so
//! the "features" of this layer are individual embedding coordinates.
//!
//! # References
//!
//! - [Factorization Machines](https://www.csie.ntu.edu.tw/~b97053/paper/Rendle2010FM.pdf)

use crate::error::LayerError;
use crate::initializer::{split_seed, Initializer};
use crate::layer::Layer;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
struct FmCache {
    input: Tensor,
    /// x @ V, shape [batch, factor_dim]
    summed: Tensor,
}

/// Factorization machine with linear weights `w`, interaction factors `V`
/// and a scalar bias.
///
/// # Example
///
/// ```
/// use shoulder_layers::fm::FactorizationMachine;
/// use shoulder_layers::layer::Layer;
/// use shoulder_layers::tensor::Tensor;
///
/// let fm = FactorizationMachine::new(90, 3, 10);
/// assert_eq!(fm.w().shape(), &[3, 1]);
/// assert_eq!(fm.v().shape(), &[3, 10]);
/// assert_eq!(fm.bias(), 0.0);
///
/// let out = fm.forward(&Tensor::ones(&[10, 3])).unwrap();
/// assert_eq!(out.shape(), &[10, 1]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorizationMachine {
    /// Linear weights of shape [input_width, 1]
    w: Tensor,
    /// Interaction factors of shape [input_width, factor_dim]
    #[serde(rename = "V")]
    v: Tensor,
    /// Scalar bias stored as shape [1]
    bias: Tensor,
    #[serde(skip)]
    cache: Option<FmCache>,
    #[serde(skip)]
    grads: Option<Vec<Tensor>>,
}

impl FactorizationMachine {
    /// Creates an FM over `input_width` features with `factor_dim` latent
    /// factors.
    ///
    /// `w` and `V` are Glorot-uniform from independent streams derived from
    /// `seed`; the bias starts at `0.0`.
    pub fn new(seed: u64, input_width: usize, factor_dim: usize) -> Self {
        let w = Initializer::GlorotUniform {
            seed: split_seed(seed, 0),
        }
        .initialize(&[input_width, 1]);
        let v = Initializer::GlorotUniform {
            seed: split_seed(seed, 1),
        }
        .initialize(&[input_width, factor_dim]);
        Self {
            w,
            v,
            bias: Tensor::zeros(&[1]),
            cache: None,
            grads: None,
        }
    }

    /// Builds an FM from explicit parameters.
    ///
    /// # Errors
    ///
    /// Returns a shape error if `w` is not `[width, 1]` or `v` is not
    /// `[width, k]`.
    pub fn from_parts(w: Tensor, v: Tensor, bias: f32) -> Result<Self, LayerError> {
        if w.ndim() != 2 || w.shape()[1] != 1 {
            return Err(LayerError::ShapeMismatch {
                expected: vec![w.shape()[0], 1],
                actual: w.shape().to_vec(),
            });
        }
        if v.ndim() != 2 || v.shape()[0] != w.shape()[0] {
            return Err(LayerError::ShapeMismatch {
                expected: vec![w.shape()[0], v.shape().last().copied().unwrap_or(0)],
                actual: v.shape().to_vec(),
            });
        }
        Ok(Self {
            w,
            v,
            bias: Tensor::from_data(&[1], vec![bias]),
            cache: None,
            grads: None,
        })
    }

    /// Linear weights.
    pub fn w(&self) -> &Tensor {
        &self.w
    }

    /// Interaction factors.
    pub fn v(&self) -> &Tensor {
        &self.v
    }

    /// Scalar bias.
    pub fn bias(&self) -> f32 {
        self.bias.data()[0]
    }

    /// Number of input features.
    pub fn input_width(&self) -> usize {
        self.w.shape()[0]
    }

    fn check_input(&self, input: &Tensor) -> Result<(), LayerError> {
        if input.ndim() != 2 {
            return Err(LayerError::ForwardError {
                message: format!("Expected 2D input, got {}D", input.ndim()),
            });
        }
        if input.cols() != self.input_width() {
            return Err(LayerError::InvalidInputDimension {
                expected: self.input_width(),
                actual: input.cols(),
            });
        }
        Ok(())
    }

    fn compute(&self, input: &Tensor) -> (Tensor, Tensor) {
        let linear = input.matmul(&self.w);
        let summed = input.matmul(&self.v);
        let sum_of_squares = input.sqr().matmul(&self.v.sqr());
        let interaction = summed
            .sqr()
            .sub(&sum_of_squares)
            .sum_axis(1)
            .scale(0.5)
            .reshape(&[input.rows(), 1]);
        let output = linear.add(&interaction).add(&self.bias);
        (output, summed)
    }

    /// Performs forward pass and caches what backward needs.
    pub fn forward_train(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        self.check_input(input)?;
        let (output, summed) = self.compute(input);
        self.cache = Some(FmCache {
            input: input.clone(),
            summed,
        });
        Ok(output)
    }
}

impl Layer for FactorizationMachine {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        self.check_input(input)?;
        Ok(self.compute(input).0)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let FmCache { input, summed } = self.cache.as_ref().ok_or(LayerError::NotInitialized)?;
        let batch = input.rows();
        if grad.shape() != [batch, 1] {
            return Err(LayerError::ShapeMismatch {
                expected: vec![batch, 1],
                actual: grad.shape().to_vec(),
            });
        }
        let width = self.input_width();
        let k = self.v.shape()[1];
        let g = grad.data();

        // dw = x^T g
        let w_grad = input.transpose().matmul(grad);
        let bias_grad = Tensor::from_data(&[1], vec![grad.sum()]);

        // dV = x^T (g ⊙ s) - V ⊙ ((x²)^T g)
        let mut g_summed = summed.clone();
        for (b, row) in g_summed.data_mut().chunks_mut(k.max(1)).enumerate() {
            row.iter_mut().for_each(|s| *s *= g[b]);
        }
        let sq_weight = input.sqr().transpose().matmul(grad);
        let mut v_grad = input.transpose().matmul(&g_summed);
        for i in 0..width {
            let c = sq_weight.data()[i];
            for f in 0..k {
                v_grad.data_mut()[i * k + f] -= self.v.data()[i * k + f] * c;
            }
        }

        // dx = g wᵀ + g ⊙ (s Vᵀ - x ⊙ rowsum(V²))
        let v_sq_rows = self.v.sqr().sum_axis(1);
        let s_vt = summed.matmul(&self.v.transpose());
        let mut input_grad = Tensor::zeros(&[batch, width]);
        for b in 0..batch {
            for i in 0..width {
                let idx = b * width + i;
                let x = input.data()[idx];
                let inner = s_vt.data()[idx] - x * v_sq_rows.data()[i];
                input_grad.data_mut()[idx] = g[b] * (self.w.data()[i] + inner);
            }
        }

        self.grads = Some(vec![w_grad, v_grad, bias_grad]);
        Ok(input_grad)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.w, &self.v, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.w, &mut self.v, &mut self.bias]
    }

    fn take_gradients(&mut self) -> Result<Vec<Tensor>, LayerError> {
        let grads = self.grads.take().ok_or(LayerError::NotInitialized)?;
        self.cache = None;
        Ok(grads)
    }

    fn name(&self) -> &str {
        "FactorizationMachine"
    }
}

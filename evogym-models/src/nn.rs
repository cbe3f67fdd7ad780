//! Defines a fully connected neural network policy
use std::f32::consts::E;

use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use evogym_core::error::ConfigError;
use evogym_core::model::{Evaluator, GradientFuser, Initializer, Policy, WeightUpdater};

use crate::intrinsics::{dot, inplace_sum, scale, softmax, sum};

use super::*;

#[derive(Serialize, Deserialize, Clone, Debug, Copy, PartialEq)]
/// Defines the different types of functions between layers
pub enum NonLinearity {
    /// ReLu
    ReLu,

    /// Tanh
    Tanh,

    /// Linear. Note this isn't non-linear
    Linear,

    /// Sigmoid
    Sigmoid,

    /// ELU
    ELU,
}

impl NonLinearity {
    #[inline]
    /// Applies the specified function
    fn eval(&self, f: f32) -> f32 {
        use self::NonLinearity::*;
        match self {
            ReLu => f.max(0f32),
            Tanh => f.tanh(),
            Sigmoid => 1. / (1. + E.powf(-f)),
            Linear => f,
            ELU => {
                if f > 0. {
                    f
                } else {
                    f.exp() - 1.
                }
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Copy, PartialEq)]
/// Transform applied to the output of the last layer
pub enum Head {
    /// Turns the scores into action probabilities.  Required for random selection.
    Softmax,
    /// Raw scores
    Identity,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
/// Represents a layer of a neural network
struct Layer {
    /// The weights of the layer, one row per output
    w: Vec<Vec<f32>>,
    /// The bias
    bias: Vec<f32>,
    /// The type of non-linearity to apply
    nl: NonLinearity,
}

impl Layer {
    /// Creates a new layer
    pub fn new(input_dim: usize, output_dim: usize, nl: NonLinearity) -> Self {
        let w = (0..output_dim).map(|_x| vec![0f32; input_dim]).collect();

        Layer {
            w,
            bias: vec![0f32; output_dim],
            nl,
        }
    }

    /// Gets the dimensions of the layer
    fn dims(&self) -> (usize, usize) {
        (self.w[0].len(), self.bias.len())
    }

    /// Given a dense payload, applies the weights, bias, and non-linearity to it
    fn eval(&self, payload: &[f32], output: &mut [f32]) {
        for i in 0..self.w.len() {
            output[i] = dot(&self.w[i], payload);
        }

        inplace_sum(&mut output[0..self.bias.len()], &self.bias);
        for o in output.iter_mut() {
            *o = self.nl.eval(*o);
        }
    }
}

impl WeightUpdater for Layer {
    #[inline]
    fn num_weights(&self) -> usize {
        self.w.len() * (self.w[0].len() + 1)
    }

    fn update_gradients<F>(&mut self, f: &mut F)
    where
        F: FnMut() -> f32,
    {
        for r in self.w.iter_mut() {
            update_vec(r, f);
        }

        update_vec(&mut self.bias, f);
    }

    fn scale_gradients(&mut self, s: f32) {
        for r in self.w.iter_mut() {
            scale(r, s);
        }

        scale(&mut self.bias, s);
    }

    fn copy_gradients(&self, other: &mut Self) {
        assert_eq!(self.num_weights(), other.num_weights());
        for i in 0..self.w.len() {
            copy_vec(&self.w[i], &mut other.w[i]);
        }
        copy_vec(&self.bias, &mut other.bias);
    }

    fn add_gradients(&mut self, other: &Self) {
        assert_eq!(self.num_weights(), other.num_weights());
        for i in 0..self.w.len() {
            add_vec(&mut self.w[i], &other.w[i]);
        }
        add_vec(&mut self.bias, &other.bias);
    }
}

impl GradientFuser<Layer> for Layer {
    fn update(&self, grad: &Layer, into: &mut Self) {
        assert_eq!(self.w.len(), grad.w.len());
        assert_eq!(self.bias.len(), grad.bias.len());

        for i in 0..self.w.len() {
            sum(&self.w[i], &grad.w[i], &mut into.w[i]);
        }

        sum(&self.bias, &grad.bias, &mut into.bias);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
/// Representation of a full network
pub struct Network {
    /// All the layers
    layers: Vec<Layer>,
    /// Applied to the last layer's output
    head: Head,
}

impl Network {
    /// Initializes a new network with the specified layer sizes, the last of which is
    /// the number of actions.  Hidden layers use `nl`; the last layer is linear and
    /// fed through `head`.
    pub fn new(input_dim: usize, sizes: &[usize], nl: NonLinearity, head: Head) -> Self {
        assert!(!sizes.is_empty());
        let mut input = input_dim;
        let mut layers = Vec::with_capacity(sizes.len());
        for (i, &s) in sizes.iter().enumerate() {
            let lnl = if i + 1 == sizes.len() {
                NonLinearity::Linear
            } else {
                nl
            };
            layers.push(Layer::new(input, s, lnl));
            input = s;
        }

        Network { layers, head }
    }

    /// Output transform
    pub fn head(&self) -> Head {
        self.head
    }

    /// Widths of every layer, last one being the action count
    pub fn sizes(&self) -> Vec<usize> {
        self.layers.iter().map(|l| l.bias.len()).collect()
    }

    /// Activation of the hidden layers, if there are any
    pub fn activation(&self) -> Option<NonLinearity> {
        if self.layers.len() > 1 {
            Some(self.layers[0].nl)
        } else {
            None
        }
    }
}

impl Evaluator<[f32], Vec<f32>> for Network {
    fn evaluate(&self, payload: &[f32]) -> Vec<f32> {
        let mut input = payload.to_vec();
        for layer in self.layers.iter() {
            let (_, output_dim) = layer.dims();
            let mut output = vec![0f32; output_dim];
            layer.eval(&input, &mut output);
            input = output;
        }

        if let Head::Softmax = self.head {
            softmax(&mut input);
        }
        input
    }
}

impl WeightUpdater for Network {
    fn num_weights(&self) -> usize {
        self.layers.iter().map(|l| l.num_weights()).sum()
    }

    fn update_gradients<F>(&mut self, f: &mut F)
    where
        F: FnMut() -> f32,
    {
        for l in self.layers.iter_mut() {
            l.update_gradients(f);
        }
    }

    fn scale_gradients(&mut self, s: f32) {
        for l in self.layers.iter_mut() {
            l.scale_gradients(s);
        }
    }

    fn copy_gradients(&self, other: &mut Self) {
        assert_eq!(self.num_weights(), other.num_weights());
        for i in 0..self.layers.len() {
            self.layers[i].copy_gradients(&mut other.layers[i]);
        }
    }

    fn add_gradients(&mut self, other: &Self) {
        assert_eq!(self.num_weights(), other.num_weights());
        for i in 0..self.layers.len() {
            self.layers[i].add_gradients(&other.layers[i]);
        }
    }
}

impl GradientFuser<Network> for Network {
    fn update(&self, grad: &Network, into: &mut Self) {
        assert_eq!(self.num_weights(), grad.num_weights());
        assert_eq!(self.num_weights(), into.num_weights());
        for i in 0..self.layers.len() {
            self.layers[i].update(&grad.layers[i], &mut into.layers[i]);
        }
    }
}

impl Policy for Network {
    fn input_dims(&self) -> usize {
        self.layers[0].dims().0
    }

    fn output_dims(&self) -> usize {
        self.layers[self.layers.len() - 1].dims().1
    }

    // Every layer needs a rectangular weight matrix with one bias per row, and each
    // layer's width must feed the next
    fn validate(&self) -> Result<(), ConfigError> {
        let malformed = |msg: String| Err(ConfigError::Malformed(msg));
        if self.layers.is_empty() {
            return malformed("network has no layers".into());
        }

        let mut previous: Option<usize> = None;
        for (i, layer) in self.layers.iter().enumerate() {
            let rows = layer.w.len();
            if rows == 0 {
                return malformed(format!("layer {} has no outputs", i));
            }
            let inputs = layer.w[0].len();
            if inputs == 0 || layer.w.iter().any(|r| r.len() != inputs) {
                return malformed(format!("layer {} has ragged or empty rows", i));
            }
            if layer.bias.len() != rows {
                return malformed(format!(
                    "layer {} has {} outputs but {} biases",
                    i,
                    rows,
                    layer.bias.len()
                ));
            }
            if let Some(p) = previous {
                if p != inputs {
                    return malformed(format!(
                        "layer {} takes {} inputs but layer {} emits {}",
                        i,
                        inputs,
                        i - 1,
                        p
                    ));
                }
            }
            previous = Some(rows);
        }
        Ok(())
    }
}

/// Representation of a neural network model
pub struct NNModel {
    /// Size of the input dimensions
    input_dims: usize,
    /// Hidden layer widths followed by the number of actions
    sizes: Vec<usize>,
    /// Type of non-linearity to apply
    nl: NonLinearity,
    /// Output transform
    head: Head,
}

impl NNModel {
    /// Initializes a new neural network model mapping `input_dims` observations to
    /// `output_dims` actions.  `hidden_dims` may be empty for a linear policy.
    pub fn new(
        input_dims: usize,
        hidden_dims: &[usize],
        output_dims: usize,
        nl: NonLinearity,
        head: Head,
    ) -> Self {
        assert!(input_dims > 0);
        assert!(output_dims > 0);
        hidden_dims.iter().for_each(|d| assert!(*d > 0));
        let mut sizes = hidden_dims.to_vec();
        sizes.push(output_dims);
        NNModel {
            input_dims,
            sizes,
            nl,
            head,
        }
    }

    /// Builds a network with every weight drawn uniformly from [-1, 1]
    pub fn random(&self, seed: u64) -> Network {
        let mut network = self.zero();
        let uniform = Uniform::new_inclusive(-1.0, 1.0);
        let mut prng = XorShiftRng::seed_from_u64(seed);
        network.update_gradients(&mut || uniform.sample(&mut prng));
        network
    }
}

impl Initializer for NNModel {
    type Model = Network;

    fn zero(&self) -> Self::Model {
        Network::new(self.input_dims, &self.sizes, self.nl, self.head)
    }
}

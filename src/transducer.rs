//! Sequence transducers: models that map a one-hot keyboard window to one
//! string-vocabulary code per position.

use std::path::Path;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use duet_core::Vocabulary;

use crate::corpus::{read_json, write_json};

/// One-hot rows for one window: `input[position][code]`
pub type OneHotWindow = Vec<Vec<f32>>;

pub trait SequenceTransducer {
    fn input_width(&self) -> usize;

    fn output_width(&self) -> usize;

    /// One gradient step on a batch; returns the mean cross-entropy per
    /// position before the step
    fn fit_batch(&mut self, inputs: &[OneHotWindow], targets: &[&[u32]]) -> f64;

    /// Mean cross-entropy per position, without learning
    fn evaluate_batch(&self, inputs: &[OneHotWindow], targets: &[&[u32]]) -> f64;

    /// The most probable output code at every input position
    fn predict(&self, input: &[Vec<f32>]) -> Vec<u32>;
}

/// Per-position softmax classifier over one-hot inputs, trained with SGD.
///
/// Positions share one weight matrix; there is no context between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxTransducer {
    input_width: usize,
    output_width: usize,
    learning_rate: f32,
    /// Row-major `output_width x input_width`
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl SoftmaxTransducer {
    pub fn new(input_width: usize, output_width: usize, learning_rate: f32) -> Self {
        Self {
            input_width,
            output_width,
            learning_rate,
            weights: vec![0.0; input_width * output_width],
            bias: vec![0.0; output_width],
        }
    }

    pub fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    /// Output distribution for one input row
    fn probabilities(&self, row: &[f32]) -> Vec<f32> {
        let mut logits = self.bias.clone();
        // Inputs are one-hot, so only the set columns contribute
        for (j, &x) in row.iter().enumerate().take(self.input_width) {
            if x != 0.0 {
                for (k, logit) in logits.iter_mut().enumerate() {
                    *logit += self.weights[k * self.input_width + j] * x;
                }
            }
        }

        let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0;
        for logit in logits.iter_mut() {
            *logit = (*logit - max).exp();
            sum += *logit;
        }
        for p in logits.iter_mut() {
            *p /= sum;
        }
        logits
    }

    fn cross_entropy(p: &[f32], target: u32) -> f64 {
        let p = p.get(target as usize).copied().unwrap_or(0.0);
        -(p.max(1e-12) as f64).ln()
    }
}

impl SequenceTransducer for SoftmaxTransducer {
    fn input_width(&self) -> usize {
        self.input_width
    }

    fn output_width(&self) -> usize {
        self.output_width
    }

    fn fit_batch(&mut self, inputs: &[OneHotWindow], targets: &[&[u32]]) -> f64 {
        let mut weight_grad = vec![0.0f32; self.weights.len()];
        let mut bias_grad = vec![0.0f32; self.bias.len()];
        let mut loss = 0.0;
        let mut positions = 0usize;

        for (window, target) in inputs.iter().zip(targets) {
            for (row, &t) in window.iter().zip(target.iter()) {
                let mut p = self.probabilities(row);
                loss += Self::cross_entropy(&p, t);
                positions += 1;

                // d(loss)/d(logit) = p - onehot(target)
                if let Some(pt) = p.get_mut(t as usize) {
                    *pt -= 1.0;
                }
                for (k, g) in p.iter().enumerate() {
                    bias_grad[k] += g;
                    for (j, &x) in row.iter().enumerate().take(self.input_width) {
                        if x != 0.0 {
                            weight_grad[k * self.input_width + j] += g * x;
                        }
                    }
                }
            }
        }

        if positions == 0 {
            return 0.0;
        }

        let scale = self.learning_rate / positions as f32;
        for (w, g) in self.weights.iter_mut().zip(&weight_grad) {
            *w -= scale * g;
        }
        for (b, g) in self.bias.iter_mut().zip(&bias_grad) {
            *b -= scale * g;
        }

        loss / positions as f64
    }

    fn evaluate_batch(&self, inputs: &[OneHotWindow], targets: &[&[u32]]) -> f64 {
        let mut loss = 0.0;
        let mut positions = 0usize;
        for (window, target) in inputs.iter().zip(targets) {
            for (row, &t) in window.iter().zip(target.iter()) {
                loss += Self::cross_entropy(&self.probabilities(row), t);
                positions += 1;
            }
        }
        if positions == 0 {
            0.0
        } else {
            loss / positions as f64
        }
    }

    fn predict(&self, input: &[Vec<f32>]) -> Vec<u32> {
        input
            .iter()
            .map(|row| {
                self.probabilities(row)
                    .iter()
                    .enumerate()
                    .fold((0usize, f32::NEG_INFINITY), |best, (k, &p)| {
                        if p > best.1 {
                            (k, p)
                        } else {
                            best
                        }
                    })
                    .0 as u32
            })
            .collect()
    }
}

/// Everything generation needs from a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint<T> {
    pub keyboard_vocabulary: Vocabulary,
    pub string_vocabulary: Vocabulary,
    pub window_length: usize,
    /// Last completed epoch, counting from 1
    pub epoch: usize,
    /// Training loss of that epoch
    pub loss: f64,
    pub model: T,
}

impl<T: Serialize + DeserializeOwned> Checkpoint<T> {
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn load_if_exists(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }
}

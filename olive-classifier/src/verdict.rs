//! Interpretation of the model output.
//!
//! The model yields one score per class. The best scoring class decides the
//! [`Verdict`]: class 0 means the olive is healthy, any other class names the disease.
use std::fmt::Display;

use ndarray::ArrayView1;
use thiserror::Error;

use crate::{
    service::{
        labels::{LabelTable, HEALTHY_INDEX},
        prepare::postprocessing,
    },
    tensor::Tensor,
};

#[derive(Error, Debug, PartialEq)]
pub enum VerdictError {
    #[error("The model produced {actual} scores but the label table has {expected} classes")]
    LabelMismatch { expected: usize, actual: usize },
    #[error("The output of shape {0:?} is not a score vector")]
    NotAVector(Vec<usize>),
    #[error("The score at index {0} is not a finite number")]
    InvalidScore(usize),
}

/// How the confidence of a verdict is derived from the scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfidencePolicy {
    /// The winning score as produced by the model.
    #[default]
    Raw,
    /// The winning probability after a softmax over all the scores.
    Softmax,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub is_healthy: bool,
    pub disease_label: Option<String>,
    pub confidence: f32,
    pub class_index: usize,
    pub raw_scores: Vec<f32>,
}

pub struct Prediction {
    pub class: String,
    pub score: f32,
}

impl Verdict {
    /// Best `k` classes, highest score first. Ties keep the class order.
    pub fn top_k(&self, labels: &LabelTable, k: usize) -> Vec<Prediction> {
        let mut ranking = self.raw_scores.iter().copied().enumerate().collect::<Vec<_>>();
        // stable sort, equal scores stay in index order
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranking.truncate(k);

        ranking
            .into_iter()
            .filter_map(|(i, score)| {
                labels.get(i).map(|class| Prediction {
                    class: String::from(class),
                    score,
                })
            })
            .collect()
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_healthy {
            writeln!(f, "✓ Healthy Olive")?;
        } else {
            writeln!(f, "⚠ Disease Detected")?;
        }
        if let Some(disease) = &self.disease_label {
            writeln!(f, "{disease}")?;
        }
        write!(f, "Confidence: {:.1}%", self.confidence * 100.0)
    }
}

/// Turns the output tensor of the model into a verdict.
///
/// The tensor must hold a single score vector (`[N]`, `[1, N]`, ...) with exactly one
/// score per label.
pub fn interpret(
    output: &Tensor,
    labels: &LabelTable,
    policy: ConfidencePolicy,
) -> Result<Verdict, VerdictError> {
    let non_unit_dims = output.shape().iter().filter(|&&dim| dim != 1).count();
    if non_unit_dims > 1 {
        return Err(VerdictError::NotAVector(output.shape().to_vec()));
    }
    interpret_scores(output.data(), labels, policy)
}

pub fn interpret_scores(
    scores: &[f32],
    labels: &LabelTable,
    policy: ConfidencePolicy,
) -> Result<Verdict, VerdictError> {
    if scores.len() != labels.len() {
        return Err(VerdictError::LabelMismatch {
            expected: labels.len(),
            actual: scores.len(),
        });
    }
    if let Some(index) = scores.iter().position(|score| !score.is_finite()) {
        return Err(VerdictError::InvalidScore(index));
    }

    // strict comparison: the first of equal maxima wins
    let (class_index, best) = scores
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, score)| {
            if score > best.1 {
                (i, score)
            } else {
                best
            }
        });

    let confidence = match policy {
        ConfidencePolicy::Raw => best,
        ConfidencePolicy::Softmax => postprocessing(ArrayView1::from(scores))[class_index],
    };

    let is_healthy = class_index == HEALTHY_INDEX;
    let disease_label = (!is_healthy).then(|| labels[class_index].to_string());

    Ok(Verdict {
        is_healthy,
        disease_label,
        confidence,
        class_index,
        raw_scores: scores.to_vec(),
    })
}

//! Boundary with the inference engine.
//!
//! The engine is an external capability: it loads a serialized model once,
//! reports the names of the model inputs and outputs, and runs the model on
//! named tensors. [`TractEngine`] is the implementation used by default.
mod store;
mod tract;

pub use store::*;
pub use tract::*;

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use thiserror::Error;

use crate::tensor::Tensor;

/// Input name → tensor. Keys must be exactly the declared inputs of the session.
pub type InferenceRequest = BTreeMap<String, Tensor>;

/// Output name → tensor.
pub type InferenceResult = BTreeMap<String, Tensor>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Could not load the model {path}: {reason}")]
    Load { path: PathBuf, reason: String },
    #[error("Missing input {0}")]
    MissingInput(String),
    #[error("Unexpected input {0}, not declared by the model")]
    UnexpectedInput(String),
    #[error("Input {name} has shape {actual:?}, the model expects {expected}")]
    ShapeMismatch {
        name: String,
        expected: String,
        actual: Vec<usize>,
    },
    #[error("Model execution failed: {0}")]
    Execution(String),
    #[error("Output {0} is not a float tensor")]
    UnsupportedOutput(String),
}

/// Names declared by a loaded model, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionInfo {
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
}

impl SessionInfo {
    /// Checks that the request provides exactly the declared inputs.
    pub fn check_request(&self, request: &InferenceRequest) -> Result<(), EngineError> {
        if let Some(unexpected) = request
            .keys()
            .find(|name| !self.input_names.contains(name))
        {
            return Err(EngineError::UnexpectedInput(unexpected.clone()));
        }
        if let Some(missing) = self
            .input_names
            .iter()
            .find(|name| !request.contains_key(*name))
        {
            return Err(EngineError::MissingInput(missing.clone()));
        }
        Ok(())
    }
}

/// A loaded model session.
///
/// Implementations must report a shape problem on an input as
/// [`EngineError::ShapeMismatch`], so that callers can retry with another layout.
pub trait InferenceEngine {
    fn session(&self) -> &SessionInfo;

    fn run(&self, request: InferenceRequest) -> Result<InferenceResult, EngineError>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for &E {
    fn session(&self) -> &SessionInfo {
        (**self).session()
    }

    fn run(&self, request: InferenceRequest) -> Result<InferenceResult, EngineError> {
        (**self).run(request)
    }
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Arc<E> {
    fn session(&self) -> &SessionInfo {
        (**self).session()
    }

    fn run(&self, request: InferenceRequest) -> Result<InferenceResult, EngineError> {
        (**self).run(request)
    }
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
    fn session(&self) -> &SessionInfo {
        (**self).session()
    }

    fn run(&self, request: InferenceRequest) -> Result<InferenceResult, EngineError> {
        (**self).run(request)
    }
}

use std::path::Path;

use log::{debug, info};
use tract_onnx::prelude::*;
use tract_onnx::tract_hir::internal::DimLike;

use super::{EngineError, InferenceEngine, InferenceRequest, InferenceResult, SessionInfo};
use crate::tensor::Tensor;

/// ONNX session executed by tract.
///
/// The model is optimized once at load time. Concrete input dimensions are
/// remembered so that a wrongly shaped input is reported as
/// [`EngineError::ShapeMismatch`] before running anything; symbolic
/// dimensions (e.g. a batch size) accept any value.
pub struct TractEngine {
    plan: TypedRunnableModel<TypedModel>,
    session: SessionInfo,
    input_shapes: Vec<Vec<Option<usize>>>,
}

impl TractEngine {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        info!("Loading ONNX model from {}", path.display());

        let engine = Self::load_plan(path).map_err(|e| EngineError::Load {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        })?;

        info!(
            "Model loaded, inputs: {:?}, outputs: {:?}",
            engine.session.input_names, engine.session.output_names
        );
        Ok(engine)
    }

    fn load_plan(path: &Path) -> TractResult<Self> {
        let model = tract_onnx::onnx().model_for_path(path)?.into_optimized()?;

        let input_names = model
            .input_outlets()?
            .iter()
            .map(|outlet| model.node(outlet.node).name.clone())
            .collect();
        let output_names = model
            .output_outlets()?
            .iter()
            .map(|outlet| {
                model
                    .outlet_label(*outlet)
                    .map(String::from)
                    .unwrap_or_else(|| model.node(outlet.node).name.clone())
            })
            .collect();
        let input_shapes = (0..model.inputs.len())
            .map(|ix| {
                let fact = model.input_fact(ix)?;
                Ok(fact
                    .shape
                    .iter()
                    .map(|dim| dim.to_usize().ok())
                    .collect::<Vec<Option<usize>>>())
            })
            .collect::<TractResult<Vec<_>>>()?;

        let plan = model.into_runnable()?;
        Ok(Self {
            plan,
            session: SessionInfo {
                input_names,
                output_names,
            },
            input_shapes,
        })
    }

    /// Releases the model. Dropping the engine has the same effect.
    pub fn close(self) {
        info!("Model session closed");
    }
}

impl InferenceEngine for TractEngine {
    fn session(&self) -> &SessionInfo {
        &self.session
    }

    fn run(&self, mut request: InferenceRequest) -> Result<InferenceResult, EngineError> {
        self.session.check_request(&request)?;

        let inputs = self
            .session
            .input_names
            .iter()
            .zip(&self.input_shapes)
            .map(|(name, expected)| {
                let tensor = request
                    .remove(name)
                    .ok_or_else(|| EngineError::MissingInput(name.clone()))?;
                check_shape(name, expected, tensor.shape())?;

                let (_, shape, data) = tensor.into_parts();
                let array = tract_ndarray::ArrayD::from_shape_vec(tract_ndarray::IxDyn(&shape), data)
                    .map_err(|e| EngineError::Execution(e.to_string()))?;
                Ok(array.into_tensor().into_tvalue())
            })
            .collect::<Result<TVec<_>, EngineError>>()?;

        debug!("Running the model on {} input(s)", inputs.len());
        let outputs = self
            .plan
            .run(inputs)
            .map_err(|e| EngineError::Execution(format!("{e:#}")))?;

        self.session
            .output_names
            .iter()
            .zip(outputs.iter())
            .map(|(name, value)| {
                let view = value
                    .to_array_view::<f32>()
                    .map_err(|_| EngineError::UnsupportedOutput(name.clone()))?;
                let tensor = Tensor::new(
                    name.clone(),
                    view.shape().to_vec(),
                    view.iter().copied().collect(),
                )
                .map_err(|e| EngineError::Execution(e.to_string()))?;
                Ok((name.clone(), tensor))
            })
            .collect()
    }
}

fn check_shape(name: &str, expected: &[Option<usize>], actual: &[usize]) -> Result<(), EngineError> {
    let compatible = expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .all(|(dim, value)| dim.map_or(true, |dim| dim == *value));
    if compatible {
        return Ok(());
    }

    let expected = expected
        .iter()
        .map(|dim| dim.map_or_else(|| String::from("?"), |dim| dim.to_string()))
        .collect::<Vec<_>>()
        .join(", ");
    Err(EngineError::ShapeMismatch {
        name: String::from(name),
        expected: format!("[{expected}]"),
        actual: actual.to_vec(),
    })
}

//! Contains the service that classifies olive images.
//!
//! The service is created using a [`ServiceBuilder`], which can be created using [`ServiceBuilder::new`].
//! It owns the loaded model, the class labels and the [`Config`].
//!
//! [`Service::classify`] runs the whole pipeline on one image: normalization,
//! tensor packing, inference (retrying once with the other layout when the
//! model rejects the input shape) and interpretation of the scores.
//! [`Service::classify_batch`] does the same for several images, preparing them in parallel.

pub mod labels;
pub mod prepare;
pub mod utility;

use std::{io, path::PathBuf};

use log::{debug, error, info, warn};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;

use crate::{
    acquire::SourceImage,
    engine::{
        EngineError, InferenceEngine, InferenceRequest, InferenceResult, ModelStore, SessionInfo,
        TractEngine,
    },
    tensor::{build_tensor, Layout, Tensor},
    verdict::{interpret, ConfidencePolicy, Verdict, VerdictError},
};

use self::{
    labels::LabelTable,
    prepare::{normalize, Interpolation, NormalizeError, NormalizedImage, DEFAULT_INPUT_SIZE},
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("The input is invalid: {0}")]
    InvalidInput(#[from] NormalizeError),
    #[error("Inference failed: {0}")]
    Inference(EngineError),
    #[error("The model output could not be interpreted: {0}")]
    Interpretation(#[from] VerdictError),
    #[error("The used model is invalid: {0}")]
    InvalidModel(&'static str),
    #[error("The output {0} was not produced by the model")]
    OutputNotFound(String),
    #[error("Could not load the model: {0}")]
    ModelLoad(EngineError),
    #[error("Could not materialize the model: {0}")]
    ModelStore(io::Error),
    #[error("Unable to create the thread pool: {0}")]
    ThreadPool(#[from] ThreadPoolBuildError),
}

impl ServiceError {
    /// True when the bundled model and the label table disagree.
    ///
    /// Such an error is not caused by the user and will happen on every image.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ServiceError::Interpretation(VerdictError::LabelMismatch { .. })
        )
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Side of the square image fed to the model.
    pub input_size: u32,
    /// Layout tried first; the other one is tried once if the model rejects it.
    pub layout: Layout,
    pub interpolation: Interpolation,
    pub confidence: ConfidencePolicy,
    /// Threads used to prepare image batches.
    pub num_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            layout: Layout::default(),
            interpolation: Interpolation::default(),
            confidence: ConfidencePolicy::default(),
            num_threads: 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServiceBuilder {
    model_path: PathBuf,
    cache_dir: Option<PathBuf>,
    labels: LabelTable,
    config: Config,
}

impl ServiceBuilder {
    pub fn new(model_path: PathBuf) -> Self {
        Self {
            model_path,
            cache_dir: None,
            labels: LabelTable::default(),
            config: Config::default(),
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn labels(mut self, labels: LabelTable) -> Self {
        self.labels = labels;
        self
    }

    /// Directory the model is copied to before being loaded.
    pub fn cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = Some(cache_dir);
        self
    }

    /// Materializes and loads the model, then creates the service.
    pub fn build(self) -> Result<Service<TractEngine>, ServiceError> {
        let model_path = match &self.cache_dir {
            Some(dir) => ModelStore::new(dir)
                .materialize(&self.model_path)
                .map_err(ServiceError::ModelStore)?,
            None => self.model_path.clone(),
        };
        let engine = TractEngine::load(model_path).map_err(ServiceError::ModelLoad)?;
        Service::new(engine, self.labels, self.config)
    }
}

pub struct Service<E = TractEngine> {
    engine: E,
    labels: LabelTable,
    config: Config,
    input_name: String,
    output_name: String,
    thread_pool: ThreadPool,
}

impl<E: InferenceEngine> Service<E> {
    /// Creates a service on an already loaded engine.
    ///
    /// The model must declare exactly one input and at least one output; the
    /// first output is the score vector.
    pub fn new(engine: E, labels: LabelTable, config: Config) -> Result<Self, ServiceError> {
        let session = engine.session();
        let input_name = match session.input_names.as_slice() {
            [name] => name.clone(),
            [] => return Err(ServiceError::InvalidModel("The model declares no input")),
            _ => return Err(ServiceError::InvalidModel("The model declares more than one input")),
        };
        let output_name = session
            .output_names
            .first()
            .cloned()
            .ok_or(ServiceError::InvalidModel("The model declares no output"))?;
        if labels.is_empty() {
            return Err(ServiceError::InvalidModel("The label table is empty"));
        }

        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build()?;

        debug!(
            "Service ready: input {}, output {}, {} classes, {:?}",
            input_name,
            output_name,
            labels.len(),
            config
        );
        Ok(Self {
            engine,
            labels,
            config,
            input_name,
            output_name,
            thread_pool,
        })
    }

    pub fn current_config(&self) -> Config {
        self.config.clone()
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn session(&self) -> &SessionInfo {
        self.engine.session()
    }

    /// Tears the service down, handing back the engine.
    pub fn into_engine(self) -> E {
        info!("Service closed");
        self.engine
    }

    /// Runs the whole pipeline on a single image.
    pub fn classify(&self, source: &SourceImage) -> Result<Verdict, ServiceError> {
        debug!("Classifying {}", source.describe());
        let image = normalize(source, self.config.input_size, self.config.interpolation)?;
        self.classify_image(&image)
    }

    /// Runs inference and interpretation on an image that is already normalized.
    pub fn classify_image(&self, image: &NormalizedImage) -> Result<Verdict, ServiceError> {
        let output = self.infer(image)?;
        let verdict = interpret(&output, &self.labels, self.config.confidence).map_err(|e| {
            if let VerdictError::LabelMismatch { expected, actual } = &e {
                error!(
                    "The model produces {actual} scores but {expected} labels are configured, check the bundled model and label table"
                );
            }
            ServiceError::from(e)
        })?;
        debug!(
            "Verdict: class {} with confidence {}",
            verdict.class_index, verdict.confidence
        );
        Ok(verdict)
    }

    /// Classifies several images. Preparation runs in parallel, inference one image at a time.
    ///
    /// Returns one outcome per source, in order.
    pub fn classify_batch(&self, sources: &[SourceImage]) -> Vec<Result<Verdict, ServiceError>> {
        let (size, interpolation) = (self.config.input_size, self.config.interpolation);
        let prepared = self
            .thread_pool
            .install(|| utility::read_and_prepare_images(sources, size, interpolation));

        prepared
            .into_iter()
            .map(|image| self.classify_image(&image?))
            .collect()
    }

    /// Runs the model and returns its score tensor.
    ///
    /// The configured layout is tried first. If the engine rejects the input
    /// shape, the alternate layout is tried exactly once.
    pub fn infer(&self, image: &NormalizedImage) -> Result<Tensor, ServiceError> {
        let layout = self.config.layout;
        let attempt = match self.run_with_layout(image, layout) {
            Err(EngineError::ShapeMismatch {
                name,
                expected,
                actual,
            }) => {
                warn!(
                    "Input {name} of shape {actual:?} rejected (expected {expected}), retrying {}",
                    layout.alternate()
                );
                self.run_with_layout(image, layout.alternate())
            }
            other => other,
        };
        let mut outputs = attempt.map_err(ServiceError::Inference)?;

        outputs
            .remove(&self.output_name)
            .ok_or_else(|| ServiceError::OutputNotFound(self.output_name.clone()))
    }

    fn run_with_layout(
        &self,
        image: &NormalizedImage,
        layout: Layout,
    ) -> Result<InferenceResult, EngineError> {
        let tensor = build_tensor(self.input_name.clone(), image, layout);
        debug!("Running inference with {layout} input {:?}", tensor.shape());
        let request = InferenceRequest::from([(self.input_name.clone(), tensor)]);
        self.engine.run(request)
    }
}

#![allow(dead_code)]

use std::{
    io::Cursor,
    sync::{
        mpsc::{Receiver, Sender},
        Mutex,
    },
};

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use olive_classifier::{
    acquire::SourceImage,
    engine::{EngineError, InferenceEngine, InferenceRequest, InferenceResult, SessionInfo},
    tensor::Tensor,
};

/// What the scripted engine does with a request.
pub enum Behavior {
    /// Accepts only inputs of this shape, anything else is a shape mismatch.
    Accept(Vec<usize>),
    /// Fails every run with an execution error.
    Fail(String),
}

/// Makes `run` block until the test releases it.
pub struct Gate {
    pub entered: Mutex<Sender<()>>,
    pub release: Mutex<Receiver<()>>,
}

/// Engine answering with fixed scores, recording the shape of every input it receives.
pub struct ScriptedEngine {
    session: SessionInfo,
    behavior: Behavior,
    scores: Vec<f32>,
    calls: Mutex<Vec<Vec<usize>>>,
    gate: Option<Gate>,
}

impl ScriptedEngine {
    pub fn new(behavior: Behavior, scores: &[f32]) -> Self {
        Self {
            session: SessionInfo {
                input_names: vec![String::from("input")],
                output_names: vec![String::from("output")],
            },
            behavior,
            scores: scores.to_vec(),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn with_session(mut self, session: SessionInfo) -> Self {
        self.session = session;
        self
    }

    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<Vec<usize>> {
        self.calls.lock().unwrap().clone()
    }
}

impl InferenceEngine for ScriptedEngine {
    fn session(&self) -> &SessionInfo {
        &self.session
    }

    fn run(&self, request: InferenceRequest) -> Result<InferenceResult, EngineError> {
        self.session.check_request(&request)?;
        let input = &request[&self.session.input_names[0]];
        self.calls.lock().unwrap().push(input.shape().to_vec());

        if let Some(gate) = &self.gate {
            gate.entered.lock().unwrap().send(()).unwrap();
            gate.release.lock().unwrap().recv().unwrap();
        }

        match &self.behavior {
            Behavior::Accept(shape) if shape.as_slice() == input.shape() => {
                let name = self.session.output_names[0].clone();
                let output =
                    Tensor::new(name.clone(), vec![1, self.scores.len()], self.scores.clone())
                        .unwrap();
                Ok(InferenceResult::from([(name, output)]))
            }
            Behavior::Accept(shape) => Err(EngineError::ShapeMismatch {
                name: input.name().to_string(),
                expected: format!("{shape:?}"),
                actual: input.shape().to_vec(),
            }),
            Behavior::Fail(reason) => Err(EngineError::Execution(reason.clone())),
        }
    }
}

/// A PNG of the given size, encoded in memory.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, 128])
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .unwrap();
    buffer.into_inner()
}

pub fn png_source(width: u32, height: u32) -> SourceImage {
    SourceImage::Bytes(png_bytes(width, height))
}

pub const HEALTHY_SCORES: [f32; 5] = [0.9, 0.05, 0.02, 0.02, 0.01];
pub const ANTHRACNOSE_SCORES: [f32; 5] = [0.1, 0.7, 0.1, 0.05, 0.05];
pub const CHANNELS_FIRST: [usize; 4] = [1, 3, 224, 224];
pub const CHANNELS_LAST: [usize; 4] = [1, 224, 224, 3];

//! # Tensor utilities
//!
//! This module contains the flat tensor exchanged with the inference engine.
//!
//! A [`Tensor`] is a named buffer of `f32` values together with its shape.
//! Images are packed into tensors by [`build_tensor`], either channels-first
//! (`[1, 3, S, S]`) or channels-last (`[1, S, S, 3]`), see [`Layout`].
use std::fmt::Display;

use ndarray::{ArrayD, ArrayViewD, IxDyn, ShapeError};
use thiserror::Error;

use crate::service::prepare::NormalizedImage;

/// Number of color channels fed to the model (red, green, blue).
pub const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    #[error("tensor {name}: data length {actual} does not match shape {shape:?} ({expected} elements)")]
    LengthMismatch {
        name: String,
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
    #[error("tensor {name}: shape {shape:?} has a zero or missing dimension")]
    InvalidShape { name: String, shape: Vec<usize> },
}

/// A named, shaped buffer of 32-bit floats stored in row-major order.
///
/// The constructor guarantees that `data.len()` equals the product of `shape`
/// and that every dimension is positive.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    name: String,
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    pub fn new(
        name: impl Into<String>,
        shape: Vec<usize>,
        data: Vec<f32>,
    ) -> Result<Self, TensorError> {
        let name = name.into();
        if shape.is_empty() || shape.iter().any(|&dim| dim == 0) {
            return Err(TensorError::InvalidShape { name, shape });
        }
        let expected = shape.iter().product::<usize>();
        if expected != data.len() {
            return Err(TensorError::LengthMismatch {
                name,
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { name, shape, data })
    }

    /// Builds a tensor from a dynamic array, taking its elements in logical order.
    pub fn from_array(name: impl Into<String>, array: ArrayD<f32>) -> Result<Self, TensorError> {
        let shape = array.shape().to_vec();
        let data = array.iter().copied().collect();
        Self::new(name, shape, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Same data under a different name.
    pub fn renamed(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn view(&self) -> Result<ArrayViewD<'_, f32>, ShapeError> {
        ArrayViewD::from_shape(IxDyn(&self.shape), &self.data)
    }

    pub fn into_parts(self) -> (String, Vec<usize>, Vec<f32>) {
        (self.name, self.shape, self.data)
    }
}

/// Position of the channel axis inside an image tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// `[batch, channel, row, column]`
    #[default]
    ChannelsFirst,
    /// `[batch, row, column, channel]`
    ChannelsLast,
}

impl Layout {
    pub fn alternate(self) -> Self {
        match self {
            Layout::ChannelsFirst => Layout::ChannelsLast,
            Layout::ChannelsLast => Layout::ChannelsFirst,
        }
    }

    /// Shape of a single-image batch of side `size`.
    pub fn shape(self, size: usize) -> Vec<usize> {
        match self {
            Layout::ChannelsFirst => vec![1, RGB_CHANNELS, size, size],
            Layout::ChannelsLast => vec![1, size, size, RGB_CHANNELS],
        }
    }
}

impl Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::ChannelsFirst => write!(f, "channels-first"),
            Layout::ChannelsLast => write!(f, "channels-last"),
        }
    }
}

/// Packs a normalized image into a batch of one, following the given layout.
///
/// Channels-first iterates channel, row, column; channels-last iterates row,
/// column, channel. Values are copied untouched.
pub fn build_tensor(name: impl Into<String>, image: &NormalizedImage, layout: Layout) -> Tensor {
    let size = image.size() as usize;
    // pixels are stored as [row, column, channel]
    let pixels = image.pixels();
    let data: Vec<f32> = match layout {
        Layout::ChannelsLast => pixels.iter().copied().collect(),
        Layout::ChannelsFirst => pixels.view().permuted_axes([2, 0, 1]).iter().copied().collect(),
    };

    Tensor {
        name: name.into(),
        shape: layout.shape(size),
        data,
    }
}

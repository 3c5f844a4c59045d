use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageError};
use ndarray::{Array1, Array3, ArrayView1};
use thiserror::Error;

use crate::{acquire::SourceImage, tensor::RGB_CHANNELS};

/// Side of the square image expected by the bundled model.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Could not decode image: {0}")]
    Decode(#[from] ImageError),
    #[error("Unsupported pixel format {color} with {channels} channels")]
    UnsupportedFormat { color: String, channels: u8 },
    #[error("Invalid target size {0}")]
    InvalidSize(u32),
    #[error("Invalid pixel grid of shape {0:?}, expected [S, S, 3] with samples in [0, 1]")]
    InvalidGrid(Vec<usize>),
}

/// Resize filter used to bring the source image to the model resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

impl From<Interpolation> for FilterType {
    fn from(value: Interpolation) -> Self {
        match value {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Bilinear => FilterType::Triangle,
        }
    }
}

/// A square RGB image with samples in `[0, 1]`, stored as `[row, column, channel]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    size: u32,
    pixels: Array3<f32>,
}

impl NormalizedImage {
    /// Wraps an already normalized pixel grid, checking its invariants.
    pub fn from_pixels(pixels: Array3<f32>) -> Result<Self, NormalizeError> {
        let (rows, columns, channels) = pixels.dim();
        let in_range = pixels.iter().all(|x| (0.0..=1.0).contains(x));
        if rows == 0 || rows != columns || channels != RGB_CHANNELS || !in_range {
            return Err(NormalizeError::InvalidGrid(pixels.shape().to_vec()));
        }
        let size = u32::try_from(rows)
            .map_err(|_| NormalizeError::InvalidGrid(pixels.shape().to_vec()))?;
        Ok(Self { size, pixels })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn pixels(&self) -> &Array3<f32> {
        &self.pixels
    }

    pub fn sample_count(&self) -> usize {
        self.pixels.len()
    }
}

/// Decodes the source image, whatever its encoding.
///
/// The format is guessed from the content, the file extension is not trusted.
pub fn decode(source: &SourceImage) -> Result<DynamicImage, NormalizeError> {
    let image = match source {
        SourceImage::Path(path) => image::io::Reader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(ImageError::IoError)?
            .decode()?,
        SourceImage::Bytes(bytes) => image::load_from_memory(bytes)?,
    };
    Ok(image)
}

/// Decodes and normalizes a source image for the classifier.
///
/// The image is stretched to `size`x`size`, grayscale is replicated on the three
/// channels, alpha is dropped and every sample is scaled from `0..=255` to `[0, 1]`.
pub fn normalize(
    source: &SourceImage,
    size: u32,
    interpolation: Interpolation,
) -> Result<NormalizedImage, NormalizeError> {
    if size == 0 {
        return Err(NormalizeError::InvalidSize(size));
    }
    let image = decode(source)?;
    normalize_image(&image, size, interpolation)
}

/// Same as [`normalize`], on an image that is already decoded.
pub fn normalize_image(
    image: &DynamicImage,
    size: u32,
    interpolation: Interpolation,
) -> Result<NormalizedImage, NormalizeError> {
    if size == 0 {
        return Err(NormalizeError::InvalidSize(size));
    }
    let color = image.color();
    // 1 = grayscale, 3 = rgb, 4 = rgba
    if !matches!(color.channel_count(), 1 | 3 | 4) {
        return Err(NormalizeError::UnsupportedFormat {
            color: format!("{color:?}"),
            channels: color.channel_count(),
        });
    }

    let (width, height) = image.dimensions();
    let resized = if (width, height) == (size, size) {
        image.clone()
    } else {
        image.resize_exact(size, size, interpolation.into())
    };
    let rgb = resized.to_rgb8();

    let side = size as usize;
    let pixels = Array3::from_shape_fn((side, side, RGB_CHANNELS), |(y, x, c)| {
        f32::from(rgb.get_pixel(x as u32, y as u32)[c]) / 255.0
    });

    Ok(NormalizedImage { size, pixels })
}

/// Postprocess the scores of the model.
///
/// This will apply a softmax function to the scores. The maximum is subtracted
/// first so that large logits do not overflow.
pub fn postprocessing(scores: ArrayView1<f32>) -> Array1<f32> {
    let max = scores.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    let exp = scores.mapv(|x| (x - max).exp());
    let sum = exp.sum();
    exp / sum
}

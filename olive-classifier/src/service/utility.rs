use rayon::prelude::*;

use crate::acquire::SourceImage;

use super::prepare::{normalize, Interpolation, NormalizeError, NormalizedImage};

/// Read and prepare images for the classifier.
///
/// Decoding and resizing run in parallel on the current rayon pool. The result
/// keeps the order of `sources`, with one outcome per image.
pub fn read_and_prepare_images(
    sources: &[SourceImage],
    size: u32,
    interpolation: Interpolation,
) -> Vec<Result<NormalizedImage, NormalizeError>> {
    sources
        .par_iter()
        .map(|source| normalize(source, size, interpolation))
        .collect()
}

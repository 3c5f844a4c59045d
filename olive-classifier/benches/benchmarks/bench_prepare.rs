use std::io::Cursor;

use criterion::{black_box, criterion_group, BenchmarkId, Criterion};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use olive_classifier::{
    acquire::SourceImage,
    service::prepare::{normalize, Interpolation, DEFAULT_INPUT_SIZE},
};

fn encoded_photo(width: u32, height: u32, format: ImageOutputFormat) -> SourceImage {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, format)
        .unwrap();
    SourceImage::Bytes(buffer.into_inner())
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("Normalize");
    group.sample_size(20);

    for (width, height) in [(640, 480), (1920, 1080)] {
        let jpeg = encoded_photo(width, height, ImageOutputFormat::Jpeg(90));
        for interpolation in [Interpolation::Nearest, Interpolation::Bilinear] {
            group.bench_with_input(
                BenchmarkId::new(format!("jpeg {interpolation:?}"), format!("{width}x{height}")),
                &jpeg,
                |b, source| {
                    b.iter(|| normalize(black_box(source), DEFAULT_INPUT_SIZE, interpolation).unwrap())
                },
            );
        }
    }
    group.finish();
}

criterion_group!(preparation, bench_normalize);

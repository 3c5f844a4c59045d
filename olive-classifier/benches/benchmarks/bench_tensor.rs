use criterion::{black_box, criterion_group, Criterion};
use ndarray::Array3;
use olive_classifier::{
    service::prepare::NormalizedImage,
    tensor::{build_tensor, Layout},
};

fn bench_layouts(c: &mut Criterion) {
    let pixels = Array3::from_shape_fn((224, 224, 3), |(y, x, c)| ((y + x + c) % 256) as f32 / 255.0);
    let image = NormalizedImage::from_pixels(pixels).unwrap();

    let mut group = c.benchmark_group("Tensor");
    group.bench_function("channels-first", |b| {
        b.iter(|| build_tensor("input", black_box(&image), Layout::ChannelsFirst))
    });
    group.bench_function("channels-last", |b| {
        b.iter(|| build_tensor("input", black_box(&image), Layout::ChannelsLast))
    });
    group.finish();
}

criterion_group!(layouts, bench_layouts);

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use signscan::{describe_sign, FeatureSummary, HeuristicClassifier, Xorshift64};

fn test_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        if (x / 16 + y / 16) % 2 == 0 {
            Rgb([210, 30, 40])
        } else {
            Rgb([240, 240, 240])
        }
    });
    DynamicImage::ImageRgb8(img)
}

fn bench_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("Features");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    for (name, width, height) in [("64x64", 64, 64), ("640x480", 640, 480), ("1920x1080", 1920, 1080)] {
        let image = test_image(width, height);
        group.bench_function(name, |b| {
            b.iter(|| FeatureSummary::from_image(black_box(&image)).unwrap())
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("Classify");
    group.sample_size(50);

    let classifier = HeuristicClassifier::new();
    let image = test_image(640, 480);
    let mut rng = Xorshift64::seeded(1);
    group.bench_function("decoded_640x480", |b| {
        b.iter(|| classifier.classify(black_box(&image), &mut rng))
    });

    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png).unwrap();
    let png = png.into_inner();
    group.bench_function("png_640x480", |b| {
        b.iter(|| classifier.classify_bytes(black_box(&png), &mut rng))
    });

    group.finish();
}

fn bench_describe(c: &mut Criterion) {
    let mut rng = Xorshift64::seeded(1);
    c.bench_function("describe_speed_limit", |b| {
        b.iter(|| describe_sign(black_box("Speed limit (60km/h)"), &mut rng))
    });
}

criterion_group!(benches, bench_features, bench_classify, bench_describe);
criterion_main!(benches);

use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::Vector3;
use ndarray::{Array1, Array2};
use recorder3d::calibration::Calibration;
use recorder3d::range_image::RangeImage;
use recorder3d::transform::Transform;

fn long_throw_calibration(width: usize, height: usize) -> Calibration {
    let rays: Array1<Vector3<f32>> = (0..width * height)
        .map(|i| {
            let (row, col) = (i / width, i % width);
            Vector3::new(
                (col as f32 - width as f32 / 2.0) / 250.0,
                (row as f32 - height as f32 / 2.0) / 250.0,
                1.0,
            )
            .normalize()
        })
        .collect();
    Calibration {
        rays,
        rig_to_cam: Transform::eye(),
    }
}

fn unproject_benchmark(c: &mut Criterion) {
    let (width, height) = (320, 288);
    let calibration = long_throw_calibration(width, height);
    let depth = Array2::from_shape_fn((height, width), |(row, col)| {
        (800 + (row * 7 + col * 3) % 1500) as u16
    });

    c.bench_function("unproject", |b| {
        b.iter(|| RangeImage::from_depth(&depth, &calibration, None).unwrap());
    });

    c.bench_function("compute_normals", |b| {
        let mut image = RangeImage::from_depth(&depth, &calibration, None).unwrap();
        b.iter(|| {
            image.compute_normals();
        });
    });
}

criterion_group!(benches, unproject_benchmark);
criterion_main!(benches);

//! Benchmark mf_parser::parse() throughput across chain lengths.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_parser(c: &mut Criterion) {
    let inputs = [
        ("no_chain", "/image/upload/photo.jpg"),
        ("fill", "/image/upload/c_fill,w_200,h_200/photo.jpg"),
        (
            "image_chain",
            "/image/upload/c_crop,w_400,h_300,x_10,y_20/c_scale,w_200/q_auto,quality_70/photo.jpg?v=2",
        ),
        (
            "video_chain",
            "/video/upload/so_5,du_10/c_fill,w_640,h_360/b_blurred,radius_4/fl_splice,l_video:outro.mp4/clip.mp4",
        ),
        (
            "noisy",
            "/image/upload/v1699999999/folder/sub/c_pad,w_300,h_300,b_white/e_background_removal/photo.png",
        ),
    ];

    let mut group = c.benchmark_group("url_parser");
    for (name, input) in &inputs {
        group.bench_function(*name, |b| {
            b.iter(|| mf_parser::parse(black_box(input)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parser);
criterion_main!(benches);

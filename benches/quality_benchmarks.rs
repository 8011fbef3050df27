use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ytsave::extractor::{extract_video_id, select_best_quality};

fn benchmark_quality_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("Quality Selection");

    let cases: [(&str, Vec<&str>); 4] = [
        ("empty", vec![]),
        ("single", vec!["134"]),
        ("typical", vec!["160", "133", "134", "135", "136", "137", "140", "251"]),
        (
            "unranked",
            vec!["140", "249", "250", "251", "18", "22", "43", "599", "600"],
        ),
    ];

    for (name, codes) in cases.iter() {
        group.bench_with_input(BenchmarkId::new("select_best_quality", name), codes, |b, codes| {
            b.iter(|| select_best_quality(black_box(codes.as_slice())))
        });
    }

    group.finish();
}

fn benchmark_url_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("URL Matching");
    let urls = [
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "https://www.youtube.com/watch?feature=share&list=PL123&v=dQw4w9WgXcQ",
        "https://youtu.be/dQw4w9WgXcQ",
        "https://www.youtube.com/shorts/dQw4w9WgXcQ",
        "https://vimeo.com/123456789",
    ];

    for url in urls {
        group.bench_with_input(BenchmarkId::new("extract_video_id", url), &url, |b, url| {
            b.iter(|| extract_video_id(black_box(url)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_quality_selection, benchmark_url_matching);
criterion_main!(benches);

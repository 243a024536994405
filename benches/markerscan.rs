use criterion::{criterion_group, criterion_main, Criterion};
use markerscan::{
    ChannelOrder, ColorImage, DetectionPipeline, MatchConfig, MatchEngine, OwnedImage,
    PipelineConfig, PreparedFrame, Template, TemplateStore,
};
use std::hint::black_box;

fn make_frame(width: usize, height: usize) -> ColorImage {
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.extend_from_slice(&[value as u8, (value * 3 & 0xFF) as u8, (255 - value) as u8]);
        }
    }
    ColorImage::from_interleaved(&data, width, height, 3, ChannelOrder::Rgb).unwrap()
}

fn bench_matching(c: &mut Criterion) {
    // Top strip of a 1280x720 source.
    let frame = make_frame(1280, 180);
    let opaque = Template::new("opaque", frame.crop(400, 60, 32, 32).unwrap(), None).unwrap();
    let alpha = OwnedImage::filled(32, 32, 255).unwrap();
    let masked =
        Template::new("masked", frame.crop(700, 90, 32, 32).unwrap(), Some(alpha)).unwrap();

    let color = MatchEngine::new(MatchConfig {
        match_threshold: 0.8,
        use_edge_filter: false,
    });
    c.bench_function("coeff_color_32px", |b| {
        b.iter(|| black_box(color.match_template(&PreparedFrame::new(&frame), &opaque)));
    });

    let edges = MatchEngine::new(MatchConfig::default());
    c.bench_function("coeff_edge_32px", |b| {
        b.iter(|| black_box(edges.match_template(&PreparedFrame::new(&frame), &opaque)));
    });

    c.bench_function("masked_ccorr_32px", |b| {
        b.iter(|| black_box(color.match_template(&PreparedFrame::new(&frame), &masked)));
    });

    if cfg!(feature = "rayon") {
        let parallel = color.with_parallel(true);
        c.bench_function("coeff_color_32px_parallel", |b| {
            b.iter(|| black_box(parallel.match_template(&PreparedFrame::new(&frame), &opaque)));
        });
    }
}

fn bench_pipeline(c: &mut Criterion) {
    let frame = make_frame(640, 90);
    let templates = [(10, 20), (300, 40), (520, 10)].map(|(x, y)| {
        Template::new(format!("t{x}"), frame.crop(x, y, 24, 24).unwrap(), None).unwrap()
    });
    let pipeline = DetectionPipeline::new(
        TemplateStore::from_templates(templates),
        PipelineConfig::default(),
    )
    .unwrap();

    c.bench_function("pipeline_three_templates", |b| {
        b.iter(|| black_box(pipeline.run(&frame, 640, 90).unwrap()));
    });
}

criterion_group!(benches, bench_matching, bench_pipeline);
criterion_main!(benches);

#![cfg(feature = "rayon")]

use markerscan::{
    ChannelOrder, ColorImage, DetectionPipeline, MatchConfig, MatchEngine, OwnedImage,
    PipelineConfig, PreparedFrame, Template, TemplateStore,
};

fn make_frame(width: usize, height: usize) -> ColorImage {
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 11) ^ (y * 3) ^ (x * y)) & 0xFF;
            data.extend_from_slice(&[value as u8, (value / 2) as u8, (255 - value) as u8]);
        }
    }
    ColorImage::from_interleaved(&data, width, height, 3, ChannelOrder::Rgb).unwrap()
}

#[test]
fn parallel_surfaces_match_sequential() {
    let frame = make_frame(120, 70);
    let opaque = Template::new("o", frame.crop(30, 20, 14, 10).unwrap(), None).unwrap();
    let alpha = OwnedImage::filled(9, 9, 200).unwrap();
    let masked = Template::new("m", frame.crop(70, 40, 9, 9).unwrap(), Some(alpha)).unwrap();

    for use_edge_filter in [false, true] {
        let seq = MatchEngine::new(MatchConfig {
            match_threshold: 0.8,
            use_edge_filter,
        });
        let par = seq.with_parallel(true);
        let prepared = PreparedFrame::new(&frame);
        for tpl in [&opaque, &masked] {
            assert_eq!(seq.surface(&prepared, tpl), par.surface(&prepared, tpl));
        }
    }
}

fn store(frame: &ColorImage) -> TemplateStore {
    TemplateStore::from_templates([(5, 5), (90, 30), (40, 12), (130, 40)].map(|(x, y)| {
        Template::new(format!("t{x}"), frame.crop(x, y, 12, 12).unwrap(), None).unwrap()
    }))
}

#[test]
fn parallel_pipeline_preserves_template_order() {
    let frame = make_frame(160, 60);
    let cfg = PipelineConfig {
        matching: MatchConfig {
            match_threshold: 0.8,
            use_edge_filter: false,
        },
        ..PipelineConfig::default()
    };
    let sequential = DetectionPipeline::new(store(&frame), cfg).unwrap();
    let parallel = DetectionPipeline::new(
        store(&frame),
        PipelineConfig {
            parallel: true,
            ..cfg
        },
    )
    .unwrap();

    let a = sequential.run(&frame, 160, 60).unwrap();
    let b = parallel.run(&frame, 160, 60).unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b);
    assert!(b.iter().enumerate().all(|(i, d)| d.id == i));
}

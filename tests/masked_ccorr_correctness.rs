use markerscan::{
    match_template, ChannelOrder, ColorImage, MatchConfig, MatchEngine, OwnedImage, PreparedFrame,
    Template, INVALID_SCORE,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_frame(rng: &mut StdRng, width: usize, height: usize) -> ColorImage {
    let data: Vec<u8> = (0..width * height * 3).map(|_| rng.random_range(0..=255)).collect();
    ColorImage::from_interleaved(&data, width, height, 3, ChannelOrder::Rgb).unwrap()
}

/// Diamond-shaped transparency: opaque inside |dx| + |dy| <= r.
fn diamond_alpha(size: usize) -> OwnedImage {
    let c = (size / 2) as i64;
    let data = (0..size * size)
        .map(|i| {
            let (x, y) = ((i % size) as i64, (i / size) as i64);
            if (x - c).abs() + (y - c).abs() <= c {
                255
            } else {
                0
            }
        })
        .collect();
    OwnedImage::new(data, size, size).unwrap()
}

fn brute_force_masked(frame: &ColorImage, tpl: &Template, x: usize, y: usize) -> f64 {
    let alpha = tpl.transparency().unwrap();
    let mut dot = 0.0f64;
    let mut e_t = 0.0f64;
    let mut e_i = 0.0f64;
    for c in 0..3 {
        let t = tpl.color().planes()[c].view();
        let f = frame.planes()[c].view();
        for ty in 0..tpl.height() {
            for tx in 0..tpl.width() {
                if *alpha.view().get(tx, ty).unwrap() == 0 {
                    continue;
                }
                let tv = *t.get(tx, ty).unwrap() as f64;
                let fv = *f.get(x + tx, y + ty).unwrap() as f64;
                dot += tv * fv;
                e_t += tv * tv;
                e_i += fv * fv;
            }
        }
    }
    dot / (e_t * e_i).sqrt()
}

#[test]
fn masked_surface_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(42);
    let frame = random_frame(&mut rng, 30, 24);
    let tpl = Template::new("d", frame.crop(5, 7, 9, 9).unwrap(), Some(diamond_alpha(9))).unwrap();

    let engine = MatchEngine::new(MatchConfig::default());
    let surface = engine.surface(&PreparedFrame::new(&frame), &tpl).unwrap();
    assert_eq!((surface.width(), surface.height()), (22, 16));
    for y in 0..surface.height() {
        for x in 0..surface.width() {
            let expected = brute_force_masked(&frame, &tpl, x, y);
            let got = surface.get(x, y).unwrap() as f64;
            assert!((got - expected).abs() < 1e-5, "({x},{y}) {got} vs {expected}");
        }
    }
    let (bx, by, best) = surface.max().unwrap();
    assert_eq!((bx, by), (5, 7));
    assert!((best - 1.0).abs() < 1e-5);
}

#[test]
fn half_masked_dark_region_never_yields_nan() {
    let mut rng = StdRng::seed_from_u64(7);
    let (width, height) = (40, 20);
    // Left half black, right half random.
    let mut data = vec![0u8; width * height * 3];
    for y in 0..height {
        for x in width / 2..width {
            let idx = (y * width + x) * 3;
            for c in 0..3 {
                data[idx + c] = rng.random_range(1..=255);
            }
        }
    }
    let frame = ColorImage::from_interleaved(&data, width, height, 3, ChannelOrder::Rgb).unwrap();

    // Opaque left half only.
    let size = 8;
    let alpha = OwnedImage::new(
        (0..size * size).map(|i| if i % size < size / 2 { 255 } else { 0 }).collect(),
        size,
        size,
    )
    .unwrap();
    let tpl = Template::new("half", frame.crop(24, 4, size, size).unwrap(), Some(alpha)).unwrap();

    let engine = MatchEngine::new(MatchConfig::default());
    let surface = engine.surface(&PreparedFrame::new(&frame), &tpl).unwrap();
    assert!(surface.as_slice().iter().all(|s| s.is_finite()));
    // Windows whose opaque half lies on the black side have zero energy.
    assert_eq!(surface.get(0, 0), Some(INVALID_SCORE));

    let candidates = match_template(&frame, &tpl, 0.8, true);
    assert!(!candidates.is_empty());
    assert!(candidates.iter().all(|c| c.score.is_finite() && c.score >= 0.8));
    assert!(candidates.iter().any(|c| c.x == 24 && c.y == 4));
}

use markerscan::{suppress, Candidate, NmsConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn overlapping_pair_keeps_higher_score() {
    let a = Candidate::new("main_quest", 0, 0, 30, 10, 0.9);
    let b = Candidate::new("main_quest", 10, 0, 30, 10, 0.85);
    assert!((a.iou(&b) - 0.5).abs() < 1e-12);

    let kept = suppress(
        vec![b, a.clone()],
        NmsConfig {
            score_threshold: 0.8,
            iou_threshold: 0.3,
        },
    );
    assert_eq!(kept, vec![a]);
}

#[test]
fn kept_boxes_never_overlap_beyond_threshold() {
    let mut rng = StdRng::seed_from_u64(0xBEEF);
    let labels = ["main_quest", "side_quest", "waypoint"];
    for round in 0..20 {
        let iou_threshold = [0.0f32, 0.1, 0.3, 0.5, 0.9][round % 5];
        let candidates: Vec<Candidate> = (0..150)
            .map(|_| {
                Candidate::new(
                    labels[rng.random_range(0..labels.len())],
                    rng.random_range(0..80),
                    rng.random_range(0..40),
                    rng.random_range(4..20),
                    rng.random_range(4..20),
                    rng.random_range(0.0f32..1.0),
                )
            })
            .collect();
        let cfg = NmsConfig {
            score_threshold: 0.5,
            iou_threshold,
        };
        let kept = suppress(candidates.clone(), cfg);

        assert!(kept.iter().all(|c| c.score >= 0.5));
        for (i, a) in kept.iter().enumerate() {
            for b in &kept[i + 1..] {
                if a.label == b.label {
                    assert!(a.iou(b) <= iou_threshold as f64);
                }
            }
        }
        // Every dropped candidate above the score threshold is covered by a
        // kept box of its own label that scores at least as high.
        for c in candidates.iter().filter(|c| c.score >= 0.5) {
            if kept.contains(c) {
                continue;
            }
            assert!(kept.iter().any(|k| {
                k.label == c.label && k.score >= c.score && k.iou(c) > iou_threshold as f64
            }));
        }
    }
}

//! Greedy IoU non-maximum suppression.

use crate::candidate::Candidate;
use std::cmp::Ordering;

/// Thresholds for suppression.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NmsConfig {
    /// Candidates scoring below this value are ignored.
    pub score_threshold: f32,
    /// A candidate overlapping a kept box by more than this IoU is dropped.
    pub iou_threshold: f32,
}

impl Default for NmsConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.8,
            iou_threshold: 0.3,
        }
    }
}

/// Collapses overlapping candidates, independently for each label.
///
/// Groups are emitted in the order their label first appears; within a group
/// kept boxes are ordered by descending score. Equal scores keep their input
/// order. Non-finite scores are never kept.
pub fn suppress(candidates: Vec<Candidate>, cfg: NmsConfig) -> Vec<Candidate> {
    let mut groups: Vec<Vec<Candidate>> = Vec::new();
    for candidate in candidates {
        match groups
            .iter_mut()
            .find(|group| group[0].label == candidate.label)
        {
            Some(group) => group.push(candidate),
            None => groups.push(vec![candidate]),
        }
    }

    groups
        .into_iter()
        .flat_map(|group| suppress_group(group, cfg))
        .collect()
}

/// Greedy NMS over one label's candidates.
pub fn suppress_group(mut candidates: Vec<Candidate>, cfg: NmsConfig) -> Vec<Candidate> {
    candidates.retain(|c| c.score.is_finite() && c.score >= cfg.score_threshold);
    // `sort_by` is stable, so ties stay in discovery order.
    candidates.sort_by(score_desc);

    let iou_threshold = cfg.iou_threshold as f64;
    let mut kept: Vec<Candidate> = Vec::new();
    'outer: for candidate in candidates {
        for kept_box in &kept {
            if kept_box.iou(&candidate) > iou_threshold {
                continue 'outer;
            }
        }
        kept.push(candidate);
    }
    kept
}

fn score_desc(a: &Candidate, b: &Candidate) -> Ordering {
    b.score.total_cmp(&a.score)
}

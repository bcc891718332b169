use crate::annotations::bounding_box::BoundingBoxGeometry;
use crate::annotations::detection::Detection;
use crate::error::ValidationError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The IoU above which two same-class boxes are considered the same lesion.
///
/// Looser than the detector's own NMS threshold, so boxes that only slightly overlap still merge.
pub const DEFAULT_MERGE_IOU_THRESHOLD: f32 = 0.1;

/// How a cluster grows around its seed.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    /// Candidates are only compared against the seed. A box overlapping a cluster member, but
    /// not the seed, stays out of the cluster even though the merged box may end up covering it.
    #[default]
    SeedOnly,
    /// Candidates are compared against every member already in the cluster, giving the
    /// connected components of the same-class overlap graph.
    Transitive,
}

/// Collapses duplicate detections of the same lesion into one enclosing box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxMerger {
    iou_threshold: f32,
    mode: MergeMode,
}

impl Default for BoxMerger {
    fn default() -> Self {
        BoxMerger {
            iou_threshold: DEFAULT_MERGE_IOU_THRESHOLD,
            mode: MergeMode::SeedOnly,
        }
    }
}

impl BoxMerger {
    pub fn new(iou_threshold: f32, mode: MergeMode) -> Result<Self, ValidationError> {
        validate_unit_interval("merge IoU threshold", iou_threshold)?;
        Ok(BoxMerger {
            iou_threshold,
            mode,
        })
    }

    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    pub fn mode(&self) -> MergeMode {
        self.mode
    }

    /// Merges same-class detections whose IoU exceeds the threshold.
    ///
    /// Detections are visited in descending confidence order. The highest-confidence box left in
    /// the pool seeds a cluster, every box that joins it leaves the pool, and the cluster is
    /// emitted as the smallest box enclosing all of its members with the seed's confidence and
    /// class. Confidences of absorbed boxes are discarded. The output is sorted by confidence,
    /// never longer than the input, and never mixes classes.
    pub fn consolidate<T: BoundingBoxGeometry>(
        &self,
        detections: Vec<Detection<T>>,
    ) -> Vec<Detection<T>> {
        let mut remaining: Vec<Detection<T>> = detections
            .into_iter()
            .sorted_by(|a, b| b.confidence.total_cmp(&a.confidence))
            .collect();
        let mut merged: Vec<Detection<T>> = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let seed = remaining.remove(0);
            let (cluster, rest) = match self.mode {
                MergeMode::SeedOnly => self.partition_by_seed(&seed, remaining),
                MergeMode::Transitive => self.partition_transitively(&seed, remaining),
            };
            remaining = rest;
            let annotation = cluster
                .iter()
                .fold(seed.annotation, |bounds, member| bounds.enclosing(&member.annotation));
            merged.push(Detection {
                annotation,
                confidence: seed.confidence,
            });
        }
        merged
    }

    fn joins<T: BoundingBoxGeometry>(&self, anchor: &T, candidate: &T) -> bool {
        anchor.class_id() == candidate.class_id()
            && anchor.intersection_over_union(candidate) > self.iou_threshold
    }

    fn partition_by_seed<T: BoundingBoxGeometry>(
        &self,
        seed: &Detection<T>,
        pool: Vec<Detection<T>>,
    ) -> (Vec<Detection<T>>, Vec<Detection<T>>) {
        pool.into_iter()
            .partition(|candidate| self.joins(&seed.annotation, &candidate.annotation))
    }

    fn partition_transitively<T: BoundingBoxGeometry>(
        &self,
        seed: &Detection<T>,
        pool: Vec<Detection<T>>,
    ) -> (Vec<Detection<T>>, Vec<Detection<T>>) {
        let (mut cluster, mut rest) = self.partition_by_seed(seed, pool);
        let mut frontier = 0;
        while frontier < cluster.len() && !rest.is_empty() {
            let (joined, stayed): (Vec<_>, Vec<_>) = rest.into_iter().partition(|candidate| {
                self.joins(&cluster[frontier].annotation, &candidate.annotation)
            });
            cluster.extend(joined);
            rest = stayed;
            frontier += 1;
        }
        (cluster, rest)
    }
}

/// Merges overlapping same-class detections against the seed only.
///
/// Shorthand for `BoxMerger::new(iou_threshold, MergeMode::SeedOnly)?.consolidate(detections)`.
pub fn consolidate<T: BoundingBoxGeometry>(
    detections: Vec<Detection<T>>,
    iou_threshold: f32,
) -> Result<Vec<Detection<T>>, ValidationError> {
    Ok(BoxMerger::new(iou_threshold, MergeMode::SeedOnly)?.consolidate(detections))
}

/// Rejects NaN and anything outside `[0, 1]`.
pub fn validate_unit_interval(name: &'static str, value: f32) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::ThresholdOutOfRange { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::bounding_box::BoundingBox;
    use crate::annotations::detection::DetectionSet;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: usize) -> Detection<BoundingBox> {
        Detection {
            annotation: BoundingBox::new(x1, y1, x2, y2, class_id).unwrap(),
            confidence,
        }
    }

    fn max_same_class_iou(detections: &DetectionSet) -> f32 {
        detections
            .iter()
            .tuple_combinations()
            .filter(|(a, b)| a.annotation.class_id() == b.annotation.class_id())
            .map(|(a, b)| a.annotation.intersection_over_union(&b.annotation))
            .fold(0.0, f32::max)
    }

    // Scenario 5 layout: A overlaps B, B overlaps C, A and C are disjoint.
    fn chain() -> DetectionSet {
        vec![
            det(12.0, 0.0, 22.0, 10.0, 0.7, 0),
            det(0.0, 0.0, 10.0, 10.0, 0.9, 0),
            det(6.0, 0.0, 16.0, 10.0, 0.8, 0),
        ]
    }

    #[test]
    fn nested_boxes_merge_into_seed() {
        let dets = vec![det(0.0, 0.0, 10.0, 10.0, 0.9, 0), det(1.0, 1.0, 9.0, 9.0, 0.8, 0)];
        let merged = consolidate(dets, 0.1).unwrap();
        assert_eq!(merged, vec![det(0.0, 0.0, 10.0, 10.0, 0.9, 0)]);
    }

    #[test]
    fn merged_box_encloses_all_members_with_seed_confidence() {
        let dets = vec![det(2.0, 2.0, 12.0, 12.0, 0.6, 4), det(0.0, 0.0, 10.0, 10.0, 0.95, 4)];
        let merged = consolidate(dets, 0.1).unwrap();
        assert_eq!(merged, vec![det(0.0, 0.0, 12.0, 12.0, 0.95, 4)]);
    }

    #[test]
    fn disjoint_boxes_are_kept_in_confidence_order() {
        let dets = vec![
            det(100.0, 100.0, 110.0, 110.0, 0.8, 0),
            det(0.0, 0.0, 5.0, 5.0, 0.9, 0),
        ];
        let merged = consolidate(dets, 0.1).unwrap();
        assert_eq!(
            merged,
            vec![det(0.0, 0.0, 5.0, 5.0, 0.9, 0), det(100.0, 100.0, 110.0, 110.0, 0.8, 0)]
        );
    }

    #[test]
    fn different_classes_never_merge() {
        let dets = vec![det(0.0, 0.0, 10.0, 10.0, 0.9, 0), det(0.0, 0.0, 10.0, 10.0, 0.8, 1)];
        let merged = consolidate(dets.clone(), 0.1).unwrap();
        assert_eq!(merged, dets);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let merged = consolidate(DetectionSet::new(), 0.1).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn seed_only_merge_is_not_transitive() {
        let merged = consolidate(chain(), 0.1).unwrap();
        // A seeds and absorbs B. C overlaps B but not A, so it survives on its own even though
        // the grown A+B box now overlaps it.
        assert_eq!(
            merged,
            vec![det(0.0, 0.0, 16.0, 10.0, 0.9, 0), det(12.0, 0.0, 22.0, 10.0, 0.7, 0)]
        );
    }

    #[test]
    fn seed_only_output_can_still_overlap_after_growth() {
        // Documented approximation: the grown box is not re-checked, so a second pass finds more.
        let first = consolidate(chain(), 0.1).unwrap();
        assert!(max_same_class_iou(&first) > 0.1);
        let second = consolidate(first, 0.1).unwrap();
        assert_eq!(second, vec![det(0.0, 0.0, 22.0, 10.0, 0.9, 0)]);
    }

    #[test]
    fn transitive_mode_follows_the_chain() {
        let merger = BoxMerger::new(0.1, MergeMode::Transitive).unwrap();
        let merged = merger.consolidate(chain());
        assert_eq!(merged, vec![det(0.0, 0.0, 22.0, 10.0, 0.9, 0)]);
    }

    #[test]
    fn transitive_mode_respects_classes() {
        let mut dets = chain();
        dets[2].annotation = BoundingBox::new(6.0, 0.0, 16.0, 10.0, 1).unwrap();
        let merger = BoxMerger::new(0.1, MergeMode::Transitive).unwrap();
        let merged = merger.consolidate(dets);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn iou_equal_to_threshold_does_not_merge() {
        // IoU of these two is exactly 0.5.
        let dets = vec![det(0.0, 0.0, 2.0, 1.0, 0.9, 0), det(0.0, 0.0, 1.0, 1.0, 0.8, 0)];
        assert_eq!(consolidate(dets.clone(), 0.5).unwrap().len(), 2);
        assert_eq!(consolidate(dets, 0.49).unwrap().len(), 1);
    }

    #[test]
    fn degenerate_boxes_pass_through() {
        let dets = vec![det(3.0, 3.0, 3.0, 3.0, 0.9, 0), det(3.0, 3.0, 3.0, 3.0, 0.8, 0)];
        let merged = consolidate(dets.clone(), 0.0).unwrap();
        assert_eq!(merged, dets);
    }

    #[test]
    fn invalid_thresholds_are_rejected() {
        for value in [-0.1_f32, 1.5, f32::NAN] {
            let result = consolidate(DetectionSet::new(), value);
            assert!(matches!(
                result,
                Err(ValidationError::ThresholdOutOfRange { name: "merge IoU threshold", .. })
            ));
        }
        assert!(BoxMerger::new(0.0, MergeMode::SeedOnly).is_ok());
        assert!(BoxMerger::new(1.0, MergeMode::Transitive).is_ok());
    }

    #[test]
    fn consolidate_is_idempotent_when_clusters_are_separated() {
        let dets = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.9, 0),
            det(1.0, 1.0, 11.0, 11.0, 0.5, 0),
            det(50.0, 50.0, 60.0, 60.0, 0.7, 0),
            det(52.0, 52.0, 61.0, 61.0, 0.65, 0),
            det(0.0, 0.0, 10.0, 10.0, 0.4, 2),
            det(200.0, 0.0, 220.0, 30.0, 0.3, 1),
        ];
        let once = consolidate(dets.clone(), 0.1).unwrap();
        let twice = consolidate(once.clone(), 0.1).unwrap();
        assert_eq!(once, twice);
        assert!(once.len() <= dets.len());
        assert_eq!(once.len(), 4);
        assert!(max_same_class_iou(&once) <= 0.1);
    }

    /// Linear congruential step, enough to vary layouts without a rng dependency.
    fn next(state: &mut u64) -> u64 {
        *state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        *state >> 33
    }

    /// Clusters of near-duplicate boxes, 100 px apart, with mixed classes inside each cluster.
    /// Any two same-class boxes in a cluster have IoU above 0.5. Returns the detections and the
    /// number of distinct (cluster, class) pairs.
    fn separated_layout(seed: u64) -> (DetectionSet, usize) {
        let mut state = seed;
        let mut detections = Vec::new();
        let mut groups = Vec::new();
        for cluster in 0..1 + next(&mut state) % 5 {
            let x = cluster as f32 * 100.0;
            let y = (next(&mut state) % 4) as f32 * 100.0;
            for _ in 0..1 + next(&mut state) % 6 {
                let class_id = (next(&mut state) % 3) as usize;
                let left = x + (next(&mut state) % 3) as f32;
                let top = y + (next(&mut state) % 3) as f32;
                let width = 20.0 + (next(&mut state) % 3) as f32;
                let height = 20.0 + (next(&mut state) % 3) as f32;
                let confidence = ((detections.len() * 37) % 97 + 1) as f32 / 100.0;
                detections.push(det(left, top, left + width, top + height, confidence, class_id));
                groups.push((cluster, class_id));
            }
        }
        let expected = groups.into_iter().unique().count();
        (detections, expected)
    }

    #[test]
    fn merge_properties_hold_across_separated_layouts() {
        for seed in 0..40 {
            let (dets, expected) = separated_layout(seed);
            for threshold in [0.0, 0.1, 0.3, 0.5] {
                for mode in [MergeMode::SeedOnly, MergeMode::Transitive] {
                    let merger = BoxMerger::new(threshold, mode).unwrap();
                    let once = merger.consolidate(dets.clone());
                    assert!(once.len() <= dets.len(), "seed {seed}, threshold {threshold}");
                    assert_eq!(once.len(), expected, "seed {seed}, threshold {threshold}");
                    assert!(
                        max_same_class_iou(&once) <= threshold,
                        "seed {seed}, threshold {threshold}"
                    );
                    assert!(once.windows(2).all(|w| w[0].confidence >= w[1].confidence));
                    assert_eq!(merger.consolidate(once.clone()), once, "seed {seed}, threshold {threshold}");
                }
            }
        }
    }

    #[test]
    fn output_never_contains_mixed_class_clusters() {
        let dets = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.9, 0),
            det(1.0, 1.0, 10.0, 10.0, 0.8, 1),
            det(2.0, 2.0, 10.0, 10.0, 0.7, 0),
            det(3.0, 3.0, 10.0, 10.0, 0.6, 1),
        ];
        let merged = consolidate(dets, 0.1).unwrap();
        assert_eq!(
            merged,
            vec![det(0.0, 0.0, 10.0, 10.0, 0.9, 0), det(1.0, 1.0, 10.0, 10.0, 0.8, 1)]
        );
    }
}

//! Fusing anatomy and pathology detections into a chart.
//!
//! The engine emits a background layer (one tooth entry per anatomy finding,
//! in input order) followed by an overlay layer (one update entry per
//! successfully associated pathology finding, in input order). Entries are
//! never merged or mutated after being appended; combining an update with
//! its tooth entry is the chart consumer's job.

pub mod associate;
pub mod labels;

use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::model::{AnatomyFinding, ChartEntry, PathologyFinding, ToothEntry, ToothUpdate};
use crate::core::positions::is_valid_position;
use crate::core::rotation::estimate_rotation;
use crate::core::zones::classify_zones;

pub trait FusionEngine {
    fn fuse(
        &self,
        anatomy: &[AnatomyFinding],
        pathology: &[PathologyFinding],
    ) -> Result<Vec<ChartEntry>>;
}

/// What to do with an update entry whose ISO position does not reference a
/// chartable tooth entry in the same fusion call: the matched tooth carried
/// the unmapped sentinel 0 or an id outside the ISO scheme, so the chart has
/// no tooth to attach the update to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Emit the update anyway. Matches the original chart behavior.
    #[default]
    Emit,
    /// Suppress the orphaned update.
    Drop,
    /// Emit a synthetic tooth entry (empty contour, rotation 0) once per
    /// position, immediately before its first orphaned update.
    Placeholder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FusionConfig {
    /// Minimum IoU for a pathology finding to attach to a tooth.
    pub iou_floor: f32,
    pub orphan_policy: OrphanPolicy,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            iou_floor: 0.01,
            orphan_policy: OrphanPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChartFusionEngine {
    config: FusionConfig,
}

impl ChartFusionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FusionConfig) -> Self {
        Self { config }
    }
}

impl FusionEngine for ChartFusionEngine {
    fn fuse(
        &self,
        anatomy: &[AnatomyFinding],
        pathology: &[PathologyFinding],
    ) -> Result<Vec<ChartEntry>> {
        let mut entries: Vec<ChartEntry> = Vec::with_capacity(anatomy.len() + pathology.len());
        let mut known_positions: BTreeSet<u8> = BTreeSet::new();

        // Background layer: every detected tooth, in detector order.
        for tooth in anatomy {
            let position = tooth.clinical_position();
            if position == 0 {
                warn!(sub_label = %tooth.sub_label, "tooth with unmapped clinical position");
            }
            let rotation = estimate_rotation(&tooth.mask_contour);
            if is_valid_position(position) {
                known_positions.insert(position);
            }
            entries.push(ChartEntry::Tooth(ToothEntry::new(tooth, position, rotation)));
        }

        // Overlay layer: one update per associated pathology finding.
        let mut dropped = 0_usize;
        for finding in pathology {
            let Some(assoc) = associate::associate(finding, anatomy, self.config.iou_floor) else {
                dropped += 1;
                continue;
            };

            let position = assoc.tooth.clinical_position();
            let zones = classify_zones(
                &assoc.tooth.bbox,
                &finding.bbox.unwrap_or(assoc.tooth.bbox),
                position,
            );

            let mut update = ToothUpdate::new(position, finding);
            labels::apply_label(&mut update, &finding.label, &zones);

            if !known_positions.contains(&position) {
                match self.config.orphan_policy {
                    OrphanPolicy::Emit => {}
                    OrphanPolicy::Drop => {
                        debug!(position, label = %finding.label, "orphaned update dropped");
                        dropped += 1;
                        continue;
                    }
                    OrphanPolicy::Placeholder => {
                        known_positions.insert(position);
                        entries.push(ChartEntry::Tooth(ToothEntry::placeholder(
                            position,
                            assoc.tooth.bbox,
                        )));
                    }
                }
            }

            entries.push(ChartEntry::Update(update));
        }

        debug!(
            teeth = anatomy.len(),
            findings = pathology.len(),
            entries = entries.len(),
            dropped,
            "fusion complete"
        );

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::DetectionBox;
    use crate::core::zones::Zone;

    fn tooth(sub_label: &str, bbox: DetectionBox) -> AnatomyFinding {
        AnatomyFinding {
            label: "Tooth".to_string(),
            sub_label: sub_label.to_string(),
            score: 0.95,
            bbox,
            mask_contour: Vec::new(),
        }
    }

    fn caries(bbox: DetectionBox) -> PathologyFinding {
        PathologyFinding {
            label: "Caries".to_string(),
            score: 0.9,
            bbox: Some(bbox),
        }
    }

    #[test]
    fn emits_background_then_overlay() {
        let anatomy = vec![
            tooth("11", DetectionBox::new(0.0, 0.0, 100.0, 100.0)),
            tooth("12", DetectionBox::new(100.0, 0.0, 200.0, 100.0)),
        ];
        let pathology = vec![caries(DetectionBox::new(10.0, 10.0, 50.0, 90.0))];

        let entries = ChartFusionEngine::new().fuse(&anatomy, &pathology).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].as_tooth().unwrap().iso_number, 11);
        assert_eq!(entries[1].as_tooth().unwrap().iso_number, 12);
        let update = entries[2].as_update().unwrap();
        assert_eq!(update.iso_number, 11);
        assert_eq!(update.ml_metadata.confidence, 0.9);
        assert!(update.pathology.as_ref().unwrap().decay.is_some());
    }

    #[test]
    fn empty_contour_yields_zero_rotation() {
        let anatomy = vec![tooth("11", DetectionBox::new(0.0, 0.0, 100.0, 100.0))];
        let entries = ChartFusionEngine::new().fuse(&anatomy, &[]).unwrap();
        let entry = entries[0].as_tooth().unwrap();
        assert_eq!(entry.rotation, 0.0);
        assert_eq!(entry.ml_metadata.rotation_deg, 0.0);
    }

    #[test]
    fn non_overlapping_finding_is_dropped_from_overlay() {
        let anatomy = vec![tooth("11", DetectionBox::new(0.0, 0.0, 10.0, 10.0))];
        let pathology = vec![caries(DetectionBox::new(100.0, 100.0, 110.0, 110.0))];
        let entries = ChartFusionEngine::new().fuse(&anatomy, &pathology).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].as_tooth().is_some());
    }

    #[test]
    fn unknown_label_still_emits_provenance_only_update() {
        let anatomy = vec![tooth("11", DetectionBox::new(0.0, 0.0, 100.0, 100.0))];
        let pathology = vec![PathologyFinding {
            label: "something_new".to_string(),
            score: 0.7,
            bbox: Some(DetectionBox::new(10.0, 10.0, 90.0, 90.0)),
        }];
        let entries = ChartFusionEngine::new().fuse(&anatomy, &pathology).unwrap();
        let update = entries[1].as_update().unwrap();
        assert!(!update.has_fragment());
        assert_eq!(update.ml_metadata.label, "something_new");
    }

    #[test]
    fn zones_follow_matched_tooth_frame() {
        let anatomy = vec![tooth("46", DetectionBox::new(0.0, 0.0, 100.0, 100.0))];
        // Center in the bottom 30% of a lower tooth: Root.
        let pathology = vec![caries(DetectionBox::new(40.0, 80.0, 60.0, 100.0))];
        let entries = ChartFusionEngine::new().fuse(&anatomy, &pathology).unwrap();
        let update = entries[1].as_update().unwrap();
        let decay = update.pathology.as_ref().unwrap().decay.as_ref().unwrap();
        assert_eq!(decay[0].zones, vec![Zone::Root]);
    }

    #[test]
    fn orphan_policy_emit_keeps_sentinel_updates() {
        // Unparseable sub_label: the update carries position 0, which no
        // chartable tooth answers to. The default policy emits it anyway.
        let anatomy = vec![tooth("??", DetectionBox::new(0.0, 0.0, 100.0, 100.0))];
        let pathology = vec![caries(DetectionBox::new(10.0, 10.0, 90.0, 90.0))];
        let entries = ChartFusionEngine::new().fuse(&anatomy, &pathology).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].as_update().unwrap().iso_number, 0);
    }

    #[test]
    fn orphan_policy_drop_suppresses_unchartable_updates() {
        let anatomy = vec![tooth("??", DetectionBox::new(0.0, 0.0, 100.0, 100.0))];
        let pathology = vec![caries(DetectionBox::new(10.0, 10.0, 90.0, 90.0))];
        let engine = ChartFusionEngine::with_config(FusionConfig {
            orphan_policy: OrphanPolicy::Drop,
            ..FusionConfig::default()
        });
        let entries = engine.fuse(&anatomy, &pathology).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].as_tooth().is_some());
    }

    #[test]
    fn orphan_policy_placeholder_emits_synthetic_tooth() {
        let anatomy = vec![tooth("??", DetectionBox::new(0.0, 0.0, 100.0, 100.0))];
        let pathology = vec![
            caries(DetectionBox::new(10.0, 10.0, 90.0, 90.0)),
            caries(DetectionBox::new(20.0, 20.0, 80.0, 80.0)),
        ];
        let engine = ChartFusionEngine::with_config(FusionConfig {
            orphan_policy: OrphanPolicy::Placeholder,
            ..FusionConfig::default()
        });
        let entries = engine.fuse(&anatomy, &pathology).unwrap();
        // One real tooth entry, one synthetic placeholder, two updates; the
        // placeholder is emitted once even with two orphaned updates.
        assert_eq!(entries.len(), 4);
        let placeholder = entries[1].as_tooth().unwrap();
        assert_eq!(placeholder.iso_number, 0);
        assert!(placeholder.mask_contour.is_empty());
        assert_eq!(placeholder.rotation, 0.0);
        assert!(entries[2].as_update().is_some());
        assert!(entries[3].as_update().is_some());
    }

    #[test]
    fn fusion_is_deterministic() {
        let anatomy = vec![
            tooth("11", DetectionBox::new(0.0, 0.0, 100.0, 100.0)),
            tooth("21", DetectionBox::new(100.0, 0.0, 200.0, 100.0)),
        ];
        let pathology = vec![
            caries(DetectionBox::new(10.0, 10.0, 50.0, 90.0)),
            PathologyFinding {
                label: "tartar".to_string(),
                score: 0.6,
                bbox: Some(DetectionBox::new(120.0, 20.0, 180.0, 60.0)),
            },
        ];
        let engine = ChartFusionEngine::new();
        let first = serde_json::to_string(&engine.fuse(&anatomy, &pathology).unwrap()).unwrap();
        let second = serde_json::to_string(&engine.fuse(&anatomy, &pathology).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}

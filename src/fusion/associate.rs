//! Pathology-to-tooth association by maximum box overlap.

use tracing::debug;

use crate::core::model::{AnatomyFinding, PathologyFinding};

/// A pathology finding matched to the tooth it overlaps most.
#[derive(Debug, Clone, Copy)]
pub struct Association<'a> {
    pub tooth: &'a AnatomyFinding,
    pub iou: f32,
}

/// Pick the tooth with the strictly highest IoU against the finding's box,
/// accepting only matches above `iou_floor`. Ties resolve to the earlier
/// tooth in anatomy-list order; a finding without a box never matches.
pub fn associate<'a>(
    finding: &PathologyFinding,
    anatomy: &'a [AnatomyFinding],
    iou_floor: f32,
) -> Option<Association<'a>> {
    let finding_box = finding.bbox?;

    let mut best: Option<Association<'a>> = None;
    for tooth in anatomy {
        let iou = finding_box.iou(&tooth.bbox);
        if best.map_or(true, |b| iou > b.iou) {
            best = Some(Association { tooth, iou });
        }
    }

    match best {
        Some(assoc) if assoc.iou > iou_floor => Some(assoc),
        Some(assoc) => {
            debug!(
                label = %finding.label,
                max_iou = assoc.iou,
                "pathology finding below overlap floor, dropped from overlay"
            );
            None
        }
        None => {
            debug!(label = %finding.label, "no anatomy findings to associate against");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::DetectionBox;

    fn tooth(sub_label: &str, bbox: DetectionBox) -> AnatomyFinding {
        AnatomyFinding {
            label: "Tooth".to_string(),
            sub_label: sub_label.to_string(),
            score: 0.9,
            bbox,
            mask_contour: Vec::new(),
        }
    }

    fn finding(bbox: Option<DetectionBox>) -> PathologyFinding {
        PathologyFinding {
            label: "Caries".to_string(),
            score: 0.8,
            bbox,
        }
    }

    #[test]
    fn associates_to_best_overlapping_tooth() {
        let teeth = vec![
            tooth("11", DetectionBox::new(0.0, 0.0, 10.0, 10.0)),
            tooth("12", DetectionBox::new(9.0, 0.0, 19.0, 10.0)),
        ];
        let finding = finding(Some(DetectionBox::new(2.0, 2.0, 8.0, 8.0)));
        let assoc = associate(&finding, &teeth, 0.01).unwrap();
        assert_eq!(assoc.tooth.sub_label, "11");
        assert!((assoc.iou - 36.0 / 100.0).abs() < 1e-6);
    }

    #[test]
    fn drops_findings_below_floor() {
        let teeth = vec![tooth("11", DetectionBox::new(0.0, 0.0, 10.0, 10.0))];
        let finding = finding(Some(DetectionBox::new(100.0, 100.0, 110.0, 110.0)));
        assert!(associate(&finding, &teeth, 0.01).is_none());
    }

    #[test]
    fn drops_findings_without_a_box() {
        let teeth = vec![tooth("11", DetectionBox::new(0.0, 0.0, 10.0, 10.0))];
        assert!(associate(&finding(None), &teeth, 0.01).is_none());
    }

    #[test]
    fn drops_findings_when_no_anatomy_exists() {
        let finding = finding(Some(DetectionBox::new(0.0, 0.0, 10.0, 10.0)));
        assert!(associate(&finding, &[], 0.01).is_none());
    }

    #[test]
    fn ties_resolve_to_first_tooth_in_list_order() {
        // Two identical teeth boxes: the first one must win, deterministically.
        let teeth = vec![
            tooth("21", DetectionBox::new(0.0, 0.0, 10.0, 10.0)),
            tooth("22", DetectionBox::new(0.0, 0.0, 10.0, 10.0)),
        ];
        let finding = finding(Some(DetectionBox::new(2.0, 2.0, 8.0, 8.0)));
        let assoc = associate(&finding, &teeth, 0.01).unwrap();
        assert_eq!(assoc.tooth.sub_label, "21");
    }
}

//! The upstream detector boundary.
//!
//! The fusion core never runs a model; it consumes two finding lists from
//! whatever produced them. [`Detector`] is that capability contract, and
//! [`JsonDetector`] is the shipped implementation: it reads detector output
//! from JSON files in the wire contract, which is how the external worker
//! hands results over for offline runs and tests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::core::geometry::DetectionBox;
use crate::core::model::{AnatomyFinding, Contour, PathologyFinding};
use crate::core::positions::{IsoClassMap, PathologyClassMap};

pub trait Detector {
    fn anatomy_findings(&self) -> Result<Vec<AnatomyFinding>>;
    fn pathology_findings(&self) -> Result<Vec<PathologyFinding>>;
}

/// Raw anatomy record as written by the detection worker. Either carries the
/// resolved `sub_label`, or the model's numeric `class_id` to be translated
/// through the injected [`IsoClassMap`].
#[derive(Debug, Deserialize)]
struct RawAnatomyRecord {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    sub_label: Option<String>,
    #[serde(default)]
    class_id: Option<u32>,
    score: f32,
    #[serde(rename = "box")]
    bbox: DetectionBox,
    #[serde(default)]
    mask_contour: Contour,
}

/// Raw pathology record: resolved `label`, or numeric `class_id` for the
/// injected [`PathologyClassMap`].
#[derive(Debug, Deserialize)]
struct RawPathologyRecord {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    class_id: Option<u32>,
    score: f32,
    #[serde(rename = "box", default)]
    bbox: Option<DetectionBox>,
}

#[derive(Debug, Clone)]
pub struct JsonDetector {
    anatomy_path: PathBuf,
    pathology_path: PathBuf,
    iso_map: IsoClassMap,
    class_map: PathologyClassMap,
    /// Findings scoring below this are discarded at the boundary. `None`
    /// trusts the upstream worker's own threshold.
    min_score: Option<f32>,
}

impl JsonDetector {
    pub fn new(anatomy_path: PathBuf, pathology_path: PathBuf) -> Self {
        Self {
            anatomy_path,
            pathology_path,
            iso_map: IsoClassMap::default(),
            class_map: PathologyClassMap::default(),
            min_score: None,
        }
    }

    pub fn with_iso_map(mut self, iso_map: IsoClassMap) -> Self {
        self.iso_map = iso_map;
        self
    }

    pub fn with_class_map(mut self, class_map: PathologyClassMap) -> Self {
        self.class_map = class_map;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    fn keeps(&self, score: f32) -> bool {
        self.min_score.map_or(true, |floor| score > floor)
    }

    fn read_records<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read detector output: {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("invalid detector output: {}", path.display()))
    }
}

impl Detector for JsonDetector {
    fn anatomy_findings(&self) -> Result<Vec<AnatomyFinding>> {
        let records: Vec<RawAnatomyRecord> = Self::read_records(&self.anatomy_path)?;
        let findings = records
            .into_iter()
            .filter(|r| self.keeps(r.score))
            .map(|r| {
                let sub_label = match (r.sub_label, r.class_id) {
                    (Some(sub_label), _) => sub_label,
                    (None, Some(class_id)) => self.iso_map.position_for(class_id).to_string(),
                    (None, None) => "0".to_string(),
                };
                AnatomyFinding {
                    label: r.label.unwrap_or_else(|| "Tooth".to_string()),
                    sub_label,
                    score: r.score,
                    bbox: r.bbox,
                    mask_contour: r.mask_contour,
                }
            })
            .collect::<Vec<_>>();
        debug!(count = findings.len(), path = %self.anatomy_path.display(), "anatomy findings loaded");
        Ok(findings)
    }

    fn pathology_findings(&self) -> Result<Vec<PathologyFinding>> {
        let records: Vec<RawPathologyRecord> = Self::read_records(&self.pathology_path)?;
        let findings = records
            .into_iter()
            .filter(|r| self.keeps(r.score))
            .map(|r| {
                let label = match (r.label, r.class_id) {
                    (Some(label), _) => label,
                    (None, Some(class_id)) => self.class_map.label_for(class_id),
                    (None, None) => "Unknown".to_string(),
                };
                PathologyFinding {
                    label,
                    score: r.score,
                    bbox: r.bbox,
                }
            })
            .collect::<Vec<_>>();
        debug!(count = findings.len(), path = %self.pathology_path.display(), "pathology findings loaded");
        Ok(findings)
    }
}

//! Detector input records and fused chart output records.
//!
//! The field names on these types are the literal wire contract consumed by
//! the dental-chart API; every rename attribute here is load-bearing.

use serde::{Deserialize, Serialize};

use crate::core::geometry::DetectionBox;
use crate::core::zones::Zone;

/// Closed polygon outline of a segmentation mask, possibly empty.
pub type Contour = Vec<[i32; 2]>;

/// One detected tooth instance, as produced by the anatomy detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnatomyFinding {
    /// Constant `"Tooth"` for every anatomy record.
    pub label: String,
    /// ISO tooth position as a string, e.g. `"11"`; `"0"` when the detector
    /// could not map the class id.
    pub sub_label: String,
    pub score: f32,
    #[serde(rename = "box")]
    pub bbox: DetectionBox,
    #[serde(default)]
    pub mask_contour: Contour,
}

impl AnatomyFinding {
    /// Two-digit ISO position, sentinel 0 for anything unparseable.
    pub fn clinical_position(&self) -> u8 {
        self.sub_label.trim().parse().unwrap_or(0)
    }
}

/// One detected disease/restoration finding, as produced by the pathology
/// detector. The label comes from a closed vocabulary of 14 categories plus
/// `"Unknown"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathologyFinding {
    pub label: String,
    pub score: f32,
    #[serde(rename = "box", default)]
    pub bbox: Option<DetectionBox>,
}

/// One record of the fused chart: a background tooth entry or an overlay
/// update entry. Serialized untagged; the two shapes are disjoint on the
/// wire (tooth entries carry `type`/`rotation`, updates do not).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ChartEntry {
    Tooth(ToothEntry),
    Update(ToothUpdate),
}

impl ChartEntry {
    pub fn iso_number(&self) -> u8 {
        match self {
            ChartEntry::Tooth(entry) => entry.iso_number,
            ChartEntry::Update(update) => update.iso_number,
        }
    }

    pub fn as_tooth(&self) -> Option<&ToothEntry> {
        match self {
            ChartEntry::Tooth(entry) => Some(entry),
            ChartEntry::Update(_) => None,
        }
    }

    pub fn as_update(&self) -> Option<&ToothUpdate> {
        match self {
            ChartEntry::Tooth(_) => None,
            ChartEntry::Update(update) => Some(update),
        }
    }
}

/// Background-layer entry: one per detected tooth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToothEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    #[serde(rename = "box")]
    pub bbox: DetectionBox,
    pub mask_contour: Contour,
    #[serde(rename = "isoNumber")]
    pub iso_number: u8,
    pub rotation: f32,
    pub ml_metadata: AnatomyMetadata,
}

impl ToothEntry {
    pub fn new(tooth: &AnatomyFinding, iso_number: u8, rotation: f32) -> Self {
        Self {
            kind: "Anatomy".to_string(),
            label: format!("Tooth {}", tooth.sub_label),
            bbox: tooth.bbox,
            mask_contour: tooth.mask_contour.clone(),
            iso_number,
            rotation,
            ml_metadata: AnatomyMetadata {
                rotation_deg: rotation,
            },
        }
    }

    /// Synthetic placeholder for an update whose tooth the anatomy detector
    /// missed (see `OrphanPolicy::Placeholder`).
    pub fn placeholder(iso_number: u8, bbox: DetectionBox) -> Self {
        Self {
            kind: "Anatomy".to_string(),
            label: format!("Tooth {iso_number}"),
            bbox,
            mask_contour: Vec::new(),
            iso_number,
            rotation: 0.0,
            ml_metadata: AnatomyMetadata { rotation_deg: 0.0 },
        }
    }
}

/// Provenance carried by a tooth entry: where its rotation came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AnatomyMetadata {
    pub rotation_deg: f32,
}

/// Overlay-layer entry: one clinical-category fragment for one tooth, plus
/// provenance. An update with no populated section still carries provenance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToothUpdate {
    #[serde(rename = "isoNumber")]
    pub iso_number: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pathology: Option<PathologySection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restoration: Option<RestorationSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periodontal: Option<PeriodontalSection>,
    #[serde(rename = "isMissing", skip_serializing_if = "Option::is_none")]
    pub is_missing: Option<bool>,
    #[serde(rename = "toBeExtracted", skip_serializing_if = "Option::is_none")]
    pub to_be_extracted: Option<bool>,
    #[serde(default)]
    pub ml_metadata: PathologyMetadata,
}

impl ToothUpdate {
    pub fn new(iso_number: u8, source: &PathologyFinding) -> Self {
        Self {
            iso_number,
            ml_metadata: PathologyMetadata {
                label: source.label.clone(),
                confidence: source.score,
                original_box: source.bbox,
            },
            ..Self::default()
        }
    }

    /// Whether any clinical section was populated by the label mapper.
    pub fn has_fragment(&self) -> bool {
        self.pathology.is_some()
            || self.restoration.is_some()
            || self.periodontal.is_some()
            || self.is_missing.is_some()
            || self.to_be_extracted.is_some()
    }
}

/// Provenance carried by an update entry: the originating detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PathologyMetadata {
    pub label: String,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_box: Option<DetectionBox>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PathologySection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decay: Option<Vec<DecayRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fracture: Option<FractureRecord>,
    #[serde(rename = "apicalPathology", skip_serializing_if = "Option::is_none")]
    pub apical_pathology: Option<bool>,
    #[serde(rename = "developmentDisorder", skip_serializing_if = "Option::is_none")]
    pub development_disorder: Option<bool>,
    #[serde(rename = "toothWear", skip_serializing_if = "Option::is_none")]
    pub tooth_wear: Option<ToothWearRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecayRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub zones: Vec<Zone>,
}

impl DecayRecord {
    pub fn dentin(zones: Vec<Zone>) -> Self {
        Self {
            kind: "Dentin".to_string(),
            zones,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FractureRecord {
    pub crown: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToothWearRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub surface: String,
}

impl ToothWearRecord {
    pub fn buccal_erosion() -> Self {
        Self {
            kind: "Erosion".to_string(),
            surface: "Buccal".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RestorationSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fillings: Option<Vec<FillingRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crowns: Option<Vec<CrownRecord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FillingRecord {
    pub zones: Vec<Zone>,
    pub material: String,
    pub quality: String,
}

impl FillingRecord {
    pub fn composite(zones: Vec<Zone>) -> Self {
        Self {
            zones,
            material: "Composite".to_string(),
            quality: "Sufficient".to_string(),
        }
    }
}

/// What a prosthetic crown is anchored on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CrownBase {
    Natural,
    Implant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrownRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub material: String,
    pub base: CrownBase,
    pub quality: String,
}

impl CrownRecord {
    pub fn single_ceramic(base: CrownBase) -> Self {
        Self {
            kind: "Single".to_string(),
            material: "Ceramic".to_string(),
            base,
            quality: "Sufficient".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PeriodontalSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sites: Option<PeriodontalSites>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub furcation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PeriodontalSites {
    pub buccal: BuccalSite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BuccalSite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tartar: Option<bool>,
}

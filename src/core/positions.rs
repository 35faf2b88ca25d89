//! ISO-11/48 tooth position helpers and the injected class-id maps.
//!
//! A clinical position is a two-digit identifier: first digit = quadrant
//! (1 upper right, 2 upper left, 3 lower left, 4 lower right), second digit =
//! position from the midline (1..=8). The sentinel 0 means unknown/unmapped.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Dental arch a position belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    /// Maxilla, quadrants 1 and 2: roots point up in the image.
    Upper,
    /// Mandible, quadrants 3 and 4: roots point down.
    Lower,
}

/// Arch for an ISO position. Only 11..=28 is the maxilla; anything else,
/// including the sentinel 0, falls into the lower branch.
pub fn arch_of(position: u8) -> Arch {
    if (11..=28).contains(&position) {
        Arch::Upper
    } else {
        Arch::Lower
    }
}

/// Quadrant digit (1..=4) of an ISO position, 0 for the sentinel.
pub fn quadrant_of(position: u8) -> u8 {
    position / 10
}

/// Whether the mesial surface sits on the image-left side of the tooth.
/// Quadrants 1 and 4 (patient's right, image left on a standard radiograph)
/// read mesial-left; quadrants 2 and 3 read mesial-right.
pub fn is_mesial_left(quadrant: u8) -> bool {
    quadrant == 1 || quadrant == 4
}

/// Validity check for a two-digit ISO position.
pub fn is_valid_position(position: u8) -> bool {
    let q = position / 10;
    let p = position % 10;
    (1..=4).contains(&q) && (1..=8).contains(&p)
}

/// Injected mapping from anatomy-model class ids to ISO positions.
///
/// Kept as data rather than code so the table can be versioned and validated
/// independently of the fusion logic. The default table is the 32-class
/// layout the anatomy model was trained with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsoClassMap {
    map: BTreeMap<u32, u8>,
}

impl Default for IsoClassMap {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        // Quadrant 1 (18..11), then 2 (21..28), 3 (38..31), 4 (41..48).
        let layout: [(u32, [u8; 8]); 4] = [
            (1, [18, 17, 16, 15, 14, 13, 12, 11]),
            (9, [21, 22, 23, 24, 25, 26, 27, 28]),
            (17, [38, 37, 36, 35, 34, 33, 32, 31]),
            (25, [41, 42, 43, 44, 45, 46, 47, 48]),
        ];
        for (first_id, teeth) in layout {
            for (offset, iso) in teeth.into_iter().enumerate() {
                map.insert(first_id + offset as u32, iso);
            }
        }
        Self { map }
    }
}

impl IsoClassMap {
    /// Load a map from a JSON object of `class_id -> position`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read ISO class map: {}", path.display()))?;
        let map: BTreeMap<u32, u8> = serde_json::from_str(&data)
            .with_context(|| format!("invalid ISO class map: {}", path.display()))?;
        let map = Self { map };
        map.validate()?;
        Ok(map)
    }

    /// Reject maps carrying positions outside the ISO scheme.
    pub fn validate(&self) -> Result<()> {
        for (&class_id, &position) in &self.map {
            if !is_valid_position(position) {
                bail!("class {} maps to invalid ISO position {}", class_id, position);
            }
        }
        Ok(())
    }

    /// ISO position for a model class id, sentinel 0 when unmapped.
    pub fn position_for(&self, class_id: u32) -> u8 {
        self.map.get(&class_id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Injected mapping from pathology-model class ids to vocabulary labels.
/// Unknown ids map to `"Unknown"`, which the label dispatcher treats as
/// provenance-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathologyClassMap {
    map: BTreeMap<u32, String>,
}

impl Default for PathologyClassMap {
    fn default() -> Self {
        let entries: [(u32, &str); 14] = [
            (1, "Caries"),
            (2, "Apical Pathology"),
            (3, "Pulpitis"),
            (4, "filling"),
            (5, "crown"),
            (6, "implant"),
            (7, "root_fragment"),
            (8, "fracture"),
            (9, "tartar"),
            (10, "bone_loss"),
            (11, "supernumerary"),
            (12, "impacted"),
            (13, "missing"),
            (14, "enamel_defect"),
        ];
        Self {
            map: entries
                .into_iter()
                .map(|(id, label)| (id, label.to_string()))
                .collect(),
        }
    }
}

impl PathologyClassMap {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read pathology class map: {}", path.display()))?;
        let map: BTreeMap<u32, String> = serde_json::from_str(&data)
            .with_context(|| format!("invalid pathology class map: {}", path.display()))?;
        Ok(Self { map })
    }

    pub fn label_for(&self, class_id: u32) -> String {
        self.map
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

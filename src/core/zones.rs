//! Surface-zone classification from relative geometry.
//!
//! A finding's box center is projected into the matched tooth's unit frame;
//! the vertical band picks Root/Cervical/Occlusal depending on which arch the
//! tooth sits in (roots point up in the maxilla, down in the mandible), and
//! the horizontal thirds pick Mesial/Distal depending on quadrant parity.

use serde::{Deserialize, Serialize};

use crate::core::geometry::DetectionBox;
use crate::core::positions::{arch_of, is_mesial_left, quadrant_of, Arch};

/// Clinical surface region of a tooth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Zone {
    Root,
    Cervical,
    Occlusal,
    Mesial,
    Distal,
}

/// Zones affected by a finding, given the matched tooth's box and ISO
/// position. At most one vertical and one horizontal zone, in that order.
/// A degenerate tooth box contributes no zones at all.
pub fn classify_zones(
    tooth_box: &DetectionBox,
    finding_box: &DetectionBox,
    position: u8,
) -> Vec<Zone> {
    let Some((rel_x, rel_y)) = tooth_box.relative_center(finding_box) else {
        return Vec::new();
    };

    let mut zones = Vec::with_capacity(2);

    zones.push(match arch_of(position) {
        Arch::Upper => {
            if rel_y < 0.4 {
                Zone::Root
            } else if rel_y > 0.7 {
                Zone::Occlusal
            } else {
                Zone::Cervical
            }
        }
        Arch::Lower => {
            if rel_y < 0.3 {
                Zone::Occlusal
            } else if rel_y > 0.6 {
                Zone::Root
            } else {
                Zone::Cervical
            }
        }
    });

    let mesial_left = is_mesial_left(quadrant_of(position));
    if rel_x < 0.33 {
        zones.push(if mesial_left { Zone::Mesial } else { Zone::Distal });
    } else if rel_x > 0.66 {
        zones.push(if mesial_left { Zone::Distal } else { Zone::Mesial });
    }

    zones
}

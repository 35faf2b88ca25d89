//! Label-to-schema dispatch.
//!
//! A fixed, ordered table of substring rules over the lower-cased pathology
//! label. Rules are evaluated in table order and the first match wins, so a
//! compound label like `"apical_pulpitis_abscess"` resolves to exactly one
//! fragment. Each rule stands alone and can be tested in isolation.

use crate::core::model::{
    BuccalSite, CrownBase, CrownRecord, DecayRecord, FillingRecord, FractureRecord,
    PathologySection, PeriodontalSection, PeriodontalSites, RestorationSection, ToothUpdate,
    ToothWearRecord,
};
use crate::core::zones::Zone;

/// One dispatch rule: any keyword hit applies the builder.
struct LabelRule {
    keywords: &'static [&'static str],
    apply: fn(&mut ToothUpdate, &[Zone]),
}

/// Dispatch table, in precedence order. A compound label like
/// `"root_fragment_fracture"` resolves to whichever rule sits earlier here,
/// so the order is part of the contract.
const RULES: &[LabelRule] = &[
    LabelRule {
        keywords: &["caries", "decay"],
        apply: |update, zones| {
            pathology(update).decay = Some(vec![DecayRecord::dentin(zones.to_vec())]);
        },
    },
    LabelRule {
        keywords: &["filling"],
        apply: |update, zones| {
            restoration(update).fillings = Some(vec![FillingRecord::composite(zones.to_vec())]);
        },
    },
    LabelRule {
        keywords: &["crown"],
        apply: |update, _| {
            restoration(update).crowns = Some(vec![CrownRecord::single_ceramic(CrownBase::Natural)]);
        },
    },
    LabelRule {
        keywords: &["implant"],
        apply: |update, _| {
            restoration(update).crowns = Some(vec![CrownRecord::single_ceramic(CrownBase::Implant)]);
        },
    },
    LabelRule {
        keywords: &["fracture"],
        apply: |update, _| {
            pathology(update).fracture = Some(FractureRecord { crown: true });
        },
    },
    LabelRule {
        keywords: &["root_fragment"],
        apply: |update, _| {
            update.to_be_extracted = Some(true);
            pathology(update).development_disorder = Some(true);
        },
    },
    LabelRule {
        keywords: &["apical", "pulpitis"],
        apply: |update, _| {
            pathology(update).apical_pathology = Some(true);
        },
    },
    LabelRule {
        keywords: &["tartar"],
        apply: |update, _| {
            update.periodontal = Some(PeriodontalSection {
                sites: Some(PeriodontalSites {
                    buccal: BuccalSite { tartar: Some(true) },
                }),
                furcation: None,
            });
        },
    },
    LabelRule {
        keywords: &["bone_loss"],
        apply: |update, _| {
            update.periodontal = Some(PeriodontalSection {
                sites: None,
                furcation: Some("Stage 2".to_string()),
            });
        },
    },
    LabelRule {
        keywords: &["impacted", "supernumerary"],
        apply: |update, _| {
            pathology(update).development_disorder = Some(true);
        },
    },
    LabelRule {
        keywords: &["missing"],
        apply: |update, _| {
            update.is_missing = Some(true);
        },
    },
    LabelRule {
        keywords: &["enamel"],
        apply: |update, _| {
            pathology(update).tooth_wear = Some(ToothWearRecord::buccal_erosion());
        },
    },
];

fn pathology(update: &mut ToothUpdate) -> &mut PathologySection {
    update.pathology.get_or_insert_with(PathologySection::default)
}

fn restoration(update: &mut ToothUpdate) -> &mut RestorationSection {
    update
        .restoration
        .get_or_insert_with(RestorationSection::default)
}

/// Apply the first matching rule for `label` to `update`. Labels outside the
/// vocabulary leave the update untouched; it still carries its provenance.
pub fn apply_label(update: &mut ToothUpdate, label: &str, zones: &[Zone]) {
    let label = label.to_lowercase();
    for rule in RULES {
        if rule.keywords.iter().any(|k| label.contains(k)) {
            (rule.apply)(update, zones);
            return;
        }
    }
}

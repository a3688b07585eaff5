//! Industrial-hazard taxonomy returned by image analysis.

use serde::{Deserialize, Serialize};

/// Tag value meaning "no hazard detected".
pub const NO_HAZARD_TAG: i32 = -1;

/// Hazard categories, keyed by the integer tag the analyzer returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HazardCategory {
    None,
    Entanglement,
    CaughtIn,
    SlipOrTrip,
    FlyingObject,
    FallFromHeight,
    FallingObject,
    Collision,
    Explosion,
    AwkwardMotion,
    ElectricShock,
    Contact,
    Collapse,
}

impl HazardCategory {
    pub const ALL: [HazardCategory; 13] = [
        HazardCategory::None,
        HazardCategory::Entanglement,
        HazardCategory::CaughtIn,
        HazardCategory::SlipOrTrip,
        HazardCategory::FlyingObject,
        HazardCategory::FallFromHeight,
        HazardCategory::FallingObject,
        HazardCategory::Collision,
        HazardCategory::Explosion,
        HazardCategory::AwkwardMotion,
        HazardCategory::ElectricShock,
        HazardCategory::Contact,
        HazardCategory::Collapse,
    ];

    /// Map a raw tag to a category. Unknown tags yield `None`.
    pub fn from_tag(tag: i32) -> Option<Self> {
        let index = usize::try_from(tag + 1).ok()?;
        Self::ALL.get(index).copied()
    }

    pub fn tag(self) -> i32 {
        // ALL is ordered by tag starting at -1.
        Self::ALL.iter().position(|c| *c == self).unwrap_or(0) as i32 - 1
    }

    pub fn label(self) -> &'static str {
        match self {
            HazardCategory::None => "none",
            HazardCategory::Entanglement => "entanglement",
            HazardCategory::CaughtIn => "caught-in",
            HazardCategory::SlipOrTrip => "slip or trip",
            HazardCategory::FlyingObject => "flying object",
            HazardCategory::FallFromHeight => "fall from height",
            HazardCategory::FallingObject => "falling object",
            HazardCategory::Collision => "collision",
            HazardCategory::Explosion => "explosion",
            HazardCategory::AwkwardMotion => "awkward motion",
            HazardCategory::ElectricShock => "electric shock",
            HazardCategory::Contact => "contact",
            HazardCategory::Collapse => "collapse",
        }
    }
}

/// Result of analyzing one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardReport {
    /// Hazard tag, `-1` when nothing was found.
    pub tag: i32,
    /// Description of the situation in the image.
    pub message: String,
    /// Suggested remediation or prevention.
    pub solution: String,
}

impl HazardReport {
    /// The report used when the analyzer finds no hazard.
    pub fn none() -> Self {
        Self {
            tag: NO_HAZARD_TAG,
            message: "No industrial hazard was identified in the image.".to_string(),
            solution: "No action required.".to_string(),
        }
    }

    pub fn category(&self) -> Option<HazardCategory> {
        HazardCategory::from_tag(self.tag)
    }

    pub fn is_hazard(&self) -> bool {
        self.tag != NO_HAZARD_TAG
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// World axis along which slabs are cut.
///
/// Each axis maps to exactly one anatomical viewing direction:
/// X is coronal, Y is axial and Z is sagittal.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
pub enum Axis {
    #[serde(alias = "coronal", alias = "x")]
    Coronal,
    #[default]
    #[serde(alias = "axial", alias = "y")]
    Axial,
    #[serde(alias = "sagittal", alias = "z")]
    Sagittal,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Coronal, Axis::Axial, Axis::Sagittal];

    /// Index into `(x, y, z)` tuples.
    pub fn index(self) -> usize {
        match self {
            Axis::Coronal => 0,
            Axis::Axial => 1,
            Axis::Sagittal => 2,
        }
    }

    /// The two perpendicular axes, in x-y-z order.
    pub fn others(self) -> (Axis, Axis) {
        match self {
            Axis::Coronal => (Axis::Axial, Axis::Sagittal),
            Axis::Axial => (Axis::Coronal, Axis::Sagittal),
            Axis::Sagittal => (Axis::Coronal, Axis::Axial),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Coronal => "coronal",
            Axis::Axial => "axial",
            Axis::Sagittal => "sagittal",
        };
        f.write_str(name)
    }
}

/// MRI acquisition modality of a loaded volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modality {
    T1,
    Flair,
    SwiMagnitude,
    SwiPhase,
}

impl Modality {
    /// Recognize a modality from a directory or file stem such as `swi_mag`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase().replace(['-', ' '], "_");
        match name.as_str() {
            "t1" | "t1w" => Some(Modality::T1),
            "flair" => Some(Modality::Flair),
            "swi_mag" | "swimag" | "swi" | "swi_magnitude" => Some(Modality::SwiMagnitude),
            "swi_phase" | "swiphase" | "phase" => Some(Modality::SwiPhase),
            _ => None,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modality::T1 => "T1-weighted",
            Modality::Flair => "FLAIR",
            Modality::SwiMagnitude => "SWI magnitude",
            Modality::SwiPhase => "SWI phase",
        };
        f.write_str(name)
    }
}

/// Binary mask drawn on top of the base volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OverlayKind {
    Lesion,
    Prl,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 2] = [OverlayKind::Lesion, OverlayKind::Prl];

    pub fn color(self) -> [f32; 3] {
        match self {
            OverlayKind::Lesion => [1.0, 0.2, 1.0],
            OverlayKind::Prl => [0.0, 1.0, 0.0],
        }
    }
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayKind::Lesion => f.write_str("lesion"),
            OverlayKind::Prl => f.write_str("PRL"),
        }
    }
}

/// Order of the slices of a DICOM series along the stacking axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modality_names() {
        assert_eq!(Modality::from_name("T1"), Some(Modality::T1));
        assert_eq!(Modality::from_name("swi-mag"), Some(Modality::SwiMagnitude));
        assert_eq!(Modality::from_name("swiPhase"), Some(Modality::SwiPhase));
        assert_eq!(Modality::from_name("dwi"), None);
    }

    #[test]
    fn axis_others_are_perpendicular() {
        for axis in Axis::ALL {
            let (a, b) = axis.others();
            assert_ne!(a, axis);
            assert_ne!(b, axis);
            assert!(a.index() < b.index());
        }
    }

    #[test]
    fn axis_parses_from_yaml_aliases() {
        let axis: Axis = serde_yaml::from_str("sagittal").unwrap();
        assert_eq!(axis, Axis::Sagittal);
        let axis: Axis = serde_yaml::from_str("Axial").unwrap();
        assert_eq!(axis, Axis::Axial);
    }
}

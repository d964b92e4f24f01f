//! Purpose: Closed key space of a manifest file: splits, slots, and their entry names.
//! Exports: `Split`, `Slot`, `ManifestKey`.
//! Role: The only place that knows the persisted entry names.
//! Invariants: Entry names are part of the on-disk format and never change.
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub const ALL: [Split; 2] = [Split::Train, Split::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Slot {
    Raw,
    GroundTruth,
    Prediction,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Raw, Slot::GroundTruth, Slot::Prediction];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Raw => "raw",
            Slot::GroundTruth => "ground_truth",
            Slot::Prediction => "prediction",
        }
    }

    fn stem(self) -> &'static str {
        match self {
            Slot::Raw => "raw",
            Slot::GroundTruth => "gt",
            Slot::Prediction => "pred",
        }
    }
}

/// Named entry inside a manifest file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ManifestKey {
    SlotPath(Split, Slot),
    SlotKey(Split, Slot),
    Features(Split),
    Baseline(Split),
}

impl ManifestKey {
    pub fn name(self) -> String {
        match self {
            ManifestKey::SlotPath(split, slot) => format!("{}_{}_path", split.as_str(), slot.stem()),
            ManifestKey::SlotKey(split, slot) => format!("{}_{}_key", split.as_str(), slot.stem()),
            ManifestKey::Features(split) => format!("{}_feat", split.as_str()),
            ManifestKey::Baseline(split) => format!("{}_shape", split.as_str()),
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "train" => Ok(Split::Train),
            "test" => Ok(Split::Test),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown split {value:?}"))
                .with_hint("Use `train` or `test`.")),
        }
    }
}

impl FromStr for Slot {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "raw" => Ok(Slot::Raw),
            "ground_truth" | "gt" => Ok(Slot::GroundTruth),
            "prediction" | "pred" => Ok(Slot::Prediction),
            _ => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown slot {value:?}"))
                .with_hint("Use `raw`, `ground_truth` (gt), or `prediction` (pred).")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ManifestKey, Slot, Split};
    use crate::core::error::ErrorKind;
    use std::collections::HashSet;

    #[test]
    fn entry_names_match_file_layout() {
        assert_eq!(ManifestKey::SlotPath(Split::Train, Slot::Raw).name(), "train_raw_path");
        assert_eq!(ManifestKey::SlotKey(Split::Train, Slot::Raw).name(), "train_raw_key");
        assert_eq!(ManifestKey::SlotPath(Split::Test, Slot::GroundTruth).name(), "test_gt_path");
        assert_eq!(ManifestKey::SlotKey(Split::Test, Slot::Prediction).name(), "test_pred_key");
        assert_eq!(ManifestKey::Features(Split::Train).name(), "train_feat");
        assert_eq!(ManifestKey::Baseline(Split::Test).name(), "test_shape");
    }

    #[test]
    fn entry_names_are_distinct() {
        let mut names = HashSet::new();
        for split in Split::ALL {
            for slot in Slot::ALL {
                assert!(names.insert(ManifestKey::SlotPath(split, slot).name()));
                assert!(names.insert(ManifestKey::SlotKey(split, slot).name()));
            }
            assert!(names.insert(ManifestKey::Features(split).name()));
            assert!(names.insert(ManifestKey::Baseline(split).name()));
        }
        assert_eq!(names.len(), 16);
    }

    #[test]
    fn parse_accepts_short_slot_names() {
        assert_eq!("gt".parse::<Slot>().expect("gt"), Slot::GroundTruth);
        assert_eq!("prediction".parse::<Slot>().expect("pred"), Slot::Prediction);
        assert_eq!("test".parse::<Split>().expect("test"), Split::Test);
        let err = "validation".parse::<Split>().expect_err("bad split");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}

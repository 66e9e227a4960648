//! The fixed traffic sign label table.
//!
//! Class identifiers are indices into [`SIGN_LABELS`]. Lookups are total: any
//! id outside the table resolves to [`UNKNOWN_SIGN`].

use std::collections::HashMap;
use std::ops::RangeInclusive;

use lazy_static::lazy_static;

/// Name reported for ids that are not in the table.
pub const UNKNOWN_SIGN: &str = "Unknown Sign";

/// Ids of the "Unknown Sign Type N" entries.
pub const UNKNOWN_CLASS_IDS: RangeInclusive<u32> = 37..=44;

/// Class reported when an image cannot be decoded.
pub const UNDECODABLE_CLASS_ID: u32 = 37;

pub const SIGN_LABELS: [&str; 52] = [
    "Bicycles crossing",
    "Children crossing",
    "Danger Ahead",
    "Dangerous curve to the left",
    "Dangerous curve to the right",
    "Don't Go Left",
    "Don't Go Left or Right",
    "Don't Go Right",
    "Don't Go straight",
    "Don't Go straight or left",
    "Don't overtake from Left",
    "Fences",
    "Go Left",
    "Go Left or right",
    "Go Right",
    "Go left or straight",
    "Go right or straight",
    "Go straight",
    "Go straight or right",
    "Heavy Vehicle Accidents",
    "Horn",
    "No Car",
    "No U-turn",
    "No entry",
    "No horn",
    "No stopping",
    "Road Divider",
    "Roundabout mandatory",
    "Speed limit (15km/h)",
    "Speed limit (30km/h)",
    "Speed limit (40km/h)",
    "Speed limit (50km/h)",
    "Speed limit (5km/h)",
    "Speed limit (60km/h)",
    "Speed limit (70km/h)",
    "Train Crossing",
    "Under Construction",
    "Unknown Sign Type 1",
    "Unknown Sign Type 2",
    "Unknown Sign Type 3",
    "Unknown Sign Type 4",
    "Unknown Sign Type 5",
    "Unknown Sign Type 6",
    "Unknown Sign Type 7",
    "Unknown Sign Type 8",
    "U-turn",
    "Zebra Crossing",
    "ZigZag Curve",
    "Keep Left",
    "Keep Right",
    "Speed limit (80km/h)",
    "Watch out for cars",
];

lazy_static! {
    static ref CLASS_IDS_BY_NAME: HashMap<String, u32> = SIGN_LABELS
        .iter()
        .enumerate()
        .map(|(id, name)| (name.to_lowercase(), id as u32))
        .collect();
}

pub fn num_classes() -> usize {
    SIGN_LABELS.len()
}

pub fn label_for(class_id: u32) -> &'static str {
    SIGN_LABELS
        .get(class_id as usize)
        .copied()
        .unwrap_or(UNKNOWN_SIGN)
}

/// Case-insensitive reverse lookup.
pub fn class_id_for(name: &str) -> Option<u32> {
    CLASS_IDS_BY_NAME.get(&name.trim().to_lowercase()).copied()
}

/// Resolves a relay prediction string (normally a decimal class id) to a name.
pub fn label_for_prediction(prediction: &str) -> &'static str {
    match prediction.trim().parse::<u32>() {
        Ok(id) => label_for(id),
        Err(_) => UNKNOWN_SIGN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_total() {
        for id in 0..SIGN_LABELS.len() as u32 {
            assert!(!label_for(id).is_empty());
        }
        assert_eq!(label_for(52), UNKNOWN_SIGN);
        assert_eq!(label_for(u32::MAX), UNKNOWN_SIGN);
    }

    #[test]
    fn test_unknown_range_names() {
        for id in UNKNOWN_CLASS_IDS {
            assert!(label_for(id).starts_with("Unknown Sign Type"));
        }
        assert_eq!(label_for(45), "U-turn");
    }

    #[test]
    fn test_reverse_lookup() {
        assert_eq!(class_id_for("No entry"), Some(23));
        assert_eq!(class_id_for("  speed LIMIT (60km/h) "), Some(33));
        assert_eq!(class_id_for("Stop"), None);
    }

    #[test]
    fn test_prediction_strings() {
        assert_eq!(label_for_prediction("33"), "Speed limit (60km/h)");
        assert_eq!(label_for_prediction(" 0\n"), "Bicycles crossing");
        assert_eq!(label_for_prediction("99"), UNKNOWN_SIGN);
        assert_eq!(label_for_prediction("stop sign"), UNKNOWN_SIGN);
    }
}

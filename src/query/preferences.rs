//! User preference payloads and their validation.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{RecommendError, RecommendResult};
use crate::encoding::normalize_text;
use crate::models::{BinaryAttribute, PriceTier, PRICE_POINT_HIGH, PRICE_POINT_MID};

/// Number of tags a user must pick per tag family.
pub const TAGS_PER_FAMILY: usize = 3;

/// The seven general preference keys, in user-vector order.
pub const GENERAL_KEYS: [&str; 7] = [
    "study_space",
    "car_req",
    "nondairy_charge",
    "gluten_free",
    "food_menu",
    PRICE_POINT_MID,
    PRICE_POINT_HIGH,
];

/// Answers to the six yes/no and price questions.
///
/// `car_req` is the user's willingness to drive: `false` means the café must
/// be reachable without a car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneralPreferences {
    pub study_space: bool,
    pub car_req: bool,
    pub nondairy_charge: bool,
    pub gluten_free: bool,
    pub food_menu: bool,
    pub price_tier: PriceTier,
}

impl GeneralPreferences {
    /// Build from the `key -> 0|1` map the presentation layer sends.
    ///
    /// # Errors
    /// Returns `RecommendError::InvalidInput` if a key is missing or
    /// unrecognised, a value is not 0 or 1, or both price indicators are set
    pub fn from_map(map: &BTreeMap<String, i64>) -> RecommendResult<Self> {
        if let Some(key) = map.keys().find(|k| !GENERAL_KEYS.contains(&k.as_str())) {
            return Err(RecommendError::InvalidInput(format!(
                "unrecognised preference key '{}'",
                key
            )));
        }

        let get = |key: &str| -> RecommendResult<bool> {
            match map.get(key).copied() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                Some(other) => Err(RecommendError::InvalidInput(format!(
                    "preference '{}' must be 0 or 1, got {}",
                    key, other
                ))),
                None => Err(RecommendError::InvalidInput(format!(
                    "missing preference '{}'",
                    key
                ))),
            }
        };

        let price_tier = PriceTier::from_indicators(get(PRICE_POINT_MID)?, get(PRICE_POINT_HIGH)?)
            .ok_or_else(|| {
                RecommendError::InvalidInput(
                    "price_point_mid and price_point_high are mutually exclusive".to_string(),
                )
            })?;

        Ok(Self {
            study_space: get(BinaryAttribute::StudySpace.column())?,
            car_req: get(BinaryAttribute::CarReq.column())?,
            nondairy_charge: get(BinaryAttribute::NondairyCharge.column())?,
            gluten_free: get(BinaryAttribute::GlutenFree.column())?,
            food_menu: get(BinaryAttribute::FoodMenu.column())?,
            price_tier,
        })
    }

    /// The `key -> 0|1` map form, with all seven keys.
    pub fn to_map(&self) -> BTreeMap<String, i64> {
        let (mid, high) = self.price_tier.indicators();
        let mut map = BTreeMap::new();
        for attr in BinaryAttribute::ALL {
            map.insert(attr.column().to_string(), i64::from(self.flag(attr)));
        }
        map.insert(PRICE_POINT_MID.to_string(), i64::from(mid));
        map.insert(PRICE_POINT_HIGH.to_string(), i64::from(high));
        map
    }

    /// The answer for one binary attribute.
    pub fn flag(&self, attr: BinaryAttribute) -> bool {
        match attr {
            BinaryAttribute::StudySpace => self.study_space,
            BinaryAttribute::CarReq => self.car_req,
            BinaryAttribute::NondairyCharge => self.nondairy_charge,
            BinaryAttribute::GlutenFree => self.gluten_free,
            BinaryAttribute::FoodMenu => self.food_menu,
        }
    }
}

/// A complete, validated preference set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub general: GeneralPreferences,
    /// Exactly three normalized, distinct atmosphere tags
    pub atmosphere: Vec<String>,
    /// Exactly three normalized, distinct specials tags
    pub specials: Vec<String>,
}

impl UserPreferences {
    /// Validate and normalize the two tag lists.
    ///
    /// # Errors
    /// Returns `RecommendError::InvalidInput` unless each list holds exactly
    /// three distinct, non-empty tags
    pub fn new(
        general: GeneralPreferences,
        atmosphere: Vec<String>,
        specials: Vec<String>,
    ) -> RecommendResult<Self> {
        Ok(Self {
            general,
            atmosphere: validate_tags("atmosphere", atmosphere)?,
            specials: validate_tags("specials", specials)?,
        })
    }

    /// Validate the raw three-part payload of the engine call boundary.
    pub fn from_parts(
        general: &BTreeMap<String, i64>,
        atmosphere: Vec<String>,
        specials: Vec<String>,
    ) -> RecommendResult<Self> {
        Self::new(GeneralPreferences::from_map(general)?, atmosphere, specials)
    }
}

fn validate_tags(family: &str, tags: Vec<String>) -> RecommendResult<Vec<String>> {
    if tags.len() != TAGS_PER_FAMILY {
        return Err(RecommendError::InvalidInput(format!(
            "expected exactly {} {} tags, got {}",
            TAGS_PER_FAMILY,
            family,
            tags.len()
        )));
    }

    let normalized: Vec<String> = tags.iter().map(|t| normalize_text(t)).collect();
    if normalized.iter().any(String::is_empty) {
        return Err(RecommendError::InvalidInput(format!("empty {} tag", family)));
    }
    let distinct: HashSet<&String> = normalized.iter().collect();
    if distinct.len() != normalized.len() {
        return Err(RecommendError::InvalidInput(format!(
            "{} tags must be distinct: {:?}",
            family, tags
        )));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(values: [i64; 7]) -> BTreeMap<String, i64> {
        GENERAL_KEYS.iter().map(|k| k.to_string()).zip(values).collect()
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_map() {
        let prefs = GeneralPreferences::from_map(&map([1, 0, 1, 0, 1, 1, 0])).unwrap();
        assert!(prefs.study_space);
        assert!(!prefs.car_req);
        assert!(prefs.nondairy_charge);
        assert!(!prefs.gluten_free);
        assert!(prefs.food_menu);
        assert_eq!(prefs.price_tier, PriceTier::Mid);
    }

    #[test]
    fn test_map_round_trip_per_price_tier() {
        for tier in PriceTier::ALL {
            let prefs = GeneralPreferences {
                price_tier: tier,
                ..Default::default()
            };
            let m = prefs.to_map();
            let (mid, high) = tier.indicators();
            assert_eq!(m[PRICE_POINT_MID], i64::from(mid));
            assert_eq!(m[PRICE_POINT_HIGH], i64::from(high));
            assert_eq!(GeneralPreferences::from_map(&m).unwrap(), prefs);
        }
    }

    #[test]
    fn test_missing_key() {
        let mut m = map([0; 7]);
        m.remove("gluten_free");
        let err = GeneralPreferences::from_map(&m).unwrap_err();
        assert!(matches!(err, RecommendError::InvalidInput(msg) if msg.contains("gluten_free")));
    }

    #[test]
    fn test_unrecognised_key() {
        let mut m = map([0; 7]);
        m.insert("wifi".to_string(), 1);
        assert!(matches!(
            GeneralPreferences::from_map(&m),
            Err(RecommendError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_binary_value() {
        assert!(matches!(
            GeneralPreferences::from_map(&map([0, 2, 0, 0, 0, 0, 0])),
            Err(RecommendError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_both_price_indicators() {
        assert!(matches!(
            GeneralPreferences::from_map(&map([0, 0, 0, 0, 0, 1, 1])),
            Err(RecommendError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_tags_normalized() {
        let prefs = UserPreferences::new(
            GeneralPreferences::default(),
            tags(&["Cozy", " hole  in the wall", "chic"]),
            tags(&["nutty", "sweet", "rich"]),
        )
        .unwrap();
        assert_eq!(prefs.atmosphere, tags(&["cozy", "hole in the wall", "chic"]));
    }

    #[test]
    fn test_two_tags_rejected() {
        let err = UserPreferences::new(
            GeneralPreferences::default(),
            tags(&["cozy", "chic"]),
            tags(&["nutty", "sweet", "rich"]),
        )
        .unwrap_err();
        assert!(matches!(err, RecommendError::InvalidInput(msg) if msg.contains("atmosphere")));
    }

    #[test]
    fn test_duplicate_tags_rejected() {
        assert!(UserPreferences::new(
            GeneralPreferences::default(),
            tags(&["cozy", "chic", "airy"]),
            tags(&["nutty", "Nutty", "rich"]),
        )
        .is_err());
    }

    #[test]
    fn test_empty_tag_rejected() {
        assert!(UserPreferences::new(
            GeneralPreferences::default(),
            tags(&["cozy", "  ", "airy"]),
            tags(&["nutty", "sweet", "rich"]),
        )
        .is_err());
    }
}

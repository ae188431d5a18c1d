//! Non-negotiable requirements applied before scoring.

use serde::Serialize;

use super::preferences::GeneralPreferences;
use crate::models::{BinaryAttribute, Cafe};

/// Hard filters derived from a user's general answers.
///
/// A café that fails any active filter is never scored, however similar it
/// would otherwise be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HardFilters {
    /// The user will not drive: keep only cafés with `car_req = 0`
    pub no_car: bool,
    /// Keep only cafés with `study_space = 1`
    pub study_space: bool,
    /// Keep only cafés with `gluten_free = 1`
    pub gluten_free: bool,
    /// The user wants a full meal: keep only cafés with `food_menu = 1`
    pub food_menu: bool,
}

impl HardFilters {
    pub fn from_preferences(prefs: &GeneralPreferences) -> Self {
        Self {
            no_car: !prefs.car_req,
            study_space: prefs.study_space,
            gluten_free: prefs.gluten_free,
            food_menu: prefs.food_menu,
        }
    }

    /// Whether `cafe` passes every active filter.
    pub fn admits(&self, cafe: &Cafe) -> bool {
        (!self.no_car || !cafe.flag(BinaryAttribute::CarReq))
            && (!self.study_space || cafe.flag(BinaryAttribute::StudySpace))
            && (!self.gluten_free || cafe.flag(BinaryAttribute::GlutenFree))
            && (!self.food_menu || cafe.flag(BinaryAttribute::FoodMenu))
    }

    /// Names of the active filters, for logging.
    pub fn active(&self) -> Vec<&'static str> {
        [
            (self.no_car, "no_car"),
            (self.study_space, "study_space"),
            (self.gluten_free, "gluten_free"),
            (self.food_menu, "food_menu"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::cafe;
    use crate::models::PriceTier;

    // flags: study_space, car_req, nondairy_charge, gluten_free, food_menu

    #[test]
    fn test_willing_to_drive_admits_everything() {
        let filters = HardFilters::from_preferences(&GeneralPreferences {
            car_req: true,
            ..Default::default()
        });
        assert!(filters.active().is_empty());
        assert!(filters.admits(&cafe(1, [false, true, false, false, false], PriceTier::Low)));
        assert!(filters.admits(&cafe(2, [false; 5], PriceTier::High)));
    }

    #[test]
    fn test_not_driving_excludes_car_cafes() {
        let filters = HardFilters::from_preferences(&GeneralPreferences::default());
        assert_eq!(filters.active(), vec!["no_car"]);
        assert!(!filters.admits(&cafe(1, [false, true, false, false, false], PriceTier::Low)));
        assert!(filters.admits(&cafe(2, [false; 5], PriceTier::Low)));
    }

    #[test]
    fn test_requirements_combine() {
        let filters = HardFilters::from_preferences(&GeneralPreferences {
            study_space: true,
            car_req: true,
            gluten_free: true,
            food_menu: true,
            ..Default::default()
        });
        assert!(filters.admits(&cafe(1, [true, true, false, true, true], PriceTier::Mid)));
        assert!(!filters.admits(&cafe(2, [true, false, false, true, false], PriceTier::Mid)));
        assert!(!filters.admits(&cafe(3, [false, false, false, true, true], PriceTier::Mid)));
        assert!(!filters.admits(&cafe(4, [true, false, false, false, true], PriceTier::Mid)));
    }

    #[test]
    fn test_nondairy_is_never_a_filter() {
        let filters = HardFilters::from_preferences(&GeneralPreferences {
            car_req: true,
            nondairy_charge: true,
            ..Default::default()
        });
        assert!(filters.admits(&cafe(1, [false; 5], PriceTier::Low)));
    }
}

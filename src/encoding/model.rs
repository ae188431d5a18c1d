//! The fitted feature model.
//!
//! A `FeatureModel` is built once from a `Catalog` snapshot. It owns the
//! fitted encoders, the encoded catalog matrix, and the two named schemas, and
//! is immutable afterwards, so one model can serve any number of concurrent
//! requests.

use tracing::info;

use super::{
    top_descriptors, EncodingError, EncodingResult, FeatureSchema, OneHotEncoder, TagKind,
    TagVocabulary,
};
use crate::catalog::Catalog;
use crate::models::{BinaryAttribute, Cafe, CafeId, PRICE_POINT_COLUMN, PRICE_POINT_LOW};
use crate::query::preferences::{GeneralPreferences, UserPreferences, GENERAL_KEYS};

/// One encoded catalog entry.
///
/// Rows are only built by `FeatureModel::fit`, so their length always
/// matches the model's catalog schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    cafe_id: CafeId,
    /// Values in catalog-schema order
    values: Vec<f32>,
}

impl FeatureRow {
    pub fn cafe_id(&self) -> CafeId {
        self.cafe_id
    }

    /// Values in catalog-schema order.
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// A user's answers encoded in the user schema.
#[derive(Debug, Clone, PartialEq)]
pub struct UserEncoding {
    /// Values in user-schema order
    pub values: Vec<f32>,
    /// Atmosphere tags outside the fitted vocabulary
    pub unknown_atmosphere: Vec<String>,
    /// Specials tags outside the fitted vocabulary
    pub unknown_specials: Vec<String>,
}

impl UserEncoding {
    pub fn has_unknown_tags(&self) -> bool {
        !self.unknown_atmosphere.is_empty() || !self.unknown_specials.is_empty()
    }
}

/// Encoders, schemas and encoded matrix fitted on one catalog snapshot.
#[derive(Debug, Clone)]
pub struct FeatureModel {
    catalog: Catalog,
    atmosphere: TagVocabulary,
    specials: TagVocabulary,
    catalog_schema: FeatureSchema,
    user_schema: FeatureSchema,
    /// Position of every user-schema column in the catalog schema
    shared: Vec<usize>,
    rows: Vec<FeatureRow>,
}

impl FeatureModel {
    /// Fit every encoder on `catalog` and encode all of its entries.
    ///
    /// Catalog schema: one-hot categorical features (including the price
    /// tier, minus its low level), the raw binary attributes, then the
    /// atmosphere and specials multi-hot sections. User schema: the seven
    /// general preference keys, then the same two multi-hot sections.
    ///
    /// # Errors
    /// Returns `EncodingError::SchemaMismatch` if feature names collide or the
    /// catalog schema cannot cover every user column
    pub fn fit(catalog: Catalog) -> EncodingResult<Self> {
        let top: Vec<(Vec<String>, Vec<String>)> = catalog
            .cafes()
            .iter()
            .map(|cafe| {
                let rows = catalog.descriptors_for(cafe.cafe_id);
                (
                    top_descriptors(rows, TagKind::Atmosphere),
                    top_descriptors(rows, TagKind::Specials),
                )
            })
            .collect();

        let atmosphere = TagVocabulary::fit(TagKind::Atmosphere, top.iter().map(|(a, _)| a));
        let specials = TagVocabulary::fit(TagKind::Specials, top.iter().map(|(_, s)| s));

        let mut categories = catalog.categorical_values();
        if categories.contains_key(PRICE_POINT_COLUMN) {
            return Err(EncodingError::SchemaMismatch(format!(
                "categorical column '{}' is reserved for the price tier",
                PRICE_POINT_COLUMN
            )));
        }
        // All three levels, so the price features exist whatever the data holds.
        categories.insert(
            PRICE_POINT_COLUMN.to_string(),
            vec!["high".to_string(), "low".to_string(), "mid".to_string()],
        );
        let one_hot = OneHotEncoder::fit(categories, &[PRICE_POINT_LOW]);

        let mut columns: Vec<String> = one_hot.feature_names().to_vec();
        columns.extend(BinaryAttribute::ALL.iter().map(|a| a.column().to_string()));
        columns.extend(atmosphere.column_names());
        columns.extend(specials.column_names());
        let catalog_schema = FeatureSchema::new(columns)?;

        let mut user_columns: Vec<String> = GENERAL_KEYS.iter().map(|k| k.to_string()).collect();
        user_columns.extend(atmosphere.column_names());
        user_columns.extend(specials.column_names());
        let user_schema = FeatureSchema::new(user_columns)?;

        let shared = catalog_schema.projection(&user_schema)?;

        let rows = catalog
            .cafes()
            .iter()
            .zip(&top)
            .map(|(cafe, (atm, spe))| {
                let mut values = one_hot.transform(&categorical_row(cafe));
                values.extend(
                    BinaryAttribute::ALL
                        .iter()
                        .map(|&a| if cafe.flag(a) { 1.0 } else { 0.0 }),
                );
                values.extend(atmosphere.transform(atm.as_slice()).values);
                values.extend(specials.transform(spe.as_slice()).values);
                catalog_schema.check(&values)?;
                Ok(FeatureRow {
                    cafe_id: cafe.cafe_id,
                    values,
                })
            })
            .collect::<EncodingResult<Vec<_>>>()?;

        info!(
            "Fitted feature model: {} cafés, {} catalog columns, {} shared columns ({} atmosphere tags, {} specials tags)",
            rows.len(),
            catalog_schema.len(),
            user_schema.len(),
            atmosphere.len(),
            specials.len()
        );

        Ok(Self {
            catalog,
            atmosphere,
            specials,
            catalog_schema,
            user_schema,
            shared,
            rows,
        })
    }

    /// The snapshot this model was fitted on.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn atmosphere_vocabulary(&self) -> &TagVocabulary {
        &self.atmosphere
    }

    pub fn specials_vocabulary(&self) -> &TagVocabulary {
        &self.specials
    }

    pub fn catalog_schema(&self) -> &FeatureSchema {
        &self.catalog_schema
    }

    pub fn user_schema(&self) -> &FeatureSchema {
        &self.user_schema
    }

    /// Encoded catalog rows, in catalog order.
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn row(&self, id: CafeId) -> Option<&FeatureRow> {
        self.catalog.position(id).and_then(|pos| self.rows.get(pos))
    }

    /// One café's row restricted to the user-schema columns, in user-schema order.
    ///
    /// Returns `None` for a café this model has not encoded.
    pub fn shared_values(&self, id: CafeId) -> Option<Vec<f32>> {
        let row = self.row(id)?;
        self.shared.iter().map(|&pos| row.values.get(pos).copied()).collect()
    }

    /// Encode validated user answers in the user schema.
    ///
    /// Tags outside the fitted vocabularies contribute nothing to the vector
    /// and are reported on the returned encoding; whether that is acceptable is
    /// the caller's policy.
    pub fn encode_user(&self, prefs: &UserPreferences) -> EncodingResult<UserEncoding> {
        let mut values = general_vector(&prefs.general).to_vec();
        let atmosphere = self.atmosphere.transform(prefs.atmosphere.as_slice());
        let specials = self.specials.transform(prefs.specials.as_slice());
        values.extend(atmosphere.values);
        values.extend(specials.values);
        self.user_schema.check(&values)?;

        Ok(UserEncoding {
            values,
            unknown_atmosphere: atmosphere.unknown,
            unknown_specials: specials.unknown,
        })
    }
}

/// The seven general answers in `GENERAL_KEYS` order.
pub fn general_vector(general: &GeneralPreferences) -> [f32; 7] {
    let bit = |b: bool| if b { 1.0 } else { 0.0 };
    let (mid, high) = general.price_tier.indicators();
    [
        bit(general.study_space),
        bit(general.car_req),
        bit(general.nondairy_charge),
        bit(general.gluten_free),
        bit(general.food_menu),
        f32::from(mid),
        f32::from(high),
    ]
}

fn categorical_row(cafe: &Cafe) -> std::collections::BTreeMap<String, String> {
    let mut row = cafe.categorical.clone();
    row.insert(PRICE_POINT_COLUMN.to_string(), cafe.price_tier.as_str().to_string());
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{cafe, descriptor, reference};
    use crate::models::PriceTier;
    use crate::provider::RawTables;

    fn catalog() -> Catalog {
        let mut first = cafe(1, [true, false, true, false, false], PriceTier::Mid);
        first.categorical.insert("neighborhood".into(), "downtown".into());
        let mut second = cafe(2, [false, true, false, true, true], PriceTier::High);
        second.categorical.insert("neighborhood".into(), "uptown".into());

        Catalog::from_tables(RawTables {
            catalog: vec![first, second],
            descriptors: vec![
                descriptor(1, "cozy", "nutty"),
                descriptor(1, "cozy", "sweet"),
                descriptor(1, "modern", "nutty"),
                descriptor(1, "airy", "rich"),
                descriptor(1, "chic", "floral"),
                descriptor(1, "airy", ""),
                descriptor(2, "bustling", "bitter"),
            ],
            references: vec![reference(1, "One", "Latte"), reference(2, "Two", "Mocha")],
        })
        .unwrap()
    }

    fn prefs(tier: PriceTier, atm: [&str; 3], spe: [&str; 3]) -> UserPreferences {
        let general = GeneralPreferences {
            study_space: true,
            car_req: false,
            nondairy_charge: true,
            gluten_free: false,
            food_menu: false,
            price_tier: tier,
        };
        UserPreferences::new(
            general,
            atm.iter().map(|s| s.to_string()).collect(),
            spe.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_vocabulary_is_union_of_top_three() {
        let model = FeatureModel::fit(catalog()).unwrap();
        // café 1 keeps cozy, airy and modern; chic falls outside its top three
        assert_eq!(
            model.atmosphere_vocabulary().classes(),
            &["airy", "bustling", "cozy", "modern"]
        );
        assert_eq!(
            model.specials_vocabulary().classes(),
            &["bitter", "nutty", "rich", "sweet"]
        );
    }

    #[test]
    fn test_catalog_schema_layout() {
        let model = FeatureModel::fit(catalog()).unwrap();
        let columns = model.catalog_schema().columns();
        assert_eq!(
            &columns[..9],
            &[
                "neighborhood_downtown",
                "neighborhood_uptown",
                "price_point_high",
                "price_point_mid",
                "study_space",
                "car_req",
                "nondairy_charge",
                "gluten_free",
                "food_menu",
            ]
        );
        assert!(model.catalog_schema().position("price_point_low").is_none());
        assert_eq!(columns.len(), 9 + 4 + 4);
    }

    #[test]
    fn test_user_schema_layout() {
        let model = FeatureModel::fit(catalog()).unwrap();
        let columns = model.user_schema().columns();
        assert_eq!(&columns[..7], &GENERAL_KEYS);
        assert_eq!(columns[7], "atmosphere:airy");
        assert_eq!(columns.len(), 7 + 4 + 4);
    }

    #[test]
    fn test_catalog_row_encoding() {
        let model = FeatureModel::fit(catalog()).unwrap();
        let row = model.row(1).unwrap();
        assert_eq!(
            row.values(),
            &[
                1.0, 0.0, // neighborhood downtown, uptown
                0.0, 1.0, // price high, mid
                1.0, 0.0, 1.0, 0.0, 0.0, // binary attributes
                1.0, 0.0, 1.0, 1.0, // airy bustling cozy modern
                0.0, 1.0, 1.0, 1.0, // bitter nutty rich sweet
            ]
        );
        assert_eq!(row.cafe_id(), 1);
    }

    #[test]
    fn test_shared_values_align_by_name() {
        let model = FeatureModel::fit(catalog()).unwrap();
        let shared = model.shared_values(2).unwrap();
        // general section: study, car, nondairy, gluten, food, mid, high
        assert_eq!(&shared[..7], &[0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        assert_eq!(shared.len(), model.user_schema().len());
    }

    #[test]
    fn test_shared_values_unknown_cafe() {
        let model = FeatureModel::fit(catalog()).unwrap();
        assert!(model.row(42).is_none());
        assert!(model.shared_values(42).is_none());
    }

    #[test]
    fn test_encode_user_price_indicators() {
        let model = FeatureModel::fit(catalog()).unwrap();
        for (tier, mid, high) in [
            (PriceTier::Low, 0.0, 0.0),
            (PriceTier::Mid, 1.0, 0.0),
            (PriceTier::High, 0.0, 1.0),
        ] {
            let enc = model
                .encode_user(&prefs(tier, ["cozy", "airy", "modern"], ["nutty", "rich", "sweet"]))
                .unwrap();
            assert_eq!(enc.values[5], mid);
            assert_eq!(enc.values[6], high);
        }
    }

    #[test]
    fn test_encode_user_matches_catalog_tag_sections() {
        let model = FeatureModel::fit(catalog()).unwrap();
        let enc = model
            .encode_user(&prefs(PriceTier::Mid, ["cozy", "airy", "modern"], ["nutty", "sweet", "rich"]))
            .unwrap();
        let shared = model.shared_values(1).unwrap();
        assert_eq!(&enc.values[7..], &shared[7..]);
        assert!(!enc.has_unknown_tags());
    }

    #[test]
    fn test_encode_user_reports_unknown_tags() {
        let model = FeatureModel::fit(catalog()).unwrap();
        let enc = model
            .encode_user(&prefs(PriceTier::Low, ["cozy", "funky", "chic"], ["nutty", "rich", "vanilla"]))
            .unwrap();
        assert_eq!(enc.unknown_atmosphere, vec!["funky".to_string(), "chic".to_string()]);
        assert_eq!(enc.unknown_specials, vec!["vanilla".to_string()]);
        assert_eq!(enc.values.len(), model.user_schema().len());
    }

    #[test]
    fn test_reserved_price_column_rejected() {
        let mut first = cafe(1, [false; 5], PriceTier::Low);
        first.categorical.insert("price_point".into(), "low".into());
        let catalog = Catalog::from_tables(RawTables {
            catalog: vec![first],
            descriptors: vec![descriptor(1, "cozy", "nutty")],
            references: vec![reference(1, "One", "Latte")],
        })
        .unwrap();
        assert!(matches!(FeatureModel::fit(catalog), Err(EncodingError::SchemaMismatch(_))));
    }
}

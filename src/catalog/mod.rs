//! In-memory catalog snapshot.
//!
//! A `Catalog` is the validated join of the three source tables: every café,
//! its descriptor rows, and its reference record, keyed by `cafe_id`. It is
//! immutable once built; a fresh snapshot is built whenever the data is
//! reloaded.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::models::{Cafe, CafeId, DescriptorRecord, ReferenceRecord};
use crate::provider::{DataSource, RawTables};

/// Errors raised while assembling a catalog from raw tables.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The source could not be read
    #[error("Source error: {0}")]
    SourceError(String),

    /// The same cafe_id appears twice in one table
    #[error("Duplicate cafe_id {id} in {table} table")]
    DuplicateKey { table: &'static str, id: CafeId },

    /// A row references a cafe_id absent from the catalog
    #[error("{table} table references unknown cafe_id {id}")]
    UnknownKey { table: &'static str, id: CafeId },

    /// A catalog entry has no reference record
    #[error("No reference record for cafe_id {0}")]
    MissingReference(CafeId),

    /// Catalog entries with no row in the descriptor table
    #[error("No descriptor rows for cafe_id(s) {0:?}")]
    MissingDescriptors(Vec<CafeId>),

    /// The catalog table has no rows
    #[error("Catalog is empty")]
    Empty,
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Validated, immutable snapshot of the catalog, descriptor and reference data.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Cafés in source order
    cafes: Vec<Cafe>,

    /// cafe_id -> position in `cafes`
    positions: HashMap<CafeId, usize>,

    /// Descriptor rows grouped per café, source order preserved
    descriptors: HashMap<CafeId, Vec<DescriptorRecord>>,

    references: HashMap<CafeId, ReferenceRecord>,
}

impl Catalog {
    /// Read all three tables from `source` and validate them.
    ///
    /// # Errors
    /// Returns `CatalogError::SourceError` if a table cannot be read, or
    /// another `CatalogError` if the tables disagree on their keys
    pub fn load<D: DataSource + ?Sized>(source: &D) -> CatalogResult<Self> {
        let tables = source
            .load_all()
            .map_err(|e| CatalogError::SourceError(e.to_string()))?;
        let catalog = Self::from_tables(tables)?;
        info!(
            "Loaded catalog from {}: {} cafés, {} descriptor rows",
            source.name(),
            catalog.len(),
            catalog.descriptor_count()
        );
        Ok(catalog)
    }

    /// Join and validate raw tables.
    ///
    /// Reference keys must match catalog keys exactly, and every catalogued
    /// café needs at least one descriptor row; descriptor rows may only
    /// reference catalogued cafés.
    pub fn from_tables(tables: RawTables) -> CatalogResult<Self> {
        let RawTables {
            catalog,
            descriptors,
            references,
        } = tables;

        if catalog.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut positions = HashMap::with_capacity(catalog.len());
        for (pos, cafe) in catalog.iter().enumerate() {
            if positions.insert(cafe.cafe_id, pos).is_some() {
                return Err(CatalogError::DuplicateKey {
                    table: "catalog",
                    id: cafe.cafe_id,
                });
            }
        }

        let mut reference_map = HashMap::with_capacity(references.len());
        for record in references {
            if !positions.contains_key(&record.cafe_id) {
                return Err(CatalogError::UnknownKey {
                    table: "reference",
                    id: record.cafe_id,
                });
            }
            let id = record.cafe_id;
            if reference_map.insert(id, record).is_some() {
                return Err(CatalogError::DuplicateKey {
                    table: "reference",
                    id,
                });
            }
        }
        if let Some(cafe) = catalog.iter().find(|c| !reference_map.contains_key(&c.cafe_id)) {
            return Err(CatalogError::MissingReference(cafe.cafe_id));
        }

        let mut grouped: HashMap<CafeId, Vec<DescriptorRecord>> = HashMap::new();
        for row in descriptors {
            if !positions.contains_key(&row.cafe_id) {
                return Err(CatalogError::UnknownKey {
                    table: "descriptor",
                    id: row.cafe_id,
                });
            }
            grouped.entry(row.cafe_id).or_default().push(row);
        }

        let undescribed: Vec<CafeId> = catalog
            .iter()
            .map(|c| c.cafe_id)
            .filter(|id| !grouped.contains_key(id))
            .collect();
        if !undescribed.is_empty() {
            return Err(CatalogError::MissingDescriptors(undescribed));
        }

        Ok(Self {
            cafes: catalog,
            positions,
            descriptors: grouped,
            references: reference_map,
        })
    }

    /// All cafés, in source order.
    pub fn cafes(&self) -> &[Cafe] {
        &self.cafes
    }

    /// Get a café by id.
    pub fn get(&self, id: CafeId) -> Option<&Cafe> {
        self.positions.get(&id).map(|&pos| &self.cafes[pos])
    }

    /// Position of a café in source order; used as the ranking tie-break.
    pub fn position(&self, id: CafeId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Descriptor rows of one café, in source order.
    pub fn descriptors_for(&self, id: CafeId) -> &[DescriptorRecord] {
        self.descriptors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Reference record of one café.
    pub fn reference(&self, id: CafeId) -> Option<&ReferenceRecord> {
        self.references.get(&id)
    }

    /// Reference record with its display asset resolved under `asset_dir`.
    ///
    /// The asset is named after the café's specialty: `<asset_dir>/<specials>.png`.
    pub fn reference_with_asset(&self, id: CafeId, asset_dir: Option<&Path>) -> Option<ReferenceRecord> {
        let mut record = self.references.get(&id)?.clone();
        record.asset = asset_dir.map(|dir| dir.join(format!("{}.png", record.specials)));
        Some(record)
    }

    /// Number of cafés.
    pub fn len(&self) -> usize {
        self.cafes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cafes.is_empty()
    }

    /// Total number of descriptor rows across all cafés.
    pub fn descriptor_count(&self) -> usize {
        self.descriptors.values().map(Vec::len).sum()
    }

    /// Distinct values of every categorical column, sorted.
    ///
    /// This is what a one-hot encoder is fitted on.
    pub fn categorical_values(&self) -> BTreeMap<String, Vec<String>> {
        let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for cafe in &self.cafes {
            for (column, value) in &cafe.categorical {
                values.entry(column.clone()).or_default().push(value.clone());
            }
        }
        for list in values.values_mut() {
            list.sort();
            list.dedup();
        }
        values
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{BinaryAttribute, PriceTier};

    pub(crate) fn cafe(id: CafeId, flags: [bool; 5], tier: PriceTier) -> Cafe {
        Cafe {
            cafe_id: id,
            categorical: BTreeMap::new(),
            binary: BinaryAttribute::ALL.into_iter().zip(flags).collect(),
            price_tier: tier,
        }
    }

    pub(crate) fn reference(id: CafeId, name: &str, specials: &str) -> ReferenceRecord {
        ReferenceRecord {
            cafe_id: id,
            cafe_name: name.to_string(),
            specials: specials.to_string(),
            extra: BTreeMap::new(),
            asset: None,
        }
    }

    pub(crate) fn descriptor(id: CafeId, atmosphere: &str, specials: &str) -> DescriptorRecord {
        let opt = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
        DescriptorRecord {
            cafe_id: id,
            atmosphere_desc: opt(atmosphere),
            specials_desc: opt(specials),
        }
    }

    fn tables() -> RawTables {
        RawTables {
            catalog: vec![
                cafe(1, [true, false, false, false, true], PriceTier::Low),
                cafe(2, [false, true, false, true, false], PriceTier::High),
            ],
            descriptors: vec![
                descriptor(1, "cozy", "nutty"),
                descriptor(2, "chic", ""),
                descriptor(1, "cozy", "sweet"),
            ],
            references: vec![reference(2, "Two", "Mocha"), reference(1, "One", "Latte")],
        }
    }

    #[test]
    fn test_from_tables_joins_by_key() {
        let catalog = Catalog::from_tables(tables()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.position(2), Some(1));
        assert_eq!(catalog.descriptors_for(1).len(), 2);
        assert_eq!(catalog.descriptors_for(2).len(), 1);
        assert!(catalog.descriptors_for(9).is_empty());
        assert_eq!(catalog.reference(1).unwrap().cafe_name, "One");
        assert_eq!(catalog.descriptor_count(), 3);
    }

    #[test]
    fn test_duplicate_catalog_key() {
        let mut t = tables();
        t.catalog.push(cafe(1, [false; 5], PriceTier::Low));
        assert!(matches!(
            Catalog::from_tables(t),
            Err(CatalogError::DuplicateKey { table: "catalog", id: 1 })
        ));
    }

    #[test]
    fn test_missing_reference() {
        let mut t = tables();
        t.references.retain(|r| r.cafe_id != 2);
        assert!(matches!(Catalog::from_tables(t), Err(CatalogError::MissingReference(2))));
    }

    #[test]
    fn test_reference_for_unknown_cafe() {
        let mut t = tables();
        t.references.push(reference(9, "Nine", "Tea"));
        assert!(matches!(
            Catalog::from_tables(t),
            Err(CatalogError::UnknownKey { table: "reference", id: 9 })
        ));
    }

    #[test]
    fn test_descriptor_for_unknown_cafe() {
        let mut t = tables();
        t.descriptors.push(descriptor(7, "airy", ""));
        assert!(matches!(
            Catalog::from_tables(t),
            Err(CatalogError::UnknownKey { table: "descriptor", id: 7 })
        ));
    }

    #[test]
    fn test_cafe_without_descriptors() {
        let mut t = tables();
        t.catalog.push(cafe(3, [false; 5], PriceTier::Mid));
        t.catalog.push(cafe(4, [false; 5], PriceTier::Low));
        t.references.push(reference(3, "Three", "Tea"));
        t.references.push(reference(4, "Four", "Chai"));
        t.descriptors.retain(|d| d.cafe_id != 2);
        match Catalog::from_tables(t) {
            Err(CatalogError::MissingDescriptors(ids)) => assert_eq!(ids, vec![2, 3, 4]),
            other => panic!("Expected MissingDescriptors, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_catalog() {
        assert!(matches!(Catalog::from_tables(RawTables::default()), Err(CatalogError::Empty)));
    }

    #[test]
    fn test_reference_with_asset() {
        let catalog = Catalog::from_tables(tables()).unwrap();
        let record = catalog.reference_with_asset(1, Some(Path::new("assets"))).unwrap();
        assert_eq!(record.asset, Some(Path::new("assets").join("Latte.png")));
        assert!(catalog.reference_with_asset(1, None).unwrap().asset.is_none());
    }

    #[test]
    fn test_categorical_values_sorted_and_deduplicated() {
        let mut t = tables();
        t.catalog[0].categorical.insert("style".into(), "roastery".into());
        t.catalog[1].categorical.insert("style".into(), "bakery".into());
        let catalog = Catalog::from_tables(t).unwrap();
        let values = catalog.categorical_values();
        assert_eq!(values["style"], vec!["bakery".to_string(), "roastery".to_string()]);
    }
}

//! CSV data source implementation.
//!
//! This module reads the catalog, descriptor and reference tables from CSV
//! files with a header row. The catalog and reference tables have open column
//! sets, so they are parsed through their headers; the descriptor table has a
//! fixed shape and is deserialized with serde.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use super::{DataSource, ProviderError, ProviderResult};
use crate::models::{
    BinaryAttribute, Cafe, CafeId, DescriptorRecord, PriceTier, ReferenceRecord, CAFE_ID_COLUMN,
    PRICE_POINT_COLUMN, PRICE_POINT_HIGH, PRICE_POINT_MID,
};

/// Default catalog file name.
pub const DEFAULT_CATALOG_FILE: &str = "coffeeshop_df.csv";
/// Default descriptor file name.
pub const DEFAULT_DESCRIPTOR_FILE: &str = "descriptor_df.csv";
/// Default reference file name.
pub const DEFAULT_REFERENCE_FILE: &str = "reference_df.csv";

/// Reads the three tables from CSV files on disk.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    catalog_path: PathBuf,
    descriptor_path: PathBuf,
    reference_path: PathBuf,
    name: String,
}

impl CsvDataSource {
    /// Create a source from explicit file paths.
    pub fn new(
        catalog_path: impl Into<PathBuf>,
        descriptor_path: impl Into<PathBuf>,
        reference_path: impl Into<PathBuf>,
    ) -> Self {
        let catalog_path = catalog_path.into();
        let name = format!(
            "csv:{}",
            catalog_path
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        );
        Self {
            catalog_path,
            descriptor_path: descriptor_path.into(),
            reference_path: reference_path.into(),
            name,
        }
    }

    /// Create a source from a directory holding the default file names.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(
            dir.join(DEFAULT_CATALOG_FILE),
            dir.join(DEFAULT_DESCRIPTOR_FILE),
            dir.join(DEFAULT_REFERENCE_FILE),
        )
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub fn descriptor_path(&self) -> &Path {
        &self.descriptor_path
    }

    pub fn reference_path(&self) -> &Path {
        &self.reference_path
    }

    fn open(path: &Path) -> ProviderResult<csv::Reader<std::fs::File>> {
        let file = std::fs::File::open(path)?;
        Ok(ReaderBuilder::new().trim(Trim::All).from_reader(file))
    }
}

/// Header lookup for the open-schema tables.
struct Header {
    index: HashMap<String, usize>,
    names: Vec<String>,
    file: String,
}

impl Header {
    fn read(reader: &mut csv::Reader<std::fs::File>, path: &Path) -> ProviderResult<Self> {
        let names: Vec<String> = reader
            .headers()
            .map_err(|e| ProviderError::ParseError(format!("{}: {}", path.display(), e)))?
            .iter()
            .map(str::to_string)
            .collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Ok(Self {
            index,
            names,
            file: path.display().to_string(),
        })
    }

    fn has(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    fn require(&self, column: &str) -> ProviderResult<usize> {
        self.index
            .get(column)
            .copied()
            .ok_or_else(|| ProviderError::MissingColumn(format!("{} (in {})", column, self.file)))
    }

    fn cell<'r>(&self, record: &'r StringRecord, column: &str) -> ProviderResult<&'r str> {
        let idx = self.require(column)?;
        record.get(idx).ok_or_else(|| {
            ProviderError::ParseError(format!(
                "{} line {}: row has no '{}' field",
                self.file,
                line_of(record),
                column
            ))
        })
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn parse_id(raw: &str, file: &str, record: &StringRecord) -> ProviderResult<CafeId> {
    raw.parse::<CafeId>().map_err(|_| {
        ProviderError::ParseError(format!(
            "{} line {}: cafe_id '{}' is not an integer",
            file,
            line_of(record),
            raw
        ))
    })
}

/// Parse a 0/1 cell. Spreadsheet exports also write `true`/`false` and `1.0`.
pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" => Some(false),
        _ => None,
    }
}

fn flag_cell(header: &Header, record: &StringRecord, column: &str) -> ProviderResult<bool> {
    let raw = header.cell(record, column)?;
    parse_flag(raw).ok_or_else(|| {
        ProviderError::ParseError(format!(
            "{} line {}: column '{}' must be 0 or 1, got '{}'",
            header.file,
            line_of(record),
            column,
            raw
        ))
    })
}

fn price_tier(header: &Header, record: &StringRecord) -> ProviderResult<PriceTier> {
    if header.has(PRICE_POINT_COLUMN) {
        let raw = header.cell(record, PRICE_POINT_COLUMN)?;
        return raw.parse::<PriceTier>().map_err(|e| {
            ProviderError::ParseError(format!("{} line {}: {}", header.file, line_of(record), e))
        });
    }

    let mid = flag_cell(header, record, PRICE_POINT_MID)?;
    let high = flag_cell(header, record, PRICE_POINT_HIGH)?;
    PriceTier::from_indicators(mid, high).ok_or_else(|| {
        ProviderError::ParseError(format!(
            "{} line {}: price_point_mid and price_point_high are both set",
            header.file,
            line_of(record)
        ))
    })
}

impl DataSource for CsvDataSource {
    fn load_catalog(&self) -> ProviderResult<Vec<Cafe>> {
        let mut reader = Self::open(&self.catalog_path)?;
        let header = Header::read(&mut reader, &self.catalog_path)?;

        header.require(CAFE_ID_COLUMN)?;
        for attr in BinaryAttribute::ALL {
            header.require(attr.column())?;
        }
        if !header.has(PRICE_POINT_COLUMN) {
            header.require(PRICE_POINT_MID)?;
            header.require(PRICE_POINT_HIGH)?;
        }

        let categorical_columns: Vec<&String> = header
            .names
            .iter()
            .filter(|name| {
                let name = name.as_str();
                name != CAFE_ID_COLUMN
                    && name != PRICE_POINT_COLUMN
                    && name != PRICE_POINT_MID
                    && name != PRICE_POINT_HIGH
                    && BinaryAttribute::from_column(name).is_none()
            })
            .collect();

        let mut cafes = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| ProviderError::ParseError(format!("{}: {}", header.file, e)))?;

            let cafe_id = parse_id(header.cell(&record, CAFE_ID_COLUMN)?, &header.file, &record)?;

            let mut binary = BTreeMap::new();
            for attr in BinaryAttribute::ALL {
                binary.insert(attr, flag_cell(&header, &record, attr.column())?);
            }

            let mut categorical = BTreeMap::new();
            for column in &categorical_columns {
                categorical.insert((*column).clone(), header.cell(&record, column)?.to_string());
            }

            cafes.push(Cafe {
                cafe_id,
                categorical,
                binary,
                price_tier: price_tier(&header, &record)?,
            });
        }

        debug!("Read {} catalog rows from {}", cafes.len(), header.file);
        Ok(cafes)
    }

    fn load_descriptors(&self) -> ProviderResult<Vec<DescriptorRecord>> {
        let mut reader = Self::open(&self.descriptor_path)?;
        let file = self.descriptor_path.display().to_string();

        let header = Header::read(&mut reader, &self.descriptor_path)?;
        header.require(CAFE_ID_COLUMN)?;

        let mut rows = Vec::new();
        for row in reader.deserialize::<DescriptorRecord>() {
            let row = row.map_err(|e| ProviderError::ParseError(format!("{}: {}", file, e)))?;
            rows.push(row);
        }

        debug!("Read {} descriptor rows from {}", rows.len(), file);
        Ok(rows)
    }

    fn load_references(&self) -> ProviderResult<Vec<ReferenceRecord>> {
        const NAME_COLUMN: &str = "cafe_name";
        const SPECIALS_COLUMN: &str = "specials";

        let mut reader = Self::open(&self.reference_path)?;
        let header = Header::read(&mut reader, &self.reference_path)?;

        header.require(CAFE_ID_COLUMN)?;
        header.require(NAME_COLUMN)?;
        header.require(SPECIALS_COLUMN)?;

        let extra_columns: Vec<&String> = header
            .names
            .iter()
            .filter(|name| {
                !matches!(name.as_str(), CAFE_ID_COLUMN | NAME_COLUMN | SPECIALS_COLUMN)
            })
            .collect();

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| ProviderError::ParseError(format!("{}: {}", header.file, e)))?;

            let mut extra = BTreeMap::new();
            for column in &extra_columns {
                extra.insert((*column).clone(), header.cell(&record, column)?.to_string());
            }

            records.push(ReferenceRecord {
                cafe_id: parse_id(header.cell(&record, CAFE_ID_COLUMN)?, &header.file, &record)?,
                cafe_name: header.cell(&record, NAME_COLUMN)?.to_string(),
                specials: header.cell(&record, SPECIALS_COLUMN)?.to_string(),
                extra,
                asset: None,
            });
        }

        debug!("Read {} reference rows from {}", records.len(), header.file);
        Ok(records)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_tables(catalog: &str, descriptors: &str, references: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(DEFAULT_CATALOG_FILE), catalog).unwrap();
        fs::write(dir.path().join(DEFAULT_DESCRIPTOR_FILE), descriptors).unwrap();
        fs::write(dir.path().join(DEFAULT_REFERENCE_FILE), references).unwrap();
        dir
    }

    const DESCRIPTORS: &str = "cafe_id,atmosphere_desc,specials_desc\n0,cozy,nutty\n0,,sweet\n";
    const REFERENCES: &str = "cafe_id,cafe_name,specials,address\n0,Bean There,Hazelnut Latte,1 Main St\n";

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("True"), Some(true));
        assert_eq!(parse_flag("0.0"), Some(false));
        assert_eq!(parse_flag("2"), None);
        assert_eq!(parse_flag(""), None);
    }

    #[test]
    fn test_catalog_with_categorical_price() {
        let dir = write_tables(
            "cafe_id,neighborhood,study_space,car_req,nondairy_charge,gluten_free,food_menu,price_point\n\
             0,downtown,1,0,1,0,1,mid\n",
            DESCRIPTORS,
            REFERENCES,
        );
        let source = CsvDataSource::from_dir(dir.path());
        let cafes = source.load_catalog().unwrap();

        assert_eq!(cafes.len(), 1);
        assert_eq!(cafes[0].price_tier, PriceTier::Mid);
        assert!(cafes[0].flag(BinaryAttribute::StudySpace));
        assert!(!cafes[0].flag(BinaryAttribute::CarReq));
        assert_eq!(cafes[0].categorical.get("neighborhood").map(String::as_str), Some("downtown"));
        assert!(!cafes[0].categorical.contains_key("price_point"));
    }

    #[test]
    fn test_catalog_with_price_indicators() {
        let dir = write_tables(
            "cafe_id,study_space,car_req,nondairy_charge,gluten_free,food_menu,price_point_mid,price_point_high\n\
             0,0,0,0,0,0,0,1\n",
            DESCRIPTORS,
            REFERENCES,
        );
        let cafes = CsvDataSource::from_dir(dir.path()).load_catalog().unwrap();
        assert_eq!(cafes[0].price_tier, PriceTier::High);
        assert!(cafes[0].categorical.is_empty());
    }

    #[test]
    fn test_catalog_conflicting_price_indicators() {
        let dir = write_tables(
            "cafe_id,study_space,car_req,nondairy_charge,gluten_free,food_menu,price_point_mid,price_point_high\n\
             0,0,0,0,0,0,1,1\n",
            DESCRIPTORS,
            REFERENCES,
        );
        let err = CsvDataSource::from_dir(dir.path()).load_catalog().unwrap_err();
        assert!(matches!(err, ProviderError::ParseError(_)));
    }

    #[test]
    fn test_catalog_missing_binary_column() {
        let dir = write_tables(
            "cafe_id,study_space,car_req,nondairy_charge,food_menu,price_point\n0,0,0,0,0,low\n",
            DESCRIPTORS,
            REFERENCES,
        );
        let err = CsvDataSource::from_dir(dir.path()).load_catalog().unwrap_err();
        match err {
            ProviderError::MissingColumn(msg) => assert!(msg.contains("gluten_free")),
            other => panic!("Expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_catalog_non_binary_value() {
        let dir = write_tables(
            "cafe_id,study_space,car_req,nondairy_charge,gluten_free,food_menu,price_point\n0,yes,0,0,0,0,low\n",
            DESCRIPTORS,
            REFERENCES,
        );
        assert!(CsvDataSource::from_dir(dir.path()).load_catalog().is_err());
    }

    #[test]
    fn test_descriptors_empty_cells() {
        let dir = write_tables("", DESCRIPTORS, REFERENCES);
        let rows = CsvDataSource::from_dir(dir.path()).load_descriptors().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].atmosphere_desc.as_deref(), Some("cozy"));
        assert_eq!(rows[1].atmosphere_desc, None);
        assert_eq!(rows[1].specials_desc.as_deref(), Some("sweet"));
    }

    #[test]
    fn test_references_carry_extra_columns() {
        let dir = write_tables("", DESCRIPTORS, REFERENCES);
        let refs = CsvDataSource::from_dir(dir.path()).load_references().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].cafe_name, "Bean There");
        assert_eq!(refs[0].specials, "Hazelnut Latte");
        assert_eq!(refs[0].extra.get("address").map(String::as_str), Some("1 Main St"));
        assert!(refs[0].asset.is_none());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = CsvDataSource::from_dir(dir.path()).load_catalog().unwrap_err();
        assert!(matches!(err, ProviderError::IoError(_)));
    }
}

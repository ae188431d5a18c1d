//! Data source module.
//!
//! This module defines the interface for loading the three read-only tables
//! the recommender works from (catalog, descriptors, references) and includes
//! a CSV implementation.
//!
//! The `DataSource` trait abstracts where the tables come from, so the
//! recommender can be driven by files on disk in production and by in-memory
//! fixtures in tests without coupling to either.

use thiserror::Error;

use crate::models::{Cafe, DescriptorRecord, ReferenceRecord};

pub mod csv_file;

pub use csv_file::CsvDataSource;

/// Errors that can occur when reading a table from a data source.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Failed to read from the data source
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the data format
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A required column is absent from a table header
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Other source-specific errors
    #[error("Provider error: {0}")]
    Other(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// The three raw tables, exactly as read from a source.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub catalog: Vec<Cafe>,
    pub descriptors: Vec<DescriptorRecord>,
    pub references: Vec<ReferenceRecord>,
}

/// Trait for sources of catalog, descriptor and reference data.
///
/// # Design Notes
///
/// - Sources are read-only; nothing in the crate writes back
/// - Rows are returned in source order, which the ranking tie-breaks rely on
/// - Cross-table consistency is not the source's job; `Catalog` validates it
pub trait DataSource: Send + Sync {
    /// Load every catalog entry.
    ///
    /// # Errors
    /// Returns `ProviderError` if the table cannot be read or a row is malformed
    fn load_catalog(&self) -> ProviderResult<Vec<Cafe>>;

    /// Load every descriptor row.
    ///
    /// # Errors
    /// Returns `ProviderError` if the table cannot be read or a row is malformed
    fn load_descriptors(&self) -> ProviderResult<Vec<DescriptorRecord>>;

    /// Load every reference record.
    ///
    /// # Errors
    /// Returns `ProviderError` if the table cannot be read or a row is malformed
    fn load_references(&self) -> ProviderResult<Vec<ReferenceRecord>>;

    /// Load all three tables in one call.
    fn load_all(&self) -> ProviderResult<RawTables> {
        Ok(RawTables {
            catalog: self.load_catalog()?,
            descriptors: self.load_descriptors()?,
            references: self.load_references()?,
        })
    }

    /// Get a human-readable name/description of this source.
    ///
    /// This is useful for logging and debugging.
    fn name(&self) -> &str;
}

impl<T: DataSource + ?Sized> DataSource for std::sync::Arc<T> {
    fn load_catalog(&self) -> ProviderResult<Vec<Cafe>> {
        (**self).load_catalog()
    }

    fn load_descriptors(&self) -> ProviderResult<Vec<DescriptorRecord>> {
        (**self).load_descriptors()
    }

    fn load_references(&self) -> ProviderResult<Vec<ReferenceRecord>> {
        (**self).load_references()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

//! Named feature columns.

use std::collections::HashMap;

use super::{EncodingError, EncodingResult};

/// An ordered list of uniquely named feature columns.
///
/// Vectors are always paired with a schema; two vectors are compared by
/// projecting one schema onto the other by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema, rejecting duplicate column names.
    ///
    /// # Errors
    /// Returns `EncodingError::SchemaMismatch` naming the first duplicate
    pub fn new(columns: Vec<String>) -> EncodingResult<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(EncodingError::SchemaMismatch(format!(
                    "column '{}' appears more than once",
                    name
                )));
            }
        }
        Ok(Self { columns, index })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// For every column of `target`, its position in `self`.
    ///
    /// # Errors
    /// Returns `EncodingError::SchemaMismatch` listing the `target` columns
    /// that `self` lacks
    pub fn projection(&self, target: &FeatureSchema) -> EncodingResult<Vec<usize>> {
        let mut positions = Vec::with_capacity(target.len());
        let mut missing = Vec::new();
        for column in &target.columns {
            match self.position(column) {
                Some(pos) => positions.push(pos),
                None => missing.push(column.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(EncodingError::SchemaMismatch(format!(
                "columns missing from source schema: {}",
                missing.join(", ")
            )));
        }
        Ok(positions)
    }

    /// Check that `values` has one entry per column.
    pub fn check(&self, values: &[f32]) -> EncodingResult<()> {
        if values.len() != self.len() {
            return Err(EncodingError::DimensionMismatch {
                expected: self.len(),
                actual: values.len(),
            });
        }
        Ok(())
    }
}

//! Feature encoding.
//!
//! This module turns catalog entries and user answers into comparable numeric
//! vectors:
//!
//! - `top_descriptors` ranks a café's descriptor tags by frequency
//! - `TagVocabulary` is a fitted multi-label binarizer over those tags
//! - `OneHotEncoder` encodes the catalog's categorical columns
//! - `FeatureSchema` names every column so catalog and user vectors are
//!   aligned by name rather than position
//! - `FeatureModel` bundles all of the above, fitted once per data snapshot
//!
//! Tags are normalized with [`normalize_text`] both when fitting and when
//! encoding user answers, so "Cozy " and "cozy" are the same tag.

pub mod model;
pub mod one_hot;
pub mod schema;
pub mod vocabulary;

pub use model::{FeatureModel, FeatureRow, UserEncoding};
pub use one_hot::OneHotEncoder;
pub use schema::FeatureSchema;
pub use vocabulary::{MultiHot, TagVocabulary};

use std::collections::HashMap;

use thiserror::Error;

use crate::models::DescriptorRecord;

/// Number of most frequent tags kept per café and tag type.
pub const TOP_DESCRIPTORS: usize = 3;

/// Errors that can occur while fitting or applying encoders.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Two vectors or schemas disagree on their columns
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A vector does not have its schema's length
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type for encoding operations.
pub type EncodingResult<T> = Result<T, EncodingError>;

/// The two free-text descriptor families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Atmosphere,
    Specials,
}

impl TagKind {
    /// Column-name prefix of this tag family in a feature schema.
    pub fn prefix(self) -> &'static str {
        match self {
            TagKind::Atmosphere => "atmosphere",
            TagKind::Specials => "specials",
        }
    }

    /// The tag of this family on a descriptor row, if the cell was filled.
    pub fn tag_of(self, row: &DescriptorRecord) -> Option<&str> {
        match self {
            TagKind::Atmosphere => row.atmosphere_desc.as_deref(),
            TagKind::Specials => row.specials_desc.as_deref(),
        }
    }

    /// Schema column name for `tag`.
    pub fn column(self, tag: &str) -> String {
        format!("{}:{}", self.prefix(), tag)
    }
}

/// Normalizes text for consistent tag matching.
///
/// This function applies the following transformations:
/// - Converts to lowercase
/// - Trims leading/trailing whitespace
/// - Collapses multiple consecutive spaces to a single space
///
/// # Example
/// ```
/// use cafe_recommender::encoding::normalize_text;
/// assert_eq!(normalize_text("  Hole   in the Wall "), "hole in the wall");
/// ```
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The `TOP_DESCRIPTORS` most frequent tags of one family across `rows`.
///
/// Tags are normalized before counting. Sorted by count descending; equal
/// counts keep the order in which the tag first appeared in `rows`.
pub fn top_descriptors(rows: &[DescriptorRecord], kind: TagKind) -> Vec<String> {
    // tag -> (count, first-seen position)
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (pos, row) in rows.iter().enumerate() {
        let Some(raw) = kind.tag_of(row) else { continue };
        let tag = normalize_text(raw);
        if tag.is_empty() {
            continue;
        }
        counts.entry(tag).or_insert((0, pos)).0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(tag, (count, first))| (tag, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(TOP_DESCRIPTORS)
        .map(|(tag, _, _)| tag)
        .collect()
}

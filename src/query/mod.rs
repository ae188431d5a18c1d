//! Recommendation processing and ranking module.
//!
//! This module validates a user's answers, applies the hard filters, scores
//! the surviving cafés by cosine similarity against the user vector, and
//! returns the best match. It coordinates between the data source, the
//! fitted `FeatureModel`, and the catalog's reference records.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use cafe_recommender::provider::CsvDataSource;
//! use cafe_recommender::query::{BruteForceRecommender, Recommender};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let recommender = BruteForceRecommender::new(CsvDataSource::from_dir("data"));
//!
//! let general: BTreeMap<String, i64> = [
//!     ("study_space", 1), ("car_req", 0), ("nondairy_charge", 1), ("gluten_free", 0),
//!     ("food_menu", 0), ("price_point_mid", 1), ("price_point_high", 0),
//! ]
//! .into_iter()
//! .map(|(k, v)| (k.to_string(), v))
//! .collect();
//!
//! let top = recommender.recommend_raw(
//!     &general,
//!     vec!["cozy".into(), "modern".into(), "local".into()],
//!     vec!["nutty".into(), "sweet".into(), "rich".into()],
//! )?;
//! println!("Try {} at {}", top.record.specials, top.record.cafe_name);
//! # Ok(())
//! # }
//! ```

pub mod filters;
pub mod preferences;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::cache::ModelHandle;
use crate::catalog::Catalog;
use crate::encoding::FeatureModel;
use crate::models::{Recommendation, ScoredCandidate};
use crate::provider::DataSource;

pub use filters::HardFilters;
pub use preferences::{GeneralPreferences, UserPreferences, GENERAL_KEYS, TAGS_PER_FAMILY};

/// Errors that can occur while producing a recommendation.
#[derive(Debug, Error)]
pub enum RecommendError {
    /// Malformed or incomplete preference payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The hard filters eliminated every café
    #[error("No café satisfies the hard requirements")]
    EmptyCandidateSet,

    /// Source data missing, corrupt or inconsistent
    #[error("Data load error: {0}")]
    DataLoadError(String),

    /// User tags outside the fitted vocabulary, under the reject policy
    #[error("Unknown tags: {0}")]
    VocabularyMismatch(String),
}

/// Result type for recommendation operations.
pub type RecommendResult<T> = Result<T, RecommendError>;

/// What to do with user tags the fitted vocabulary does not contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTagPolicy {
    /// Encode the tag as all zeros and carry on
    #[default]
    Ignore,
    /// Fail with `RecommendError::VocabularyMismatch`
    Reject,
}

impl FromStr for UnknownTagPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(UnknownTagPolicy::Ignore),
            "reject" => Ok(UnknownTagPolicy::Reject),
            other => Err(format!("unknown tag policy '{}' (expected ignore or reject)", other)),
        }
    }
}

/// Per-engine settings shared by every recommender.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendOptions {
    pub unknown_tags: UnknownTagPolicy,

    /// Directory display assets are resolved under
    pub asset_dir: Option<PathBuf>,
}

/// Trait for recommendation engines.
///
/// Implementations differ only in where their `FeatureModel` comes from; the
/// filtering, scoring and tie-breaking rules are the same for all of them.
pub trait Recommender: Send + Sync {
    /// Score every café that survives the hard filters.
    ///
    /// # Returns
    /// Candidates sorted by descending similarity; equal scores keep catalog order
    ///
    /// # Errors
    /// Returns `RecommendError` if the data cannot be loaded, the filters leave
    /// no candidate, or unknown tags are rejected
    fn rank(&self, prefs: &UserPreferences) -> RecommendResult<Vec<ScoredCandidate>>;

    /// The single best match for `prefs`.
    fn recommend(&self, prefs: &UserPreferences) -> RecommendResult<Recommendation>;

    /// Validate a raw payload and recommend.
    ///
    /// # Errors
    /// Returns `RecommendError::InvalidInput` if the payload is malformed, or any
    /// error `recommend` returns
    fn recommend_raw(
        &self,
        general: &BTreeMap<String, i64>,
        atmosphere: Vec<String>,
        specials: Vec<String>,
    ) -> RecommendResult<Recommendation> {
        let prefs = UserPreferences::from_parts(general, atmosphere, specials)?;
        self.recommend(&prefs)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Cosine similarity is the cosine of the angle between two vectors. It ranges
/// from -1 to 1, where 1 means the vectors point in the same direction. It is
/// defined here as 0 when either vector has zero magnitude.
///
/// Both vectors must have the same length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have the same length");

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Load a catalog snapshot from `source` and fit a feature model on it.
///
/// # Errors
/// Returns `RecommendError::DataLoadError` for unreadable, inconsistent or
/// unencodable data
pub fn load_model<D: DataSource + ?Sized>(source: &D) -> RecommendResult<FeatureModel> {
    let catalog =
        Catalog::load(source).map_err(|e| RecommendError::DataLoadError(e.to_string()))?;
    FeatureModel::fit(catalog).map_err(|e| RecommendError::DataLoadError(e.to_string()))
}

/// Filter and score against an already fitted model.
pub fn rank_candidates(
    model: &FeatureModel,
    prefs: &UserPreferences,
    policy: UnknownTagPolicy,
) -> RecommendResult<Vec<ScoredCandidate>> {
    // 1. Encode the user's answers in the shared column space
    let user = model
        .encode_user(prefs)
        .map_err(|e| RecommendError::DataLoadError(e.to_string()))?;

    if user.has_unknown_tags() {
        let unknown: Vec<String> = user
            .unknown_atmosphere
            .iter()
            .map(|t| format!("atmosphere '{}'", t))
            .chain(user.unknown_specials.iter().map(|t| format!("specials '{}'", t)))
            .collect();
        match policy {
            UnknownTagPolicy::Reject => {
                return Err(RecommendError::VocabularyMismatch(unknown.join(", ")));
            }
            UnknownTagPolicy::Ignore => {
                debug!("Ignoring tags outside the fitted vocabulary: {}", unknown.join(", "));
            }
        }
    }

    // 2. Apply the hard filters, keeping catalog order
    let filters = HardFilters::from_preferences(&prefs.general);
    let survivors: Vec<_> = model
        .rows()
        .iter()
        .zip(model.catalog().cafes())
        .filter(|(_, cafe)| filters.admits(cafe))
        .map(|(row, _)| row)
        .collect();

    debug!(
        "Hard filters {:?} kept {} of {} cafés",
        filters.active(),
        survivors.len(),
        model.rows().len()
    );

    if survivors.is_empty() {
        return Err(RecommendError::EmptyCandidateSet);
    }

    // 3. Compute cosine similarity over the shared columns
    let mut results: Vec<ScoredCandidate> = survivors
        .into_iter()
        .map(|row| {
            let cafe_id = row.cafe_id();
            let shared = model.shared_values(cafe_id).ok_or_else(|| {
                RecommendError::DataLoadError(format!("no encoded row for cafe_id {}", cafe_id))
            })?;
            Ok(ScoredCandidate { cafe_id, score: cosine_similarity(&user.values, &shared) })
        })
        .collect::<RecommendResult<_>>()?;

    // 4. Sort by similarity score (descending); the sort is stable, so ties keep catalog order
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    Ok(results)
}

/// The best match against an already fitted model.
pub fn top_match(
    model: &FeatureModel,
    prefs: &UserPreferences,
    options: &RecommendOptions,
) -> RecommendResult<Recommendation> {
    let ranked = rank_candidates(model, prefs, options.unknown_tags)?;
    let best = ranked.first().ok_or(RecommendError::EmptyCandidateSet)?;

    let record = model
        .catalog()
        .reference_with_asset(best.cafe_id, options.asset_dir.as_deref())
        .ok_or_else(|| {
            RecommendError::DataLoadError(format!("no reference record for cafe_id {}", best.cafe_id))
        })?;

    debug!("Top match: {} (cafe_id {}, score {:.4})", record.cafe_name, best.cafe_id, best.score);

    Ok(Recommendation {
        record,
        score: best.score,
    })
}

/// Recommender that reloads the data and refits the model on every request.
///
/// Nothing is shared between calls, so edits to the source data are picked up
/// immediately. Suitable for the small, static catalogs this crate targets.
pub struct BruteForceRecommender<D>
where
    D: DataSource,
{
    /// Source of catalog, descriptor and reference data
    source: D,

    options: RecommendOptions,
}

impl<D> BruteForceRecommender<D>
where
    D: DataSource,
{
    /// Create a recommender with default options.
    pub fn new(source: D) -> Self {
        Self::with_options(source, RecommendOptions::default())
    }

    pub fn with_options(source: D, options: RecommendOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &RecommendOptions {
        &self.options
    }
}

impl<D> Recommender for BruteForceRecommender<D>
where
    D: DataSource,
{
    fn rank(&self, prefs: &UserPreferences) -> RecommendResult<Vec<ScoredCandidate>> {
        let model = load_model(&self.source)?;
        rank_candidates(&model, prefs, self.options.unknown_tags)
    }

    fn recommend(&self, prefs: &UserPreferences) -> RecommendResult<Recommendation> {
        let model = load_model(&self.source)?;
        top_match(&model, prefs, &self.options)
    }
}

/// Recommender that scores against a shared, cached `FeatureModel`.
///
/// Each request works on the snapshot current when it started; a concurrent
/// `ModelHandle::rebuild` never exposes a half-built model.
pub struct CachedRecommender {
    handle: Arc<ModelHandle>,
    options: RecommendOptions,
}

impl CachedRecommender {
    pub fn new(handle: Arc<ModelHandle>, options: RecommendOptions) -> Self {
        Self { handle, options }
    }

    pub fn handle(&self) -> &Arc<ModelHandle> {
        &self.handle
    }
}

impl Recommender for CachedRecommender {
    fn rank(&self, prefs: &UserPreferences) -> RecommendResult<Vec<ScoredCandidate>> {
        let model = self.handle.load();
        rank_candidates(&model, prefs, self.options.unknown_tags)
    }

    fn recommend(&self, prefs: &UserPreferences) -> RecommendResult<Recommendation> {
        let model = self.handle.load();
        top_match(&model, prefs, &self.options)
    }
}

//! Café Recommender - A questionnaire-driven recommendation engine for cafés.
//!
//! This library provides the core functionality for the café recommender,
//! which encodes a user's questionnaire answers and a small café catalog into
//! comparable feature vectors and returns the single best match.
//!
//! # Architecture
//!
//! The system is organized into several key modules:
//!
//! - **models**: Core data structures (Cafe, DescriptorRecord, ReferenceRecord, etc.)
//! - **provider**: Read-only access to the three source tables (CSV-based)
//! - **catalog**: Validated, immutable join of the source tables
//! - **encoding**: One-hot, multi-hot and schema alignment of feature vectors
//! - **query**: Preference validation, hard filters and similarity ranking
//! - **cache**: Atomically swappable fitted model for long-running hosts
//! - **config**: TOML engine configuration
//! - **api**: Request/response payloads for presentation layers
//!
//! # Workflow
//!
//! ## Model Fitting
//!
//! 1. Load the catalog, descriptor and reference tables
//! 2. Validate that the tables agree on `cafe_id`
//! 3. Derive each café's top three atmosphere and specials tags
//! 4. Fit the one-hot encoder and both tag vocabularies
//! 5. Encode every café into a catalog feature row
//!
//! ## Recommendation
//!
//! 1. Validate the user's answers and normalize their tags
//! 2. Encode the answers into the user feature vector
//! 3. Apply the hard filters (car, study space, gluten free, full meal)
//! 4. Compute cosine similarity over the shared columns
//! 5. Return the reference record of the best-scoring café
//!
//! # Example
//!
//! ```no_run
//! use cafe_recommender::{EngineConfig, GeneralPreferences, PriceTier, Recommender, UserPreferences};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let recommender = EngineConfig::default().build_recommender()?;
//!
//!     let general = GeneralPreferences {
//!         study_space: true,
//!         price_tier: PriceTier::Mid,
//!         ..Default::default()
//!     };
//!     let prefs = UserPreferences::new(
//!         general,
//!         vec!["cozy".into(), "local".into(), "modern".into()],
//!         vec!["nutty".into(), "sweet".into(), "rich".into()],
//!     )?;
//!
//!     let top = recommender.recommend(&prefs)?;
//!     println!("Your café recommendation is {}.", top.record.cafe_name);
//!     Ok(())
//! }
//! ```

// Public modules
pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod encoding;
pub mod models;
pub mod provider;
pub mod query;

// Re-export commonly used types at the crate root
pub use config::EngineConfig;
pub use models::{BinaryAttribute, Cafe, CafeId, PriceTier, Recommendation, ReferenceRecord};
pub use provider::{CsvDataSource, DataSource};
pub use query::{
    BruteForceRecommender, CachedRecommender, GeneralPreferences, RecommendError, Recommender,
    UnknownTagPolicy, UserPreferences,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Process-wide cache of the fitted feature model.
//!
//! Wraps a `FeatureModel` in an `ArcSwap` so readers never block and a rebuild
//! swaps the pointer atomically. A request keeps the `Arc` it loaded for its
//! whole duration, so a concurrent rebuild is invisible to it.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{info, warn};

use crate::encoding::FeatureModel;
use crate::provider::DataSource;
use crate::query::{load_model, RecommendResult};

/// Single-writer, multi-reader holder of the current feature model.
pub struct ModelHandle {
    inner: ArcSwap<FeatureModel>,
}

impl ModelHandle {
    /// Create a handle seeded with `model`.
    pub fn new(model: FeatureModel) -> Self {
        Self {
            inner: ArcSwap::from_pointee(model),
        }
    }

    /// Load `source` and fit the initial model.
    ///
    /// # Errors
    /// Returns `RecommendError::DataLoadError` if the data cannot be loaded or fitted
    pub fn build<D: DataSource + ?Sized>(source: &D) -> RecommendResult<Self> {
        Ok(Self::new(load_model(source)?))
    }

    /// Return a clone of the current `Arc<FeatureModel>`.
    pub fn load(&self) -> Arc<FeatureModel> {
        self.inner.load_full()
    }

    /// Reload `source`, refit, and atomically swap in the new model.
    ///
    /// The new model is fully built before the swap. On error the current model
    /// stays active and the error is returned.
    pub fn rebuild<D: DataSource + ?Sized>(&self, source: &D) -> RecommendResult<()> {
        match load_model(source) {
            Ok(model) => {
                let cafes = model.rows().len();
                self.inner.store(Arc::new(model));
                info!("Feature model rebuilt from {} ({} cafés)", source.name(), cafes);
                Ok(())
            }
            Err(e) => {
                warn!("Feature model rebuild failed, keeping previous model: {}", e);
                Err(e)
            }
        }
    }

    /// Manually swap in a new model.
    pub fn store(&self, model: FeatureModel) {
        self.inner.store(Arc::new(model));
    }
}

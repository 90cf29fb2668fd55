//! Category → composer routing.

use std::collections::HashMap;
use std::sync::Arc;

use domain::{Outcome, ProcessCategory, ProcessFailure, ProcessResult};

use crate::composer::{Composer, ShipmentComposer};

/// Registered composers, one per process category.
pub struct ComposerRegistry {
    composers: HashMap<ProcessCategory, Arc<dyn Composer>>,
}

impl Default for ComposerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ComposerRegistry {
    pub fn empty() -> Self {
        Self {
            composers: HashMap::new(),
        }
    }

    /// A [`ShipmentComposer`] for every category.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for category in ProcessCategory::ALL {
            registry.register(Arc::new(ShipmentComposer::for_category(category)));
        }
        registry
    }

    /// Registers `composer` for its category, replacing any previous one.
    pub fn register(&mut self, composer: Arc<dyn Composer>) {
        self.composers.insert(composer.category(), composer);
    }

    pub fn categories(&self) -> Vec<ProcessCategory> {
        let mut categories: Vec<_> = self.composers.keys().copied().collect();
        categories.sort_by_key(|c| c.as_str());
        categories
    }

    /// Looks up the composer for a journaled category name.
    ///
    /// Unknown names and unregistered categories are an
    /// inconsistent-internal-state failure.
    pub fn route(&self, name: &str) -> ProcessResult<Arc<dyn Composer>> {
        let composer = name
            .parse::<ProcessCategory>()
            .ok()
            .and_then(|category| self.composers.get(&category).cloned());

        match composer {
            Some(composer) => Outcome::success(composer),
            None => {
                tracing::warn!(category = name, "no composer registered");
                Outcome::failure(ProcessFailure::inconsistent_internal_state(format!(
                    "No implementation found for process category '{name}'"
                )))
            }
        }
    }
}

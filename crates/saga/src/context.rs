//! What a running process instance can reach.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::aggregate::instance_id_for;
use crate::journal::Journal;
use crate::registry::ComposerRegistry;
use crate::services::Services;
use crate::settings::EngineSettings;

/// Correlation scope of a (child) process.
///
/// The root scope of shipment `42` is `42_process`; its children are
/// `42_{role}`, and a child's children append to the child's id
/// (`42_manifestation_leg1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    id: String,
    prefix: String,
}

impl Scope {
    pub fn root(shipment_id: &str) -> Self {
        Self {
            id: instance_id_for(shipment_id),
            prefix: shipment_id.to_string(),
        }
    }

    pub fn child(&self, role: &str) -> Self {
        let id = format!("{}_{role}", self.prefix);
        Self {
            prefix: id.clone(),
            id,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Everything one activation of an instance runs against.
pub struct ProcessContext {
    journal: Journal,
    services: Services,
    settings: Arc<EngineSettings>,
    registry: Arc<ComposerRegistry>,
}

impl ProcessContext {
    pub fn new(
        journal: Journal,
        services: Services,
        settings: Arc<EngineSettings>,
        registry: Arc<ComposerRegistry>,
    ) -> Self {
        Self {
            journal,
            services,
            settings,
            registry,
        }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ComposerRegistry {
        &self.registry
    }

    /// The engine clock. Only read inside journaled stages.
    pub fn now(&self) -> DateTime<Utc> {
        self.journal.scheduler().now()
    }
}

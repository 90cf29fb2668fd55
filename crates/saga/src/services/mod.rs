//! Collaborator services the composed stages call.
//!
//! Each collaborator is a trait with an in-memory implementation that
//! mimics the remote system: deterministic fail rules keyed on the
//! shipment id, call counters, and switches tests use to inject outages.

pub mod carrier;
pub mod collection;
pub mod documents;

use std::sync::Arc;

pub use carrier::{CarrierService, InMemoryCarrierService};
pub use collection::{CollectionService, InMemoryCollectionService};
pub use documents::{DocumentRequest, DocumentService, InMemoryDocumentService};

/// The collaborators a process instance is wired to.
#[derive(Clone)]
pub struct Services {
    pub carrier: Arc<dyn CarrierService>,
    pub documents: Arc<dyn DocumentService>,
    pub collection: Arc<dyn CollectionService>,
}

impl Services {
    pub fn new(
        carrier: Arc<dyn CarrierService>,
        documents: Arc<dyn DocumentService>,
        collection: Arc<dyn CollectionService>,
    ) -> Self {
        Self {
            carrier,
            documents,
            collection,
        }
    }

    /// Wires fresh in-memory stubs.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryCarrierService::new()),
            Arc::new(InMemoryDocumentService::new()),
            Arc::new(InMemoryCollectionService::new()),
        )
    }
}

/// Shared outage switch: the next `n` calls fail as unavailable.
#[derive(Debug, Default)]
pub(crate) struct Outages(std::sync::atomic::AtomicUsize);

impl Outages {
    pub(crate) fn set(&self, calls: usize) {
        self.0.store(calls, std::sync::atomic::Ordering::SeqCst);
    }

    /// Consumes one outage, returning true if this call should fail.
    pub(crate) fn take(&self) -> bool {
        use std::sync::atomic::Ordering;
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

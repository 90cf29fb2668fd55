//! Document service trait and in-memory implementation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use domain::shipment::DOCUMENT_BASE_URL;
use domain::{DocumentKind, Fault, ManifestedShipment};

use super::Outages;
use crate::invoker::StepError;

/// What a document generator needs to know about a shipment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    pub shipment_id: String,
    pub carrier_ids: Vec<String>,
}

impl From<&ManifestedShipment> for DocumentRequest {
    fn from(shipment: &ManifestedShipment) -> Self {
        Self {
            shipment_id: shipment.id.clone(),
            carrier_ids: shipment
                .legs
                .iter()
                .map(|l| l.leg.carrier_id.clone())
                .collect(),
        }
    }
}

#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Generates one document and returns its URL.
    async fn generate(
        &self,
        kind: DocumentKind,
        request: &DocumentRequest,
    ) -> Result<String, StepError>;
}

#[derive(Debug, Default)]
struct InMemoryDocumentState {
    calls: AtomicUsize,
    outages: Outages,
    refused: RwLock<Vec<DocumentKind>>,
}

/// In-memory document store. URLs are `{base}/{shipmentId}_{suffix}`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentService {
    state: Arc<InMemoryDocumentState>,
}

impl InMemoryDocumentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses every request for documents of `kind`.
    pub fn refuse(&self, kind: DocumentKind) {
        self.state
            .refused
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(kind);
    }

    pub fn fail_next(&self, calls: usize) {
        self.state.outages.set(calls);
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentService for InMemoryDocumentService {
    async fn generate(
        &self,
        kind: DocumentKind,
        request: &DocumentRequest,
    ) -> Result<String, StepError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);

        if self.state.outages.take() {
            return Err(StepError::Unavailable("document store unreachable".to_string()));
        }

        let refused = self
            .state
            .refused
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&kind);
        if refused {
            return Err(StepError::Rejected(Fault::general(
                "Document generation failed",
                vec![format!("Could not generate {kind}")],
            )));
        }

        Ok(format!(
            "{DOCUMENT_BASE_URL}/{}_{}",
            request.shipment_id,
            kind.suffix()
        ))
    }
}

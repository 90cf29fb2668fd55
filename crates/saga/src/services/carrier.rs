//! Carrier service trait and in-memory implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use domain::shipment::DOCUMENT_BASE_URL;
use domain::{CollectionBooking, Fault, Leg, ManifestedLeg, ManifestedShipment};
use uuid::Uuid;

use super::Outages;
use crate::invoker::StepError;

/// Carrier-facing operations.
#[async_trait]
pub trait CarrierService: Send + Sync {
    /// Registers one leg with its carrier, returning tracking numbers and
    /// the labels document.
    async fn manifest_leg(&self, shipment_id: &str, leg: &Leg) -> Result<ManifestedLeg, StepError>;

    /// Books the collection of a manifested shipment with the carrier of `leg`.
    async fn book_collection(
        &self,
        shipment: &ManifestedShipment,
        leg: &ManifestedLeg,
    ) -> Result<CollectionBooking, StepError>;
}

#[derive(Debug, Default)]
struct InMemoryCarrierState {
    manifest_calls: AtomicUsize,
    booking_calls: AtomicUsize,
    outages: Outages,
}

/// In-memory carrier.
///
/// Manifestation is refused for shipment ids ending in `1`; booking is
/// refused for ids ending in `2`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCarrierService {
    state: Arc<InMemoryCarrierState>,
}

impl InMemoryCarrierService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `calls` calls fail as unavailable.
    pub fn fail_next(&self, calls: usize) {
        self.state.outages.set(calls);
    }

    /// Manifest attempts made so far, retries included.
    pub fn manifest_calls(&self) -> usize {
        self.state.manifest_calls.load(Ordering::SeqCst)
    }

    pub fn booking_calls(&self) -> usize {
        self.state.booking_calls.load(Ordering::SeqCst)
    }
}

fn reference() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl CarrierService for InMemoryCarrierService {
    async fn manifest_leg(&self, shipment_id: &str, leg: &Leg) -> Result<ManifestedLeg, StepError> {
        self.state.manifest_calls.fetch_add(1, Ordering::SeqCst);

        if self.state.outages.take() {
            return Err(StepError::Unavailable("carrier unreachable".to_string()));
        }

        if shipment_id.ends_with('1') {
            return Err(StepError::Rejected(Fault::general(
                "Carrier manifestation failed",
                vec![
                    "1.2.3: Address line 1 missing".to_string(),
                    "1.2.5: Postal code missing".to_string(),
                ],
            )));
        }

        tracing::debug!(shipment_id, carrier_id = %leg.carrier_id, "leg manifested");
        Ok(ManifestedLeg {
            leg: leg.clone(),
            tracking_numbers: vec![reference(), reference()],
            labels_document_url: format!(
                "{DOCUMENT_BASE_URL}/{shipment_id}_{}",
                leg.carrier_id
            ),
        })
    }

    async fn book_collection(
        &self,
        shipment: &ManifestedShipment,
        leg: &ManifestedLeg,
    ) -> Result<CollectionBooking, StepError> {
        self.state.booking_calls.fetch_add(1, Ordering::SeqCst);

        if self.state.outages.take() {
            return Err(StepError::Unavailable("carrier unreachable".to_string()));
        }

        if shipment.id.ends_with('2') {
            return Err(StepError::Rejected(Fault::general(
                "Carrier collection booking failed",
                vec!["2.3.4: Collection not possible on the requested day".to_string()],
            )));
        }

        tracing::debug!(shipment_id = %shipment.id, carrier_id = %leg.leg.carrier_id, "collection booked");
        Ok(CollectionBooking {
            carrier_id: leg.leg.carrier_id.clone(),
            booking_reference: reference(),
            location_reference: reference(),
        })
    }
}

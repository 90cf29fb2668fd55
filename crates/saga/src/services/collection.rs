//! Collection planning service trait and in-memory implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use domain::{CollectionEligibility, CollectionSchedule, Fault, ManifestedLeg, ManifestedShipment};

use super::Outages;
use crate::invoker::StepError;

/// Default wait between planning a collection and booking it, in seconds.
pub const DEFAULT_BOOKING_DELAY_SECS: i64 = 5;

/// Decides whether and when a shipment's collection is booked.
#[async_trait]
pub trait CollectionService: Send + Sync {
    async fn check_eligibility(
        &self,
        shipment: &ManifestedShipment,
        leg: &ManifestedLeg,
        now: DateTime<Utc>,
    ) -> Result<CollectionEligibility, StepError>;

    /// Picks the instant at which the carrier booking should be made.
    async fn schedule(
        &self,
        shipment: &ManifestedShipment,
        leg: &ManifestedLeg,
        now: DateTime<Utc>,
    ) -> Result<CollectionSchedule, StepError>;
}

#[derive(Debug)]
struct InMemoryCollectionState {
    booking_delay: Duration,
    calls: AtomicUsize,
    ineligible: AtomicBool,
    outages: Outages,
}

/// In-memory planner that books `booking_delay` after scheduling.
#[derive(Debug, Clone)]
pub struct InMemoryCollectionService {
    state: Arc<InMemoryCollectionState>,
}

impl Default for InMemoryCollectionService {
    fn default() -> Self {
        Self::with_booking_delay(Duration::seconds(DEFAULT_BOOKING_DELAY_SECS))
    }
}

impl InMemoryCollectionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_booking_delay(booking_delay: Duration) -> Self {
        Self {
            state: Arc::new(InMemoryCollectionState {
                booking_delay,
                calls: AtomicUsize::new(0),
                ineligible: AtomicBool::new(false),
                outages: Outages::default(),
            }),
        }
    }

    /// Makes every eligibility check fail validation.
    pub fn set_ineligible(&self, ineligible: bool) {
        self.state.ineligible.store(ineligible, Ordering::SeqCst);
    }

    pub fn fail_next(&self, calls: usize) {
        self.state.outages.set(calls);
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn booking_delay(&self) -> Duration {
        self.state.booking_delay
    }
}

#[async_trait]
impl CollectionService for InMemoryCollectionService {
    async fn check_eligibility(
        &self,
        _shipment: &ManifestedShipment,
        leg: &ManifestedLeg,
        now: DateTime<Utc>,
    ) -> Result<CollectionEligibility, StepError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);

        if self.state.outages.take() {
            return Err(StepError::Unavailable("planner unreachable".to_string()));
        }

        if self.state.ineligible.load(Ordering::SeqCst) {
            return Err(StepError::Validation(Fault::validation(
                "Shipment cannot be scheduled for collection booking",
                vec!["3.4.5 Missed booking cut-off time".to_string()],
            )));
        }

        Ok(CollectionEligibility {
            carrier_id: leg.leg.carrier_id.clone(),
            checked_at: now,
        })
    }

    async fn schedule(
        &self,
        shipment: &ManifestedShipment,
        leg: &ManifestedLeg,
        now: DateTime<Utc>,
    ) -> Result<CollectionSchedule, StepError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);

        if self.state.outages.take() {
            return Err(StepError::Unavailable("planner unreachable".to_string()));
        }

        let book_at = now + self.state.booking_delay;
        tracing::debug!(shipment_id = %shipment.id, %book_at, "collection booking scheduled");
        Ok(CollectionSchedule {
            shipment_id: shipment.id.clone(),
            carrier_id: leg.leg.carrier_id.clone(),
            book_at,
            due: book_at <= now,
        })
    }
}

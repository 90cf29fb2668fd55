use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Proof that the primary leg passed the collection planning checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEligibility {
    pub carrier_id: String,
    pub checked_at: DateTime<Utc>,
}

/// When the carrier booking for a shipment should be made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSchedule {
    pub shipment_id: String,
    pub carrier_id: String,
    pub book_at: DateTime<Utc>,
    /// The booking may be made right away, without waiting for `book_at`.
    pub due: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionBooking {
    pub carrier_id: String,
    pub booking_reference: String,
    pub location_reference: String,
}

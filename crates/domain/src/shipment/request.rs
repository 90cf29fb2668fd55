use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One carrier hop of a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub carrier_id: String,
    pub sender: String,
    pub receiver: String,
    pub collection_location: String,
}

impl Leg {
    pub fn new(
        carrier_id: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        collection_location: impl Into<String>,
    ) -> Self {
        Self {
            carrier_id: carrier_id.into(),
            sender: sender.into(),
            receiver: receiver.into(),
            collection_location: collection_location.into(),
        }
    }
}

/// Request to fulfil a shipment.
///
/// Plain data: an empty id or a wrong number of legs is representable so
/// that it can be rejected by [`validate`](super::validate) with a readable
/// fault instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub id: String,
    #[serde(default)]
    pub legs: Vec<Leg>,
    pub collection_date: NaiveDate,
    pub time_zone: String,
}

impl ProcessRequest {
    pub fn new(
        id: impl Into<String>,
        legs: Vec<Leg>,
        collection_date: NaiveDate,
        time_zone: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            legs,
            collection_date,
            time_zone: time_zone.into(),
        }
    }

    /// The leg whose collection gets booked.
    pub fn primary_leg(&self) -> Option<&Leg> {
        self.legs.first()
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::request::{Leg, ProcessRequest};

/// A leg accepted by its carrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestedLeg {
    #[serde(flatten)]
    pub leg: Leg,
    pub tracking_numbers: Vec<String>,
    pub labels_document_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestedShipment {
    pub id: String,
    pub legs: Vec<ManifestedLeg>,
    pub collection_date: NaiveDate,
    pub time_zone: String,
}

impl ManifestedShipment {
    /// Combines a request with its manifested legs, in leg order.
    pub fn from_request(request: &ProcessRequest, legs: Vec<ManifestedLeg>) -> Self {
        Self {
            id: request.id.clone(),
            legs,
            collection_date: request.collection_date,
            time_zone: request.time_zone.clone(),
        }
    }

    pub fn primary_leg(&self) -> Option<&ManifestedLeg> {
        self.legs.first()
    }
}

use serde::{Deserialize, Serialize};

use super::{
    collection::CollectionBooking,
    documents::ShipmentDocuments,
    manifest::{ManifestedLeg, ManifestedShipment},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestedLegOutcome {
    pub carrier_id: String,
    pub tracking_numbers: Vec<String>,
    pub labels_url: String,
}

impl From<&ManifestedLeg> for ManifestedLegOutcome {
    fn from(leg: &ManifestedLeg) -> Self {
        Self {
            carrier_id: leg.leg.carrier_id.clone(),
            tracking_numbers: leg.tracking_numbers.clone(),
            labels_url: leg.labels_document_url.clone(),
        }
    }
}

/// Everything a successfully fulfilled shipment produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub id: String,
    pub manifested_legs: Vec<ManifestedLegOutcome>,
    pub documents: ShipmentDocuments,
    pub collection_booking: CollectionBooking,
}

impl ProcessOutcome {
    pub fn assemble(
        shipment: &ManifestedShipment,
        documents: ShipmentDocuments,
        collection_booking: CollectionBooking,
    ) -> Self {
        Self {
            id: shipment.id.clone(),
            manifested_legs: shipment.legs.iter().map(ManifestedLegOutcome::from).collect(),
            documents,
            collection_booking,
        }
    }
}

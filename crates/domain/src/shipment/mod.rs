//! Shipment fulfilment data and the pure decisions made about it.

mod category;
mod collection;
mod completed;
mod documents;
mod manifest;
mod request;
mod validation;

pub use category::{ProcessCategory, classify};
pub use collection::{CollectionBooking, CollectionEligibility, CollectionSchedule};
pub use completed::{ManifestedLegOutcome, ProcessOutcome};
pub use documents::{DocumentKind, PaperlessTradeDocuments, ShipmentDocuments};
pub use manifest::{ManifestedLeg, ManifestedShipment};
pub use request::{Leg, ProcessRequest};
pub use validation::{INVALID_REQUEST, validate};

/// Base URL of the stub document store.
pub const DOCUMENT_BASE_URL: &str = "http://somewhere.net/shipment-documents";

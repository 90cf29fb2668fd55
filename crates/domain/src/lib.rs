//! Domain layer of the shipment orchestrator.
//!
//! - [`Outcome`] and [`short_circuit`]: the success/failure algebra every
//!   stage speaks
//! - [`Fault`] and [`ProcessFailure`]: the business fault vocabulary
//! - [`shipment`]: requests, intermediate results, validation and
//!   classification
//! - [`Aggregate`]: the event-sourcing traits the saga instance implements

pub mod aggregate;
pub mod error;
pub mod fault;
pub mod outcome;
pub mod shipment;

pub use aggregate::{Aggregate, DomainEvent, SnapshotCapable};
pub use error::DomainError;
pub use fault::{Fault, FaultKind, ProcessFailure};
pub use outcome::{Outcome, ProcessResult, short_circuit};
pub use shipment::{
    CollectionBooking, CollectionEligibility, CollectionSchedule, DocumentKind, Leg,
    ManifestedLeg, ManifestedLegOutcome, ManifestedShipment, PaperlessTradeDocuments,
    ProcessCategory, ProcessOutcome, ProcessRequest, ShipmentDocuments, classify, validate,
};

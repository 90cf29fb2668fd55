//! Durable saga orchestration for shipment fulfilment.
//!
//! A shipment process is validated, classified, and then run through the
//! composer for its category:
//! 1. Manifest every leg with its carrier (legs in parallel)
//! 2. Generate labels, invoice, receipt and combined document
//! 3. Plan the collection, wait for the booking instant, book it
//!
//! Every stage result is journaled in the instance's event stream, so an
//! engine restarted on the same store replays finished stages and resumes
//! from the first one that never completed.

pub mod aggregate;
pub mod composer;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod invoker;
pub mod journal;
pub mod process;
pub mod registry;
pub mod scheduler;
pub mod services;
pub mod settings;
pub mod state;

pub use aggregate::{PROCESS_AGGREGATE_TYPE, SagaInstance, instance_id_for};
pub use composer::{Composer, InvoicePlan, ShipmentComposer};
pub use context::{ProcessContext, Scope};
pub use engine::{ProcessEngine, StartReceipt};
pub use error::{Result, SagaError, StageResult};
pub use events::SagaEvent;
pub use invoker::{RetryPolicy, StepError, StepOptions, invoke};
pub use journal::{CORRELATION_ID, Journal};
pub use registry::ComposerRegistry;
pub use scheduler::{ManualScheduler, Scheduler, SystemScheduler};
pub use services::{
    CarrierService, CollectionService, DocumentRequest, DocumentService,
    InMemoryCarrierService, InMemoryCollectionService, InMemoryDocumentService, Services,
};
pub use settings::EngineSettings;
pub use state::ProcessStatus;

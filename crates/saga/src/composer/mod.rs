//! Composed shipment pipelines.
//!
//! A composer runs the stages of one process category in order:
//! manifestation, documents, collection booking. Each stage is a child
//! scope with its own journal records, and stages are chained with
//! [`short_circuit`] so a failing stage is the last one to run.

mod collection;
mod documents;
mod manifestation;

use async_trait::async_trait;
use domain::{Outcome, ProcessCategory, ProcessOutcome, ProcessRequest, short_circuit};

use crate::context::{ProcessContext, Scope};
use crate::error::StageResult;

pub use collection::book_collection;
pub use documents::generate_documents;
pub use manifestation::manifest_shipment;

/// Stage name under which a child scope records its combined result.
pub const COMPLETED: &str = "completed";

#[async_trait]
pub trait Composer: Send + Sync {
    fn category(&self) -> ProcessCategory;

    /// Runs the pipeline for a validated request under `scope`.
    async fn compose(
        &self,
        ctx: &ProcessContext,
        scope: &Scope,
        request: &ProcessRequest,
    ) -> StageResult<ProcessOutcome>;
}

/// Which invoice the documents stage produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoicePlan {
    None,
    Customs,
    /// Produced by a `paperless_trade` child of the documents scope.
    PaperlessTrade,
}

/// The standard three-stage pipeline, parameterised by its invoice.
#[derive(Debug, Clone, Copy)]
pub struct ShipmentComposer {
    category: ProcessCategory,
    invoice: InvoicePlan,
}

impl ShipmentComposer {
    pub fn domestic() -> Self {
        Self::for_category(ProcessCategory::Domestic)
    }

    pub fn international() -> Self {
        Self::for_category(ProcessCategory::International)
    }

    pub fn international_with_paperless_trade() -> Self {
        Self::for_category(ProcessCategory::InternationalWithPaperlessTrade)
    }

    pub fn for_category(category: ProcessCategory) -> Self {
        let invoice = match category {
            ProcessCategory::Domestic => InvoicePlan::None,
            ProcessCategory::International => InvoicePlan::Customs,
            ProcessCategory::InternationalWithPaperlessTrade => InvoicePlan::PaperlessTrade,
        };
        Self { category, invoice }
    }

    pub fn invoice(&self) -> InvoicePlan {
        self.invoice
    }
}

#[async_trait]
impl Composer for ShipmentComposer {
    fn category(&self) -> ProcessCategory {
        self.category
    }

    #[tracing::instrument(skip_all, fields(category = %self.category.as_str(), scope = %scope))]
    async fn compose(
        &self,
        ctx: &ProcessContext,
        scope: &Scope,
        request: &ProcessRequest,
    ) -> StageResult<ProcessOutcome> {
        let invoice = self.invoice;
        let manifested = manifest_shipment(ctx, scope, request).await;

        short_circuit(manifested, |shipment| async move {
            let shipment = &shipment;
            let documents = generate_documents(ctx, scope, shipment, invoice).await;

            short_circuit(documents, |documents| async move {
                let booking = book_collection(ctx, scope, shipment).await;

                short_circuit(booking, |booking| async move {
                    Ok(Outcome::success(ProcessOutcome::assemble(
                        shipment, documents, booking,
                    )))
                })
                .await
            })
            .await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_follows_category() {
        assert_eq!(ShipmentComposer::domestic().invoice(), InvoicePlan::None);
        assert_eq!(ShipmentComposer::international().invoice(), InvoicePlan::Customs);
        assert_eq!(
            ShipmentComposer::international_with_paperless_trade().invoice(),
            InvoicePlan::PaperlessTrade
        );
    }

    #[test]
    fn customs_invoice_matches_category_rule() {
        for category in ProcessCategory::ALL {
            let composer = ShipmentComposer::for_category(category);
            assert_eq!(composer.category(), category);
            assert_eq!(
                composer.invoice() != InvoicePlan::None,
                category.includes_customs_invoice()
            );
        }
    }
}

use domain::{
    DocumentKind, Outcome, ManifestedShipment, PaperlessTradeDocuments, ProcessFailure,
    ShipmentDocuments, short_circuit,
};

use super::{COMPLETED, InvoicePlan};
use crate::context::{ProcessContext, Scope};
use crate::error::StageResult;
use crate::invoker::invoke;
use crate::services::DocumentRequest;

/// Generates labels, the planned invoice, receipt and combined document,
/// in that order, under `{id}_documents`.
pub async fn generate_documents(
    ctx: &ProcessContext,
    parent: &Scope,
    shipment: &ManifestedShipment,
    invoice: InvoicePlan,
) -> StageResult<ShipmentDocuments> {
    let scope = parent.child("documents");
    let scope = &scope;
    let request = DocumentRequest::from(shipment);
    let request = &request;

    ctx.journal()
        .stage(scope.id(), COMPLETED, async move {
            let labels = document(ctx, scope, DocumentKind::Labels, request).await;
            short_circuit(labels, |labels_url| async move {
                let invoice_url = invoice_document(ctx, scope, invoice, request).await;
                short_circuit(invoice_url, |invoice_url| async move {
                    let receipt = document(ctx, scope, DocumentKind::Receipt, request).await;
                    short_circuit(receipt, |receipt_url| async move {
                        let combined =
                            document(ctx, scope, DocumentKind::CombinedDocument, request).await;
                        short_circuit(combined, |combined_document_url| async move {
                            Ok(Outcome::success(ShipmentDocuments {
                                labels_url,
                                invoice_url,
                                receipt_url,
                                combined_document_url,
                            }))
                        })
                        .await
                    })
                    .await
                })
                .await
            })
            .await
        })
        .await
}

async fn invoice_document(
    ctx: &ProcessContext,
    scope: &Scope,
    plan: InvoicePlan,
    request: &DocumentRequest,
) -> StageResult<Option<String>> {
    match plan {
        InvoicePlan::None => Ok(Outcome::success(None)),
        InvoicePlan::Customs => Ok(document(ctx, scope, DocumentKind::CustomsInvoice, request)
            .await?
            .map(Some)),
        InvoicePlan::PaperlessTrade => Ok(paperless_trade(ctx, scope, request)
            .await?
            .map(|documents| Some(documents.invoice_url))),
    }
}

/// Child `{id}_documents_paperless_trade`.
async fn paperless_trade(
    ctx: &ProcessContext,
    parent: &Scope,
    request: &DocumentRequest,
) -> StageResult<PaperlessTradeDocuments> {
    let scope = parent.child("paperless_trade");
    let invoice = document(ctx, &scope, DocumentKind::PaperlessTradeInvoice, request).await?;
    Ok(invoice.map(|invoice_url| PaperlessTradeDocuments { invoice_url }))
}

async fn document(
    ctx: &ProcessContext,
    scope: &Scope,
    kind: DocumentKind,
    request: &DocumentRequest,
) -> StageResult<String> {
    let step = kind.step_name();

    ctx.journal()
        .stage(scope.id(), step, async {
            let outcome = invoke(step, &ctx.settings().documents, || {
                ctx.services().documents.generate(kind, request)
            })
            .await;
            Ok(outcome.map_failure(ProcessFailure::single))
        })
        .await
}

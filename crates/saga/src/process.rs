//! The process definition every instance runs.
//!
//! Validation, then classification, then the category's composer. The
//! definition is re-executed from the top on each activation; the journal
//! turns every stage that already ran into a replay.

use domain::{Outcome, ProcessFailure, ProcessOutcome, ProcessRequest, classify, short_circuit, validate};

use crate::context::{ProcessContext, Scope};
use crate::error::StageResult;

pub const VALIDATION: &str = "validation";
pub const CLASSIFICATION: &str = "classification";

#[tracing::instrument(skip_all, fields(shipment_id = %request.id))]
pub async fn run(ctx: &ProcessContext, request: &ProcessRequest) -> StageResult<ProcessOutcome> {
    let root = Scope::root(&request.id);
    let root = &root;

    let validated = ctx
        .journal()
        .stage(root.id(), VALIDATION, async {
            Ok(validate(request).map_failure(ProcessFailure::single))
        })
        .await;

    short_circuit(validated, |request: ProcessRequest| async move {
        let request = &request;
        let category = ctx
            .journal()
            .stage(root.id(), CLASSIFICATION, async {
                Ok(Outcome::success(classify(request).as_str().to_string()))
            })
            .await;

        short_circuit(category, |name: String| async move {
            tracing::info!(category = %name, "process classified");
            match ctx.registry().route(&name) {
                Outcome::Success(composer) => composer.compose(ctx, root, request).await,
                Outcome::Failure(failure) => Ok(Outcome::failure(failure)),
            }
        })
        .await
    })
    .await
}

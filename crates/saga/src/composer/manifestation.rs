use domain::{Leg, ManifestedLeg, ManifestedShipment, Outcome, ProcessFailure, ProcessRequest};
use futures_util::future::join_all;

use super::COMPLETED;
use crate::context::{ProcessContext, Scope};
use crate::error::StageResult;
use crate::invoker::invoke;

const MANIFEST_LEG: &str = "manifest-leg";

/// Manifests every leg concurrently under `{id}_manifestation`.
///
/// Legs are aggregated in request order; if any leg fails, the stage
/// fails with the first failing leg's fault.
pub async fn manifest_shipment(
    ctx: &ProcessContext,
    parent: &Scope,
    request: &ProcessRequest,
) -> StageResult<ManifestedShipment> {
    let scope = parent.child("manifestation");
    let scope = &scope;

    ctx.journal()
        .stage::<ManifestedShipment, _>(scope.id(), COMPLETED, async move {
            let legs = join_all(
                request
                    .legs
                    .iter()
                    .enumerate()
                    .map(|(index, leg)| manifest_leg(ctx, scope, &request.id, index + 1, leg)),
            )
            .await;

            let mut manifested = Vec::with_capacity(legs.len());
            for leg in legs {
                match leg? {
                    Outcome::Success(leg) => manifested.push(leg),
                    Outcome::Failure(failure) => return Ok(Outcome::failure(failure)),
                }
            }

            Ok(Outcome::success(ManifestedShipment::from_request(
                request, manifested,
            )))
        })
        .await
}

async fn manifest_leg(
    ctx: &ProcessContext,
    parent: &Scope,
    shipment_id: &str,
    number: usize,
    leg: &Leg,
) -> StageResult<ManifestedLeg> {
    let scope = parent.child(&format!("leg{number}"));

    ctx.journal()
        .stage(scope.id(), MANIFEST_LEG, async {
            let outcome = invoke(MANIFEST_LEG, &ctx.settings().carrier, || {
                ctx.services().carrier.manifest_leg(shipment_id, leg)
            })
            .await;
            Ok(outcome.map_failure(ProcessFailure::single))
        })
        .await
}

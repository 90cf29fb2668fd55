use domain::{
    CollectionBooking, CollectionEligibility, CollectionSchedule, Fault, ManifestedLeg,
    ManifestedShipment, Outcome, ProcessFailure, short_circuit,
};

use super::COMPLETED;
use crate::context::{ProcessContext, Scope};
use crate::error::StageResult;
use crate::invoker::invoke;

const CHECK_ELIGIBILITY: &str = "check-eligibility";
const SCHEDULE: &str = "schedule";
const BOOK_COLLECTION: &str = "book-collection";

/// Plans and books the collection of the primary leg under
/// `{id}_collection`.
///
/// A schedule that is already due books at once; otherwise the scope
/// sleeps on a durable timer until the booking instant. A timer that fires
/// later than the configured tolerance fails the stage instead of booking.
pub async fn book_collection(
    ctx: &ProcessContext,
    parent: &Scope,
    shipment: &ManifestedShipment,
) -> StageResult<CollectionBooking> {
    let scope = parent.child("collection");
    let scope = &scope;

    ctx.journal()
        .stage::<CollectionBooking, _>(scope.id(), COMPLETED, async move {
            let Some(leg) = shipment.primary_leg() else {
                return Ok(Outcome::failure(
                    ProcessFailure::inconsistent_internal_state(
                        "Manifested shipment has no legs to collect",
                    ),
                ));
            };

            let eligibility = check_eligibility(ctx, scope, shipment, leg).await;
            short_circuit(eligibility, |_eligibility| async move {
                let schedule = schedule(ctx, scope, shipment, leg).await;
                short_circuit(schedule, |schedule| async move {
                    if schedule.due {
                        return book_with_carrier(ctx, scope, shipment, leg).await;
                    }

                    let fired_at = ctx.journal().sleep_until(scope.id(), schedule.book_at).await?;

                    let lateness = fired_at - schedule.book_at;
                    if lateness > ctx.settings().collection_late_tolerance {
                        tracing::warn!(
                            scope = %scope,
                            book_at = %schedule.book_at,
                            %fired_at,
                            "collection booking window missed"
                        );
                        return Ok(Outcome::failure(ProcessFailure::single(Fault::general(
                            "Collection booking window missed",
                            vec![format!(
                                "Booking was due at {} but could only run at {}",
                                schedule.book_at, fired_at
                            )],
                        ))));
                    }

                    book_with_carrier(ctx, scope, shipment, leg).await
                })
                .await
            })
            .await
        })
        .await
}

async fn check_eligibility(
    ctx: &ProcessContext,
    scope: &Scope,
    shipment: &ManifestedShipment,
    leg: &ManifestedLeg,
) -> StageResult<CollectionEligibility> {
    ctx.journal()
        .stage(scope.id(), CHECK_ELIGIBILITY, async {
            let now = ctx.now();
            let outcome = invoke(CHECK_ELIGIBILITY, &ctx.settings().collection, || {
                ctx.services()
                    .collection
                    .check_eligibility(shipment, leg, now)
            })
            .await;
            Ok(outcome.map_failure(ProcessFailure::single))
        })
        .await
}

async fn schedule(
    ctx: &ProcessContext,
    scope: &Scope,
    shipment: &ManifestedShipment,
    leg: &ManifestedLeg,
) -> StageResult<CollectionSchedule> {
    ctx.journal()
        .stage(scope.id(), SCHEDULE, async {
            let now = ctx.now();
            let outcome = invoke(SCHEDULE, &ctx.settings().collection, || {
                ctx.services().collection.schedule(shipment, leg, now)
            })
            .await;
            Ok(outcome.map_failure(ProcessFailure::single))
        })
        .await
}

/// Child `{id}_collection_booking`.
async fn book_with_carrier(
    ctx: &ProcessContext,
    parent: &Scope,
    shipment: &ManifestedShipment,
    leg: &ManifestedLeg,
) -> StageResult<CollectionBooking> {
    let scope = parent.child("booking");

    ctx.journal()
        .stage(scope.id(), BOOK_COLLECTION, async {
            let outcome = invoke(BOOK_COLLECTION, &ctx.settings().carrier, || {
                ctx.services().carrier.book_collection(shipment, leg)
            })
            .await;
            Ok(outcome.map_failure(ProcessFailure::single))
        })
        .await
}

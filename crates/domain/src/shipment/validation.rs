use crate::{Fault, Outcome};

use super::ProcessRequest;

/// Description of the fault raised for a malformed request.
pub const INVALID_REQUEST: &str = "Invalid request";

/// Checks the request shape before anything else runs.
///
/// Every problem found is reported in one validation fault. Pure and
/// deterministic, so replaying it always gives the same answer.
pub fn validate(request: &ProcessRequest) -> Outcome<ProcessRequest, Fault> {
    let mut errors = Vec::new();

    if request.id.trim().is_empty() {
        errors.push("ShipmentId must be specified".to_string());
    }
    if !(1..=2).contains(&request.legs.len()) {
        errors.push("Shipment must have 1 or 2 legs".to_string());
    }

    if errors.is_empty() {
        Outcome::success(request.clone())
    } else {
        Outcome::failure(Fault::validation(INVALID_REQUEST, errors))
    }
}

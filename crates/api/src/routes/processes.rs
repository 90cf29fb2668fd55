//! Shipment process endpoints: start, status and journal.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{Days, NaiveDate, Utc};
use domain::{Leg, ProcessFailure, ProcessOutcome, ProcessRequest};
use event_store::EventStore;
use saga::{ProcessEngine, StartReceipt};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore + Clone + 'static> {
    pub engine: ProcessEngine<S>,
}

// -- Request types --

/// Optional body of a start request. Anything left out is filled from the
/// demo shipment for the path id.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartProcessRequest {
    pub legs: Option<Vec<Leg>>,
    pub collection_date: Option<NaiveDate>,
    pub time_zone: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStatusResponse {
    pub shipment_id: String,
    pub status: String,
    pub completed_stages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ProcessOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ProcessFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

/// Response type for a journal record.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelopeResponse {
    pub event_id: String,
    pub event_type: String,
    pub correlation_id: Option<String>,
    pub version: i64,
    pub timestamp: String,
    pub payload: serde_json::Value,
}

// -- Handlers --

/// POST /{id}: start the process for a shipment.
///
/// Accepted even when the request turns out invalid: validation is the
/// first stage of the process and its failure is reported by the status
/// endpoint.
#[tracing::instrument(skip(state, body))]
pub async fn start<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<StartReceipt>), ApiError> {
    let overrides = if body.iter().all(u8::is_ascii_whitespace) {
        StartProcessRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?
    };

    let request = build_request(&id, overrides);
    let receipt = state.engine.start(request).await?;

    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

/// GET /{id}: committed state of a shipment's process.
#[tracing::instrument(skip(state))]
pub async fn status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProcessStatusResponse>, ApiError> {
    let instance = state
        .engine
        .query(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No process found for shipment {id}")))?;

    Ok(Json(ProcessStatusResponse {
        shipment_id: instance.shipment_id().to_string(),
        status: instance.status().to_string(),
        completed_stages: instance.completed_stages().to_vec(),
        outcome: instance.outcome().cloned(),
        failure: instance.failure().cloned(),
        started_at: instance.started_at().map(|t| t.to_rfc3339()),
        finished_at: instance.finished_at().map(|t| t.to_rfc3339()),
    }))
}

/// GET /{id}/events: the journal of a shipment's process.
#[tracing::instrument(skip(state))]
pub async fn events<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelopeResponse>>, ApiError> {
    let envelopes = state.engine.events(&id).await?;
    if envelopes.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No process found for shipment {id}"
        )));
    }

    let responses = envelopes
        .into_iter()
        .map(|e| EventEnvelopeResponse {
            event_id: e.event_id.to_string(),
            correlation_id: e.metadata_str(saga::CORRELATION_ID).map(String::from),
            event_type: e.event_type,
            version: e.version.as_i64(),
            timestamp: e.timestamp.to_rfc3339(),
            payload: e.payload,
        })
        .collect();

    Ok(Json(responses))
}

/// Fills a start request from the demo shipment for `id`.
///
/// Ids starting with `1` ship domestically within the UK on one leg; any
/// other id ships internationally from Germany on two legs.
pub fn build_request(id: &str, overrides: StartProcessRequest) -> ProcessRequest {
    let (legs, time_zone) = if id.starts_with('1') {
        (
            vec![Leg::new(
                "c62bee763e7a4ce387dda5eb11678815",
                "GB-sender1",
                "GB-receiver1",
                "GB-collection1",
            )],
            "Europe/London",
        )
    } else {
        (
            vec![
                Leg::new(
                    "9d6d28f2fbee4e53aeac2c3b3ba98d28",
                    "DE-sender1",
                    "DE-receiver1",
                    "DE-collection1",
                ),
                Leg::new(
                    "c62bee763e7a4ce387dda5eb11678815",
                    "DE-sender2",
                    "GB-receiver2",
                    "DE-collection2",
                ),
            ],
            "Europe/Berlin",
        )
    };

    let today = Utc::now().date_naive();
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);

    ProcessRequest::new(
        id,
        overrides.legs.unwrap_or(legs),
        overrides.collection_date.unwrap_or(tomorrow),
        overrides.time_zone.unwrap_or_else(|| time_zone.to_string()),
    )
}

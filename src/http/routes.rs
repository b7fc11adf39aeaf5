use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use serde_json::json;
use tracing::{error, warn};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::{self, Reply, Response};
use warp::Filter;

use super::responses::{GlobalMetricsResponse, ProgramMetricsResponse, TransactionsResponse};
use crate::aggregation::MetricsEngine;
use crate::collector::EventPublisher;
use crate::metrics::MetricsRegistry;
use crate::model::ClientEvent;

/// Shared handles the HTTP surface reads from and writes into
#[derive(Clone)]
pub struct HttpState {
    pub publisher: Arc<EventPublisher>,
    pub engine: Arc<MetricsEngine>,
    pub metrics: Arc<MetricsRegistry>,
}

fn with_state(state: HttpState) -> impl Filter<Extract = (HttpState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> Response {
    reply::with_status(reply::json(&json!({ "error": message.into() })), status).into_response()
}

/// All routes of the service
pub fn routes(state: HttpState) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {
    let ingest = warp::path!("agent" / "events")
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .then(ingest_event);

    let global = warp::path!("metrics" / "query")
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(global_metrics);

    let program = warp::path!("metrics" / "programs" / "query")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .then(program_metrics);

    let transactions = warp::path!("transactions" / "query")
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(program_shares);

    let health = warp::path!("health").and(warp::get()).map(|| {
        reply::json(&json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "service": "txn_pulse"
        }))
        .into_response()
    });

    let prometheus = warp::path!("metrics")
        .and(warp::get())
        .and(with_state(state))
        .map(|state: HttpState| match state.metrics.export_metrics() {
            Ok(text) => reply::with_header(text, "Content-Type", "text/plain; version=0.0.4; charset=utf-8").into_response(),
            Err(e) => {
                error!("Failed to export metrics: {}", e);
                error_reply(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to export metrics: {}", e))
            }
        });

    ingest
        .or(global)
        .unify()
        .or(program)
        .unify()
        .or(transactions)
        .unify()
        .or(health)
        .unify()
        .or(prometheus)
        .unify()
}

async fn ingest_event(body: Bytes, state: HttpState) -> Response {
    let event: ClientEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "rejecting malformed client event");
            return error_reply(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match state.publisher.publish(event).await {
        Ok(id) => reply::with_status(reply::json(&json!({ "id": id })), StatusCode::CREATED).into_response(),
        Err(e) => {
            error!(error = %e, "❌ failed to publish client event");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn global_metrics(state: HttpState) -> Response {
    match state.engine.global_snapshot().await {
        Ok(snapshot) => reply::json(&GlobalMetricsResponse::from(&snapshot)).into_response(),
        Err(e) => {
            error!(error = %e, "❌ global metrics query failed");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn program_metrics(params: HashMap<String, String>, state: HttpState) -> Response {
    let Some(program) = params.get("program_id").filter(|p| !p.is_empty()) else {
        return error_reply(StatusCode::BAD_REQUEST, "program_id is required");
    };

    match state.engine.program_snapshot(program).await {
        Ok(snapshot) => reply::json(&ProgramMetricsResponse::from(&snapshot)).into_response(),
        Err(e) => {
            error!(program = %program, error = %e, "❌ program metrics query failed");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn program_shares(state: HttpState) -> Response {
    match state.engine.program_shares().await {
        Ok(transactions) => reply::json(&TransactionsResponse { transactions }).into_response(),
        Err(e) => {
            error!(error = %e, "❌ program share query failed");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

//! HTTP surface over the engine mailbox.

use crate::engine::{EngineError, Mailbox};
use axum::{
    extract::{Path, Query, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use luckymint_types::{
    mint::{Address, MintTarget, RequestId},
    Instruction,
};
use serde::{Deserialize, Serialize};
use tracing::error;

const DEFAULT_EVENTS_LIMIT: usize = 100;
const MAX_EVENTS_LIMIT: usize = 1_000;

#[derive(Serialize)]
struct HealthzResponse {
    ok: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct EventsQuery {
    #[serde(default)]
    since: u64,
    #[serde(default)]
    limit: Option<usize>,
}

pub fn router(mailbox: Mailbox) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/instructions", post(submit))
        .route("/ledger", get(ledger))
        .route("/collections/:target", get(collection))
        .route("/requests/:id", get(request))
        .route("/events", get(events))
        .route("/accounts/:address", get(account))
        .with_state(mailbox)
}

fn reject(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Protocol rejections are the caller's fault; anything else is ours.
fn engine_error(err: EngineError) -> Response {
    match &err {
        EngineError::Rejected(inner) if inner.mint_error().is_some() => {
            reject(StatusCode::UNPROCESSABLE_ENTITY, inner)
        }
        _ => {
            error!(?err, "engine request failed");
            reject(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    }
}

async fn healthz() -> Response {
    Json(HealthzResponse { ok: true }).into_response()
}

async fn submit(
    AxumState(mut mailbox): AxumState<Mailbox>,
    Json(instruction): Json<Instruction>,
) -> Response {
    match mailbox.execute(instruction).await {
        Ok(events) => Json(events).into_response(),
        Err(err) => engine_error(err),
    }
}

async fn ledger(AxumState(mut mailbox): AxumState<Mailbox>) -> Response {
    match mailbox.ledger().await {
        Ok(ledger) => Json(ledger).into_response(),
        Err(err) => engine_error(err),
    }
}

async fn collection(
    AxumState(mut mailbox): AxumState<Mailbox>,
    Path(target): Path<String>,
) -> Response {
    let target: MintTarget = match target.parse() {
        Ok(target) => target,
        Err(err) => return reject(StatusCode::BAD_REQUEST, err),
    };
    match mailbox.collection(target).await {
        Ok(config) => Json(config).into_response(),
        Err(err) => engine_error(err),
    }
}

async fn request(AxumState(mut mailbox): AxumState<Mailbox>, Path(id): Path<u64>) -> Response {
    match mailbox.request(RequestId(id)).await {
        Ok(Some(view)) => Json(view).into_response(),
        Ok(None) => reject(StatusCode::NOT_FOUND, format!("unknown request {id}")),
        Err(err) => engine_error(err),
    }
}

async fn events(
    AxumState(mut mailbox): AxumState<Mailbox>,
    Query(query): Query<EventsQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENTS_LIMIT)
        .min(MAX_EVENTS_LIMIT);
    match mailbox.events(query.since, limit).await {
        Ok(events) => Json(events).into_response(),
        Err(err) => engine_error(err),
    }
}

async fn account(
    AxumState(mut mailbox): AxumState<Mailbox>,
    Path(address): Path<String>,
) -> Response {
    let address: Address = match address.parse() {
        Ok(address) => address,
        Err(err) => return reject(StatusCode::BAD_REQUEST, err),
    };
    match mailbox.account(address).await {
        Ok(view) => Json(view).into_response(),
        Err(err) => engine_error(err),
    }
}

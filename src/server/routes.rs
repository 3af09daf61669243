//! Axum adapter between HTTP and the [`Dispatcher`].
//!
//! A single fallback handler receives every path and method. It extracts the
//! decoded path, query string and (for `POST`) form body, dispatches, and
//! renders the outcome. Capability faults are rendered as 500 with the full
//! error detail.

use std::collections::HashMap;

use axum::{
    body::Body,
    extract::{FromRequest, Query, Request, State},
    http::Method,
    response::{IntoResponse, Response},
    Form, Router,
};
use percent_encoding::percent_decode_str;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::dispatch::{DispatchRequest, Dispatcher};

/// Shared application state for the HTTP server.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

/// Build the axum router: one catch-all handler behind CORS and tracing.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch_handler)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<Body>| {
                tracing::info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .with_state(state)
}

/// Percent-decoded request path.
fn decode_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

async fn dispatch_handler(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let path = decode_path(request.uri().path());
    let query = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .map(|Query(query)| query)
        .unwrap_or_else(|rejection| {
            tracing::debug!(%rejection, "Ignoring unparsable query string");
            HashMap::new()
        });

    let form = if method == Method::POST {
        match Form::<HashMap<String, String>>::from_request(request, &state).await {
            Ok(Form(form)) => form,
            Err(rejection) => {
                tracing::debug!(%rejection, "No form body");
                HashMap::new()
            }
        }
    } else {
        HashMap::new()
    };

    let request = DispatchRequest {
        method,
        path,
        query,
        form,
    };
    match state.dispatcher.dispatch(request).await {
        Ok(outcome) => outcome.into_response(),
        Err(fault) => fault.into_response(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

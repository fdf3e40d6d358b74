//! HTTP server wiring (spec §6): `/healthy`, `/ready`, the tail websocket
//! upgrade, and the proxy fallback that drives dispatch + the
//! route-specific merger. Metrics live on a separate mux (`metrics::router`),
//! started on its own bind address by the binary crate.

use std::sync::Arc;
use std::time::Instant;

use agent_core::readiness::Ready;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::client::BackendClient;
use crate::error::GatewayError;
use crate::metrics::Metrics;
use crate::routes::Route;
use crate::{dispatch, forward, merge, routes, tail};

#[derive(Clone)]
pub struct AppState {
	pub clients: Arc<Vec<BackendClient>>,
	pub metrics: Arc<Metrics>,
	pub ready: Ready,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/healthy", get(handle_healthy))
		.route("/ready", get(handle_ready))
		.route("/loki/api/v1/tail", get(handle_tail))
		.fallback(handle_proxy)
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

async fn handle_healthy() -> &'static str {
	"OK"
}

async fn handle_ready(State(state): State<AppState>) -> Response {
	if state.ready.is_ready() {
		(StatusCode::OK, "OK").into_response()
	} else {
		(StatusCode::SERVICE_UNAVAILABLE, "Not Ready").into_response()
	}
}

async fn handle_tail(
	ws: WebSocketUpgrade,
	State(state): State<AppState>,
	RawQuery(query): RawQuery,
	headers: axum::http::HeaderMap,
) -> Response {
	let path_and_query = match query {
		Some(q) if !q.is_empty() => format!("/loki/api/v1/tail?{q}"),
		_ => "/loki/api/v1/tail".to_string(),
	};
	let clients = (*state.clients).clone();
	ws.on_upgrade(move |socket| tail::bridge(socket, clients, path_and_query, headers))
}

async fn handle_proxy(State(state): State<AppState>, request: axum::extract::Request) -> Response {
	let started = Instant::now();
	let (parts, body) = request.into_parts();
	let path = parts.uri.path().to_string();
	let path_and_query = match parts.uri.query() {
		Some(q) if !q.is_empty() => format!("{path}?{q}"),
		_ => path.clone(),
	};
	let route = routes::match_path(&path);

	// spec §4.2(1): buffer the whole body up front; a read failure is a
	// `ClientReadError`, not an upstream failure.
	let body = match axum::body::to_bytes(body, usize::MAX).await {
		Ok(b) => b,
		Err(e) => return GatewayError::ClientReadError(e.to_string()).into_response(),
	};

	let result =
		dispatch::dispatch(&state.clients, parts.method, &path_and_query, &parts.headers, body).await;

	let (status, failed, response) = match result {
		Ok(responses) => {
			let resp = handle_route(route, responses).await;
			(resp.status().as_u16(), false, resp)
		},
		Err(e) => {
			let is_stats_404 = matches!(route, Route::IndexStats)
				&& matches!(&e, GatewayError::UpstreamHttpError { status, .. } if status.as_u16() == 404);
			if is_stats_404 {
				let resp = (
					StatusCode::NOT_FOUND,
					Json(json!({"status": "error", "message": "stats not supported"})),
				)
					.into_response();
				(404, true, resp)
			} else {
				let resp = e.into_response();
				(resp.status().as_u16(), true, resp)
			}
		},
	};

	let duration = started.elapsed();
	state.metrics.record(&path, status, duration.as_secs_f64(), failed);
	tracing::event!(
		target: "gateway request",
		tracing::Level::INFO,
		path = %path,
		status,
		backend_count = state.clients.len(),
		failed,
		duration_ms = duration.as_millis() as u64,
		"request completed"
	);
	response
}

async fn handle_route(route: Route, responses: Vec<dispatch::BackendResponse>) -> Response {
	match route {
		Route::Queries => merge::success_json(merge::queries::merge(responses).await),
		Route::Series => merge::success_json(merge::series::merge(responses).await),
		Route::IndexStats => merge::success_json(merge::index_stats::merge(responses).await),
		Route::Labels | Route::LabelValues => merge::success_json(merge::labels::merge(responses).await),
		Route::IndexVolume => merge::success_json(merge::volume::merge(responses).await),
		Route::IndexVolumeRange => merge::success_json(merge::volume_range::merge(responses).await),
		Route::DetectedLabels => merge::success_json(merge::detected_labels::merge(responses).await),
		Route::DetectedFields => merge::success_json(merge::detected_fields::merge(responses).await),
		Route::DetectedFieldValues { name } => {
			merge::success_json(merge::detected_field_values::merge(responses, &name).await)
		},
		Route::Tail => {
			// Handled by `handle_tail` before dispatch is ever invoked; the
			// router only reaches here if a non-upgrade request hits the
			// tail path, which has no meaningful body to forward.
			(StatusCode::BAD_REQUEST, "tail requires a websocket upgrade").into_response()
		},
		Route::PassThrough => match forward::forward(responses).await {
			Ok(resp) => resp,
			Err(e) => e.into_response(),
		},
	}
}

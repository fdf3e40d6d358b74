//! Metrics registry and `/metrics` handler (spec §6 observability surface).
//!
//! Same `prometheus_client::registry::Registry` + `encode` plumbing and
//! content negotiation as `management::metrics_server` elsewhere in this
//! stack, rebuilt on `axum` rather than a raw `hyper_helpers::Server` (this
//! gateway already runs an `axum::Router` for the main proxy surface, so the
//! admin mux reuses the same stack rather than introducing a second HTTP
//! server abstraction).

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

#[derive(Clone, Hash, PartialEq, Eq, Debug, prometheus_client::encoding::EncodeLabelSet)]
pub struct RequestLabels {
	pub route: String,
	pub status: u16,
}

/// Counters and histograms named per spec §6: `request_count_total`,
/// `request_failures_total`, `request_duration_seconds`.
pub struct Metrics {
	registry: Mutex<Registry>,
	pub request_count: Family<RequestLabels, Counter>,
	pub request_failures: Family<RequestLabels, Counter>,
	pub request_duration: Family<RequestLabels, Histogram>,
}

impl Metrics {
	pub fn new() -> Arc<Self> {
		let mut registry = Registry::default();
		let request_count = Family::<RequestLabels, Counter>::default();
		let request_failures = Family::<RequestLabels, Counter>::default();
		let request_duration =
			Family::<RequestLabels, Histogram>::new_with_constructor(|| {
				Histogram::new([0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0].into_iter())
			});

		registry.register(
			"request_count",
			"Total number of client requests handled",
			request_count.clone(),
		);
		registry.register(
			"request_failures",
			"Total number of client requests that ended in a failure response",
			request_failures.clone(),
		);
		registry.register(
			"request_duration_seconds",
			"Client request latency in seconds",
			request_duration.clone(),
		);

		Arc::new(Self {
			registry: Mutex::new(registry),
			request_count,
			request_failures,
			request_duration,
		})
	}

	pub fn record(&self, route: &str, status: u16, duration_seconds: f64, failed: bool) {
		let labels = RequestLabels {
			route: route.to_string(),
			status,
		};
		self.request_count.get_or_create(&labels).inc();
		if failed {
			self.request_failures.get_or_create(&labels).inc();
		}
		self.request_duration.get_or_create(&labels).observe(duration_seconds);
	}

	pub fn router(self: Arc<Self>) -> Router {
		Router::new()
			.route("/metrics", get(handle_metrics))
			.with_state(self)
	}
}

async fn handle_metrics(State(metrics): State<Arc<Metrics>>, headers: HeaderMap) -> impl IntoResponse {
	let mut buf = String::new();
	let registry = metrics.registry.lock().expect("registry mutex poisoned");
	if let Err(err) = encode(&mut buf, &registry) {
		return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
	}
	drop(registry);
	(StatusCode::OK, [(header::CONTENT_TYPE, content_type(&headers))], buf).into_response()
}

fn content_type(headers: &HeaderMap) -> &'static str {
	let wants_openmetrics = headers
		.get_all(header::ACCEPT)
		.iter()
		.filter_map(|v| v.to_str().ok())
		.any(|v| {
			v
				.to_lowercase()
				.split(';')
				.next()
				.map(|t| t == "application/openmetrics-text")
				.unwrap_or(false)
		});
	if wants_openmetrics {
		"application/openmetrics-text;charset=utf-8;version=1.0.0"
	} else {
		"text/plain; charset=utf-8"
	}
}

//! Per-endpoint mergers (spec §4.4). Each submodule implements one
//! family's aggregation rule from spec §3's table over the family's
//! backend-native JSON shape, and is independently unit-testable against
//! hand-built `serde_json::Value` fixtures (spec §8).

pub mod detected_field_values;
pub mod detected_fields;
pub mod detected_labels;
pub mod index_stats;
pub mod labels;
pub mod patterns;
pub mod queries;
pub mod series;
pub mod volume;
pub mod volume_range;

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::warn;

use crate::dispatch::BackendResponse;

/// Drains and parses every backend body as JSON (spec §4.4's common
/// contract: "read the body, close it, parse JSON … continue on
/// parse/read errors for individual backends"). A backend whose body
/// fails to parse contributes nothing and is logged, never fails the
/// whole merge (spec §7 `UpstreamDecodeError`).
pub async fn read_bodies(responses: Vec<BackendResponse>) -> Vec<(String, Value)> {
	let mut out = Vec::with_capacity(responses.len());
	for backend in responses {
		let name = backend.backend_name.clone();
		match backend.response.bytes().await {
			Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
				Ok(v) => out.push((name, v)),
				Err(e) => warn!(backend = %name, error = %e, "backend returned malformed JSON, skipping"),
			},
			Err(e) => warn!(backend = %name, error = %e, "failed to read backend body, skipping"),
		}
	}
	out
}

/// Canonical sorted `k1=v1,k2=v2,…` serialization of a label-set, used as a
/// map key by the volume family of mergers (spec GLOSSARY).
pub fn metric_key(labels: &serde_json::Map<String, Value>) -> String {
	let mut pairs: Vec<(&String, String)> = labels
		.iter()
		.map(|(k, v)| (k, v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())))
		.collect();
	pairs.sort_by(|a, b| a.0.cmp(b.0));
	pairs
		.into_iter()
		.map(|(k, v)| format!("{k}={v}"))
		.collect::<Vec<_>>()
		.join(",")
}

pub fn success_json(data: Value) -> Response {
	Json(data).into_response()
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn metric_key_sorts_labels() {
		let labels = json!({"b": "2", "a": "1"}).as_object().unwrap().clone();
		assert_eq!(metric_key(&labels), "a=1,b=2");
	}
}

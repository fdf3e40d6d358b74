//! Index-stats merger (spec §4.4): four integer counters, summed.
//!
//! The 404 short-circuit ("stats not supported") is handled by the caller
//! (`server::handle_index_stats`) since it depends on the dispatcher's
//! per-backend status code, which this module never sees — by the time a
//! merger runs, the dispatcher has already gated on HTTP-level failure.

use serde_json::{Value, json};

use crate::dispatch::BackendResponse;

pub async fn merge(responses: Vec<BackendResponse>) -> Value {
	let bodies = super::read_bodies(responses).await;
	merge_values(&bodies)
}

fn merge_values(bodies: &[(String, Value)]) -> Value {
	let mut streams = 0i64;
	let mut chunks = 0i64;
	let mut bytes = 0i64;
	let mut entries = 0i64;
	for (_, body) in bodies {
		streams += body.get("streams").and_then(Value::as_i64).unwrap_or(0);
		chunks += body.get("chunks").and_then(Value::as_i64).unwrap_or(0);
		bytes += body.get("bytes").and_then(Value::as_i64).unwrap_or(0);
		entries += body.get("entries").and_then(Value::as_i64).unwrap_or(0);
	}
	json!({
		"status": "success",
		"streams": streams,
		"chunks": chunks,
		"bytes": bytes,
		"entries": entries,
	})
}

//! Queries merger (spec §4.4, §9 "Polymorphic response shapes"): the
//! `result` field is a tagged variant (`streams` | `matrix` | `vector`).
//! The variant is fixed from the first parsed backend; a later backend
//! reporting a different variant is skipped with a log entry rather than
//! failing the whole merge.

use std::collections::BTreeSet;

use serde_json::{Map, Value, json};
use tracing::warn;

use crate::dispatch::BackendResponse;

pub async fn merge(responses: Vec<BackendResponse>) -> Value {
	let bodies = super::read_bodies(responses).await;
	merge_values(&bodies)
}

fn merge_values(bodies: &[(String, Value)]) -> Value {
	let mut result_type: Option<String> = None;
	let mut result: Vec<Value> = Vec::new();
	let mut stats = Value::Null;
	let mut encoding_flags: BTreeSet<String> = BTreeSet::new();
	let mut saw_encoding_flags = false;

	for (name, body) in bodies {
		let Some(rt) = body.pointer("/data/resultType").and_then(Value::as_str) else {
			warn!(backend = %name, "query response missing resultType, skipping");
			continue;
		};
		match &result_type {
			None => result_type = Some(rt.to_string()),
			Some(existing) if existing != rt => {
				warn!(backend = %name, expected = %existing, got = %rt, "backend returned a different result type, skipping");
				continue;
			},
			_ => {},
		}

		if let Some(entries) = body.pointer("/data/result").and_then(Value::as_array) {
			result.extend(entries.iter().cloned());
		}

		if let Some(backend_stats) = body.pointer("/data/stats") {
			sum_stats(&mut stats, backend_stats);
		}

		if let Some(flags) = body.pointer("/data/encodingFlags").and_then(Value::as_array) {
			saw_encoding_flags = true;
			for flag in flags {
				if let Some(s) = flag.as_str() {
					encoding_flags.insert(s.to_string());
				}
			}
		}
	}

	let mut data = Map::new();
	data.insert(
		"resultType".to_string(),
		json!(result_type.unwrap_or_else(|| "streams".to_string())),
	);
	data.insert("result".to_string(), json!(result));
	if !stats.is_null() {
		data.insert("stats".to_string(), stats);
	}
	if saw_encoding_flags {
		data.insert("encodingFlags".to_string(), json!(encoding_flags.into_iter().collect::<Vec<_>>()));
	}

	json!({
		"status": "success",
		"data": Value::Object(data),
	})
}

/// Additively merges numeric counters at matching key paths; non-numeric
/// leaves are kept from whichever side already has a value.
fn sum_stats(acc: &mut Value, new: &Value) {
	match (acc.is_null(), new) {
		(true, _) => *acc = new.clone(),
		(false, Value::Object(new_map)) => {
			let Value::Object(acc_map) = acc else {
				return;
			};
			for (k, v) in new_map {
				acc_map
					.entry(k.clone())
					.and_modify(|existing| sum_stats(existing, v))
					.or_insert_with(|| v.clone());
			}
		},
		(false, Value::Number(n)) => {
			if let (Some(a), Some(b)) = (acc.as_f64(), n.as_f64()) {
				let sum = a + b;
				*acc = serde_json::Number::from_f64(sum)
					.map(Value::Number)
					.unwrap_or_else(|| json!(sum as i64));
			}
		},
		_ => {},
	}
}

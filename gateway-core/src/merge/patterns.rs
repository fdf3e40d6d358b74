//! Patterns merger (spec §4.4, scenario S3): counts summed per
//! (pattern, timestamp); patterns sorted by name; samples per pattern
//! sorted ascending by timestamp. Sample pairs shorter than 2 elements are
//! ignored (malformed upstream data).

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::dispatch::BackendResponse;

pub async fn merge(responses: Vec<BackendResponse>) -> Value {
	let bodies = super::read_bodies(responses).await;
	merge_values(&bodies)
}

fn merge_values(bodies: &[(String, Value)]) -> Value {
	let mut patterns: BTreeMap<String, BTreeMap<i64, i64>> = BTreeMap::new();

	for (_, body) in bodies {
		let Some(data) = body.get("data").and_then(Value::as_array) else {
			continue;
		};
		for entry in data {
			let Some(pattern) = entry.get("pattern").and_then(Value::as_str) else {
				continue;
			};
			let Some(samples) = entry.get("samples").and_then(Value::as_array) else {
				continue;
			};
			let slot = patterns.entry(pattern.to_string()).or_default();
			for sample in samples {
				let Some(pair) = sample.as_array() else { continue };
				if pair.len() < 2 {
					continue;
				}
				let Some(ts) = pair[0].as_i64() else { continue };
				let Some(count) = pair[1].as_i64() else { continue };
				*slot.entry(ts).or_insert(0) += count;
			}
		}
	}

	let data: Vec<Value> = patterns
		.into_iter()
		.map(|(pattern, samples)| {
			let samples: Vec<Value> =
				samples.into_iter().map(|(ts, count)| json!([ts, count])).collect();
			json!({"pattern": pattern, "samples": samples})
		})
		.collect();

	json!({
		"status": "success",
		"data": data,
	})
}

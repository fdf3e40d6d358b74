//! Series merger (spec §4.4): append-only, no deduplication, so output
//! multiplicity equals the sum of input multiplicities (spec §3 Invariants).

use serde_json::{Value, json};

use crate::dispatch::BackendResponse;

pub async fn merge(responses: Vec<BackendResponse>) -> Value {
	let bodies = super::read_bodies(responses).await;
	merge_values(&bodies)
}

fn merge_values(bodies: &[(String, Value)]) -> Value {
	let mut out = Vec::new();
	for (_, body) in bodies {
		if let Some(data) = body.get("data").and_then(Value::as_array) {
			out.extend(data.iter().cloned());
		}
	}
	json!({
		"status": "success",
		"data": out,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn appends_without_dedup() {
		let bodies = vec![
			(
				"sg1".to_string(),
				json!({"status":"success","data":[{"job":"a"}]}),
			),
			(
				"sg2".to_string(),
				json!({"status":"success","data":[{"job":"a"}]}),
			),
		];
		let merged = merge_values(&bodies);
		assert_eq!(merged["data"].as_array().unwrap().len(), 2);
	}

	#[test]
	fn multiplicity_equals_sum_of_inputs() {
		let bodies = vec![
			(
				"sg1".to_string(),
				json!({"status":"success","data":[{"job":"a"},{"job":"b"}]}),
			),
			("sg2".to_string(), json!({"status":"success","data":[{"job":"c"}]})),
		];
		let merged = merge_values(&bodies);
		assert_eq!(merged["data"].as_array().unwrap().len(), 3);
	}
}

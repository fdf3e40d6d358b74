//! Labels and label-values mergers (spec §4.4): both endpoints share the
//! same union-of-strings aggregation rule, so one function serves both
//! routes (spec §4.3's route table explicitly notes this).

use std::collections::BTreeSet;

use serde_json::{Value, json};

use crate::dispatch::BackendResponse;

pub async fn merge(responses: Vec<BackendResponse>) -> Value {
	let bodies = super::read_bodies(responses).await;
	merge_values(&bodies)
}

fn merge_values(bodies: &[(String, Value)]) -> Value {
	let mut set = BTreeSet::new();
	for (_, body) in bodies {
		if let Some(data) = body.get("data").and_then(Value::as_array) {
			for entry in data {
				if let Some(s) = entry.as_str() {
					set.insert(s.to_string());
				}
			}
		}
	}
	json!({
		"status": "success",
		"data": set.into_iter().collect::<Vec<_>>(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use test_case::test_case;

	#[test_case(
		vec![
			("sg1".to_string(), json!({"status":"success","data":["a","b"]})),
			("sg2".to_string(), json!({"status":"success","data":["c","b"]})),
		],
		json!({"status":"success","data":["a","b","c"]});
		"S1 labels union"
	)]
	fn scenarios(bodies: Vec<(String, Value)>, expected: Value) {
		assert_eq!(merge_values(&bodies), expected);
	}

	#[test]
	fn order_insensitive() {
		let a = vec![
			("sg1".to_string(), json!({"status":"success","data":["a","b"]})),
			("sg2".to_string(), json!({"status":"success","data":["c"]})),
		];
		let b = vec![
			("sg2".to_string(), json!({"status":"success","data":["c"]})),
			("sg1".to_string(), json!({"status":"success","data":["a","b"]})),
		];
		assert_eq!(merge_values(&a), merge_values(&b));
	}

	#[test]
	fn ignores_malformed_backend_silently() {
		let bodies = vec![
			("sg1".to_string(), json!({"status":"success","data":["a"]})),
			("sg2".to_string(), json!(null)),
		];
		assert_eq!(merge_values(&bodies), json!({"status":"success","data":["a"]}));
	}
}

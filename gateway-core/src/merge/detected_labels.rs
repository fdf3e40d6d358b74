//! Detected-labels merger (spec §4.4): sum cardinalities per label name,
//! output sorted by name.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::dispatch::BackendResponse;

pub async fn merge(responses: Vec<BackendResponse>) -> Value {
	let bodies = super::read_bodies(responses).await;
	merge_values(&bodies)
}

fn merge_values(bodies: &[(String, Value)]) -> Value {
	let mut cardinalities: BTreeMap<String, i64> = BTreeMap::new();

	for (_, body) in bodies {
		let Some(labels) = body.get("detectedLabels").and_then(Value::as_array) else {
			continue;
		};
		for entry in labels {
			let Some(label) = entry.get("label").and_then(Value::as_str) else {
				continue;
			};
			let cardinality = entry.get("cardinality").and_then(Value::as_i64).unwrap_or(0);
			*cardinalities.entry(label.to_string()).or_insert(0) += cardinality;
		}
	}

	let detected_labels: Vec<Value> = cardinalities
		.into_iter()
		.map(|(label, cardinality)| json!({"label": label, "cardinality": cardinality}))
		.collect();

	json!({ "detectedLabels": detected_labels })
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn sums_cardinalities_sorted_by_name() {
		let bodies = vec![
			(
				"sg1".to_string(),
				json!({"detectedLabels":[
					{"label":"job","cardinality":3},
					{"label":"app","cardinality":1},
				]}),
			),
			(
				"sg2".to_string(),
				json!({"detectedLabels":[{"label":"job","cardinality":7}]}),
			),
		];
		let merged = merge_values(&bodies);
		assert_eq!(
			merged,
			json!({"detectedLabels":[
				{"label":"app","cardinality":1},
				{"label":"job","cardinality":10},
			]})
		);
	}

	#[test]
	fn order_insensitive() {
		let a = vec![
			("sg1".to_string(), json!({"detectedLabels":[{"label":"job","cardinality":1}]})),
			("sg2".to_string(), json!({"detectedLabels":[{"label":"job","cardinality":2}]})),
		];
		let b = vec![
			("sg2".to_string(), json!({"detectedLabels":[{"label":"job","cardinality":2}]})),
			("sg1".to_string(), json!({"detectedLabels":[{"label":"job","cardinality":1}]})),
		];
		assert_eq!(merge_values(&a), merge_values(&b));
	}
}

//! Detected-field-values merger (spec §4.4, scenario S2). The output
//! `field` is the route-supplied name, never the upstream echo — backends
//! sometimes echo a placeholder (see S2's `"field":"ignored"`).

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::dispatch::BackendResponse;

pub async fn merge(responses: Vec<BackendResponse>, field_name: &str) -> Value {
	let bodies = super::read_bodies(responses).await;
	merge_values(&bodies, field_name)
}

fn merge_values(bodies: &[(String, Value)], field_name: &str) -> Value {
	let mut counts: BTreeMap<String, i64> = BTreeMap::new();

	for (_, body) in bodies {
		let Some(values) = body.get("values").and_then(Value::as_array) else {
			continue;
		};
		for entry in values {
			let Some(value) = entry.get("value").and_then(Value::as_str) else {
				continue;
			};
			let count = entry.get("count").and_then(Value::as_i64).unwrap_or(0);
			*counts.entry(value.to_string()).or_insert(0) += count;
		}
	}

	let values: Vec<Value> = counts
		.into_iter()
		.map(|(value, count)| json!({"value": value, "count": count}))
		.collect();

	json!({ "field": field_name, "values": values })
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn s2_sums_counts_sorted_by_value_uses_route_name() {
		let bodies = vec![
			(
				"sg1".to_string(),
				json!({"field":"ignored","values":[
					{"value":"X","count":1},
					{"value":"Y","count":2},
				]}),
			),
			(
				"sg2".to_string(),
				json!({"field":"ignored","values":[{"value":"X","count":3}]}),
			),
		];
		let merged = merge_values(&bodies, "foo/bar");
		assert_eq!(
			merged,
			json!({"field":"foo/bar","values":[
				{"value":"X","count":4},
				{"value":"Y","count":2},
			]})
		);
	}

	#[test]
	fn accepts_label_key_too() {
		let bodies = vec![(
			"sg1".to_string(),
			json!({"label":"ignored","values":[{"value":"Z","count":5}]}),
		)];
		let merged = merge_values(&bodies, "name");
		assert_eq!(merged, json!({"field":"name","values":[{"value":"Z","count":5}]}));
	}
}

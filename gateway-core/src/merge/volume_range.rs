//! Index-volume-range merger (spec §4.4): always `matrix`, merged per
//! (metric, timestamp).

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::dispatch::BackendResponse;

pub async fn merge(responses: Vec<BackendResponse>) -> Value {
	let bodies = super::read_bodies(responses).await;
	merge_values(&bodies)
}

fn merge_values(bodies: &[(String, Value)]) -> Value {
	let mut metrics: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
	let mut series: BTreeMap<String, BTreeMap<i64, i64>> = BTreeMap::new();

	for (_, body) in bodies {
		let Some(result) = body.pointer("/data/result").and_then(Value::as_array) else {
			continue;
		};
		for entry in result {
			let Some(metric) = entry.get("metric").and_then(Value::as_object) else {
				continue;
			};
			let Some(values) = entry.get("values").and_then(Value::as_array) else {
				continue;
			};
			let key = super::metric_key(metric);
			metrics.entry(key.clone()).or_insert_with(|| metric.clone());
			let slot = series.entry(key).or_default();
			for pair in values {
				if let Some((ts, val)) = parse_point(pair) {
					*slot.entry(ts).or_insert(0) += val;
				}
			}
		}
	}

	let result: Vec<Value> = series
		.into_iter()
		.map(|(key, points)| {
			let metric = metrics.remove(&key).unwrap_or_default();
			let values: Vec<Value> =
				points.into_iter().map(|(ts, v)| json!([ts, v.to_string()])).collect();
			json!({"metric": metric, "values": values})
		})
		.collect();

	json!({
		"status": "success",
		"data": {
			"resultType": "matrix",
			"result": result,
		}
	})
}

fn parse_point(pair: &Value) -> Option<(i64, i64)> {
	let arr = pair.as_array()?;
	let ts = arr.first()?.as_i64().unwrap_or(0);
	let val = arr
		.get(1)?
		.as_str()
		.and_then(|s| s.parse::<i64>().ok())
		.or_else(|| arr.get(1)?.as_i64())?;
	Some((ts, val))
}

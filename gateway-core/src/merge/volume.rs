//! Index-volume merger (spec §4.4): keys merged by `metric-key`. The input
//! result type is `vector` or `matrix`; output is `matrix` if any merged
//! entry carries matrix data, else `vector`.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::dispatch::BackendResponse;

enum Acc {
	/// `(ts, value)` — the real upstream timestamp is preserved; only the
	/// value is summed across backends (spec §3: the accumulator carries
	/// "the single `[ts, value]` pair").
	Vector(i64, i64),
	Matrix(BTreeMap<i64, i64>),
}

pub async fn merge(responses: Vec<BackendResponse>) -> Value {
	let bodies = super::read_bodies(responses).await;
	merge_values(&bodies)
}

fn merge_values(bodies: &[(String, Value)]) -> Value {
	let mut metrics: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
	let mut accs: BTreeMap<String, Acc> = BTreeMap::new();

	for (_, body) in bodies {
		let Some(result) = body.pointer("/data/result").and_then(Value::as_array) else {
			continue;
		};
		let result_type = body.pointer("/data/resultType").and_then(Value::as_str);
		for entry in result {
			let Some(metric) = entry.get("metric").and_then(Value::as_object) else {
				continue;
			};
			let key = super::metric_key(metric);
			metrics.entry(key.clone()).or_insert_with(|| metric.clone());

			match result_type {
				Some("matrix") => {
					let Some(values) = entry.get("values").and_then(Value::as_array) else {
						continue;
					};
					let slot = accs.entry(key).or_insert_with(|| Acc::Matrix(BTreeMap::new()));
					let series = match slot {
						Acc::Matrix(m) => m,
						Acc::Vector(ts, v) => {
							let mut m = BTreeMap::new();
							m.insert(*ts, *v);
							*slot = Acc::Matrix(m);
							match slot {
								Acc::Matrix(m) => m,
								Acc::Vector(..) => unreachable!(),
							}
						},
					};
					for pair in values {
						if let Some((ts, val)) = parse_point(pair) {
							*series.entry(ts).or_insert(0) += val;
						}
					}
				},
				_ => {
					let Some(pair) = entry.get("value") else { continue };
					let Some((ts, val)) = parse_point(pair) else { continue };
					match accs.entry(key).or_insert(Acc::Vector(ts, 0)) {
						Acc::Vector(_, v) => *v += val,
						Acc::Matrix(m) => {
							*m.entry(ts).or_insert(0) += val;
						},
					}
				},
			}
		}
	}

	let any_matrix = accs.values().any(|a| matches!(a, Acc::Matrix(_)));
	let result: Vec<Value> = accs
		.into_iter()
		.map(|(key, acc)| {
			let metric = metrics.remove(&key).unwrap_or_default();
			match acc {
				Acc::Vector(ts, v) => json!({"metric": metric, "value": [ts, v.to_string()]}),
				Acc::Matrix(m) => {
					let values: Vec<Value> =
						m.into_iter().map(|(ts, v)| json!([ts, v.to_string()])).collect();
					json!({"metric": metric, "values": values})
				},
			}
		})
		.collect();

	json!({
		"status": "success",
		"data": {
			"resultType": if any_matrix { "matrix" } else { "vector" },
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

//! Detected-fields merger (spec §4.4): accepts either upstream shape
//! (`fields` with type/parsers, or the leaner `detectedFields`), and always
//! emits the canonical `fields` shape.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Value, json};

use crate::dispatch::BackendResponse;

#[derive(Default)]
struct FieldAcc {
	cardinality: i64,
	field_type: Option<String>,
	parsers: BTreeSet<String>,
}

pub async fn merge(responses: Vec<BackendResponse>) -> Value {
	let bodies = super::read_bodies(responses).await;
	merge_values(&bodies)
}

fn merge_values(bodies: &[(String, Value)]) -> Value {
	let mut fields: BTreeMap<String, FieldAcc> = BTreeMap::new();
	let mut limit: Option<Value> = None;

	for (_, body) in bodies {
		if limit.is_none() {
			if let Some(l) = body.get("limit") {
				if !l.is_null() {
					limit = Some(l.clone());
				}
			}
		}

		if let Some(entries) = body.get("fields").and_then(Value::as_array) {
			for entry in entries {
				let Some(label) = entry.get("label").and_then(Value::as_str) else {
					continue;
				};
				let acc = fields.entry(label.to_string()).or_default();
				acc.cardinality += entry.get("cardinality").and_then(Value::as_i64).unwrap_or(0);
				if acc.field_type.is_none() {
					if let Some(t) = entry.get("type").and_then(Value::as_str) {
						if !t.is_empty() {
							acc.field_type = Some(t.to_string());
						}
					}
				}
				if let Some(parsers) = entry.get("parsers").and_then(Value::as_array) {
					for p in parsers {
						if let Some(s) = p.as_str() {
							acc.parsers.insert(s.to_string());
						}
					}
				}
			}
		} else if let Some(entries) = body.get("detectedFields").and_then(Value::as_array) {
			for entry in entries {
				let label = entry
					.get("field")
					.or_else(|| entry.get("label"))
					.and_then(Value::as_str);
				let Some(label) = label else { continue };
				let acc = fields.entry(label.to_string()).or_default();
				acc.cardinality += entry.get("cardinality").and_then(Value::as_i64).unwrap_or(0);
			}
		}
	}

	let fields: Vec<Value> = fields
		.into_iter()
		.map(|(label, acc)| {
			let mut obj = serde_json::Map::new();
			obj.insert("label".to_string(), json!(label));
			if let Some(t) = acc.field_type {
				obj.insert("type".to_string(), json!(t));
			}
			obj.insert("cardinality".to_string(), json!(acc.cardinality));
			if !acc.parsers.is_empty() {
				obj.insert("parsers".to_string(), json!(acc.parsers.into_iter().collect::<Vec<_>>()));
			}
			Value::Object(obj)
		})
		.collect();

	let mut out = serde_json::Map::new();
	out.insert("fields".to_string(), json!(fields));
	if let Some(l) = limit {
		out.insert("limit".to_string(), l);
	}
	Value::Object(out)
}

//! Route table (spec §4.3). A plain `match` over path segments: the path
//! space is small, fixed, and every arm needs to carry a specific merger or
//! bridge selection that a declarative router would only obscure (see
//! SPEC_FULL.md's rationale under component 4.3).

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
	Queries,
	Series,
	IndexStats,
	Labels,
	LabelValues,
	IndexVolume,
	IndexVolumeRange,
	DetectedLabels,
	DetectedFields,
	DetectedFieldValues { name: String },
	Tail,
	PassThrough,
}

/// Longest-match among explicit entries, then templated entries, per
/// spec §4.3's matching table.
pub fn match_path(path: &str) -> Route {
	match path {
		"/loki/api/v1/query" | "/loki/api/v1/query_range" => return Route::Queries,
		"/loki/api/v1/series" => return Route::Series,
		"/loki/api/v1/index/stats" => return Route::IndexStats,
		"/loki/api/v1/labels" => return Route::Labels,
		"/loki/api/v1/index/volume" => return Route::IndexVolume,
		"/loki/api/v1/index/volume_range" => return Route::IndexVolumeRange,
		"/loki/api/v1/detected_labels" => return Route::DetectedLabels,
		"/loki/api/v1/detected_fields" => return Route::DetectedFields,
		_ => {},
	}

	if let Some(rest) = path.strip_prefix("/loki/api/v1/label/") {
		if let Some(name) = rest.strip_suffix("/values") {
			if !name.is_empty() {
				let _ = name;
				return Route::LabelValues;
			}
		}
	}

	if let Some(rest) = path.strip_prefix("/loki/api/v1/detected_field/") {
		if let Some(encoded_name) = rest.strip_suffix("/values") {
			if !encoded_name.is_empty() {
				let name = urlencoding_decode(encoded_name);
				return Route::DetectedFieldValues { name };
			}
		}
	}

	if path.starts_with("/loki/api/v1/tail") {
		return Route::Tail;
	}

	Route::PassThrough
}

/// Minimal percent-decoder for the route-derived field/label name (spec
/// §4.3: "name passed through literally (client-provided, URL-decoded)").
fn urlencoding_decode(s: &str) -> String {
	let mut out = Vec::with_capacity(s.len());
	let bytes = s.as_bytes();
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'%' && i + 2 < bytes.len() {
			if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
				out.push(byte);
				i += 3;
				continue;
			}
		}
		out.push(bytes[i]);
		i += 1;
	}
	String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn matches_explicit_endpoints() {
		assert_eq!(match_path("/loki/api/v1/query"), Route::Queries);
		assert_eq!(match_path("/loki/api/v1/query_range"), Route::Queries);
		assert_eq!(match_path("/loki/api/v1/series"), Route::Series);
		assert_eq!(match_path("/loki/api/v1/index/stats"), Route::IndexStats);
		assert_eq!(match_path("/loki/api/v1/labels"), Route::Labels);
		assert_eq!(match_path("/loki/api/v1/index/volume"), Route::IndexVolume);
		assert_eq!(
			match_path("/loki/api/v1/index/volume_range"),
			Route::IndexVolumeRange
		);
		assert_eq!(match_path("/loki/api/v1/detected_labels"), Route::DetectedLabels);
		assert_eq!(match_path("/loki/api/v1/detected_fields"), Route::DetectedFields);
	}

	#[test]
	fn matches_templated_label_values() {
		assert_eq!(match_path("/loki/api/v1/label/job/values"), Route::LabelValues);
	}

	#[test]
	fn matches_templated_detected_field_values_and_decodes_name() {
		let route = match_path("/loki/api/v1/detected_field/foo%2Fbar/values");
		assert_eq!(
			route,
			Route::DetectedFieldValues {
				name: "foo/bar".to_string()
			}
		);
	}

	#[test]
	fn matches_tail_prefix() {
		assert_eq!(match_path("/loki/api/v1/tail"), Route::Tail);
		assert_eq!(match_path("/loki/api/v1/tail?query=foo"), Route::Tail);
	}

	#[test]
	fn falls_back_to_pass_through() {
		assert_eq!(match_path("/loki/api/v1/push"), Route::PassThrough);
		assert_eq!(match_path("/unknown"), Route::PassThrough);
	}
}

//! Human-readable duration parsing for config fields (`"200ms"`, `"5s"`, …).
//!
//! Built on the `duration-str` crate, already declared in the workspace
//! dependency table (`duration-str = "0.13"`).

use serde::{Deserialize, Deserializer};
use std::time::Duration;

pub fn deserialize_opt<'de, D>(de: D) -> Result<Option<Duration>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw: Option<String> = Option::deserialize(de)?;
	match raw {
		None => Ok(None),
		Some(s) => duration_str::parse(&s).map(Some).map_err(serde::de::Error::custom),
	}
}

/// Rejects a millisecond-granularity duration string, per spec: the
/// `query_range`/`volume_range` step durations disallow milliseconds.
pub fn deserialize_opt_no_ms<'de, D>(de: D) -> Result<Option<Duration>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw: Option<String> = Option::deserialize(de)?;
	match raw {
		None => Ok(None),
		Some(s) => {
			if s.ends_with("ms") {
				return Err(serde::de::Error::custom(format!(
					"millisecond step durations are not allowed: {s}"
				)));
			}
			duration_str::parse(&s).map(Some).map_err(serde::de::Error::custom)
		},
	}
}

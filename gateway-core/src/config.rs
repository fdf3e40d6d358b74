//! Configuration model (spec §3, §6). A validated `GatewayConfig` is what
//! the core is handed; YAML parsing and validation both live here so the
//! binary only has to read bytes off disk and call [`GatewayConfig::parse`].

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TlsConfig {
	#[serde(default)]
	pub insecure_skip_verify: bool,
	pub ca_file: Option<String>,
	pub cert_file: Option<String>,
	pub key_file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpClientConfig {
	#[serde(default, deserialize_with = "crate::duration::deserialize_opt")]
	pub dial_timeout: Option<Duration>,
	#[serde(default)]
	pub tls_config: TlsConfig,
}

/// Default dial timeout when unset (spec §4.1).
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerGroup {
	pub name: String,
	pub url: String,
	#[serde(default)]
	pub timeout: u64,
	#[serde(default)]
	pub headers: HashMap<String, String>,
	#[serde(default)]
	pub http_client_config: HttpClientConfig,
}

impl ServerGroup {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.timeout)
	}

	pub fn dial_timeout(&self) -> Duration {
		self
			.http_client_config
			.dial_timeout
			.unwrap_or(DEFAULT_DIAL_TIMEOUT)
	}
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct StepConfig {
	#[serde(default, deserialize_with = "crate::duration::deserialize_opt_no_ms")]
	pub step: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ApiConfig {
	#[serde(default)]
	pub query_range: StepConfig,
	#[serde(default)]
	pub volume_range: StepConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
	pub level: Option<String>,
	pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GatewayConfig {
	pub server_groups: Vec<ServerGroup>,
	#[serde(default)]
	pub logging: LoggingConfig,
	#[serde(default)]
	pub api: ApiConfig,
}

impl GatewayConfig {
	pub fn from_yaml_str(contents: &str) -> Result<Self, GatewayError> {
		let cfg: GatewayConfig =
			serde_yaml::from_str(contents).map_err(|e| GatewayError::ConfigInvalid(e.to_string()))?;
		cfg.validate()?;
		Ok(cfg)
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
		let contents = std::fs::read_to_string(path.as_ref())
			.map_err(|e| GatewayError::ConfigInvalid(format!("reading {:?}: {e}", path.as_ref())))?;
		Self::from_yaml_str(&contents)
	}

	fn validate(&self) -> Result<(), GatewayError> {
		if self.server_groups.is_empty() {
			return Err(GatewayError::ConfigInvalid(
				"at least one server group is required".to_string(),
			));
		}
		let mut seen = std::collections::HashSet::new();
		for group in &self.server_groups {
			if group.name.trim().is_empty() {
				return Err(GatewayError::ConfigInvalid(
					"server group name must not be empty".to_string(),
				));
			}
			if !seen.insert(group.name.clone()) {
				return Err(GatewayError::ConfigInvalid(format!(
					"duplicate server group name: {}",
					group.name
				)));
			}
			if group.url.trim().is_empty() {
				return Err(GatewayError::ConfigInvalid(format!(
					"server group {} has an empty url",
					group.name
				)));
			}
			url::Url::parse(&group.url).map_err(|e| {
				GatewayError::ConfigInvalid(format!("server group {}: invalid url: {e}", group.name))
			})?;
		}
		Ok(())
	}
}

//! Backend HTTP client factory (spec §4.1).
//!
//! Same four TLS knobs (`insecure` / `insecure_host` / `cert`+`key` / `root`)
//! as `http::backendtls::LocalBackendTLS::try_into` elsewhere in this stack,
//! fed straight into `reqwest`'s own TLS API rather than a hand-built
//! `rustls::ClientConfig`, since `reqwest::Client` already owns that layer
//! for a plain HTTP(S)/WS(S) backend.

use crate::config::ServerGroup;
use crate::error::GatewayError;

/// One `reqwest::Client` per configured backend, built once at startup and
/// shared for the life of the process (spec §3 Lifecycle, §5).
#[derive(Debug, Clone)]
pub struct BackendClient {
	pub name: String,
	pub base_url: String,
	pub headers: std::collections::HashMap<String, String>,
	pub client: reqwest::Client,
}

pub fn build(group: &ServerGroup) -> Result<BackendClient, GatewayError> {
	let mut builder = reqwest::Client::builder()
		.connect_timeout(group.dial_timeout())
		.gzip(true);

	if group.timeout > 0 {
		builder = builder.timeout(group.request_timeout());
	}

	let tls = &group.http_client_config.tls_config;

	if tls.insecure_skip_verify {
		builder = builder.danger_accept_invalid_certs(true);
	}

	if let Some(ca_file) = &tls.ca_file {
		let pem = std::fs::read(ca_file).map_err(|e| {
			GatewayError::ConfigInvalid(format!("server group {}: reading ca_file: {e}", group.name))
		})?;
		let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
			GatewayError::ConfigInvalid(format!("server group {}: parsing ca_file: {e}", group.name))
		})?;
		builder = builder.add_root_certificate(cert);
	}

	if let (Some(cert_file), Some(key_file)) = (&tls.cert_file, &tls.key_file) {
		let mut pem = std::fs::read(cert_file).map_err(|e| {
			GatewayError::ConfigInvalid(format!("server group {}: reading cert_file: {e}", group.name))
		})?;
		let mut key_pem = std::fs::read(key_file).map_err(|e| {
			GatewayError::ConfigInvalid(format!("server group {}: reading key_file: {e}", group.name))
		})?;
		pem.push(b'\n');
		pem.append(&mut key_pem);
		let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
			GatewayError::ConfigInvalid(format!(
				"server group {}: building client identity: {e}",
				group.name
			))
		})?;
		builder = builder.identity(identity);
	} else if tls.cert_file.is_some() || tls.key_file.is_some() {
		return Err(GatewayError::ConfigInvalid(format!(
			"server group {}: cert_file and key_file must both be set or both be absent",
			group.name
		)));
	}

	let client = builder
		.build()
		.map_err(|e| GatewayError::ConfigInvalid(format!("server group {}: {e}", group.name)))?;

	Ok(BackendClient {
		name: group.name.clone(),
		base_url: group.url.clone(),
		headers: group.headers.clone(),
		client,
	})
}

/// Builds one client per configured server group, failing on the first
/// error (spec §4.1: "never partially initialized").
pub fn build_all(groups: &[ServerGroup]) -> Result<Vec<BackendClient>, GatewayError> {
	groups.iter().map(build).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::ServerGroup;

	fn group(name: &str, url: &str) -> ServerGroup {
		ServerGroup {
			name: name.to_string(),
			url: url.to_string(),
			timeout: 30,
			headers: Default::default(),
			http_client_config: Default::default(),
		}
	}

	#[test]
	fn builds_plain_client() {
		let g = group("sg1", "http://localhost:3100");
		let c = build(&g).unwrap();
		assert_eq!(c.name, "sg1");
	}

	#[test]
	fn builds_insecure_tls_client() {
		let mut g = group("sg1", "https://localhost:3100");
		g.http_client_config.tls_config.insecure_skip_verify = true;
		assert!(build(&g).is_ok());
	}

	#[test]
	fn rejects_cert_without_key() {
		let mut g = group("sg1", "https://localhost:3100");
		g.http_client_config.tls_config.cert_file = Some("cert.pem".to_string());
		let err = build(&g).unwrap_err();
		assert!(err.to_string().contains("cert_file"));
	}
}

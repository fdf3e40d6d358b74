//! Error taxonomy (spec §7). These are kinds, not layers: each variant
//! carries exactly what its call site needs to render the client-facing
//! response or the fatal startup message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
	#[error("invalid configuration: {0}")]
	ConfigInvalid(String),

	#[error("{backend_name}: {cause}")]
	UpstreamTransport {
		backend_name: String,
		backend_url: String,
		cause: String,
	},

	#[error("{backend_name}: {body}")]
	UpstreamHttpError {
		backend_name: String,
		backend_url: String,
		status: StatusCode,
		body: String,
	},

	#[error("backend {backend_name} returned malformed JSON: {cause}")]
	UpstreamDecodeError { backend_name: String, cause: String },

	#[error("failed to read request body: {0}")]
	ClientReadError(String),

	#[error("websocket upgrade failed: {0}")]
	UpgradeError(String),

	#[error("failed to write response to client: {0}")]
	DownstreamWriteError(String),

	#[error("no upstream returned a successful response")]
	NoUpstream,
}

impl GatewayError {
	/// The `Failed-Backend` header value, when this error originated from a
	/// specific backend.
	pub fn failed_backend(&self) -> Option<&str> {
		match self {
			GatewayError::UpstreamTransport { backend_name, .. }
			| GatewayError::UpstreamHttpError { backend_name, .. } => Some(backend_name),
			_ => None,
		}
	}
}

impl IntoResponse for GatewayError {
	fn into_response(self) -> Response {
		let (status, body) = match &self {
			GatewayError::UpstreamTransport { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
			GatewayError::UpstreamHttpError { status, .. } => (*status, self.to_string()),
			GatewayError::ClientReadError(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
			GatewayError::UpgradeError(_) => (StatusCode::BAD_REQUEST, self.to_string()),
			GatewayError::NoUpstream => (StatusCode::BAD_GATEWAY, self.to_string()),
			GatewayError::DownstreamWriteError(_) | GatewayError::UpstreamDecodeError { .. } => {
				(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
			},
			GatewayError::ConfigInvalid(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
		};
		let failed_backend = self.failed_backend().map(str::to_string);
		let mut resp = (status, [("Content-Type", "text/plain; charset=utf-8")], body).into_response();
		if let Some(name) = failed_backend {
			if let Ok(v) = axum::http::HeaderValue::from_str(&name) {
				resp.headers_mut().insert("Failed-Backend", v);
			}
		}
		resp
	}
}

//! First-response forwarder (spec §4.6): for unrecognized paths, forward
//! the first successful upstream response verbatim and drain the rest.
//! The dispatcher has already gated on HTTP-level failure, so every
//! response here is 2xx; there is no domain-generic merge to apply.

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::dispatch::BackendResponse;
use crate::error::GatewayError;

pub async fn forward(mut responses: Vec<BackendResponse>) -> Result<Response, GatewayError> {
	if responses.is_empty() {
		return Err(GatewayError::NoUpstream);
	}

	let first = responses.remove(0);
	// Drain and close the rest without keeping their bodies (spec §4.6,
	// §5 resource discipline).
	for rest in responses {
		drop(rest.response);
	}

	let status = first.response.status();
	let mut headers = HeaderMap::new();
	for (name, value) in first.response.headers() {
		// `append`, not `insert`: a header repeated upstream (e.g. multiple
		// `Set-Cookie` lines) must pass through verbatim, not collapse to
		// its last value (spec §4.6).
		headers.append(name, value.clone());
	}
	headers.insert("Connection", "keep-alive".parse().unwrap());

	let body = first.response.bytes().await.map_err(|e| GatewayError::UpstreamDecodeError {
		backend_name: first.backend_name,
		cause: e.to_string(),
	})?;

	let mut resp = (StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::OK), Body::from(body))
		.into_response();
	*resp.headers_mut() = headers;
	Ok(resp)
}

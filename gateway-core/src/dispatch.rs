//! Fan-out dispatcher (spec §4.2, §9).
//!
//! One `tokio::task::JoinSet` task per configured backend, fed from a
//! single buffered copy of the client body. Results are delivered on an
//! `mpsc` channel sized to the backend count so no task ever blocks on
//! send (spec §9 "size the channel to the number of configured backends").
//! The first error aborts the remaining tasks and drains anything already
//! in flight before the dispatcher hands an error back to the caller.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::client::BackendClient;
use crate::error::GatewayError;
use crate::trace;

/// A successful reply from one backend. The merger that receives this is
/// responsible for draining and closing the body (spec §3 Invariants).
pub struct BackendResponse {
	pub backend_name: String,
	pub backend_url: String,
	pub response: reqwest::Response,
}

/// Dispatches `method path?query` with `body` to every backend client
/// concurrently. On full success, returns one [`BackendResponse`] per
/// backend (order is arrival order — unspecified, per spec §5). On the
/// first failure, returns a [`GatewayError`] built from that failure and
/// aborts/drains the rest.
pub async fn dispatch(
	clients: &[BackendClient],
	method: reqwest::Method,
	path_and_query: &str,
	headers: &http::HeaderMap,
	body: Bytes,
) -> Result<Vec<BackendResponse>, GatewayError> {
	let (tx, mut rx) = mpsc::channel::<Result<BackendResponse, GatewayError>>(clients.len().max(1));

	// Computed once so every fanned-out backend call carries the same trace
	// id (spec §4.2(2)).
	let traceparent = trace::outbound_traceparent(headers);

	let mut tasks = JoinSet::new();
	for backend in clients.iter().cloned() {
		let method = method.clone();
		let path_and_query = path_and_query.to_string();
		let headers = headers.clone();
		let body = body.clone();
		let tx = tx.clone();
		let traceparent = traceparent.clone();
		tasks.spawn(async move {
			let result = call_one(&backend, method, &path_and_query, &headers, body, &traceparent).await;
			// A closed receiver means the dispatcher already gave up; drop silently.
			let _ = tx.send(result).await;
		});
	}
	drop(tx);

	let mut out = Vec::with_capacity(clients.len());
	let mut first_error: Option<GatewayError> = None;
	for _ in 0..clients.len() {
		match rx.recv().await {
			Some(Ok(resp)) => {
				if first_error.is_some() {
					// Already failing; drain and close this one without keeping it.
					drop(resp.response);
				} else {
					out.push(resp);
				}
			},
			Some(Err(e)) => {
				if first_error.is_none() {
					first_error = Some(e);
					tasks.abort_all();
				}
			},
			None => break,
		}
	}
	// Let any still-spawned tasks finish/abort without blocking return.
	while tasks.join_next().await.is_some() {}

	match first_error {
		Some(e) => Err(e),
		None => Ok(out),
	}
}

async fn call_one(
	backend: &BackendClient,
	method: reqwest::Method,
	path_and_query: &str,
	headers: &http::HeaderMap,
	body: Bytes,
	traceparent: &str,
) -> Result<BackendResponse, GatewayError> {
	let url = format!(
		"{}{}",
		backend.base_url.trim_end_matches('/'),
		path_and_query
	);

	// Per-group headers overwrite client headers of the same name (spec
	// §4.2(2)): build one `HeaderMap` and `insert` (not append) the
	// per-group entries over the client's, then attach it once. Trace
	// context is injected last so it always reaches the backend regardless
	// of what either side set (spec §4.2(2)).
	let mut merged = headers.clone();
	for (name, value) in &backend.headers {
		if let (Ok(name), Ok(value)) =
			(http::HeaderName::from_bytes(name.as_bytes()), http::HeaderValue::from_str(value))
		{
			merged.insert(name, value);
		}
	}
	crate::trace::inject(&mut merged, traceparent);

	let req = backend.client.request(method, &url).headers(merged).body(body);

	let resp = req.send().await.map_err(|e| GatewayError::UpstreamTransport {
		backend_name: backend.name.clone(),
		backend_url: backend.base_url.clone(),
		cause: e.to_string(),
	})?;

	if resp.status().is_success() {
		return Ok(BackendResponse {
			backend_name: backend.name.clone(),
			backend_url: backend.base_url.clone(),
			response: resp,
		});
	}

	let status = resp.status();
	let body = resp.text().await.unwrap_or_default();
	Err(GatewayError::UpstreamHttpError {
		backend_name: backend.name.clone(),
		backend_url: backend.base_url.clone(),
		status,
		body,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::ServerGroup;
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn group(name: &str, url: &str) -> ServerGroup {
		ServerGroup {
			name: name.to_string(),
			url: url.to_string(),
			timeout: 5,
			headers: Default::default(),
			http_client_config: Default::default(),
		}
	}

	#[tokio::test]
	async fn dispatch_succeeds_across_backends() {
		let s1 = MockServer::start().await;
		let s2 = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/loki/api/v1/labels"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status":"success","data":["a"]})))
			.mount(&s1)
			.await;
		Mock::given(method("GET"))
			.and(path("/loki/api/v1/labels"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status":"success","data":["b"]})))
			.mount(&s2)
			.await;

		let clients = crate::client::build_all(&[group("sg1", &s1.uri()), group("sg2", &s2.uri())]).unwrap();
		let out = dispatch(
			&clients,
			reqwest::Method::GET,
			"/loki/api/v1/labels",
			&http::HeaderMap::new(),
			Bytes::new(),
		)
		.await
		.unwrap();
		assert_eq!(out.len(), 2);
	}

	#[tokio::test]
	async fn dispatch_fails_fast_on_http_error() {
		let s1 = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(500).set_body_string("upstream error"))
			.mount(&s1)
			.await;

		let clients = crate::client::build_all(&[group("sg1", &s1.uri())]).unwrap();
		let err = dispatch(
			&clients,
			reqwest::Method::GET,
			"/loki/api/v1/labels",
			&http::HeaderMap::new(),
			Bytes::new(),
		)
		.await
		.unwrap_err();
		match err {
			GatewayError::UpstreamHttpError { body, status, .. } => {
				assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
				assert!(body.contains("upstream error"));
			},
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn group_headers_overwrite_client_headers_of_the_same_name() {
		let s1 = MockServer::start().await;
		Mock::given(method("GET"))
			.and(wiremock::matchers::header("x-scope-orgid", "tenant-a"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status":"success","data":[]})))
			.mount(&s1)
			.await;

		let mut g = group("sg1", &s1.uri());
		g.headers.insert("X-Scope-OrgID".to_string(), "tenant-a".to_string());
		let clients = crate::client::build_all(&[g]).unwrap();

		let mut client_headers = http::HeaderMap::new();
		client_headers.insert("x-scope-orgid", "client-supplied".parse().unwrap());

		let out = dispatch(&clients, reqwest::Method::GET, "/loki/api/v1/labels", &client_headers, Bytes::new())
			.await
			.unwrap();
		assert_eq!(out.len(), 1);
	}

	#[tokio::test]
	async fn dispatch_fails_on_connection_error() {
		let clients = crate::client::build_all(&[group("sg1", "http://127.0.0.1:1")]).unwrap();
		let err = dispatch(
			&clients,
			reqwest::Method::GET,
			"/loki/api/v1/labels",
			&http::HeaderMap::new(),
			Bytes::new(),
		)
		.await
		.unwrap_err();
		assert!(matches!(err, GatewayError::UpstreamTransport { .. }));
	}
}

//! Tail bridge (spec §4.5, §9): N upstream WebSocket readers fan in to one
//! shared channel, drained by a single writer that forwards to the client
//! socket. No cycles, no shared mutability among readers — each reader
//! owns its own upstream connection end to end.

use axum::extract::ws::{Message as ClientMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tracing::warn;

use crate::client::BackendClient;
use crate::error::GatewayError;
use crate::trace;

/// Rewrites an `http(s)://` base URL into the matching `ws(s)://` URL and
/// appends the original path and raw query string (spec §4.5).
fn upstream_ws_url(base_url: &str, path_and_query: &str) -> String {
	let base = base_url.trim_end_matches('/');
	let rewritten = if let Some(rest) = base.strip_prefix("https://") {
		format!("wss://{rest}")
	} else if let Some(rest) = base.strip_prefix("http://") {
		format!("ws://{rest}")
	} else {
		base.to_string()
	};
	format!("{rewritten}{path_and_query}")
}

/// Drives the whole bridge for one client connection: dials every backend,
/// fans their frames into `client_socket`, and returns once every upstream
/// reader has exited (spec §4.5 lifecycle).
pub async fn bridge(
	client_socket: WebSocket,
	clients: Vec<BackendClient>,
	path_and_query: String,
	client_headers: http::HeaderMap,
) {
	let (tx, mut rx) = mpsc::channel::<serde_json::Value>(clients.len().max(1));
	let (mut client_sink, mut client_stream) = client_socket.split();

	// Shared across every upstream dial so all of them (and the client
	// request that triggered the upgrade) carry the same trace id (spec
	// §4.5).
	let traceparent = trace::outbound_traceparent(&client_headers);

	let mut readers = tokio::task::JoinSet::new();
	for backend in clients {
		let tx = tx.clone();
		let path_and_query = path_and_query.clone();
		let traceparent = traceparent.clone();
		readers.spawn(async move {
			run_upstream_reader(backend, path_and_query, tx, traceparent).await;
		});
	}
	drop(tx);

	// Best-effort: a client-initiated close should tear down the upstream
	// readers too, even though they have no direct handle on the client
	// socket (spec §5 "client socket closing must cause upstream readers to
	// stop").
	let cancel_readers = readers.len() > 0;
	let forward = async {
		while let Some(frame) = rx.recv().await {
			let text = match serde_json::to_string(&frame) {
				Ok(t) => t,
				Err(e) => {
					warn!(error = %e, "failed to re-encode tail frame, dropping");
					continue;
				},
			};
			if let Err(e) = client_sink.send(ClientMessage::Text(text)).await {
				let err = GatewayError::DownstreamWriteError(e.to_string());
				warn!(error = %err, "abandoning tail response");
				return;
			}
		}
	};

	let watch_client_close = async {
		while let Some(Ok(msg)) = client_stream.next().await {
			if matches!(msg, ClientMessage::Close(_)) {
				break;
			}
		}
	};

	if cancel_readers {
		tokio::select! {
			_ = forward => {},
			_ = watch_client_close => {
				readers.abort_all();
			},
		}
	} else {
		forward.await;
	}

	while readers.join_next().await.is_some() {}
}

/// One upstream connection end to end: dial, read frames until failure or
/// close, deliver each to the shared channel. A parse or read error ends
/// only this reader (spec §4.5: "record and exit that goroutine only").
async fn run_upstream_reader(
	backend: BackendClient,
	path_and_query: String,
	tx: mpsc::Sender<serde_json::Value>,
	traceparent: String,
) {
	let url = upstream_ws_url(&backend.base_url, &path_and_query);

	let mut request = match tokio_tungstenite::tungstenite::client::IntoClientRequest::into_client_request(url.as_str()) {
		Ok(r) => r,
		Err(e) => {
			warn!(backend = %backend.name, error = %e, "invalid tail URL, skipping backend");
			return;
		},
	};
	for (name, value) in &backend.headers {
		if let (Ok(name), Ok(value)) = (
			tokio_tungstenite::tungstenite::http::HeaderName::from_bytes(name.as_bytes()),
			tokio_tungstenite::tungstenite::http::HeaderValue::from_str(value),
		) {
			request.headers_mut().insert(name, value);
		}
	}
	if let Ok(value) = tokio_tungstenite::tungstenite::http::HeaderValue::from_str(&traceparent) {
		request.headers_mut().insert("traceparent", value);
	}

	let (ws_stream, _) = match tokio_tungstenite::connect_async(request).await {
		Ok(conn) => conn,
		Err(e) => {
			let err = GatewayError::UpgradeError(e.to_string());
			warn!(backend = %backend.name, error = %err, "skipping backend for tail");
			return;
		},
	};

	let (_sink, mut stream) = ws_stream.split();
	loop {
		match stream.next().await {
			Some(Ok(UpstreamMessage::Text(text))) => match serde_json::from_str::<serde_json::Value>(&text.to_string()) {
				Ok(v) => {
					if tx.send(v).await.is_err() {
						return;
					}
				},
				Err(e) => warn!(backend = %backend.name, error = %e, "malformed tail frame, skipping"),
			},
			Some(Ok(UpstreamMessage::Close(_))) | None => return,
			Some(Ok(_)) => continue,
			Some(Err(e)) => {
				warn!(backend = %backend.name, error = %e, "tail websocket read error, closing reader");
				return;
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rewrites_http_scheme_to_ws() {
		assert_eq!(
			upstream_ws_url("http://backend:3100", "/loki/api/v1/tail?query=x"),
			"ws://backend:3100/loki/api/v1/tail?query=x"
		);
	}

	#[test]
	fn rewrites_https_scheme_to_wss() {
		assert_eq!(
			upstream_ws_url("https://backend:3100/", "/loki/api/v1/tail"),
			"wss://backend:3100/loki/api/v1/tail"
		);
	}
}

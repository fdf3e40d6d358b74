//! W3C trace-context propagation for outbound requests (spec §4.2(2): "trace
//! context injected into outbound headers"; §4.5: "inject trace context into
//! handshake headers").
//!
//! Same propagate-don't-replace shape as `trcng::extract_context_from_request`/
//! `add_context_to_request` elsewhere in this stack — forward whatever the
//! client already set, mint a fresh root only when there's nothing to
//! propagate. That module reaches for the full `opentelemetry`/
//! `opentelemetry_http` propagator stack because it also exports spans to a
//! collector; this gateway never originates or exports spans, only forwards
//! trace context, so it implements the W3C `traceparent` wire format
//! directly instead.

use http::{HeaderMap, HeaderValue};

const VERSION: &str = "00";

/// The `traceparent` value to send to every backend for one fanned-out
/// request: the client's own header if it's well-formed, otherwise a fresh
/// root span. Computed once per request so every backend (and the tail
/// bridge's upstream dials) shares one trace id.
pub fn outbound_traceparent(client_headers: &HeaderMap) -> String {
	if let Some(existing) = client_headers.get("traceparent").and_then(|v| v.to_str().ok()) {
		if is_well_formed(existing) {
			return existing.to_string();
		}
	}
	generate_root()
}

pub fn inject(headers: &mut HeaderMap, traceparent: &str) {
	if let Ok(value) = HeaderValue::from_str(traceparent) {
		headers.insert("traceparent", value);
	}
}

fn generate_root() -> String {
	let trace_id: [u8; 16] = rand::random();
	let span_id: [u8; 8] = rand::random();
	format!("{VERSION}-{}-{}-01", hex(&trace_id), hex(&span_id))
}

fn hex(bytes: &[u8]) -> String {
	bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// `version-trace_id-parent_id-flags`, all lowercase hex, trace_id 16 bytes,
/// parent_id 8 bytes (W3C Trace Context). Not a full conformance check —
/// just enough to decide whether to propagate it verbatim.
fn is_well_formed(s: &str) -> bool {
	let parts: Vec<&str> = s.split('-').collect();
	parts.len() == 4
		&& parts[1].len() == 32
		&& parts[2].len() == 16
		&& parts[3].len() == 2
		&& parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_hexdigit()))
}

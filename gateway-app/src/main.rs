//! Thin binary: parse CLI args, load config, build backend clients, and
//! run the proxy and admin routers side by side until either exits.
//!
//! Same shape as a typical `clap`-args-plus-`JoinSet`-of-`axum::serve`-tasks
//! binary entry point, adapted to this gateway's two fixed mux addresses
//! rather than a local/xds config split.

use std::net::SocketAddr;
use std::sync::Arc;

use agent_core::readiness::Ready;
use clap::Parser;
use gateway_core::{client, server, GatewayConfig};
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Log-query fan-out gateway", long_about = None)]
struct Args {
	/// Address the proxy listens on.
	#[arg(long, default_value = ":3100")]
	bind_addr: String,

	/// Address the admin mux (/metrics) listens on.
	#[arg(long, default_value = ":3101")]
	admin_bind_addr: String,

	/// Path to the YAML config file.
	#[arg(long, default_value = "config.yaml")]
	config: std::path::PathBuf,

	/// Log output format.
	#[arg(long, default_value = "pretty")]
	log_format: String,
}

fn parse_bind_addr(addr: &str) -> anyhow::Result<SocketAddr> {
	let addr = if let Some(port) = addr.strip_prefix(':') {
		format!("0.0.0.0:{port}")
	} else {
		addr.to_string()
	};
	Ok(addr.parse()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	init_tracing(&args.log_format);

	let config = match GatewayConfig::from_file(&args.config) {
		Ok(c) => c,
		Err(e) => {
			tracing::error!(error = %e, "failed to load configuration");
			std::process::exit(1);
		},
	};

	let clients = match client::build_all(&config.server_groups) {
		Ok(c) => c,
		Err(e) => {
			tracing::error!(error = %e, "failed to build backend clients");
			std::process::exit(1);
		},
	};

	let metrics = gateway_core::metrics::Metrics::new();
	let ready = Ready::new();

	let state = server::AppState {
		clients: Arc::new(clients),
		metrics: metrics.clone(),
		ready: ready.clone(),
	};

	let bind_addr = parse_bind_addr(&args.bind_addr)?;
	let admin_bind_addr = parse_bind_addr(&args.admin_bind_addr)?;

	let proxy_listener = match tokio::net::TcpListener::bind(bind_addr).await {
		Ok(l) => l,
		Err(e) => {
			tracing::error!(error = %e, addr = %bind_addr, "failed to bind proxy address");
			std::process::exit(1);
		},
	};
	let admin_listener = match tokio::net::TcpListener::bind(admin_bind_addr).await {
		Ok(l) => l,
		Err(e) => {
			tracing::error!(error = %e, addr = %admin_bind_addr, "failed to bind admin address");
			std::process::exit(1);
		},
	};

	let proxy_router = server::router(state);
	let admin_router = metrics.router();

	ready.set_ready();
	tracing::info!(proxy = %bind_addr, admin = %admin_bind_addr, "gateway listening");

	let mut tasks = JoinSet::new();
	tasks.spawn(async move { axum::serve(proxy_listener, proxy_router).await });
	tasks.spawn(async move { axum::serve(admin_listener, admin_router).await });

	while let Some(result) = tasks.join_next().await {
		result??;
	}
	Ok(())
}

fn init_tracing(format: &str) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
	if format == "json" {
		subscriber.json().init();
	} else {
		subscriber.init();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_colon_prefixed_port() {
		let addr = parse_bind_addr(":3100").unwrap();
		assert_eq!(addr.port(), 3100);
	}

	#[test]
	fn parses_explicit_host() {
		let addr = parse_bind_addr("127.0.0.1:3100").unwrap();
		assert_eq!(addr.ip().to_string(), "127.0.0.1");
	}
}

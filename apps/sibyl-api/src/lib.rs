pub mod routes;
pub mod state;

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use color_eyre::eyre;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(
	version = sibyl_cli::VERSION,
	rename_all = "kebab",
	styles = sibyl_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

/// Resolved listener addresses. The admin plane is loopback-only no
/// matter what the config says; the query plane may open up when the
/// operator disables `bind_localhost_only`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ListenAddrs {
	query: SocketAddr,
	admin: SocketAddr,
}
impl ListenAddrs {
	fn resolve(
		service: &sibyl_config::Service,
		security: &sibyl_config::Security,
	) -> color_eyre::Result<Self> {
		let query: SocketAddr = service.http_bind.parse()?;
		let admin: SocketAddr = service.admin_bind.parse()?;

		if security.bind_localhost_only && !query.ip().is_loopback() {
			return Err(eyre::eyre!(
				"http_bind must be a loopback address when bind_localhost_only is true."
			));
		}
		if !admin.ip().is_loopback() {
			return Err(eyre::eyre!("admin_bind must be a loopback address."));
		}

		Ok(Self { query, admin })
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = sibyl_config::load(&args.config)?;

	init_tracing(&config.service.log_level);

	let addrs = ListenAddrs::resolve(&config.service, &config.security)?;
	let state = AppState::new(config)?;
	let query_listener = TcpListener::bind(addrs.query).await?;
	let admin_listener = TcpListener::bind(addrs.admin).await?;

	tracing::info!(query_addr = %addrs.query, admin_addr = %addrs.admin, "Listeners bound.");

	tokio::try_join!(
		axum::serve(query_listener, routes::router(state.clone())),
		axum::serve(admin_listener, routes::admin_router(state)),
	)?;

	Ok(())
}

fn init_tracing(log_level: &str) {
	let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}

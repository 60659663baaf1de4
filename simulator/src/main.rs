//! Standalone dev store: the simulated points store served over HTTP/WS.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Arg, Command};
use tracing::info;

use stakebook_engine::mocks::MemoryStore;
use stakebook_simulator::Api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let matches = Command::new("dev-store")
        .about("Serve an in-memory stakebook store for local development.")
        .arg(Arg::new("port").long("port").default_value("8787"))
        .get_matches();
    let port: u16 = matches
        .get_one::<String>("port")
        .expect("port has a default")
        .parse()
        .context("invalid --port")?;

    let store = Arc::new(MemoryStore::new());
    let api = Api::new(store);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind dev store listener")?;
    info!(%addr, "dev store listening");

    axum::serve(listener, api.router())
        .await
        .context("dev store server")?;
    Ok(())
}

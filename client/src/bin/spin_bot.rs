//! Load-generating bot that spins against a hosted store on an interval.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Arg, Command};
use serde::Deserialize;
use tracing::{info, warn, Level};

use stakebook_client::{Recovery, RecoveryPolicy, StoreClient};
use stakebook_engine::{PointsStore, SpinEngine, SpinError};
use stakebook_types::constants::INITIAL_POINTS;
use stakebook_types::{SpinDistribution, UserId};

#[derive(Deserialize)]
struct Config {
    base_url: String,
    /// Fixed identity to spin as. A fresh one is generated when absent.
    user_id: Option<UserId>,
    /// Milliseconds between spins.
    interval_ms: u64,
    /// Number of settled spins before exiting. Zero spins forever.
    spins: u64,
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("spin-bot")
        .about("Repeatedly spin the wheel against a stakebook store.")
        .arg(Arg::new("config").long("config").required(true))
        .get_matches();

    let config_file = matches.get_one::<String>("config").unwrap();
    let config_file =
        std::fs::read_to_string(config_file).context("could not read config file")?;
    let config: Config =
        serde_yaml::from_str(&config_file).context("could not parse config file")?;

    let level = Level::from_str(&config.log_level).context("invalid log level")?;
    tracing_subscriber::fmt().with_max_level(level).init();

    let user = config.user_id.unwrap_or_else(UserId::random);
    info!(base_url = %config.base_url, %user, "starting spin-bot");

    let client = Arc::new(StoreClient::new(&config.base_url)?);
    client.probe().await.context("store probe failed")?;
    let engine = SpinEngine::new(client.clone());
    let table = SpinDistribution::standard();
    let policy = RecoveryPolicy::new();

    let mut ticker = tokio::time::interval(Duration::from_millis(config.interval_ms));
    let mut completed = 0u64;
    loop {
        ticker.tick().await;
        match engine.spin(user, &table).await {
            Ok(report) => {
                info!(
                    delta = report.total_delta,
                    balance = report.balance,
                    "{}", report.message
                );
                completed += 1;
            }
            Err(SpinError::InsufficientPoints { have, need }) => {
                // Broke bots get the signup default back and keep going.
                warn!(have, need, "insufficient points; reseeding");
                client
                    .set_balance(user, INITIAL_POINTS)
                    .await
                    .context("reseed failed")?;
            }
            Err(SpinError::Store(err)) => {
                if policy.on_error(&err).await == Recovery::ReloadRequired {
                    anyhow::bail!("store unreachable: {err}");
                }
                warn!(error = %err, "spin rejected by the store");
            }
            Err(err) => {
                warn!(error = %err, "spin failed");
            }
        }
        if config.spins != 0 && completed >= config.spins {
            info!(completed, "spin-bot done");
            return Ok(());
        }
    }
}

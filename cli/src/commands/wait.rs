use anyhow::{Context, Result};
use log::info;
use omero_client::{Client, ReadinessConfig};
use std::time::Duration;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct ReadinessArgs {
    #[structopt(long = "max-retries", default_value = "180")]
    /// Number of failed readiness checks to tolerate before the final attempt
    max_retries: u32,

    #[structopt(long = "retry-interval", default_value = "2")]
    /// Seconds to wait after each failed readiness check
    retry_interval: u64,
}

impl ReadinessArgs {
    pub fn config(&self) -> ReadinessConfig {
        ReadinessConfig {
            max_retry_count: self.max_retries,
            interval: Duration::from_secs(self.retry_interval),
        }
    }
}

pub fn run(client: &Client, args: &ReadinessArgs) -> Result<()> {
    wait_for_server(client, &args.config())
}

pub fn wait_for_server(client: &Client, config: &ReadinessConfig) -> Result<()> {
    let connection = client.connection();
    info!(
        "Waiting for OMERO at {}:{} (up to {} attempts over {:?})",
        connection.host,
        connection.port,
        config.max_retry_count + 1,
        config.budget()
    );
    let attempts = client
        .wait_until_ready(config)
        .context("OMERO server did not become ready")?;
    info!("OMERO is ready after {attempts} attempt(s).");
    Ok(())
}

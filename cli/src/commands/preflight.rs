use anyhow::{Context, Result};
use log::info;
use omero_client::Client;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub struct PreflightArgs {
    #[structopt(long = "data-dir")]
    /// Directory holding the images to import, as seen by the OMERO CLI
    data_dir: Option<String>,
}

pub fn run(client: &Client, args: &PreflightArgs, default_data_dir: &str) -> Result<()> {
    check(client, args.data_dir.as_deref().unwrap_or(default_data_dir))
}

/// Fails if the OMERO CLI is not executable or `data_dir` is missing. Runs no server commands.
pub fn check(client: &Client, data_dir: &str) -> Result<()> {
    client
        .check_cli()
        .context("Preflight check for the OMERO CLI has failed")?;
    info!("Found OMERO CLI at `{}`", client.omero_bin());

    client
        .check_directory(data_dir)
        .context("Preflight check for the data directory has failed")?;
    info!("Found data directory `{data_dir}`");
    Ok(())
}

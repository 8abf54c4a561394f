use crate::{
    commands::{
        config::ConfigArgs, import::ImportArgs, preflight::PreflightArgs, seed::SeedArgs,
        wait::ReadinessArgs,
    },
    printer::OutputFormat,
};
use anyhow::{anyhow, Error, Result};
use std::{path::PathBuf, str::FromStr};
use structopt::StructOpt;

/// omero-seed populates an OMERO server with sample data for integration testing.
#[derive(Debug, StructOpt)]
#[structopt(
    global_settings = &[
        structopt::clap::AppSettings::ColoredHelp,
        structopt::clap::AppSettings::InferSubcommands,
    ]
)]
pub struct Args {
    #[structopt(long = "config-file", parse(from_os_str))]
    /// Path to the configuration file. Typically defaults to ~/.config/omero-seed on Linux.
    pub config: Option<PathBuf>,

    #[structopt(short = "c", long = "context")]
    /// Specify what context to use. Overrides the current context, if any.
    pub context: Option<String>,

    #[structopt(short = "v", long = "verbose")]
    /// Enable more verbose logging.
    pub verbose: bool,

    #[structopt(short = "o", long = "output", default_value = "table")]
    /// Output format. One of: table, json
    pub output: OutputFormat,

    #[structopt(long = "engine")]
    /// Container engine used to exec into the server container [default: docker]
    pub engine: Option<String>,

    #[structopt(long = "container")]
    /// Name of the server container [default: omero-server]
    pub container: Option<String>,

    #[structopt(long = "local")]
    /// Run the OMERO CLI directly instead of through the container engine
    pub local: bool,

    #[structopt(long = "omero-bin")]
    /// Path to the OMERO CLI as seen from where it runs
    pub omero_bin: Option<String>,

    #[structopt(short = "s", long = "server")]
    /// Server host name [default: localhost]
    pub host: Option<String>,

    #[structopt(short = "p", long = "port")]
    /// Server port [default: 4064]
    pub port: Option<u16>,

    #[structopt(short = "u", long = "user")]
    /// User name. Overrides OMERO_USER and the current context [default: root]
    pub user: Option<String>,

    #[structopt(short = "w", long = "password")]
    /// Password. Overrides OMERO_PASS and the current context [default: omero]
    pub password: Option<String>,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    #[structopt(name = "completion")]
    /// Output shell completion code for the specified shell (bash or zsh)
    Completion { shell: Shell },

    #[structopt(name = "config")]
    /// Manage connection contexts
    Config {
        #[structopt(subcommand)]
        config_args: ConfigArgs,
    },

    #[structopt(name = "seed")]
    /// Wait for the server, then create the sample projects, datasets, annotations and images
    Seed {
        #[structopt(flatten)]
        seed_args: SeedArgs,
    },

    #[structopt(name = "wait")]
    /// Wait until the server answers queries
    Wait {
        #[structopt(flatten)]
        readiness_args: ReadinessArgs,
    },

    #[structopt(name = "preflight")]
    /// Check that the OMERO CLI and the data directory are present
    Preflight {
        #[structopt(flatten)]
        preflight_args: PreflightArgs,
    },

    #[structopt(name = "import")]
    /// Import files matching patterns into a dataset
    Import {
        #[structopt(flatten)]
        import_args: ImportArgs,
    },

    #[structopt(name = "count")]
    /// Count projects, datasets and images created today
    Count,
}

#[derive(Debug)]
pub enum Shell {
    Bash,
    Zsh,
}

impl FromStr for Shell {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self> {
        match string {
            "bash" => Ok(Shell::Bash),
            "zsh" => Ok(Shell::Zsh),
            _ => Err(anyhow!("unknown shell: '{}'", string)),
        }
    }
}

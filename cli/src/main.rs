#![deny(clippy::all)]

mod args;
mod commands;
mod config;
mod printer;
mod progress;
mod utils;

use anyhow::{anyhow, Context, Result};
use log::{debug, error, warn};
use omero_client::{
    Client, Config as ClientConfig, Connection, ContainerRunner, LocalRunner, Runner,
    DEFAULT_HOST, DEFAULT_OMERO_BIN, DEFAULT_PASSWORD, DEFAULT_PORT, DEFAULT_USER,
};
use std::{env, fs, io, path::PathBuf, process};
use structopt::{clap::Shell as ClapShell, StructOpt};

use crate::{
    args::{Args, Command, Shell},
    commands::{config as config_command, count, import, preflight, seed, wait},
    config::{ContextConfig, SeedConfig},
    printer::Printer,
    utils::io::init_env_logger,
};

const USER_ENV_VARIABLE_NAME: &str = "OMERO_USER";
const PASSWORD_ENV_VARIABLE_NAME: &str = "OMERO_PASS";

const DEFAULT_ENGINE: &str = "docker";
const DEFAULT_CONTAINER: &str = "omero-server";
const DEFAULT_DATA_DIR: &str = "/opt/omero/test-data";

fn run(args: Args) -> Result<()> {
    let config_path = find_configuration(&args)?;
    let cli_config = config::read_seed_config(&config_path)?;
    let printer = Printer::new(args.output);

    match &args.command {
        Command::Config { config_args } => {
            config_command::run(config_args, cli_config, config_path).map(|_| ())
        }
        Command::Completion { shell } => {
            let mut app = Args::clap();
            let clap_shell = match shell {
                Shell::Zsh => ClapShell::Zsh,
                Shell::Bash => ClapShell::Bash,
            };
            app.gen_completions_to("omero-seed", clap_shell, &mut io::stdout());
            Ok(())
        }
        Command::Seed { seed_args } => {
            let context = current_context(&args, &cli_config)?;
            seed::run(
                &client_from_args(&args, context),
                seed_args,
                data_dir_from_context(context),
                &printer,
            )
        }
        Command::Wait { readiness_args } => {
            let context = current_context(&args, &cli_config)?;
            wait::run(&client_from_args(&args, context), readiness_args)
        }
        Command::Preflight { preflight_args } => {
            let context = current_context(&args, &cli_config)?;
            preflight::run(
                &client_from_args(&args, context),
                preflight_args,
                data_dir_from_context(context),
            )
        }
        Command::Import { import_args } => {
            let context = current_context(&args, &cli_config)?;
            import::run(
                &client_from_args(&args, context),
                import_args,
                data_dir_from_context(context),
                &printer,
            )
        }
        Command::Count => {
            let context = current_context(&args, &cli_config)?;
            count::run(&client_from_args(&args, context), &printer)
        }
    }
}

fn current_context<'a>(args: &Args, config: &'a SeedConfig) -> Result<Option<&'a ContextConfig>> {
    if let Some(context_name) = args.context.as_ref() {
        let context = config.get_context(context_name);
        if context.is_none() {
            return Err(anyhow!("Unknown context `{}`.", context_name));
        };
        Ok(context)
    } else {
        Ok(config.get_current_context())
    }
}

/// Resolves each setting from, in order: the command line, the environment (credentials
/// only), the context and the built-in default.
fn client_from_args(args: &Args, context: Option<&ContextConfig>) -> Client {
    let from_context = |field: fn(&ContextConfig) -> Option<&String>| {
        context.and_then(field).cloned()
    };

    let user = args
        .user
        .clone()
        .or_else(|| env::var(USER_ENV_VARIABLE_NAME).ok())
        .or_else(|| from_context(|context| context.user.as_ref()))
        .unwrap_or_else(|| DEFAULT_USER.to_owned());

    let password = args
        .password
        .clone()
        .or_else(|| env::var(PASSWORD_ENV_VARIABLE_NAME).ok())
        .or_else(|| from_context(|context| context.password.as_ref()))
        .unwrap_or_else(|| DEFAULT_PASSWORD.to_owned());

    let host = args
        .host
        .clone()
        .or_else(|| from_context(|context| context.host.as_ref()))
        .unwrap_or_else(|| DEFAULT_HOST.to_owned());

    let port = args
        .port
        .or_else(|| context.and_then(|context| context.port))
        .unwrap_or(DEFAULT_PORT);

    let omero_bin = args
        .omero_bin
        .clone()
        .or_else(|| from_context(|context| context.omero_bin.as_ref()))
        .unwrap_or_else(|| DEFAULT_OMERO_BIN.to_owned());

    let local = args.local || context.is_some_and(|context| context.local);
    let runner: Box<dyn Runner> = if local {
        debug!("Running the OMERO CLI directly");
        Box::new(LocalRunner)
    } else {
        let engine = args
            .engine
            .clone()
            .or_else(|| from_context(|context| context.engine.as_ref()))
            .unwrap_or_else(|| DEFAULT_ENGINE.to_owned());
        let container = args
            .container
            .clone()
            .or_else(|| from_context(|context| context.container.as_ref()))
            .unwrap_or_else(|| DEFAULT_CONTAINER.to_owned());
        debug!("Running the OMERO CLI through `{engine} exec {container}`");
        Box::new(ContainerRunner::new(engine, container))
    };

    if password == DEFAULT_PASSWORD && user == DEFAULT_USER {
        debug!("Using the default OMERO credentials");
    }

    Client::new(
        ClientConfig {
            omero_bin,
            connection: Connection {
                user,
                password,
                host,
                port,
            },
        },
        runner,
    )
}

fn data_dir_from_context(context: Option<&ContextConfig>) -> &str {
    context
        .and_then(|context| context.data_dir.as_deref())
        .unwrap_or(DEFAULT_DATA_DIR)
}

fn find_configuration(args: &Args) -> Result<PathBuf> {
    let config_path = if let Some(config_path) = args.config.clone() {
        if !config_path.exists() {
            warn!(
                "Configuration file `{}` doesn't exist.",
                config_path.display()
            );
        }
        config_path
    } else {
        let mut config_path =
            dirs::config_dir().context("Could not get path to the user's config directory")?;
        config_path.push("omero-seed");
        fs::create_dir_all(&config_path).with_context(|| {
            format!(
                "Could not create config directory {}",
                config_path.display()
            )
        })?;
        config_path.push("contexts.json");
        config_path
    };
    Ok(config_path)
}

fn main() {
    let args = Args::from_args();
    init_env_logger(args.verbose);

    if let Err(error) = run(args) {
        error!("An error occurred:");
        for cause in error.chain() {
            error!(" |- {cause}");
        }

        #[cfg(feature = "backtrace")]
        {
            error!("{}", error.backtrace());
        }

        process::exit(1);
    }
}

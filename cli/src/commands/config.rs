use colored::Colorize;
use log::{error, info, warn};
use prettytable::row;
use std::path::Path;
use structopt::StructOpt;

use crate::{
    config::{self, ContextConfig, SeedConfig},
    printer::new_table,
    utils,
};
use anyhow::{anyhow, Result};

#[derive(Debug, StructOpt)]
pub enum ConfigArgs {
    #[structopt(name = "add")]
    /// Add a new context to the config file, or modify an existing one
    AddContext {
        #[structopt(long = "name", short = "n")]
        /// The name of the context that will be created or updated
        name: Option<String>,

        #[structopt(long = "engine")]
        /// Container engine used to exec into the server container
        engine: Option<String>,

        #[structopt(long = "container")]
        /// Name of the server container
        container: Option<String>,

        #[structopt(long = "local")]
        /// Run the OMERO CLI directly instead of through the container engine
        local: bool,

        #[structopt(long = "omero-bin")]
        /// Path to the OMERO CLI as seen from where it runs
        omero_bin: Option<String>,

        #[structopt(long = "server")]
        /// Server host name
        host: Option<String>,

        #[structopt(long = "port")]
        /// Server port
        port: Option<u16>,

        #[structopt(long = "user")]
        /// User name
        user: Option<String>,

        #[structopt(long = "password")]
        /// Password, stored in cleartext
        password: Option<String>,

        #[structopt(long = "data-dir")]
        /// Directory holding the images to import
        data_dir: Option<String>,
    },

    #[structopt(name = "current")]
    /// Display the current context
    CurrentContext,

    #[structopt(name = "delete")]
    /// Delete the specified context from the config file
    DeleteContext {
        /// The name(s) of the context(s) which will be deleted
        names: Vec<String>,
    },

    #[structopt(name = "ls")]
    /// List available contexts in the config file
    ListContexts {
        #[structopt(long = "passwords")]
        /// Show passwords (by default passwords are hidden).
        passwords: bool,
    },

    #[structopt(name = "use")]
    /// Set the current context in the config file
    UseContext {
        /// The name of the context.
        name: String,
    },
}

pub fn run(
    args: &ConfigArgs,
    mut config: SeedConfig,
    config_path: impl AsRef<Path>,
) -> Result<SeedConfig> {
    match args {
        ConfigArgs::ListContexts { passwords } if config.num_contexts() > 0 => {
            let mut contexts = config.get_all_contexts().clone();
            contexts.sort_unstable_by(|lhs, rhs| lhs.name.cmp(&rhs.name));
            let mut table = new_table();
            table.set_titles(
                row![bFg => "Active", "Context", "Exec", "Server", "User", "Password", "Data Dir"],
            );
            for context in contexts.iter() {
                let active = config
                    .get_current_context()
                    .is_some_and(|current_context| current_context.name == context.name);
                table.add_row(row![
                    if active { "    ->" } else { "" },
                    if active {
                        context.name.bold().bright_white()
                    } else {
                        context.name.normal()
                    },
                    describe_exec(context),
                    format!(
                        "{}:{}",
                        context.host.as_deref().unwrap_or("-"),
                        context
                            .port
                            .map(|port| port.to_string())
                            .unwrap_or_else(|| "-".to_owned())
                    ),
                    context.user.as_deref().unwrap_or(""),
                    match (&context.password, passwords) {
                        (None, _) => String::new(),
                        (Some(password), true) => password.clone(),
                        (Some(_), false) => "<Hidden>".into(),
                    },
                    context.data_dir.as_deref().unwrap_or("")
                ]);
            }
            table.printstd();
        }
        ConfigArgs::ListContexts { .. } => {
            info!("No available contexts.");
        }
        ConfigArgs::AddContext {
            name,
            engine,
            container,
            local,
            omero_bin,
            host,
            port,
            user,
            password,
            data_dir,
        } => {
            let name = read_context_name(name)?;
            let existing_context = config.get_context(&name).cloned().unwrap_or_default();
            if existing_context.name.is_empty() {
                info!("A new context `{}` will be created.", name);
            } else {
                info!("Context `{}` already exists, it will be modified.", name);
            }

            // Only the fields that were given replace the existing ones.
            let context = ContextConfig {
                name: name.clone(),
                engine: engine.clone().or(existing_context.engine),
                container: container.clone().or(existing_context.container),
                local: *local || existing_context.local,
                omero_bin: omero_bin.clone().or(existing_context.omero_bin),
                host: host.clone().or(existing_context.host),
                port: port.or(existing_context.port),
                user: user.clone().or(existing_context.user),
                password: password.clone().or(existing_context.password),
                data_dir: data_dir.clone().or(existing_context.data_dir),
            };
            add_or_edit_context(context, &mut config, &config_path)?;
        }
        ConfigArgs::UseContext { name } => {
            if !config.set_current_context(name) {
                error!(
                    "No such context `{}` exists in `{}`.",
                    name,
                    config_path.as_ref().display()
                );
            } else {
                config::write_seed_config(config_path, &config)?;
                info!("Switched to context `{}`.", name);
            }
        }
        ConfigArgs::CurrentContext => config.get_current_context().map_or_else(
            || info!("There is no default context in use."),
            |current_context| println!("{}", current_context.name),
        ),
        ConfigArgs::DeleteContext { names } => {
            for name in names {
                if config.delete_context(name) {
                    config::write_seed_config(&config_path, &config)?;
                    info!(
                        "Deleted context `{}` from `{}`.",
                        name,
                        config_path.as_ref().display()
                    );
                } else {
                    error!(
                        "No such context `{}` exists in `{}`.",
                        name,
                        config_path.as_ref().display()
                    );
                }
            }
        }
    }
    Ok(config)
}

fn describe_exec(context: &ContextConfig) -> String {
    if context.local {
        "local".to_owned()
    } else {
        format!(
            "{} exec {}",
            context.engine.as_deref().unwrap_or("-"),
            context.container.as_deref().unwrap_or("-")
        )
    }
}

fn read_context_name(name: &Option<String>) -> Result<String> {
    if let Some(name) = name {
        return if name.is_empty() {
            Err(anyhow!("Context name cannot be empty."))
        } else {
            Ok(name.clone())
        };
    }
    loop {
        let name = utils::prompt_line("Context name")?;
        if !name.is_empty() {
            return Ok(name);
        }
        error!("Context name cannot be empty.");
    }
}

fn add_or_edit_context(
    context: ContextConfig,
    config: &mut SeedConfig,
    config_path: impl AsRef<Path>,
) -> Result<()> {
    let name = context.name.clone();
    if context.password.is_some() {
        warn!(
            "Be careful, passwords are stored in cleartext in {}.",
            config_path.as_ref().display()
        );
    }

    let update_existing = config.set_context(context);
    if !update_existing && config.num_contexts() == 1 {
        info!("Default context set to `{}`.", name);
        config.set_current_context(&name);
    }

    config::write_seed_config(config_path, config)?;

    if update_existing {
        info!("Context `{}` was updated.", name);
    } else {
        info!("New context `{}` was created.", name);
    }

    Ok(())
}

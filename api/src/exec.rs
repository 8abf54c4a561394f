//! Running commands, either directly or through a container exec wrapper.
//!
//! Every interaction with the server goes through a [`Runner`]: the client only builds
//! argument vectors and interprets the captured output. This keeps the client free of
//! process handling and lets tests substitute a scripted runner.

use log::debug;
use std::{
    fmt::{self, Debug, Display},
    process::Command,
};

use crate::error::{Error, Result};

const REDACTED: &str = "***";

/// A command line to run. Arguments flagged as secret are masked when displayed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandLine {
    args: Vec<String>,
    secret: Vec<bool>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            args: vec![program.into()],
            secret: vec![false],
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self.secret.push(false);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self.secret.push(true);
        self
    }

    pub fn program(&self) -> &str {
        &self.args[0]
    }

    pub fn as_args(&self) -> &[String] {
        &self.args
    }

    /// Wrap this command line after a prefix, e.g. `docker exec <container>`.
    pub fn wrapped_in(self, prefix: &[&str]) -> Self {
        let mut wrapped = CommandLine {
            args: prefix.iter().map(|arg| (*arg).to_owned()).collect(),
            secret: vec![false; prefix.len()],
        };
        wrapped.args.extend(self.args);
        wrapped.secret.extend(self.secret);
        wrapped
    }
}

impl Display for CommandLine {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (arg, secret)) in self.args.iter().zip(&self.secret).enumerate() {
            if index > 0 {
                formatter.write_str(" ")?;
            }
            if *secret {
                formatter.write_str(REDACTED)?;
            } else if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(formatter, "{arg:?}")?;
            } else {
                formatter.write_str(arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait Runner: Debug {
    /// Run a command to completion and capture its output. A non-zero exit is not an error
    /// at this level; only failing to start the command is.
    fn run(&self, command: &CommandLine) -> Result<CommandOutput>;
}

/// Runs commands on the local host.
#[derive(Clone, Debug, Default)]
pub struct LocalRunner;

impl Runner for LocalRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        spawn(command)
    }
}

/// Runs commands inside a running container, e.g. `docker exec omero-server ...`.
#[derive(Clone, Debug)]
pub struct ContainerRunner {
    engine: String,
    container: String,
}

impl ContainerRunner {
    pub fn new(engine: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            container: container.into(),
        }
    }
}

impl Runner for ContainerRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        spawn(
            &command
                .clone()
                .wrapped_in(&[self.engine.as_str(), "exec", self.container.as_str()]),
        )
    }
}

fn spawn(command: &CommandLine) -> Result<CommandOutput> {
    let (program, args) = command.as_args().split_first().ok_or(Error::EmptyCommand)?;
    if program.is_empty() {
        return Err(Error::EmptyCommand);
    }
    debug!("Running `{command}`");

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| Error::Spawn {
            program: program.clone(),
            source,
        })?;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("OMERO CLI `{}` is missing or not executable", path)]
    CliNotExecutable { path: String },

    #[error("Data directory `{}` does not exist or is not mounted", path)]
    DataDirMissing { path: String },

    #[error("Server not ready after {} attempts", attempts)]
    NotReady {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("Command `{}` failed with {}: {}", command, exit_status(*code), stderr.trim())]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Could not run `{}`", program)]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Refusing to run an empty command")]
    EmptyCommand,

    #[error("Expected a {} identifier of the form `{}:<id>`, got: {}", kind, kind, identifier)]
    BadIdentifier {
        kind: &'static str,
        identifier: String,
    },

    #[error("Unexpected output from `{}`: {:?}", command, output)]
    BadResponse { command: String, output: String },
}

fn exit_status(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (killed by signal)".to_owned(),
    }
}

impl Error {
    /// Whether the error came from the remote command itself rather than from the exec wrapper.
    pub fn is_command_failure(&self) -> bool {
        matches!(self, Error::CommandFailed { .. })
    }
}

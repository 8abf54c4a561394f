//! An in-memory stand-in for a container running an OMERO server, for unit tests.

use omero_client::{exec::CommandLine, Client, CommandOutput, Config, Connection, Result, Runner};
use std::{cell::RefCell, rc::Rc};

pub const OMERO_BIN: &str = "omero";

/// Number of leading connection arguments on every `omero` command line.
const CONNECTION_ARGS: usize = 10;

#[derive(Debug, Default)]
struct State {
    cli_missing: bool,
    data_dir_missing: bool,
    failures_before_ready: u32,
    failing_subcommand: Option<String>,
    files: Vec<String>,
    next_id: u64,
    created: Vec<(String, u64)>,
    commands: Vec<Vec<String>>,
}

#[derive(Debug, Default, Clone)]
pub struct FakeServer {
    state: Rc<RefCell<State>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str) -> Self {
        self.state.borrow_mut().files.push(path.to_owned());
        self
    }

    pub fn without_cli(self) -> Self {
        self.state.borrow_mut().cli_missing = true;
        self
    }

    pub fn without_data_dir(self) -> Self {
        self.state.borrow_mut().data_dir_missing = true;
        self
    }

    /// The readiness query fails this many times before succeeding.
    pub fn ready_after(self, failures: u32) -> Self {
        self.state.borrow_mut().failures_before_ready = failures;
        self
    }

    /// Every `omero <subcommand>` invocation exits with status 1.
    pub fn failing_on(self, subcommand: &str) -> Self {
        self.state.borrow_mut().failing_subcommand = Some(subcommand.to_owned());
        self
    }

    pub fn client(&self) -> Client {
        Client::new(
            Config {
                omero_bin: OMERO_BIN.to_owned(),
                connection: Connection::default(),
            },
            Box::new(self.clone()),
        )
    }

    /// All commands run so far, including preflight checks.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.state.borrow().commands.clone()
    }

    /// The `omero` commands run so far, without the binary and connection arguments.
    pub fn omero_commands(&self) -> Vec<Vec<String>> {
        self.commands()
            .into_iter()
            .filter(|command| command[0] == OMERO_BIN)
            .map(|command| command[CONNECTION_ARGS..].to_vec())
            .collect()
    }

    pub fn count_commands(&self, subcommand: &str) -> usize {
        self.omero_commands()
            .iter()
            .filter(|command| command[0] == subcommand)
            .count()
    }

    /// Objects created so far, as `(kind, id)` in creation order.
    pub fn created(&self) -> Vec<(String, u64)> {
        self.state.borrow().created.clone()
    }

    pub fn created_of_kind(&self, kind: &str) -> usize {
        self.created()
            .iter()
            .filter(|(created_kind, _)| created_kind == kind)
            .count()
    }
}

fn exit(code: i32, stdout: impl Into<String>) -> CommandOutput {
    CommandOutput {
        code: Some(code),
        stdout: stdout.into(),
        stderr: if code == 0 {
            String::new()
        } else {
            "fake server error".to_owned()
        },
    }
}

impl State {
    fn create(&mut self, kind: &str) -> CommandOutput {
        self.next_id += 1;
        self.created.push((kind.to_owned(), self.next_id));
        exit(0, format!("{kind}:{}\n", self.next_id))
    }

    fn omero(&mut self, args: &[String]) -> CommandOutput {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        if self.failing_subcommand.as_deref() == args.first().copied() {
            return exit(1, "");
        }

        match args.as_slice() {
            ["hql", .., query] => {
                if self.failures_before_ready > 0 {
                    self.failures_before_ready -= 1;
                    return exit(1, "");
                }
                let kind = query
                    .split_whitespace()
                    .skip_while(|word| *word != "FROM")
                    .nth(1)
                    .unwrap_or_default();
                let count = self
                    .created
                    .iter()
                    .filter(|(created_kind, _)| created_kind == kind)
                    .count();
                exit(0, format!("0,{count}\n"))
            }
            ["obj", "new", kind, ..] => self.create(kind),
            ["obj", "map-set", ..] => exit(0, ""),
            ["import", "-d", _, _] => self.create("Image"),
            _ => exit(2, ""),
        }
    }
}

impl Runner for FakeServer {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        let args = command.as_args().to_vec();
        let mut state = self.state.borrow_mut();
        state.commands.push(args.clone());

        Ok(match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["test", "-x", _] => exit(if state.cli_missing { 1 } else { 0 }, ""),
            ["test", "-d", _] => exit(if state.data_dir_missing { 1 } else { 0 }, ""),
            ["find", dir, ..] => {
                let prefix = format!("{}/", dir.trim_end_matches('/'));
                let listing: String = state
                    .files
                    .iter()
                    .filter(|path| path.starts_with(&prefix))
                    .map(|path| format!("{path}\n"))
                    .collect();
                exit(0, listing)
            }
            [OMERO_BIN, ..] => state.omero(&args[CONNECTION_ARGS..]),
            _ => exit(127, ""),
        })
    }
}

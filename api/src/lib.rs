#![deny(clippy::all)]
//! A thin, typed client over the OMERO command line interface.
//!
//! The client never talks to the server directly: every operation is a single `omero`
//! invocation run through a [`Runner`], typically `docker exec` into the server container.
//! Creation operations return typed identifiers which later operations take as input, so a
//! link can only reference objects that were already created.

mod error;
pub mod exec;
pub mod resources;
pub mod retry;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    exec::CommandLine,
    resources::{find_created, image::parse_imported, ObjectId},
};

pub use crate::{
    error::{Error, Result},
    exec::{CommandOutput, ContainerRunner, LocalRunner, Runner},
    resources::{
        annotation::{MapAnnotation, MapAnnotationId, NewMapAnnotation, Tag, TagId},
        dataset::{Dataset, DatasetId, NewDataset},
        image::{ImageId, Import},
        link::{AnnotationRef, AnnotationTarget, Link, LinkId},
        project::{NewProject, Project, ProjectId},
    },
    retry::ReadinessConfig,
};

pub const DEFAULT_OMERO_BIN: &str = "/opt/omero/server/venv3/bin/omero";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 4064;
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_PASSWORD: &str = "omero";

/// Query used to check that the server accepts requests.
pub const READINESS_QUERY: &str = "SELECT count(p) FROM Project p";

/// Server login details, passed on every invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl Default for Connection {
    fn default() -> Self {
        Connection {
            user: DEFAULT_USER.to_owned(),
            password: DEFAULT_PASSWORD.to_owned(),
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
        }
    }
}

pub struct Config {
    /// Path to the `omero` executable, as seen by the runner.
    pub omero_bin: String,
    pub connection: Connection,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            omero_bin: DEFAULT_OMERO_BIN.to_owned(),
            connection: Connection::default(),
        }
    }
}

#[derive(Debug)]
pub struct Client {
    runner: Box<dyn Runner>,
    omero_bin: String,
    connection: Connection,
}

impl Client {
    /// Create a new client running commands through `runner`.
    pub fn new(config: Config, runner: Box<dyn Runner>) -> Client {
        Client {
            runner,
            omero_bin: config.omero_bin,
            connection: config.connection,
        }
    }

    pub fn omero_bin(&self) -> &str {
        &self.omero_bin
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Checks that the `omero` executable exists and is executable.
    pub fn check_cli(&self) -> Result<()> {
        let output = self
            .runner
            .run(&CommandLine::new("test").args(["-x", self.omero_bin.as_str()]))?;
        if output.success() {
            Ok(())
        } else {
            Err(Error::CliNotExecutable {
                path: self.omero_bin.clone(),
            })
        }
    }

    /// Checks that `path` is a directory.
    pub fn check_directory(&self, path: &str) -> Result<()> {
        let output = self.runner.run(&CommandLine::new("test").args(["-d", path]))?;
        if output.success() {
            Ok(())
        } else {
            Err(Error::DataDirMissing {
                path: path.to_owned(),
            })
        }
    }

    /// Lists the regular files directly under `path`, sorted.
    pub fn list_files(&self, path: &str) -> Result<Vec<String>> {
        let command =
            CommandLine::new("find").args([path, "-maxdepth", "1", "-type", "f"]);
        let stdout = self.checked(&command)?;
        let mut files: Vec<String> = stdout
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        files.sort();
        Ok(files)
    }

    /// Runs the readiness query once.
    pub fn ping(&self) -> Result<()> {
        self.count(READINESS_QUERY).map(|_| ())
    }

    /// Waits for the server to answer the readiness query. See [`retry::wait_until_ready`].
    pub fn wait_until_ready(&self, config: &ReadinessConfig) -> Result<u32> {
        retry::wait_until_ready(config, || {
            self.ping().map_err(|error| {
                if !error.is_command_failure() {
                    warn!("{error}");
                }
                error
            })
        })
    }

    /// Runs a single-value HQL count query.
    pub fn count(&self, query: &str) -> Result<u64> {
        let command = self.omero(["hql", "--style", "plain", "--quiet", query]);
        let stdout = self.checked(&command)?;
        parse_count(&stdout).ok_or_else(|| Error::BadResponse {
            command: command.to_string(),
            output: stdout,
        })
    }

    pub fn create_dataset(&self, dataset: NewDataset) -> Result<Dataset> {
        let id = self.create_object("Dataset", dataset.name, dataset.description)?;
        Ok(Dataset {
            id: DatasetId(id),
            name: dataset.name.to_owned(),
        })
    }

    pub fn create_project(&self, project: NewProject) -> Result<Project> {
        let id = self.create_object("Project", project.name, project.description)?;
        Ok(Project {
            id: ProjectId(id),
            name: project.name.to_owned(),
        })
    }

    pub fn create_tag(&self, name: &str) -> Result<Tag> {
        let text_value = format!("textValue={name}");
        let command = self.omero(["obj", "new", TagId::KIND, text_value.as_str()]);
        let id = self.run_create(TagId::KIND, &command)?;
        Ok(Tag {
            id: TagId(id),
            name: name.to_owned(),
        })
    }

    /// Creates a map annotation, then sets each pair in order with `obj map-set`.
    pub fn create_map_annotation(&self, annotation: NewMapAnnotation) -> Result<MapAnnotation> {
        let mut args = vec!["obj".to_owned(), "new".to_owned(), MapAnnotationId::KIND.to_owned()];
        if let Some(namespace) = annotation.namespace {
            args.push(format!("ns={namespace}"));
        }
        let command = self.omero(args);
        let id = MapAnnotationId(self.run_create(MapAnnotationId::KIND, &command)?);

        let reference = id.reference();
        for &(key, value) in annotation.pairs {
            self.checked(&self.omero([
                "obj",
                "map-set",
                reference.as_str(),
                "mapValue",
                key,
                value,
            ]))?;
        }

        Ok(MapAnnotation {
            id,
            namespace: annotation.namespace.map(str::to_owned),
            pairs: annotation
                .pairs
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect(),
        })
    }

    pub fn link_dataset_to_project(&self, project: ProjectId, dataset: DatasetId) -> Result<Link> {
        self.create_link(
            "ProjectDatasetLink",
            project.reference(),
            dataset.reference(),
        )
    }

    pub fn link_annotation(
        &self,
        target: impl Into<AnnotationTarget>,
        annotation: impl Into<AnnotationRef>,
    ) -> Result<Link> {
        let target = target.into();
        self.create_link(
            target.link_kind(),
            target.reference(),
            annotation.into().reference(),
        )
    }

    /// Imports one file into `dataset`.
    pub fn import(&self, dataset: DatasetId, path: &str) -> Result<Import> {
        let target = dataset.reference();
        let command = self.omero(["import", "-d", target.as_str(), path]);
        let stdout = self.checked(&command)?;
        let images = parse_imported(&stdout);
        if images.is_empty() {
            warn!("Import of `{path}` reported no image ids.");
        }
        Ok(Import {
            path: path.to_owned(),
            dataset,
            images,
        })
    }

    fn create_object(
        &self,
        kind: &'static str,
        name: &str,
        description: Option<&str>,
    ) -> Result<u64> {
        let mut args = vec![
            "obj".to_owned(),
            "new".to_owned(),
            kind.to_owned(),
            format!("name={name}"),
        ];
        if let Some(description) = description {
            args.push(format!("description={description}"));
        }
        self.run_create(kind, &self.omero(args))
    }

    fn create_link(&self, kind: &'static str, parent: String, child: String) -> Result<Link> {
        let command = self.omero([
            "obj".to_owned(),
            "new".to_owned(),
            kind.to_owned(),
            format!("parent={parent}"),
            format!("child={child}"),
        ]);
        let id = LinkId(self.run_create(kind, &command)?);
        Ok(Link {
            kind,
            id,
            parent,
            child,
        })
    }

    fn run_create(&self, kind: &'static str, command: &CommandLine) -> Result<u64> {
        let stdout = self.checked(command)?;
        find_created(kind, &command.to_string(), &stdout)
    }

    /// Builds `omero -u <user> -w <password> -s <host> -p <port> -C <args...>`.
    fn omero<I, S>(&self, args: I) -> CommandLine
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandLine::new(self.omero_bin.as_str())
            .arg("-u")
            .arg(self.connection.user.as_str())
            .arg("-w")
            .secret_arg(self.connection.password.as_str())
            .arg("-s")
            .arg(self.connection.host.as_str())
            .arg("-p")
            .arg(self.connection.port.to_string())
            .arg("-C")
            .args(args)
    }

    /// Runs a command, turning a non-zero exit into [`Error::CommandFailed`].
    fn checked(&self, command: &CommandLine) -> Result<String> {
        let output = self.runner.run(command)?;
        if output.success() {
            debug!("`{command}` succeeded");
            Ok(output.stdout)
        } else {
            Err(Error::CommandFailed {
                command: command.to_string(),
                code: output.code,
                stderr: output.stderr,
            })
        }
    }
}

static RX_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*$").expect("regex is well-formed"));

/// `hql --style plain` prints `<row>,<value>`; the count is the last number of the last
/// non-empty line.
fn parse_count(stdout: &str) -> Option<u64> {
    let line = stdout.lines().rev().find(|line| !line.trim().is_empty())?;
    RX_COUNT.captures(line)?[1].parse().ok()
}

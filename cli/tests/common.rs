use once_cell::sync::Lazy;
use std::{
    env,
    ffi::OsStr,
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    process::{Command, Output},
};
use uuid::Uuid;

/// Stands in for the OMERO CLI: logs each invocation, then answers `hql`, `obj new` and
/// `import` the way the real CLI does. While a file named `unready` exists next to the
/// script every query fails.
const FAKE_OMERO: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
echo "$*" >> "$dir/commands.log"
while [ $# -gt 0 ]; do
    case "$1" in
        -u|-w|-s|-p) shift 2 ;;
        -C) shift ;;
        *) break ;;
    esac
done
next_id() {
    n=$(cat "$dir/counter" 2>/dev/null || echo 0)
    n=$((n + 1))
    echo "$n" > "$dir/counter"
    echo "$n"
}
case "$1" in
    hql)
        if [ -f "$dir/unready" ]; then
            echo "Connection refused" >&2
            exit 1
        fi
        echo "0,0"
        ;;
    obj)
        if [ "$2" = new ]; then
            echo "$3:$(next_id)"
        fi
        ;;
    import)
        echo "Image:$(next_id)"
        ;;
    *)
        exit 2
        ;;
esac
"#;

pub struct TestCli {
    cli_path: PathBuf,
}

impl TestCli {
    pub fn get() -> &'static Self {
        static TEST_CLI: Lazy<TestCli> = Lazy::new(|| {
            let cli_path = env::current_exe()
                .ok()
                .and_then(|p| Some(p.parent()?.parent()?.join("omero-seed")))
                .expect("Could not resolve CLI executable from test executable");

            TestCli { cli_path }
        });

        &TEST_CLI
    }

    /// A command running against `server`, with its own empty config file and no
    /// credentials inherited from the environment.
    pub fn command(&self, server: &FakeOmero) -> Command {
        let mut command = Command::new(&self.cli_path);

        command
            .env_remove("OMERO_USER")
            .env_remove("OMERO_PASS")
            .env_remove("RUST_LOG")
            .arg("--config-file")
            .arg(server.root().join("contexts.json"))
            .arg("--local")
            .arg("--omero-bin")
            .arg(server.omero_bin());

        command
    }

    pub fn run(&self, server: &FakeOmero, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> String {
        self.output(self.command(server).args(args))
    }

    pub fn run_and_error(
        &self,
        server: &FakeOmero,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> String {
        self.output_error(self.command(server).args(args))
    }

    pub fn output(&self, command: &mut Command) -> String {
        let output = run_command(command);

        if !output.status.success() {
            panic!(
                "failed to run command:\n{}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        String::from_utf8(output.stdout).unwrap()
    }

    pub fn output_error(&self, command: &mut Command) -> String {
        let output = run_command(command);

        if output.status.success() {
            panic!(
                "succeeded running command (expected failure):\n{}",
                String::from_utf8_lossy(&output.stdout)
            );
        }
        assert_eq!(output.status.code(), Some(1));

        String::from_utf8(output.stderr).unwrap()
    }
}

fn run_command(command: &mut Command) -> Output {
    command.output().unwrap()
}

/// A scratch directory holding a fake `omero` script and a `data` directory of images.
/// Removed on drop.
pub struct FakeOmero {
    root: PathBuf,
}

impl FakeOmero {
    pub fn new() -> Self {
        let root = env::temp_dir().join(format!("omero-seed-{}", Uuid::new_v4()));
        fs::create_dir_all(root.join("data")).unwrap();

        let omero_bin = root.join("omero");
        fs::write(&omero_bin, FAKE_OMERO).unwrap();
        fs::set_permissions(&omero_bin, fs::Permissions::from_mode(0o755)).unwrap();

        Self { root }
    }

    pub fn with_files(self, names: &[&str]) -> Self {
        for name in names {
            fs::write(self.data_dir().join(name), b"").unwrap();
        }
        self
    }

    pub fn unready(self) -> Self {
        fs::write(self.root.join("unready"), b"").unwrap();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn omero_bin(&self) -> PathBuf {
        self.root.join("omero")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Every invocation of the fake CLI so far, one line of arguments each.
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(self.root.join("commands.log"))
            .map(|log| log.lines().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Invocations with the leading connection arguments stripped.
    pub fn subcommands(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .map(|line| match line.split_once(" -C ") {
                Some((_, subcommand)) => subcommand.to_owned(),
                None => line,
            })
            .collect()
    }
}

impl Drop for FakeOmero {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

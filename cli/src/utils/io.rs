use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use env_logger::Builder as LogBuilder;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    env,
    io::{self, BufRead, Write},
};

/// Log targets that follow `--verbose`. Everything else only logs warnings and errors.
const OWN_TARGETS: [&str; 2] = ["omero_seed", "omero_client"];

/// One-letter level markers, indexed by `Level as usize - 1`.
static LEVEL_PREFIXES: Lazy<[ColoredString; 5]> = Lazy::new(|| {
    [
        "E".red().bold(),
        "W".yellow().bold(),
        "I".green(),
        "D".normal(),
        "T".dimmed(),
    ]
});

static PROMPT_PREFIX: Lazy<ColoredString> = Lazy::new(|| "?".blue().bold());

pub fn level_prefix(level: Level) -> &'static ColoredString {
    &LEVEL_PREFIXES[level as usize - 1]
}

/// Logs to stderr. `RUST_LOG` filters are applied on top of the defaults. With `verbose`,
/// each line also names the module it came from.
pub fn init_env_logger(verbose: bool) {
    let own_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = LogBuilder::new();
    builder
        .format(move |formatter, record| {
            let prefix = level_prefix(record.level());
            if verbose {
                writeln!(formatter, "{prefix} [{}] {}", record.target(), record.args())
            } else {
                writeln!(formatter, "{prefix} {}", record.args())
            }
        })
        .filter_level(LevelFilter::Warn);
    for target in OWN_TARGETS {
        builder.filter_module(target, own_level);
    }

    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder.init();
}

/// Prompts on stderr and reads one trimmed line from stdin.
pub fn prompt_line(message: &str) -> Result<String> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "{} {message}: ", *PROMPT_PREFIX)
        .and_then(|_| stderr.flush())
        .context("Failed to write prompt.")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin.")?;
    Ok(line.trim().to_owned())
}

use anyhow::{anyhow, Context, Error, Result};
use glob::{MatchOptions, Pattern};
use std::{fmt, str::FromStr};

/// Hidden files are only matched by a pattern that itself starts with `.`, as in the shell.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// A shell-style file name pattern, matched against the final component of a path.
#[derive(Debug, Clone)]
pub struct FilePattern {
    pattern: Pattern,
}

impl FilePattern {
    pub fn new(glob: &str) -> Result<Self> {
        if glob.is_empty() {
            return Err(anyhow!("File pattern cannot be empty"));
        }
        if glob.contains('/') {
            return Err(anyhow!(
                "File pattern `{glob}` must match file names, not paths"
            ));
        }

        let pattern = Pattern::new(glob)
            .with_context(|| format!("Could not compile file pattern `{glob}`"))?;
        Ok(Self { pattern })
    }

    /// Whether the final component of `path` matches.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches_with(file_name(path), MATCH_OPTIONS)
    }
}

impl FromStr for FilePattern {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self> {
        Self::new(string)
    }
}

impl fmt::Display for FilePattern {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.pattern.as_str())
    }
}

/// The last `/`-separated component of a path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

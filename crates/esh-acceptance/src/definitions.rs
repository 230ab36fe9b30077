//! Suite definitions: which shell to test and how to talk to it.
//!
//! Definitions are read from a TOML file and may be overridden from the
//! environment:
//!
//! ```toml
//! shell = "./esh"
//! prompt = "esh> "
//! logfile = "session.log"   # "-" mirrors the session to stdout
//! plugin_dir = "plugins/"
//! timeout_secs = 10
//! ```
//!
//! | Variable         | Field          |
//! |------------------|----------------|
//! | `ESH_SHELL`      | `shell`        |
//! | `ESH_PROMPT`     | `prompt`       |
//! | `ESH_LOGFILE`    | `logfile`      |
//! | `ESH_PLUGIN_DIR` | `plugin_dir`   |
//! | `ESH_TIMEOUT`    | `timeout_secs` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use esh_expect::{Pattern, SessionConfig};
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ESH";

/// Prompt printed by shells that do not configure one.
pub const DEFAULT_PROMPT: &str = "esh> ";

/// Plugin directory handed to the shell when none is configured.
pub const DEFAULT_PLUGIN_DIR: &str = "plugins/";

/// Default expect timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Log destination that means "standard output".
const STDOUT_LOG: &str = "-";

/// Errors raised while loading definitions.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionsError {
    /// The definitions file could not be read.
    #[error("cannot read definitions {path}: {source}")]
    Read {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The definitions file is not valid TOML for this schema.
    #[error("invalid definitions: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {name}")]
    InvalidOverride {
        /// The environment variable.
        name: String,
        /// Its value.
        value: String,
    },

    /// The prompt is not a valid regular expression.
    #[error("invalid prompt pattern: {0}")]
    InvalidPrompt(#[from] regex::Error),

    /// A required field is missing or empty.
    #[error("missing {0}")]
    Missing(&'static str),
}

/// Typed suite configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Definitions {
    /// Path to the shell under test.
    pub shell: String,

    /// Regular expression matching the shell's prompt.
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Where to mirror the raw session; `-` for stdout.
    #[serde(default)]
    pub logfile: Option<String>,

    /// Extra arguments passed to the shell on every spawn.
    #[serde(default)]
    pub args: Vec<String>,

    /// Plugin directory, passed as `-p <dir>` to scenarios that use plugins.
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: PathBuf,

    /// Default expect timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Working directory for the shell.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from(DEFAULT_PLUGIN_DIR)
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Definitions {
    /// Definitions for `shell` with every other field defaulted.
    #[must_use]
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            prompt: default_prompt(),
            logfile: None,
            args: Vec::new(),
            plugin_dir: default_plugin_dir(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            working_dir: None,
        }
    }

    /// Load from a TOML file and apply `ESH_*` overrides from the process
    /// environment.
    pub fn load(path: &Path) -> Result<Self, DefinitionsError> {
        let text = std::fs::read_to_string(path).map_err(|source| DefinitionsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut definitions = Self::from_toml(&text)?;
        definitions.apply_overrides(|name| std::env::var(name).ok())?;
        definitions.validate()?;

        tracing::debug!(path = %path.display(), shell = %definitions.shell, "loaded definitions");
        Ok(definitions)
    }

    /// Parse definitions from TOML text without consulting the environment.
    pub fn from_toml(text: &str) -> Result<Self, DefinitionsError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply overrides looked up by full variable name (`ESH_SHELL`, ...).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), DefinitionsError> {
        let var = |field: &str| {
            let name = format!("{ENV_PREFIX}_{field}");
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, shell)) = var("SHELL") {
            self.shell = shell;
        }
        if let Some((_, prompt)) = var("PROMPT") {
            self.prompt = prompt;
        }
        if let Some((_, logfile)) = var("LOGFILE") {
            self.logfile = (!logfile.is_empty()).then_some(logfile);
        }
        if let Some((_, dir)) = var("PLUGIN_DIR") {
            self.plugin_dir = PathBuf::from(dir);
        }
        if let Some((name, value)) = var("TIMEOUT") {
            self.timeout_secs = value
                .trim()
                .parse()
                .map_err(|_| DefinitionsError::InvalidOverride { name, value })?;
        }

        Ok(())
    }

    /// Check that the definitions can drive a session.
    pub fn validate(&self) -> Result<(), DefinitionsError> {
        if self.shell.trim().is_empty() {
            return Err(DefinitionsError::Missing("shell"));
        }
        self.prompt_pattern()?;
        Ok(())
    }

    /// The prompt as an expect pattern.
    pub fn prompt_pattern(&self) -> Result<Pattern, DefinitionsError> {
        Ok(Pattern::regex(&self.prompt)?)
    }

    /// The default expect timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the session configuration for one scenario.
    ///
    /// With `plugins`, `-p <plugin_dir>` follows the configured arguments.
    #[must_use]
    pub fn session_config(&self, plugins: bool) -> SessionConfig {
        let mut args = self.args.clone();
        if plugins {
            args.push("-p".to_string());
            args.push(self.plugin_dir.display().to_string());
        }

        let mut config = SessionConfig::new(&self.shell).args(args).timeout(self.timeout());
        if let Some(ref dir) = self.working_dir {
            config = config.working_dir(dir);
        }
        match self.logfile.as_deref() {
            Some(STDOUT_LOG) => config.logging = config.logging.log_user(true),
            Some(path) => config.logging = config.logging.log_file(path),
            None => {}
        }

        config
    }
}

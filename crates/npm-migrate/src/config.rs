//! Configuration types for npm-migrate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main migration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Source registry (GitHub Packages) configuration.
    pub source: SourceConfig,
    /// Destination repository (Artifactory) configuration.
    #[serde(default)]
    pub destination: DestinationConfig,
    /// External tool commands.
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Migration options.
    #[serde(default)]
    pub options: MigrationOptions,
}

/// Whether the registry owner is an organization or a user account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// `/orgs/{owner}` endpoints.
    #[default]
    Orgs,
    /// `/users/{owner}` endpoints.
    Users,
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orgs => write!(f, "orgs"),
            Self::Users => write!(f, "users"),
        }
    }
}

impl FromStr for OwnerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "orgs" | "org" => Ok(Self::Orgs),
            "users" | "user" => Ok(Self::Users),
            other => Err(Error::Config(format!(
                "unknown owner type '{other}', expected 'orgs' or 'users'"
            ))),
        }
    }
}

/// Source registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// REST API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// npm registry URL the packaging tool resolves the scope against.
    #[serde(default = "default_npm_registry_url")]
    pub npm_registry_url: String,
    /// Organization or user owning the packages.
    pub owner: String,
    /// Owner kind.
    #[serde(default)]
    pub owner_kind: OwnerKind,
    /// npm scope, e.g. `@acme`. A missing `@` is added.
    pub scope: String,
    /// Access token with `read:packages`. Usually supplied through `GITHUB_PAT`.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

/// Destination repository configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Artifactory repository name.
    #[serde(default)]
    pub repository: String,
    /// Value passed to the upload tool as `JFROG_CLI_LOG_LEVEL`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            log_level: default_log_level(),
        }
    }
}

/// An external program plus the arguments placed before the subcommand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    /// Program name or path.
    pub program: String,
    /// Leading arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Creates a command with no leading arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends a leading argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// External tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Packaging tool.
    #[serde(default = "default_npm")]
    pub npm: ToolCommand,
    /// Upload tool.
    #[serde(default = "default_jfrog")]
    pub jfrog: ToolCommand,
    /// Per-invocation timeout in seconds.
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            npm: default_npm(),
            jfrog: default_jfrog(),
            timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl ToolsConfig {
    /// Timeout applied to each tool invocation.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Migration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Root of the per-item staging directories.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
    /// Number of concurrent fetches/publishes. 1 keeps the run sequential.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Fetch artifacts but skip the publish phase.
    #[serde(default)]
    pub dry_run: bool,
    /// Page size for registry listings (max 100).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Show progress bars.
    #[serde(default = "default_true")]
    pub progress: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            workers: default_workers(),
            dry_run: false,
            page_size: default_page_size(),
            http_timeout_secs: default_http_timeout_secs(),
            progress: true,
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_npm_registry_url() -> String {
    "https://npm.pkg.github.com".to_string()
}

fn default_log_level() -> String {
    "WARN".to_string()
}

fn default_npm() -> ToolCommand {
    ToolCommand::new("npm")
}

fn default_jfrog() -> ToolCommand {
    ToolCommand::new("jfrog")
}

fn default_tool_timeout_secs() -> u64 {
    300
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("npm_packages_downloaded")
}

fn default_workers() -> usize {
    1
}

fn default_page_size() -> usize {
    100
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Normalizes a scope so it always carries a single leading `@`.
#[must_use]
pub fn normalize_scope(scope: &str) -> String {
    format!("@{}", scope.trim().trim_start_matches('@'))
}

impl MigrationConfig {
    /// Creates a configuration with defaults for everything but the owner and scope.
    pub fn new(owner: impl Into<String>, scope: impl AsRef<str>) -> Self {
        Self {
            source: SourceConfig {
                api_url: default_api_url(),
                npm_registry_url: default_npm_registry_url(),
                owner: owner.into(),
                owner_kind: OwnerKind::default(),
                scope: normalize_scope(scope.as_ref()),
                token: None,
            },
            destination: DestinationConfig::default(),
            tools: ToolsConfig::default(),
            options: MigrationOptions::default(),
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yaml::from_str(&content)?;
        config.source.scope = normalize_scope(&config.source.scope);
        Ok(config)
    }

    /// The registry token, if present and non-blank.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.source
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Validate the configuration.
    ///
    /// The token check comes first so a missing credential is always reported
    /// as [`Error::PreconditionMissing`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.token().is_none() {
            return Err(Error::PreconditionMissing(
                "registry token not set (GITHUB_PAT with 'read:packages' scope)".to_string(),
            ));
        }
        if self.source.owner.trim().is_empty() {
            return Err(Error::Config("owner cannot be empty".to_string()));
        }
        if self.source.scope.trim_start_matches('@').is_empty() {
            return Err(Error::Config("scope cannot be empty".to_string()));
        }
        if !self.options.dry_run && self.destination.repository.trim().is_empty() {
            return Err(Error::Config(
                "destination repository cannot be empty".to_string(),
            ));
        }
        if self.options.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        if self.options.page_size == 0 || self.options.page_size > 100 {
            return Err(Error::Config(
                "page_size must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

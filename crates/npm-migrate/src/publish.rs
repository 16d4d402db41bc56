//! Artifact publishing with `jfrog rt upload`.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::time::Duration;
use tracing::debug;

use crate::config::{MigrationConfig, ToolCommand};
use crate::error::{Error, Result};
use crate::ledger::{LocalArtifact, WorkItem};
use crate::process::run_tool;

/// Environment variable the upload tool reads its verbosity from.
pub const LOG_LEVEL_ENV: &str = "JFROG_CLI_LOG_LEVEL";

/// Uploads local artifacts into the destination repository.
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    /// Destination path of `artifact` in the repository.
    fn destination_path(&self, artifact: &LocalArtifact, item: &WorkItem) -> String;

    /// Uploads `artifact` to [`Self::destination_path`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::PublishFailed`] when the upload fails.
    async fn publish(&self, artifact: &LocalArtifact, item: &WorkItem) -> Result<()>;
}

/// Computes `{repository}/{@scope}/{name}/{version}/{filename}`.
///
/// The `{scope}-` prefix npm puts on packed file names is stripped because
/// the scope is already a directory segment.
#[must_use]
pub fn destination_path(repository: &str, item: &WorkItem, file_name: &str) -> String {
    let scope_prefix = format!("{}-", item.package.scope_label());
    let file_name = file_name.strip_prefix(&scope_prefix).unwrap_or(file_name);
    format!(
        "{}/{}/{}/{}/{}",
        repository.trim_end_matches('/'),
        item.package.scope,
        item.package.name,
        item.version,
        file_name
    )
}

/// [`ArtifactPublisher`] backed by the JFrog CLI.
pub struct JfrogPublisher {
    command: ToolCommand,
    repository: String,
    log_level: String,
    timeout: Duration,
}

impl JfrogPublisher {
    /// Creates a publisher.
    pub fn new(
        command: ToolCommand,
        repository: impl Into<String>,
        log_level: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            command,
            repository: repository.into(),
            log_level: log_level.into(),
            timeout,
        }
    }

    /// Creates a publisher from the migration configuration.
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self::new(
            config.tools.jfrog.clone(),
            config.destination.repository.clone(),
            config.destination.log_level.clone(),
            config.tools.timeout(),
        )
    }
}

#[async_trait]
impl ArtifactPublisher for JfrogPublisher {
    fn destination_path(&self, artifact: &LocalArtifact, item: &WorkItem) -> String {
        destination_path(&self.repository, item, &artifact.file_name())
    }

    async fn publish(&self, artifact: &LocalArtifact, item: &WorkItem) -> Result<()> {
        let target = self.destination_path(artifact, item);
        debug!("Uploading {} to {}", artifact.path.display(), target);

        let output = run_tool(
            &self.command,
            &[
                OsStr::new("rt"),
                OsStr::new("upload"),
                artifact.path.as_os_str(),
                OsStr::new(&target),
            ],
            None,
            &[(LOG_LEVEL_ENV, OsStr::new(&self.log_level))],
            self.timeout,
        )
        .await
        .map_err(|e| Error::PublishFailed {
            item: item.to_string(),
            exit_code: None,
            stdout: String::new(),
            stderr: e.to_string(),
        })?;

        if !output.success {
            return Err(Error::PublishFailed {
                item: item.to_string(),
                exit_code: output.exit_code,
                stdout: output.stdout.trim().to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        if !output.stdout.trim().is_empty() {
            debug!("JFrog CLI output for {}: {}", item, output.stdout.trim());
        }
        Ok(())
    }
}

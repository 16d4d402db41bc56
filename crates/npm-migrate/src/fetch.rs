//! Artifact fetching with `npm pack`.
//!
//! Each fetch runs in the item's staging directory with a freshly written,
//! item-scoped `.npmrc` that maps the scope to the source registry and
//! carries the token. The credential file is removed when the fetch returns.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::{MigrationConfig, ToolCommand};
use crate::error::{Error, Result};
use crate::ledger::{LocalArtifact, WorkItem};
use crate::process::{filter_npm_noise, run_tool};
use crate::registry::common::registry_host_path;
use crate::registry::Package;

/// Credential file name understood by npm.
pub const NPMRC_FILE: &str = ".npmrc";

/// Extension of packed artifacts.
pub const TARBALL_EXTENSION: &str = "tgz";

/// Materializes one work item as a local artifact.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetches `item` into `destination`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailed`] or [`Error::ArtifactNotProduced`] when the
    /// packaging tool fails, and an I/O error if the staging directory cannot
    /// be prepared.
    async fn fetch(&self, item: &WorkItem, destination: &Path) -> Result<LocalArtifact>;
}

/// [`ArtifactFetcher`] backed by `npm pack`.
pub struct NpmPackFetcher {
    command: ToolCommand,
    registry_url: String,
    token: String,
    timeout: Duration,
}

impl NpmPackFetcher {
    /// Creates a fetcher.
    pub fn new(
        command: ToolCommand,
        registry_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            command,
            registry_url: registry_url.into(),
            token: token.into(),
            timeout,
        }
    }

    /// Creates a fetcher from the migration configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionMissing`] if no token is configured.
    pub fn from_config(config: &MigrationConfig) -> Result<Self> {
        let token = config
            .token()
            .ok_or_else(|| Error::PreconditionMissing("registry token not set".to_string()))?;
        Ok(Self::new(
            config.tools.npm.clone(),
            config.source.npm_registry_url.clone(),
            token,
            config.tools.timeout(),
        ))
    }

    /// Contents of the item-scoped `.npmrc`.
    fn npmrc_contents(&self, package: &Package) -> String {
        format!(
            "{}:registry={}\n//{}/:_authToken={}\n",
            package.scope,
            self.registry_url,
            registry_host_path(&self.registry_url),
            self.token
        )
    }
}

#[async_trait]
impl ArtifactFetcher for NpmPackFetcher {
    async fn fetch(&self, item: &WorkItem, destination: &Path) -> Result<LocalArtifact> {
        let dir = std::path::absolute(destination)?;
        tokio::fs::create_dir_all(&dir).await?;

        let credentials =
            CredentialFile::write(&dir, &self.npmrc_contents(&item.package)).await?;
        remove_stale_tarballs(&dir).await?;

        let spec = item.to_string();
        debug!("Packing {} in {}", spec, dir.display());

        let output = run_tool(
            &self.command,
            &[OsStr::new("pack"), OsStr::new(&spec)],
            Some(&dir),
            &[("npm_config_userconfig", credentials.path().as_os_str())],
            self.timeout,
        )
        .await
        .map_err(|e| Error::FetchFailed {
            item: spec.clone(),
            exit_code: None,
            stderr: e.to_string(),
        })?;
        drop(credentials);

        let stderr = filter_npm_noise(&output.stderr);
        if !output.stdout.trim().is_empty() {
            debug!("npm pack output for {}: {}", spec, output.stdout.trim());
        }

        if !output.success {
            return Err(Error::FetchFailed {
                item: spec,
                exit_code: output.exit_code,
                stderr,
            });
        }
        if !stderr.is_empty() {
            warn!("npm pack reported for {}: {}", spec, stderr);
        }

        let path = find_tarball(&dir)
            .await?
            .ok_or_else(|| Error::ArtifactNotProduced {
                item: spec,
                dir: dir.clone(),
            })?;
        let size_bytes = tokio::fs::metadata(&path).await?.len();

        Ok(LocalArtifact { path, size_bytes })
    }
}

/// A credential file that is deleted when dropped.
struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    async fn write(dir: &Path, contents: &str) -> Result<Self> {
        let path = dir.join(NPMRC_FILE);
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.flush().await?;

        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CredentialFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!("Could not remove {}: {}", self.path.display(), e);
        }
    }
}

fn is_tarball(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == TARBALL_EXTENSION)
}

async fn list_tarballs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut tarballs = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_tarball(&path) && entry.file_type().await?.is_file() {
            tarballs.push(path);
        }
    }
    tarballs.sort();
    Ok(tarballs)
}

async fn remove_stale_tarballs(dir: &Path) -> Result<()> {
    for path in list_tarballs(dir).await? {
        debug!("Removing existing tarball: {}", path.display());
        tokio::fs::remove_file(&path).await?;
    }
    Ok(())
}

async fn find_tarball(dir: &Path) -> Result<Option<PathBuf>> {
    Ok(list_tarballs(dir).await?.into_iter().next())
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;

//! Run-scoped record of every fetch and publish outcome.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::registry::Package;

/// One (package, version) pair slated for migration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    /// Package.
    pub package: Package,
    /// Version string as listed by the registry.
    pub version: String,
}

impl WorkItem {
    /// Creates a work item.
    pub fn new(package: Package, version: impl Into<String>) -> Self {
        Self {
            package,
            version: version.into(),
        }
    }

    /// Staging directory for this item under `root`:
    /// `{root}/{scope}_{name}/{version}`, scope without `@`.
    ///
    /// Depends on package and version only, so re-runs reuse the same location.
    #[must_use]
    pub fn staging_dir(&self, root: &Path) -> PathBuf {
        root.join(format!(
            "{}_{}",
            self.package.scope_label(),
            self.package.name
        ))
        .join(&self.version)
    }
}

/// `@scope/name@version`, the package specifier npm accepts.
impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.package, self.version)
    }
}

/// A fetched artifact on local disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalArtifact {
    /// Absolute path of the tarball.
    pub path: PathBuf,
    /// Size in bytes at fetch time.
    pub size_bytes: u64,
}

impl LocalArtifact {
    /// File name of the tarball.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Outcome of a fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchStatus {
    /// The artifact is on disk.
    Succeeded(LocalArtifact),
    /// The fetch failed.
    Failed {
        /// Human-readable error.
        error: String,
    },
}

/// Fetch-phase ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    /// Work item.
    pub item: WorkItem,
    /// Staging directory used for the item.
    pub staging_dir: PathBuf,
    /// Outcome.
    pub status: FetchStatus,
}

impl FetchResult {
    /// The fetched artifact, if the fetch succeeded.
    #[must_use]
    pub fn artifact(&self) -> Option<&LocalArtifact> {
        match &self.status {
            FetchStatus::Succeeded(artifact) => Some(artifact),
            FetchStatus::Failed { .. } => None,
        }
    }

    /// The error, if the fetch failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FetchStatus::Succeeded(_) => None,
            FetchStatus::Failed { error } => Some(error),
        }
    }

    /// Whether the fetch succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.artifact().is_some()
    }
}

/// Outcome of a publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishStatus {
    /// Uploaded.
    Succeeded,
    /// The upload failed.
    Failed {
        /// Human-readable error.
        error: String,
    },
}

/// Publish-phase ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    /// Work item.
    pub item: WorkItem,
    /// Destination path in the repository.
    pub destination: String,
    /// Outcome.
    pub status: PublishStatus,
}

impl PublishResult {
    /// The error, if the publish failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            PublishStatus::Succeeded => None,
            PublishStatus::Failed { error } => Some(error),
        }
    }

    /// Whether the publish succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == PublishStatus::Succeeded
    }
}

/// A package whose version listing failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupFailure {
    /// Package.
    pub package: Package,
    /// Human-readable error.
    pub error: String,
}

/// Aggregate record of one migration run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationLedger {
    /// Packages returned by discovery, in discovery order.
    pub packages: Vec<Package>,
    /// Packages whose registry listing had no versions.
    pub packages_without_versions: Vec<Package>,
    /// Packages whose version listing failed.
    pub version_lookup_failures: Vec<LookupFailure>,
    /// Fetch outcomes in worklist order.
    pub fetches: Vec<FetchResult>,
    /// Publish outcomes in fetch-success order.
    pub publishes: Vec<PublishResult>,
    /// Set when the publish phase was skipped (dry run).
    pub publish_skipped: bool,
    /// Wall-clock duration of the run in seconds.
    pub duration_secs: f64,
}

impl MigrationLedger {
    /// Number of discovered packages.
    #[must_use]
    pub fn packages_found(&self) -> usize {
        self.packages.len()
    }

    /// Number of versions enumerated, i.e. work items created.
    #[must_use]
    pub fn versions_found(&self) -> usize {
        self.fetches.len()
    }

    /// Number of successful fetches.
    #[must_use]
    pub fn fetch_succeeded(&self) -> usize {
        self.fetches.iter().filter(|f| f.is_success()).count()
    }

    /// Number of failed fetches.
    #[must_use]
    pub fn fetch_failed(&self) -> usize {
        self.fetches.len() - self.fetch_succeeded()
    }

    /// Number of successful publishes.
    #[must_use]
    pub fn publish_succeeded(&self) -> usize {
        self.publishes.iter().filter(|p| p.is_success()).count()
    }

    /// Number of failed publishes.
    #[must_use]
    pub fn publish_failed(&self) -> usize {
        self.publishes.len() - self.publish_succeeded()
    }

    /// Successful fetches with their artifacts, in recorded order.
    pub fn successful_fetches(&self) -> impl Iterator<Item = (&FetchResult, &LocalArtifact)> {
        self.fetches
            .iter()
            .filter_map(|fetch| fetch.artifact().map(|artifact| (fetch, artifact)))
    }

    /// Failed fetches, in recorded order.
    pub fn failed_fetches(&self) -> impl Iterator<Item = &FetchResult> {
        self.fetches.iter().filter(|f| !f.is_success())
    }

    /// Looks up the fetch entry for a work item.
    #[must_use]
    pub fn fetch_for(&self, item: &WorkItem) -> Option<&FetchResult> {
        self.fetches.iter().find(|f| &f.item == item)
    }

    /// Whether nothing was attempted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fetches.is_empty() && self.publishes.is_empty()
    }

    /// Whether any per-item failure was recorded.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.version_lookup_failures.is_empty()
            || self.fetch_failed() > 0
            || self.publish_failed() > 0
    }
}

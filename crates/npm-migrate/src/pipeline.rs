//! Migration pipeline orchestration.
//!
//! A run moves through three phases and never goes back:
//!
//! 1. **Discover**: list packages under the scope. Failure ends the run.
//! 2. **Enumerate + fetch**: list each package's versions and fetch every
//!    resulting work item into its staging directory.
//! 3. **Publish**: upload every successfully fetched artifact.
//!
//! Failures inside phases 2 and 3 are recorded in the [`MigrationLedger`]
//! and never stop the loop. Nothing is retried within a run.

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{normalize_scope, MigrationConfig, MigrationOptions};
use crate::error::Result;
use crate::fetch::{ArtifactFetcher, NpmPackFetcher};
use crate::ledger::{
    FetchResult, FetchStatus, LocalArtifact, LookupFailure, MigrationLedger, PublishResult,
    PublishStatus, WorkItem,
};
use crate::publish::{ArtifactPublisher, JfrogPublisher};
use crate::registry::{create_registry, Package, PackageRegistry};

/// Hooks invoked between pipeline phases.
///
/// All methods default to doing nothing.
pub trait RunObserver: Send + Sync {
    /// Discovery returned `packages`.
    fn packages_discovered(&self, _packages: &[Package]) {}

    /// Versions of `package` were listed.
    fn versions_listed(&self, _package: &Package, _versions: &[String]) {}

    /// The fetch phase finished; `ledger` holds every fetch outcome.
    fn fetch_phase_complete(&self, _ledger: &MigrationLedger) {}

    /// The publish phase is about to upload `count` artifacts.
    fn publish_phase_started(&self, _count: usize) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Discovery and enumeration result.
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    /// Discovered packages.
    pub packages: Vec<Package>,
    /// Work items in discovery order, then registry version order.
    pub work_items: Vec<WorkItem>,
    /// Packages listed with zero versions.
    pub packages_without_versions: Vec<Package>,
    /// Packages whose version listing failed.
    pub version_lookup_failures: Vec<LookupFailure>,
}

/// Migration pipeline.
pub struct Pipeline {
    scope: String,
    options: MigrationOptions,
    registry: Box<dyn PackageRegistry>,
    fetcher: Box<dyn ArtifactFetcher>,
    publisher: Box<dyn ArtifactPublisher>,
    observer: Box<dyn RunObserver>,
}

impl Pipeline {
    /// Create a pipeline with the GitHub registry, `npm pack` and the JFrog CLI.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the registry
    /// client cannot be created.
    pub fn new(config: MigrationConfig) -> Result<Self> {
        config.validate()?;

        let registry = create_registry(&config)?;
        let fetcher = Box::new(NpmPackFetcher::from_config(&config)?);
        let publisher = Box::new(JfrogPublisher::from_config(&config));

        Ok(Self::with_components(
            &config.source.scope,
            config.options,
            registry,
            fetcher,
            publisher,
        ))
    }

    /// Create a pipeline from explicit components.
    pub fn with_components(
        scope: &str,
        options: MigrationOptions,
        registry: Box<dyn PackageRegistry>,
        fetcher: Box<dyn ArtifactFetcher>,
        publisher: Box<dyn ArtifactPublisher>,
    ) -> Self {
        Self {
            scope: normalize_scope(scope),
            options,
            registry,
            fetcher,
            publisher,
            observer: Box::new(NoopObserver),
        }
    }

    /// Attach an observer.
    #[must_use]
    pub fn with_observer(mut self, observer: impl RunObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Discover packages and enumerate their versions.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::RegistryUnavailable`] if discovery fails.
    /// Version lookup failures are recorded in the plan instead.
    pub async fn plan(&self) -> Result<MigrationPlan> {
        info!(
            "Discovering packages with scope '{}' in {} registry",
            self.scope,
            self.registry.registry_type()
        );
        let packages = self.registry.list_packages(&self.scope).await?;
        self.observer.packages_discovered(&packages);

        let mut plan = MigrationPlan::default();
        let mut seen_packages = HashSet::new();

        for package in packages {
            if !seen_packages.insert(package.clone()) {
                continue;
            }
            plan.packages.push(package.clone());

            let versions = match self.registry.list_versions(&package).await {
                Ok(versions) => versions,
                Err(e) => {
                    warn!("Failed to get versions for package {}: {}", package, e);
                    plan.version_lookup_failures.push(LookupFailure {
                        package,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            self.observer.versions_listed(&package, &versions);

            if versions.is_empty() {
                info!("No versions found for {}. Skipping.", package);
                plan.packages_without_versions.push(package);
                continue;
            }
            info!("Found {} versions for {}", versions.len(), package);

            let mut seen_versions = HashSet::new();
            for version in versions {
                if seen_versions.insert(version.clone()) {
                    plan.work_items.push(WorkItem::new(package.clone(), version));
                }
            }
        }

        Ok(plan)
    }

    /// Run the migration pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error only if discovery fails. Per-item failures are
    /// recorded in the returned ledger.
    pub async fn run(&self) -> Result<MigrationLedger> {
        let start = Instant::now();

        info!("Starting migration pipeline");
        let plan = self.plan().await?;

        let mut ledger = MigrationLedger {
            packages: plan.packages,
            packages_without_versions: plan.packages_without_versions,
            version_lookup_failures: plan.version_lookup_failures,
            ..Default::default()
        };

        if ledger.packages.is_empty() {
            info!("No packages found with scope '{}'", self.scope);
            ledger.duration_secs = start.elapsed().as_secs_f64();
            return Ok(ledger);
        }

        ledger.fetches = self.fetch_all(plan.work_items).await;
        info!(
            "Fetch phase complete: {} fetched, {} failed",
            ledger.fetch_succeeded(),
            ledger.fetch_failed()
        );
        self.observer.fetch_phase_complete(&ledger);

        if self.options.dry_run {
            info!("Dry run mode - skipping publish phase");
            ledger.publish_skipped = true;
        } else {
            ledger.publishes = self.publish_all(&ledger.fetches).await;
        }

        ledger.duration_secs = start.elapsed().as_secs_f64();

        info!(
            "Migration complete: {} packages, {} versions, {} fetched, {} published, {} failed in {:.2}s",
            ledger.packages_found(),
            ledger.versions_found(),
            ledger.fetch_succeeded(),
            ledger.publish_succeeded(),
            ledger.fetch_failed() + ledger.publish_failed(),
            ledger.duration_secs
        );

        Ok(ledger)
    }

    async fn fetch_all(&self, items: Vec<WorkItem>) -> Vec<FetchResult> {
        let progress = self.progress_bar(items.len() as u64);
        let progress = &progress;

        let results = stream::iter(items)
            .map(|item| async move {
                let result = self.fetch_one(item).await;
                progress.inc(1);
                result
            })
            .buffered(self.options.workers.max(1))
            .collect::<Vec<_>>()
            .await;

        progress.finish_and_clear();
        results
    }

    async fn fetch_one(&self, item: WorkItem) -> FetchResult {
        let staging_dir = item.staging_dir(&self.options.staging_dir);

        let status = match self.fetcher.fetch(&item, &staging_dir).await {
            Ok(artifact) => {
                info!("✓ Fetched {} ({} bytes)", item, artifact.size_bytes);
                FetchStatus::Succeeded(artifact)
            }
            Err(e) => {
                warn!("✗ Failed to fetch {}: {}", item, e);
                FetchStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        FetchResult {
            item,
            staging_dir,
            status,
        }
    }

    async fn publish_all(&self, fetches: &[FetchResult]) -> Vec<PublishResult> {
        let candidates: Vec<(&WorkItem, &LocalArtifact)> = fetches
            .iter()
            .filter_map(|fetch| fetch.artifact().map(|artifact| (&fetch.item, artifact)))
            .collect();

        self.observer.publish_phase_started(candidates.len());
        if candidates.is_empty() {
            info!("No packages were fetched, skipping publish phase");
            return Vec::new();
        }

        let progress = self.progress_bar(candidates.len() as u64);
        let progress = &progress;

        let results = stream::iter(candidates)
            .map(|(item, artifact)| async move {
                let result = self.publish_one(item, artifact).await;
                progress.inc(1);
                result
            })
            .buffered(self.options.workers.max(1))
            .collect::<Vec<_>>()
            .await;

        progress.finish_and_clear();
        results
    }

    async fn publish_one(&self, item: &WorkItem, artifact: &LocalArtifact) -> PublishResult {
        let destination = self.publisher.destination_path(artifact, item);

        let status = match self.publisher.publish(artifact, item).await {
            Ok(()) => {
                info!("✓ Published {} to {}", item, destination);
                PublishStatus::Succeeded
            }
            Err(e) => {
                warn!("✗ Failed to publish {}: {}", item, e);
                PublishStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        PublishResult {
            item: item.clone(),
            destination,
            status,
        }
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if self.options.progress {
            create_progress_bar(total)
        } else {
            ProgressBar::hidden()
        }
    }
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = if total > 0 {
        ProgressBar::new(total)
    } else {
        ProgressBar::new_spinner()
    };

    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    pb
}

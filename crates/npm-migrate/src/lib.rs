// Migration tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # npm-migrate
//!
//! `npm-migrate` is a CLI tool and library for moving every version of a
//! scoped npm package set from GitHub Packages into a JFrog Artifactory
//! repository.
//!
//! ## Pipeline
//!
//! | Phase | Component | Notes |
//! |-------|-----------|-------|
//! | Discover | [`PackageRegistry`] | GitHub Packages REST API, paginated |
//! | Enumerate | [`PackageRegistry`] | Registry version order, no re-sorting |
//! | Fetch | [`ArtifactFetcher`] | `npm pack` in a per-item staging directory |
//! | Publish | [`ArtifactPublisher`] | `jfrog rt upload` |
//! | Report | [`MigrationReport`] | Read-only view over the [`MigrationLedger`] |
//!
//! Discovery failure aborts the run. Every later failure is recorded in the
//! ledger and the run carries on.
//!
//! ## Quick Start
//!
//! ```bash
//! export GITHUB_PAT=ghp_xxx
//! npm-migrate --owner acme-corp --scope @acme --repository npm-local
//!
//! # Fetch only, no upload
//! npm-migrate --config migration.yaml --dry-run
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! source:
//!   owner: acme-corp
//!   owner_kind: orgs
//!   scope: "@acme"
//!
//! destination:
//!   repository: npm-local
//!   log_level: WARN
//!
//! options:
//!   staging_dir: npm_packages_downloaded
//!   workers: 1
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod fetch;
pub mod ledger;
pub mod pipeline;
pub mod process;
pub mod publish;
pub mod registry;
pub mod report;
pub mod ui;

pub use config::{MigrationConfig, MigrationOptions, OwnerKind, SourceConfig, ToolCommand};
pub use error::{Error, Result};
pub use fetch::{ArtifactFetcher, NpmPackFetcher};
pub use ledger::{FetchResult, LocalArtifact, MigrationLedger, PublishResult, WorkItem};
pub use pipeline::{MigrationPlan, NoopObserver, Pipeline, RunObserver};
pub use publish::{ArtifactPublisher, JfrogPublisher};
pub use registry::{Package, PackageRegistry};
pub use report::MigrationReport;

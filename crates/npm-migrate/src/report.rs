//! Read-only views over a [`MigrationLedger`].
//!
//! Everything here is derived from the ledger. Nothing is mutated and
//! nothing can fail; a tarball that vanished since the fetch is shown with
//! size `N/A`.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use crate::ledger::MigrationLedger;

/// Placeholder for values that are no longer available.
pub const NOT_AVAILABLE: &str = "N/A";

/// Aggregate counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    /// Packages returned by discovery.
    pub packages_found: usize,
    /// Work items enumerated.
    pub versions_found: usize,
    /// Successful fetches.
    pub fetched: usize,
    /// Failed fetches.
    pub fetch_failures: usize,
    /// Successful publishes.
    pub published: usize,
    /// Failed publishes.
    pub publish_failures: usize,
    /// Packages whose version listing failed.
    pub version_lookup_failures: usize,
}

/// Per-package fetch summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSummary {
    /// `@scope/name`.
    pub package: String,
    /// Versions attempted.
    pub attempted: usize,
    /// Versions fetched.
    pub fetched: usize,
    /// Fetched versions in fetch order.
    pub versions: Vec<String>,
}

/// One fetched artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDetail {
    /// `@scope/name`.
    pub package: String,
    /// Version.
    pub version: String,
    /// Tarball file name.
    pub file_name: String,
    /// Current size as `{:.1} KB`, or `N/A` if the file is gone.
    pub size: String,
    /// Staging directory.
    pub staging_dir: String,
}

/// One failed publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishFailure {
    /// `@scope/name@version`.
    pub item: String,
    /// Human-readable error.
    pub error: String,
}

/// Publish phase outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishSummary {
    /// Whether the phase was skipped.
    pub skipped: bool,
    /// Published items, `@scope/name@version`.
    pub succeeded: Vec<String>,
    /// Failed items with their errors.
    pub failed: Vec<PublishFailure>,
}

/// Complete report for one run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Aggregate counts.
    pub statistics: RunStatistics,
    /// Per-package summary in discovery order.
    pub packages: Vec<PackageSummary>,
    /// Fetched artifacts in fetch order.
    pub artifacts: Vec<ArtifactDetail>,
    /// Failed fetches as `package@version: error`.
    pub failed_fetches: Vec<String>,
    /// Packages with no versions, `@scope/name`.
    pub packages_without_versions: Vec<String>,
    /// Failed version listings as `package: error`.
    pub version_lookup_failures: Vec<String>,
    /// Publish outcome.
    pub publish: PublishSummary,
    /// Run duration in seconds.
    pub duration_secs: f64,
}

impl MigrationReport {
    /// Builds the report for `ledger`.
    #[must_use]
    pub fn from_ledger(ledger: &MigrationLedger) -> Self {
        Self {
            statistics: statistics(ledger),
            packages: package_summaries(ledger),
            artifacts: artifact_details(ledger),
            failed_fetches: failed_fetches(ledger),
            packages_without_versions: ledger
                .packages_without_versions
                .iter()
                .map(ToString::to_string)
                .collect(),
            version_lookup_failures: ledger
                .version_lookup_failures
                .iter()
                .map(|f| format!("{}: {}", f.package, f.error))
                .collect(),
            publish: publish_summary(ledger),
            duration_secs: ledger.duration_secs,
        }
    }

    /// Renders every section as plain text with tables.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("MIGRATION STATISTICS\n");
        out.push_str(&render_statistics(&self.statistics));
        out.push('\n');

        if self.packages.is_empty() {
            out.push_str("\nNo packages were fetched.\n");
        } else {
            out.push_str("\nPackage Summary:\n");
            out.push_str(&render_package_summaries(&self.packages));
            out.push('\n');
            out.push_str("\nDetailed Download List:\n");
            out.push_str(&render_artifact_details(&self.artifacts));
            out.push('\n');
        }

        if !self.packages_without_versions.is_empty() {
            out.push_str("\nPackages without versions:\n");
            for package in &self.packages_without_versions {
                out.push_str(&format!("  - {package}\n"));
            }
        }

        if !self.version_lookup_failures.is_empty() {
            out.push_str("\nVersion lookup failures:\n");
            for failure in &self.version_lookup_failures {
                out.push_str(&format!("  ✗ {failure}\n"));
            }
        }

        if !self.failed_fetches.is_empty() {
            out.push_str("\nFailed fetches:\n");
            for failure in &self.failed_fetches {
                out.push_str(&format!("  ✗ {failure}\n"));
            }
        }

        out.push('\n');
        out.push_str(&render_publish_summary(&self.publish));
        out
    }
}

/// Aggregate counts for `ledger`.
#[must_use]
pub fn statistics(ledger: &MigrationLedger) -> RunStatistics {
    RunStatistics {
        packages_found: ledger.packages_found(),
        versions_found: ledger.versions_found(),
        fetched: ledger.fetch_succeeded(),
        fetch_failures: ledger.fetch_failed(),
        published: ledger.publish_succeeded(),
        publish_failures: ledger.publish_failed(),
        version_lookup_failures: ledger.version_lookup_failures.len(),
    }
}

/// Per-package summary for packages with at least one attempted version,
/// in first-seen order.
#[must_use]
pub fn package_summaries(ledger: &MigrationLedger) -> Vec<PackageSummary> {
    let mut summaries: Vec<PackageSummary> = Vec::new();

    for fetch in &ledger.fetches {
        let package = fetch.item.package.to_string();
        let index = match summaries.iter().position(|s| s.package == package) {
            Some(index) => index,
            None => {
                summaries.push(PackageSummary {
                    package,
                    attempted: 0,
                    fetched: 0,
                    versions: Vec::new(),
                });
                summaries.len() - 1
            }
        };

        let summary = &mut summaries[index];
        summary.attempted += 1;
        if fetch.is_success() {
            summary.fetched += 1;
            summary.versions.push(fetch.item.version.clone());
        }
    }

    summaries
}

/// Details of every fetched artifact, in fetch order.
#[must_use]
pub fn artifact_details(ledger: &MigrationLedger) -> Vec<ArtifactDetail> {
    ledger
        .successful_fetches()
        .map(|(fetch, artifact)| ArtifactDetail {
            package: fetch.item.package.to_string(),
            version: fetch.item.version.clone(),
            file_name: artifact.file_name(),
            size: std::fs::metadata(&artifact.path)
                .map(|meta| format_size_kb(meta.len()))
                .unwrap_or_else(|_| NOT_AVAILABLE.to_string()),
            staging_dir: fetch.staging_dir.display().to_string(),
        })
        .collect()
}

/// Failed fetches as `package@version: error`.
#[must_use]
pub fn failed_fetches(ledger: &MigrationLedger) -> Vec<String> {
    ledger
        .failed_fetches()
        .map(|fetch| format!("{}: {}", fetch.item, fetch.error().unwrap_or_default()))
        .collect()
}

/// Publish phase outcome.
#[must_use]
pub fn publish_summary(ledger: &MigrationLedger) -> PublishSummary {
    let mut summary = PublishSummary {
        skipped: ledger.publish_skipped,
        ..Default::default()
    };

    for publish in &ledger.publishes {
        match publish.error() {
            None => summary.succeeded.push(publish.item.to_string()),
            Some(error) => summary.failed.push(PublishFailure {
                item: publish.item.to_string(),
                error: error.to_string(),
            }),
        }
    }

    summary
}

/// Formats a byte count as kilobytes with one decimal.
#[must_use]
pub fn format_size_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        header
            .iter()
            .map(|h| Cell::new(h).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

/// Renders the statistics as a two-column table.
#[must_use]
pub fn render_statistics(stats: &RunStatistics) -> String {
    let mut table = new_table(&["Metric", "Count"]);
    for (label, value) in [
        ("Packages found", stats.packages_found),
        ("Versions found", stats.versions_found),
        ("Fetched", stats.fetched),
        ("Fetch failures", stats.fetch_failures),
        ("Published", stats.published),
        ("Publish failures", stats.publish_failures),
        ("Version lookup failures", stats.version_lookup_failures),
    ] {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    table.to_string()
}

/// Renders the per-package summary table.
#[must_use]
pub fn render_package_summaries(summaries: &[PackageSummary]) -> String {
    let mut table = new_table(&["Package Name", "Attempted", "Fetched", "Versions"]);
    for summary in summaries {
        table.add_row(vec![
            Cell::new(&summary.package),
            Cell::new(summary.attempted),
            Cell::new(summary.fetched),
            Cell::new(summary.versions.join(", ")),
        ]);
    }
    table.to_string()
}

/// Renders the per-artifact table.
#[must_use]
pub fn render_artifact_details(details: &[ArtifactDetail]) -> String {
    let mut table = new_table(&[
        "Package Name",
        "Version",
        "Tarball Filename",
        "Size",
        "Staging Directory",
    ]);
    for detail in details {
        table.add_row(vec![
            Cell::new(&detail.package),
            Cell::new(&detail.version),
            Cell::new(&detail.file_name),
            Cell::new(&detail.size),
            Cell::new(&detail.staging_dir),
        ]);
    }
    table.to_string()
}

/// Renders the publish summary.
#[must_use]
pub fn render_publish_summary(summary: &PublishSummary) -> String {
    if summary.skipped {
        return "PUBLISH SUMMARY\nPublish phase skipped (dry run).\n".to_string();
    }

    let mut out = String::from("PUBLISH SUMMARY\n");
    out.push_str(&format!(
        "Total processed: {}\nSuccessfully published: {}\nFailed publishes: {}\n",
        summary.succeeded.len() + summary.failed.len(),
        summary.succeeded.len(),
        summary.failed.len()
    ));

    if !summary.succeeded.is_empty() {
        out.push_str("\nSuccessfully published packages:\n");
        for item in &summary.succeeded {
            out.push_str(&format!("  ✓ {item}\n"));
        }
    }
    if !summary.failed.is_empty() {
        out.push_str("\nFailed publishes:\n");
        for failure in &summary.failed {
            out.push_str(&format!("  ✗ {}: {}\n", failure.item, failure.error));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{
        FetchResult, FetchStatus, LocalArtifact, LookupFailure, PublishResult, PublishStatus,
        WorkItem,
    };
    use crate::registry::Package;
    use std::path::{Path, PathBuf};

    fn item(name: &str, version: &str) -> WorkItem {
        WorkItem::new(Package::new("@acme", name), version)
    }

    fn fetched(name: &str, version: &str, path: PathBuf) -> FetchResult {
        FetchResult {
            item: item(name, version),
            staging_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            status: FetchStatus::Succeeded(LocalArtifact {
                path,
                size_bytes: 2048,
            }),
        }
    }

    fn failed(name: &str, version: &str, error: &str) -> FetchResult {
        FetchResult {
            item: item(name, version),
            staging_dir: PathBuf::from("/stage"),
            status: FetchStatus::Failed {
                error: error.to_string(),
            },
        }
    }

    fn scenario(dir: &Path) -> MigrationLedger {
        let tarball = dir.join("acme-widget-1.0.0.tgz");
        std::fs::write(&tarball, vec![0u8; 2048]).unwrap();

        MigrationLedger {
            packages: vec![Package::new("@acme", "widget")],
            fetches: vec![
                fetched("widget", "1.0.0", tarball),
                failed("widget", "1.1.0", "npm pack failed (exit code 1): 404"),
            ],
            publishes: vec![PublishResult {
                item: item("widget", "1.0.0"),
                destination: "npm-local/@acme/widget/1.0.0/widget-1.0.0.tgz".into(),
                status: PublishStatus::Succeeded,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let stats = statistics(&scenario(dir.path()));
        assert_eq!(
            stats,
            RunStatistics {
                packages_found: 1,
                versions_found: 2,
                fetched: 1,
                fetch_failures: 1,
                published: 1,
                publish_failures: 0,
                version_lookup_failures: 0,
            }
        );
    }

    #[test]
    fn test_package_summaries_first_seen_order() {
        let ledger = MigrationLedger {
            fetches: vec![
                fetched("zeta", "1.0.0", PathBuf::from("/s/acme-zeta-1.0.0.tgz")),
                failed("alpha", "2.0.0", "boom"),
                fetched("zeta", "1.1.0", PathBuf::from("/s/acme-zeta-1.1.0.tgz")),
            ],
            ..Default::default()
        };

        let summaries = package_summaries(&ledger);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].package, "@acme/zeta");
        assert_eq!(summaries[0].attempted, 2);
        assert_eq!(summaries[0].versions, vec!["1.0.0", "1.1.0"]);
        assert_eq!(summaries[1].package, "@acme/alpha");
        assert_eq!(summaries[1].fetched, 0);
    }

    #[test]
    fn test_artifact_size_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = scenario(dir.path());
        ledger.fetches.push(fetched(
            "gone",
            "1.0.0",
            dir.path().join("acme-gone-1.0.0.tgz"),
        ));

        let details = artifact_details(&ledger);
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].file_name, "acme-widget-1.0.0.tgz");
        assert_eq!(details[0].size, "2.0 KB");
        assert_eq!(details[1].size, NOT_AVAILABLE);
    }

    #[test]
    fn test_failed_fetches_format() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            failed_fetches(&scenario(dir.path())),
            vec!["@acme/widget@1.1.0: npm pack failed (exit code 1): 404"]
        );
    }

    #[test]
    fn test_publish_summary() {
        let mut ledger = MigrationLedger::default();
        ledger.publishes.push(PublishResult {
            item: item("widget", "1.0.0"),
            destination: String::new(),
            status: PublishStatus::Failed {
                error: "[Error] 403".into(),
            },
        });

        let summary = publish_summary(&ledger);
        assert!(!summary.skipped);
        assert!(summary.succeeded.is_empty());
        assert_eq!(summary.failed[0].item, "@acme/widget@1.0.0");
        assert!(render_publish_summary(&summary).contains("✗ @acme/widget@1.0.0: [Error] 403"));
    }

    #[test]
    fn test_render_mentions_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = scenario(dir.path());
        ledger
            .packages_without_versions
            .push(Package::new("@acme", "empty"));
        ledger.version_lookup_failures.push(LookupFailure {
            package: Package::new("@acme", "broken"),
            error: "HTTP 500".into(),
        });

        let text = MigrationReport::from_ledger(&ledger).render();
        assert!(text.contains("acme-widget-1.0.0.tgz"));
        assert!(text.contains("@acme/widget@1.1.0: npm pack failed"));
        assert!(text.contains("@acme/empty"));
        assert!(text.contains("@acme/broken: HTTP 500"));
        assert!(text.contains("✓ @acme/widget@1.0.0"));
    }

    #[test]
    fn test_render_dry_run() {
        let ledger = MigrationLedger {
            publish_skipped: true,
            ..Default::default()
        };
        let text = MigrationReport::from_ledger(&ledger).render();
        assert!(text.contains("No packages were fetched."));
        assert!(text.contains("skipped (dry run)"));
    }

    #[test]
    fn test_format_size_kb() {
        assert_eq!(format_size_kb(0), "0.0 KB");
        assert_eq!(format_size_kb(1536), "1.5 KB");
    }

    #[test]
    fn test_report_is_serializable() {
        let dir = tempfile::tempdir().unwrap();
        let report = MigrationReport::from_ledger(&scenario(dir.path()));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["statistics"]["fetched"], 1);
        assert_eq!(json["packages"][0]["package"], "@acme/widget");
    }
}

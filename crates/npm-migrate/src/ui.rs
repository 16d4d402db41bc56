//! Console output for the command-line tool.

use console::{style, Style};

use crate::config::MigrationConfig;
use crate::ledger::MigrationLedger;
use crate::pipeline::{MigrationPlan, RunObserver};
use crate::registry::Package;
use crate::report::{render_statistics, statistics, MigrationReport};

const RULE: &str = "════════════════════════════════════════════════════════════════════════════════";

/// Prints phase banners while a run is in progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleUi;

impl ConsoleUi {
    /// Creates a console UI.
    pub fn new() -> Self {
        Self
    }

    /// Prints a section banner.
    pub fn print_banner(&self, title: &str) {
        let cyan = Style::new().cyan().bold();
        println!();
        println!("{}", cyan.apply_to(RULE));
        println!("{}", cyan.apply_to(title));
        println!("{}", cyan.apply_to(RULE));
    }

    /// Prints the effective configuration before a run.
    pub fn print_config(&self, config: &MigrationConfig) {
        let bold = Style::new().bold();
        println!(
            "{} {} ({})",
            bold.apply_to("Owner:      "),
            config.source.owner,
            config.source.owner_kind
        );
        println!("{} {}", bold.apply_to("Scope:      "), config.source.scope);
        println!(
            "{} {}",
            bold.apply_to("Repository: "),
            if config.destination.repository.is_empty() {
                "-"
            } else {
                config.destination.repository.as_str()
            }
        );
        println!(
            "{} {}",
            bold.apply_to("Staging:    "),
            config.options.staging_dir.display()
        );
        if config.options.dry_run {
            println!("{}", style("Dry run: artifacts will not be published").yellow());
        }
    }

    /// Prints the full run report.
    pub fn print_report(&self, ledger: &MigrationLedger) {
        self.print_banner("MIGRATION REPORT");
        println!("{}", MigrationReport::from_ledger(ledger).render());

        let green = Style::new().green().bold();
        let yellow = Style::new().yellow().bold();
        if ledger.has_failures() {
            println!(
                "{} Completed with failures in {:.2}s",
                yellow.apply_to("⚠"),
                ledger.duration_secs
            );
        } else {
            println!(
                "{} Migration complete in {:.2}s",
                green.apply_to("✅"),
                ledger.duration_secs
            );
        }
    }

    /// Prints a discovery and enumeration plan.
    pub fn print_plan(&self, plan: &MigrationPlan) {
        self.print_banner("ALL PACKAGES FOUND");
        for (idx, package) in plan.packages.iter().enumerate() {
            let versions: Vec<&str> = plan
                .work_items
                .iter()
                .filter(|item| &item.package == package)
                .map(|item| item.version.as_str())
                .collect();
            println!(
                "{:3}. {} {}",
                idx + 1,
                package,
                style(format!("({} versions)", versions.len())).dim()
            );
            if !versions.is_empty() {
                println!("     {}", versions.join(", "));
            }
        }
        println!();
        println!("Total packages found: {}", plan.packages.len());
        println!("Total versions found: {}", plan.work_items.len());

        for failure in &plan.version_lookup_failures {
            println!(
                "{} {}: {}",
                style("✗").red(),
                failure.package,
                failure.error
            );
        }
    }
}

impl RunObserver for ConsoleUi {
    fn packages_discovered(&self, packages: &[Package]) {
        println!("Found {} packages.", packages.len());
        if !packages.is_empty() {
            self.print_banner("FETCHING PACKAGES FROM GITHUB");
        }
    }

    fn versions_listed(&self, package: &Package, versions: &[String]) {
        println!(
            "{} {} {}",
            style("•").cyan(),
            package,
            style(format!("({} versions)", versions.len())).dim()
        );
    }

    fn fetch_phase_complete(&self, ledger: &MigrationLedger) {
        self.print_banner("FETCH STATISTICS");
        println!("{}", render_statistics(&statistics(ledger)));
    }

    fn publish_phase_started(&self, count: usize) {
        self.print_banner("STARTING UPLOAD TO JFROG ARTIFACTORY");
        println!("Publishing {count} artifacts...");
    }
}

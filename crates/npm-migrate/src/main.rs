//! npm-migrate CLI
//!
//! Moves scoped npm packages from GitHub Packages into JFrog Artifactory.
//! Pedantic lints relaxed for CLI ergonomics.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use clap::{Args, Parser, Subcommand};
use console::style;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use npm_migrate::ui::ConsoleUi;
use npm_migrate::{MigrationConfig, OwnerKind, Pipeline};

#[derive(Parser)]
#[command(name = "npm-migrate")]
#[command(version)]
#[command(
    about = "Migrate scoped npm packages from GitHub Packages to JFrog Artifactory",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    settings: Settings,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Settings shared by every command that talks to the registries.
#[derive(Args, Clone, Default)]
struct Settings {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// GitHub organization or user that owns the packages
    #[arg(long, env = "GITHUB_ORG", global = true)]
    owner: Option<String>,

    /// npm scope to migrate, with or without '@'
    #[arg(long, env = "NPM_SCOPE", global = true)]
    scope: Option<String>,

    /// Owner kind: 'orgs' or 'users'
    #[arg(long, env = "GITHUB_ORG_TYPE", global = true)]
    owner_type: Option<OwnerKind>,

    /// GitHub token with 'read:packages' scope
    #[arg(long, env = "GITHUB_PAT", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Destination Artifactory repository
    #[arg(long, env = "JFROG_NPM_REPO", global = true)]
    repository: Option<String>,

    /// Local staging directory for fetched tarballs
    #[arg(long, env = "STAGING_DIR", value_name = "DIR", global = true)]
    staging_dir: Option<PathBuf>,

    /// Log level passed to the JFrog CLI
    #[arg(long, env = "JFROG_CLI_LOG_LEVEL", global = true)]
    jfrog_log_level: Option<String>,

    /// Fetch but do not publish
    #[arg(long, global = true)]
    dry_run: bool,

    /// Number of concurrent fetches and uploads
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,

    /// Write the run ledger as JSON
    #[arg(long, value_name = "FILE", global = true)]
    report_json: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the migration (default)
    Run,

    /// List packages and versions without fetching anything
    List,

    /// Validate configuration
    Validate,

    /// Generate example configuration
    Init {
        /// Output file path
        #[arg(short, long, default_value = "migration.yaml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {e}");
    }

    if let Err(e) = dispatch(cli).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Run) | None => run_migration(&cli.settings).await,
        Some(Commands::List) => list_packages(&cli.settings).await,
        Some(Commands::Validate) => validate_config(&cli.settings),
        Some(Commands::Init { output }) => generate_config(&output),
    }
}

/// Loads the configuration file if given, then applies flag and
/// environment overrides on top.
fn load_config(settings: &Settings) -> anyhow::Result<MigrationConfig> {
    let mut config = match &settings.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            MigrationConfig::from_file(path)?
        }
        None => MigrationConfig::new(
            settings.owner.clone().unwrap_or_default(),
            settings.scope.clone().unwrap_or_default(),
        ),
    };

    if let Some(owner) = &settings.owner {
        config.source.owner = owner.clone();
    }
    if let Some(scope) = &settings.scope {
        config.source.scope = npm_migrate::config::normalize_scope(scope);
    }
    if let Some(kind) = settings.owner_type {
        config.source.owner_kind = kind;
    }
    if let Some(token) = &settings.token {
        config.source.token = Some(token.clone());
    }
    if let Some(repository) = &settings.repository {
        config.destination.repository = repository.clone();
    }
    if let Some(level) = &settings.jfrog_log_level {
        config.destination.log_level = level.clone();
    }
    if let Some(dir) = &settings.staging_dir {
        config.options.staging_dir = dir.clone();
    }
    if let Some(workers) = settings.workers {
        config.options.workers = workers;
    }
    if settings.dry_run {
        config.options.dry_run = true;
    }
    if settings.no_progress {
        config.options.progress = false;
    }

    Ok(config)
}

async fn run_migration(settings: &Settings) -> anyhow::Result<()> {
    let config = load_config(settings)?;
    config.validate()?;

    let ui = ConsoleUi::new();
    ui.print_banner("NPM PACKAGE MIGRATION");
    ui.print_config(&config);

    info!("Starting migration...");
    let pipeline = Pipeline::new(config)?.with_observer(ui);
    let ledger = pipeline.run().await?;

    ui.print_report(&ledger);

    if let Some(path) = &settings.report_json {
        let json = serde_json::to_string_pretty(&ledger)?;
        std::fs::write(path, json)?;
        println!("Ledger written to {}", path.display());
    }

    Ok(())
}

async fn list_packages(settings: &Settings) -> anyhow::Result<()> {
    let mut config = load_config(settings)?;
    // listing never publishes, so no destination is required
    config.options.dry_run = true;
    config.validate()?;

    let pipeline = Pipeline::new(config)?;
    let plan = pipeline.plan().await?;

    ConsoleUi::new().print_plan(&plan);
    Ok(())
}

fn validate_config(settings: &Settings) -> anyhow::Result<()> {
    let config = load_config(settings)?;
    config.validate()?;

    println!("✅ Configuration is valid!");
    ConsoleUi::new().print_config(&config);
    println!(
        "   Tools:       {} / {}",
        config.tools.npm, config.tools.jfrog
    );
    println!("   Workers:     {}", config.options.workers);

    Ok(())
}

fn generate_config(output: &Path) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }

    std::fs::write(output, CONFIG_TEMPLATE)?;
    println!("✅ Generated configuration: {:?}", output);
    println!(
        "   Edit the file, export GITHUB_PAT and run: npm-migrate run --config {:?}",
        output
    );

    Ok(())
}

const CONFIG_TEMPLATE: &str = r#"# npm-migrate configuration
#
# Keep the GitHub token out of this file: export GITHUB_PAT
# (needs the 'read:packages' scope) or pass --token.

source:
  # GitHub REST API base URL
  api_url: https://api.github.com
  # npm registry that serves the packages
  npm_registry_url: https://npm.pkg.github.com
  # Organization or user that owns the packages
  owner: your-org
  # 'orgs' or 'users'
  owner_kind: orgs
  # npm scope to migrate
  scope: "@your-scope"

destination:
  # Artifactory repository that receives the tarballs
  repository: npm-local
  # JFrog CLI log level (ERROR, WARN, INFO, DEBUG)
  log_level: WARN

tools:
  # Program and leading arguments for each external tool
  npm:
    program: npm
  jfrog:
    program: jfrog
  # Per-invocation timeout in seconds
  timeout_secs: 300

options:
  # Staging root; each version lands in {staging_dir}/{scope}_{name}/{version}
  staging_dir: npm_packages_downloaded
  # Concurrent fetches and uploads; results keep registry order
  workers: 1
  # Fetch without publishing
  dry_run: false
  # GitHub API page size (1-100)
  page_size: 100
  # HTTP timeout in seconds
  http_timeout_secs: 30
  progress: true
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_and_validates() {
        let mut config: MigrationConfig = serde_yaml::from_str(CONFIG_TEMPLATE).unwrap();
        config.source.token = Some("ghp_test".to_string());
        config.validate().unwrap();
        assert_eq!(config.source.scope, "@your-scope");
        assert_eq!(config.destination.log_level, "WARN");
    }

    #[test]
    fn test_overrides_apply_over_defaults() {
        let settings = Settings {
            owner: Some("acme-corp".into()),
            scope: Some("acme".into()),
            owner_type: Some(OwnerKind::Users),
            token: Some("ghp_test".into()),
            repository: Some("npm-local".into()),
            workers: Some(4),
            dry_run: true,
            no_progress: true,
            ..Default::default()
        };

        let config = load_config(&settings).unwrap();
        assert_eq!(config.source.owner, "acme-corp");
        assert_eq!(config.source.scope, "@acme");
        assert_eq!(config.source.owner_kind, OwnerKind::Users);
        assert_eq!(config.token(), Some("ghp_test"));
        assert_eq!(config.options.workers, 4);
        assert!(config.options.dry_run);
        assert!(!config.options.progress);
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_token_is_reported() {
        let settings = Settings {
            owner: Some("acme-corp".into()),
            scope: Some("@acme".into()),
            repository: Some("npm-local".into()),
            ..Default::default()
        };
        let config = load_config(&settings).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

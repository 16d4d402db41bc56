//! Error types for npm-migrate.

use std::path::PathBuf;

use thiserror::Error;

/// Migration errors.
///
/// Only [`Error::RegistryUnavailable`], [`Error::PreconditionMissing`] and
/// [`Error::Config`] end a run. Every other kind is raised for a single
/// package or work item and recorded in the ledger by the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Package discovery against the source registry failed.
    #[error("source registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Listing the versions of one package failed.
    #[error("version lookup failed for {package}: {reason}")]
    VersionLookupFailed {
        /// Scoped package name.
        package: String,
        /// Underlying failure.
        reason: String,
    },

    /// The packaging tool exited unsuccessfully, timed out or could not start.
    #[error("fetch failed for {item} ({}): {stderr}", exit_label(.exit_code))]
    FetchFailed {
        /// Work item being fetched (`@scope/name@version`).
        item: String,
        /// Exit code, `None` if the tool never exited normally.
        exit_code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The packaging tool succeeded but left no artifact behind.
    #[error("packaging succeeded for {item} but no .tgz was produced in {}", .dir.display())]
    ArtifactNotProduced {
        /// Work item being fetched.
        item: String,
        /// Directory that was scanned.
        dir: PathBuf,
    },

    /// The upload tool exited unsuccessfully, timed out or could not start.
    #[error(
        "publish failed for {item} ({}): {}",
        exit_label(.exit_code),
        captured_output(.stdout, .stderr)
    )]
    PublishFailed {
        /// Work item being published.
        item: String,
        /// Exit code, `None` if the tool never exited normally.
        exit_code: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// A required input (such as the registry token) is missing.
    #[error("missing precondition: {0}")]
    PreconditionMissing(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Returns true if this error must terminate the whole run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RegistryUnavailable(_) | Self::PreconditionMissing(_) | Self::Config(_)
        )
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".to_string(),
    }
}

/// Both streams of a failed tool; the upload tool reports failures on stdout.
fn captured_output(stdout: &str, stderr: &str) -> String {
    match (stdout.trim(), stderr.trim()) {
        ("", "") => "no output".to_string(),
        ("", stderr) => stderr.to_string(),
        (stdout, "") => format!("stdout: {stdout}"),
        (stdout, stderr) => format!("{stderr}; stdout: {stdout}"),
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kinds() {
        assert!(Error::RegistryUnavailable("down".into()).is_fatal());
        assert!(Error::PreconditionMissing("GITHUB_PAT".into()).is_fatal());
        assert!(!Error::VersionLookupFailed {
            package: "@acme/widget".into(),
            reason: "404".into(),
        }
        .is_fatal());
        assert!(!Error::FetchFailed {
            item: "@acme/widget@1.0.0".into(),
            exit_code: Some(1),
            stderr: String::new(),
        }
        .is_fatal());
    }

    #[test]
    fn test_fetch_failed_message() {
        let err = Error::FetchFailed {
            item: "@acme/widget@1.1.0".into(),
            exit_code: Some(1),
            stderr: "npm ERR! 404".into(),
        };
        assert_eq!(
            err.to_string(),
            "fetch failed for @acme/widget@1.1.0 (exit code 1): npm ERR! 404"
        );
    }

    #[test]
    fn test_publish_failed_without_exit_code() {
        let err = Error::PublishFailed {
            item: "@acme/widget@1.0.0".into(),
            exit_code: None,
            stdout: String::new(),
            stderr: "timed out after 5s".into(),
        };
        assert!(err.to_string().contains("no exit code"));
    }

    #[test]
    fn test_publish_failed_message_includes_stdout() {
        let publish_failed = |stdout: &str, stderr: &str| Error::PublishFailed {
            item: "@acme/widget@1.0.0".into(),
            exit_code: Some(1),
            stdout: stdout.into(),
            stderr: stderr.into(),
        };

        assert_eq!(
            publish_failed("{\"status\": \"failure\"} repo not found", "").to_string(),
            "publish failed for @acme/widget@1.0.0 (exit code 1): stdout: {\"status\": \"failure\"} repo not found"
        );
        assert_eq!(
            publish_failed("", "[Error] 403").to_string(),
            "publish failed for @acme/widget@1.0.0 (exit code 1): [Error] 403"
        );
        assert_eq!(
            publish_failed("uploading", "[Error] 403").to_string(),
            "publish failed for @acme/widget@1.0.0 (exit code 1): [Error] 403; stdout: uploading"
        );
        assert!(publish_failed("", "").to_string().ends_with("no output"));
    }
}

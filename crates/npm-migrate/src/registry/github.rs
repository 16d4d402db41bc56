//! GitHub Packages registry client.
//!
//! Discovery uses the REST API:
//! - `GET /{orgs|users}/{owner}/packages?package_type=npm`
//! - `GET /{orgs|users}/{owner}/packages/npm/{name}/versions`
//!
//! Both listings are paginated with `per_page`/`page`; a page shorter than
//! `per_page` ends the listing. A listing still full after `max_pages`
//! pages is an error, never a silent truncation.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::common::{check_status, create_http_client, validate_url, MAX_PAGES};
use super::{Package, PackageRegistry};
use crate::config::{MigrationConfig, OwnerKind};
use crate::error::{Error, Result};

/// Connection settings for [`GitHubRegistry`].
#[derive(Debug, Clone)]
pub struct GitHubRegistryConfig {
    /// REST API base URL.
    pub api_url: String,
    /// Organization or user name.
    pub owner: String,
    /// Owner kind.
    pub owner_kind: OwnerKind,
    /// Access token.
    pub token: String,
    /// Page size for listings.
    pub page_size: usize,
    /// Listings longer than this many pages fail instead of being truncated.
    pub max_pages: usize,
    /// Request timeout.
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct PackageEntry {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    #[serde(default)]
    name: Option<String>,
}

/// GitHub Packages client.
pub struct GitHubRegistry {
    config: GitHubRegistryConfig,
    client: Client,
}

impl GitHubRegistry {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is invalid or the HTTP client cannot be built.
    pub fn new(config: GitHubRegistryConfig) -> Result<Self> {
        validate_url(&config.api_url)?;
        let client = create_http_client(config.timeout)?;
        Ok(Self { config, client })
    }

    /// Creates a client from the migration configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PreconditionMissing`] if no token is configured.
    pub fn from_config(config: &MigrationConfig) -> Result<Self> {
        let token = config
            .token()
            .ok_or_else(|| Error::PreconditionMissing("registry token not set".to_string()))?;

        Self::new(GitHubRegistryConfig {
            api_url: config.source.api_url.clone(),
            owner: config.source.owner.clone(),
            owner_kind: config.source.owner_kind,
            token: token.to_string(),
            page_size: config.options.page_size,
            max_pages: MAX_PAGES,
            timeout: Duration::from_secs(config.options.http_timeout_secs),
        })
    }

    fn owner_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.owner_kind,
            self.config.owner
        )
    }

    fn packages_url(&self) -> String {
        format!("{}/packages", self.owner_url())
    }

    fn versions_url(&self, package: &Package) -> String {
        format!("{}/packages/npm/{}/versions", self.owner_url(), package.name)
    }

    /// Fetches every page of a listing.
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: &str,
        extra_query: &[(&str, &str)],
    ) -> std::result::Result<Vec<T>, String> {
        let per_page = self.config.page_size.max(1);
        let per_page_param = per_page.to_string();
        let mut items = Vec::new();

        for page in 1..=self.config.max_pages {
            let page_param = page.to_string();
            let response = self
                .client
                .get(url)
                .bearer_auth(&self.config.token)
                .header("Accept", "application/vnd.github+json")
                .query(extra_query)
                .query(&[("per_page", per_page_param.as_str()), ("page", page_param.as_str())])
                .send()
                .await
                .map_err(|e| format!("request to {url} failed: {e}"))?;

            let response = check_status(response).await?;
            let batch: Vec<T> = response
                .json()
                .await
                .map_err(|e| format!("failed to parse response from {url}: {e}"))?;

            let len = batch.len();
            debug!("{}: page {} returned {} entries", url, page, len);
            items.extend(batch);

            if len < per_page {
                return Ok(items);
            }
        }

        warn!(
            "{}: still full after {} pages of {}, giving up",
            url, self.config.max_pages, per_page
        );
        Err(format!(
            "listing at {url} exceeded {} pages of {per_page} entries; increase page_size",
            self.config.max_pages
        ))
    }
}

#[async_trait]
impl PackageRegistry for GitHubRegistry {
    fn registry_type(&self) -> &'static str {
        "github"
    }

    async fn list_packages(&self, scope: &str) -> Result<Vec<Package>> {
        info!(
            "Querying GitHub Packages for {} {}",
            self.config.owner_kind, self.config.owner
        );

        let entries: Vec<PackageEntry> = self
            .get_all_pages(&self.packages_url(), &[("package_type", "npm")])
            .await
            .map_err(Error::RegistryUnavailable)?;

        let total = entries.len();
        let mut seen = HashSet::new();
        let packages: Vec<Package> = entries
            .into_iter()
            .filter_map(|entry| entry.name)
            .filter_map(|name| Package::from_registry_name(&name, scope))
            .filter(|package| seen.insert(package.clone()))
            .collect();

        info!(
            "Found {} packages with scope '{}' ({} listed)",
            packages.len(),
            scope,
            total
        );
        Ok(packages)
    }

    async fn list_versions(&self, package: &Package) -> Result<Vec<String>> {
        debug!("Fetching versions for package: {}", package);

        let entries: Vec<VersionEntry> = self
            .get_all_pages(&self.versions_url(package), &[])
            .await
            .map_err(|reason| Error::VersionLookupFailed {
                package: package.scoped_name(),
                reason,
            })?;

        let mut seen = HashSet::new();
        Ok(entries
            .into_iter()
            .filter_map(|entry| entry.name)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .filter(|name| seen.insert(name.clone()))
            .collect())
    }
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;

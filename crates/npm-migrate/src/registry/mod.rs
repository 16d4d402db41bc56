//! Source registry access.

pub mod common;
pub mod github;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{normalize_scope, MigrationConfig};
use crate::error::Result;

/// A scoped npm package discovered in the source registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    /// Scope including the leading `@`.
    pub scope: String,
    /// Base name without the scope.
    pub name: String,
}

impl Package {
    /// Creates a package, normalizing the scope.
    pub fn new(scope: &str, name: impl Into<String>) -> Self {
        Self {
            scope: normalize_scope(scope),
            name: name.into(),
        }
    }

    /// Resolves a name as listed by the registry against the configured scope.
    ///
    /// Bare names are placed under `scope`. Names that already carry a scope
    /// are kept only if it is `scope`. Returns `None` for blank names and for
    /// names under another scope.
    #[must_use]
    pub fn from_registry_name(name: &str, scope: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let scope = normalize_scope(scope);
        let candidate = match name.split_once('/') {
            Some((listed_scope, base)) if listed_scope.starts_with('@') => {
                Self::new(listed_scope, base)
            }
            _ => Self::new(&scope, name),
        };

        (!candidate.name.is_empty() && candidate.scoped_name().starts_with(&format!("{scope}/")))
            .then_some(candidate)
    }

    /// `@scope/name`.
    #[must_use]
    pub fn scoped_name(&self) -> String {
        format!("{}/{}", self.scope, self.name)
    }

    /// Scope without the leading `@`.
    #[must_use]
    pub fn scope_label(&self) -> &str {
        self.scope.trim_start_matches('@')
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.name)
    }
}

/// Read access to a package registry.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Registry name for logging.
    fn registry_type(&self) -> &'static str;

    /// Lists packages under `scope`.
    ///
    /// An empty result is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::RegistryUnavailable`] if discovery fails.
    async fn list_packages(&self, scope: &str) -> Result<Vec<Package>>;

    /// Lists the version strings of one package, in registry order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::VersionLookupFailed`] if the lookup fails.
    async fn list_versions(&self, package: &Package) -> Result<Vec<String>>;
}

/// Create the registry client described by the configuration.
///
/// # Errors
///
/// Returns an error if no token is configured or the HTTP client cannot be built.
pub fn create_registry(config: &MigrationConfig) -> Result<Box<dyn PackageRegistry>> {
    Ok(Box::new(github::GitHubRegistry::from_config(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_names() {
        let package = Package::new("acme", "widget");
        assert_eq!(package.scope, "@acme");
        assert_eq!(package.scoped_name(), "@acme/widget");
        assert_eq!(package.scope_label(), "acme");
        assert_eq!(package.to_string(), "@acme/widget");
    }

    #[test]
    fn test_from_registry_name_bare() {
        let package = Package::from_registry_name("widget", "@acme").unwrap();
        assert_eq!(package, Package::new("@acme", "widget"));
    }

    #[test]
    fn test_from_registry_name_same_scope() {
        let package = Package::from_registry_name("@acme/widget", "acme").unwrap();
        assert_eq!(package.scoped_name(), "@acme/widget");
    }

    #[test]
    fn test_from_registry_name_other_scope_is_filtered() {
        assert!(Package::from_registry_name("@other/widget", "@acme").is_none());
        // prefix match must stop at the scope boundary
        assert!(Package::from_registry_name("@acme-labs/widget", "@acme").is_none());
    }

    #[test]
    fn test_from_registry_name_blank() {
        assert!(Package::from_registry_name("", "@acme").is_none());
        assert!(Package::from_registry_name("   ", "@acme").is_none());
        assert!(Package::from_registry_name("@acme/", "@acme").is_none());
    }
}

use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;

pub const PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";
pub const LOCATION_ENV: &str = "BIGQUERY_LOCATION";
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const DATASETS_ENV: &str = "BIGQUERY_DATASETS";

pub const DEFAULT_LOCATION: &str = "US";

/// Immutable connection parameters for a [`QueryGateway`].
///
/// [`QueryGateway`]: crate::QueryGateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    project: Box<str>,
    location: Box<str>,
    credential_path: Option<PathBuf>,
    dataset_filters: Vec<Box<str>>,
}

impl ConnectionConfig {
    pub fn new<I>(
        project: impl Into<Box<str>>,
        location: impl Into<Box<str>>,
        credential_path: Option<PathBuf>,
        dataset_filters: I,
    ) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator,
        I::Item: Into<Box<str>>,
    {
        let project = project.into();
        let location = location.into();

        if project.trim().is_empty() {
            return Err(ConfigurationError::EmptyProject);
        }

        // the project is spliced into INFORMATION_SCHEMA table paths
        if project.contains('`') {
            return Err(ConfigurationError::InvalidProject(project));
        }

        if location.trim().is_empty() {
            return Err(ConfigurationError::EmptyLocation);
        }

        Ok(Self {
            project,
            location,
            credential_path,
            dataset_filters: dataset_filters.into_iter().map(Into::into).collect(),
        })
    }

    /// Builds a config from the process environment. See [`ConnectionConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `GOOGLE_CLOUD_PROJECT`, `BIGQUERY_LOCATION` (defaulting to
    /// `US`), `GOOGLE_APPLICATION_CREDENTIALS` and the comma separated
    /// `BIGQUERY_DATASETS`, reading each variable through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project = lookup(PROJECT_ENV).ok_or(ConfigurationError::MissingEnv(PROJECT_ENV))?;

        let location = lookup(LOCATION_ENV)
            .filter(|location| !location.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_owned());

        let credential_path = lookup(CREDENTIALS_ENV)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let datasets = lookup(DATASETS_ENV).unwrap_or_default();

        Self::new(project, location, credential_path, parse_dataset_list(&datasets))
    }

    #[inline]
    pub fn project(&self) -> &str {
        &self.project
    }

    #[inline]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[inline]
    pub fn credential_path(&self) -> Option<&Path> {
        self.credential_path.as_deref()
    }

    #[inline]
    pub fn dataset_filters(&self) -> &[Box<str>] {
        &self.dataset_filters
    }
}

/// Splits a comma separated dataset list, dropping blank entries.
pub fn parse_dataset_list(list: &str) -> impl Iterator<Item = &str> + '_ {
    list.split(',')
        .map(str::trim)
        .filter(|dataset| !dataset.is_empty())
}

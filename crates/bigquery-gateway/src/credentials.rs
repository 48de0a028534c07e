//! Pluggable credential resolution.
//!
//! A [`CredentialProvider`] turns some source of authentication material into a
//! [`TokenSource`], which the client uses to mint access tokens for every request.
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::error::CredentialError;

/// Everything the gateway needs to talk to BigQuery.
pub(crate) const SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// A resolved, shareable source of access tokens.
pub type TokenSource = Arc<dyn gcp_auth::TokenProvider>;

pub trait CredentialProvider: Send + Sync {
    /// A description of where credentials come from, suitable for logging. Must never
    /// include the credential material itself.
    fn describe(&self) -> Cow<'_, str>;

    fn resolve(&self) -> impl Future<Output = Result<TokenSource, CredentialError>> + Send + '_;
}

/// Credentials loaded from a service account JSON key file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBasedCredentials {
    path: PathBuf,
}

impl FileBasedCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<TokenSource, CredentialError> {
        let account = gcp_auth::CustomServiceAccount::from_file(&self.path).map_err(|source| {
            CredentialError::KeyFile {
                path: self.path.clone(),
                source,
            }
        })?;

        Ok(Arc::new(account))
    }
}

impl CredentialProvider for FileBasedCredentials {
    fn describe(&self) -> Cow<'_, str> {
        self.path.to_string_lossy()
    }

    fn resolve(&self) -> impl Future<Output = Result<TokenSource, CredentialError>> + Send + '_ {
        std::future::ready(self.load())
    }
}

/// Credentials resolved from the environment: the key file named by
/// `GOOGLE_APPLICATION_CREDENTIALS`, the metadata server, or a local `gcloud`
/// installation, in the order `gcp_auth` tries them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmbientEnvironmentCredentials;

impl CredentialProvider for AmbientEnvironmentCredentials {
    fn describe(&self) -> Cow<'_, str> {
        Cow::Borrowed("ambient environment")
    }

    async fn resolve(&self) -> Result<TokenSource, CredentialError> {
        gcp_auth::provider().await.map_err(CredentialError::Ambient)
    }
}

/// The provider selected by a [`ConnectionConfig`]: file based when a credential
/// path is configured, ambient otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    File(FileBasedCredentials),
    Ambient(AmbientEnvironmentCredentials),
}

impl Credentials {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        match config.credential_path() {
            Some(path) => Self::File(FileBasedCredentials::new(path)),
            None => Self::Ambient(AmbientEnvironmentCredentials),
        }
    }
}

impl CredentialProvider for Credentials {
    fn describe(&self) -> Cow<'_, str> {
        match self {
            Self::File(file) => file.describe(),
            Self::Ambient(ambient) => ambient.describe(),
        }
    }

    async fn resolve(&self) -> Result<TokenSource, CredentialError> {
        match self {
            Self::File(file) => file.resolve().await,
            Self::Ambient(ambient) => ambient.resolve().await,
        }
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

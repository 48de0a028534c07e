use std::borrow::Cow;
use std::path::PathBuf;

use bigquery_resources_rs::ErrorProto;
use bigquery_resources_rs::query::DecodeError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    QueryExecution(#[from] QueryExecutionError),
    #[error(transparent)]
    InvalidReference(#[from] InvalidReferenceError),
}

/// Invalid connection parameters, or local resources that couldn't be set up.
/// Always raised before anything touches the network.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("project must be a non-empty string")]
    EmptyProject,
    #[error("location must be a non-empty string")]
    EmptyLocation,
    #[error("project '{0}' contains a backtick")]
    InvalidProject(Box<str>),
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
    #[error("failed to build the local runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to build the http client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("failed to open the log file: {0}")]
    LogFile(#[from] tracing_appender::rolling::InitError),
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to load service account key from '{}': {source}", .path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: gcp_auth::Error,
    },
    #[error("failed to resolve credentials from the environment: {0}")]
    Ambient(#[source] gcp_auth::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum QueryExecutionError {
    #[error("{status}: {main}")]
    Service {
        status: u16,
        main: ErrorProto,
        misc: Vec<ErrorProto>,
    },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("failed to get an access token: {0}")]
    Token(#[from] gcp_auth::Error),
    #[error("failed to deserialize response: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("unexpected response: {0}")]
    Protocol(Cow<'static, str>),
    #[error("invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),
}

impl QueryExecutionError {
    pub(crate) fn protocol(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Protocol(message.into())
    }

    /// The HTTP status code, if the service rejected the request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Service { status, main, .. } => *status == 404 || main.is_not_found(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid table reference '{reference}': {reason}")]
pub struct InvalidReferenceError {
    reference: Box<str>,
    reason: &'static str,
}

impl InvalidReferenceError {
    pub(crate) fn new(reference: &str, reason: &'static str) -> Self {
        Self {
            reference: Box::from(reference),
            reason,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

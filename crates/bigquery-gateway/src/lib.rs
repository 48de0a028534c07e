//! A credentialed gateway for running queries against BigQuery.
//!
//! [`QueryGateway`] is the synchronous entry point: it owns exactly one
//! [`BigQueryClient`] (or any other [`Warehouse`]), bound to a project and location
//! at construction, and exposes query execution, table listing and table
//! introspection on top of it.
#[macro_use]
extern crate tracing;

mod client;
pub mod config;
pub mod credentials;
mod dataset;
mod error;
mod gateway;
pub mod logging;
mod query;
mod reference;
mod table;
mod warehouse;

pub use bigquery_resources_rs as resources;
pub use bigquery_resources_rs::query::{
    ParameterType, ParameterValue, QueryParameters, QueryResult,
};
pub use bigquery_resources_rs::table::TableSchema;
pub use bigquery_resources_rs::{Row, Value};
pub use client::BigQueryClient;
pub use config::ConnectionConfig;
pub use credentials::{
    AmbientEnvironmentCredentials, CredentialProvider, Credentials, FileBasedCredentials,
};
pub use error::{
    ConfigurationError, CredentialError, Error, InvalidReferenceError, QueryExecutionError,
};
pub use gateway::QueryGateway;
pub use logging::LogContext;
pub use reference::TableName;
pub use warehouse::Warehouse;

/// Type alias to [`core::result::Result<T, Error>`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

use std::future::Future;
use std::path::PathBuf;

use bigquery_resources_rs::DatasetReference;
use bigquery_resources_rs::query::{QueryParameters, QueryRequest, QueryResult};
use bigquery_resources_rs::table::TableSchema;

use crate::client::BigQueryClient;
use crate::config::ConnectionConfig;
use crate::credentials::{CredentialProvider, Credentials};
use crate::error::{ConfigurationError, Error, QueryExecutionError};
use crate::logging::LogContext;
use crate::reference::TableName;
use crate::warehouse::Warehouse;

/// A credentialed, synchronous connection to BigQuery.
///
/// Every method blocks the calling thread until the service responds, so a gateway
/// must not be used from within an async runtime. Async callers should use
/// [`BigQueryClient`] directly.
pub struct QueryGateway<W = BigQueryClient> {
    config: ConnectionConfig,
    warehouse: W,
    runtime: tokio::runtime::Runtime,
    log: LogContext,
}

impl QueryGateway {
    /// Validates the connection parameters, resolves credentials (from the key file
    /// at `credential_path`, or the environment when there isn't one) and connects.
    pub fn new<I>(
        project: impl Into<Box<str>>,
        location: impl Into<Box<str>>,
        credential_path: Option<PathBuf>,
        dataset_filters: I,
        log: LogContext,
    ) -> Result<Self, Error>
    where
        I: IntoIterator,
        I::Item: Into<Box<str>>,
    {
        let config = ConnectionConfig::new(project, location, credential_path, dataset_filters)?;
        Self::connect(config, log)
    }

    pub fn connect(config: ConnectionConfig, log: LogContext) -> Result<Self, Error> {
        let credentials = Credentials::from_config(&config);
        Self::connect_with(config, &credentials, log)
    }

    /// Connects with an explicit credential provider.
    pub fn connect_with<P>(
        config: ConnectionConfig,
        provider: &P,
        log: LogContext,
    ) -> Result<Self, Error>
    where
        P: CredentialProvider,
    {
        let runtime = build_runtime()?;

        let client = log.in_scope(|| {
            let result = runtime.block_on(BigQueryClient::connect(&config, provider));

            match result {
                Ok(client) => {
                    info!(
                        message = "initialized BigQuery gateway",
                        project = config.project(),
                        location = config.location(),
                        credentials = %provider.describe()
                    );
                    Ok(client)
                }
                Err(error) => {
                    error!(
                        message = "failed to initialize BigQuery gateway",
                        project = config.project(),
                        credentials = %provider.describe(),
                        %error
                    );
                    Err(error)
                }
            }
        })?;

        Ok(Self {
            config,
            warehouse: client,
            runtime,
            log,
        })
    }
}

impl<W: Warehouse> QueryGateway<W> {
    /// Builds a gateway over any [`Warehouse`].
    pub fn from_warehouse(
        config: ConnectionConfig,
        warehouse: W,
        log: LogContext,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            config,
            warehouse,
            runtime: build_runtime()?,
            log,
        })
    }

    #[inline]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[inline]
    pub fn project(&self) -> &str {
        self.config.project()
    }

    #[inline]
    pub fn location(&self) -> &str {
        self.config.location()
    }

    #[inline]
    pub fn dataset_filters(&self) -> &[Box<str>] {
        self.config.dataset_filters()
    }

    #[inline]
    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    #[inline]
    pub fn log_context(&self) -> &LogContext {
        &self.log
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.log.in_scope(|| self.runtime.block_on(future))
    }

    /// Runs a standard SQL query, binding `parameters` through the request's
    /// `queryParameters` (never into the SQL text), and waits for every row.
    pub fn execute_query(
        &self,
        sql: &str,
        parameters: Option<&QueryParameters>,
    ) -> Result<QueryResult, QueryExecutionError> {
        if sql.trim().is_empty() {
            return Err(QueryExecutionError::InvalidRequest("empty SQL".into()));
        }

        let mut request = QueryRequest::new(sql).with_location(self.location());
        if let Some(parameters) = parameters {
            request = request.with_parameters(parameters);
        }

        self.block_on(async {
            debug!(
                message = "executing query",
                sql,
                parameters = request.query_parameters.len()
            );

            match self.warehouse.query(request).await {
                Ok(result) => {
                    debug!(message = "query complete", rows = result.len());
                    Ok(result)
                }
                Err(error) => {
                    error!(message = "query failed", %error);
                    Err(error)
                }
            }
        })
    }

    /// Lists `project.dataset.table` for every table in each configured dataset, in
    /// dataset order. With no datasets configured this is always empty.
    pub fn list_tables(&self) -> Result<Vec<String>, QueryExecutionError> {
        if self.dataset_filters().is_empty() {
            self.log
                .in_scope(|| debug!(message = "no datasets configured, not listing tables"));
            return Ok(Vec::new());
        }

        self.block_on(async {
            let mut names = Vec::new();

            for dataset in self.dataset_filters() {
                let dataset = DatasetReference {
                    project_id: self.project(),
                    dataset_id: &**dataset,
                };

                let tables = self.warehouse.list_tables(dataset).await.inspect_err(|error| {
                    error!(message = "failed to list tables", %dataset, %error);
                })?;

                debug!(message = "listed tables", %dataset, tables = tables.len());

                names.extend(
                    tables
                        .iter()
                        .map(|entry| entry.table_reference.to_string()),
                );
            }

            Ok::<_, QueryExecutionError>(names)
        })
    }

    /// Fetches the DDL of a table, from `INFORMATION_SCHEMA.TABLES` of its dataset
    /// in the gateway's project. `table_name` is either `dataset.table` or
    /// `project.dataset.table`, only the last two segments are used.
    ///
    /// Returns a single row with a `ddl` column, or no rows if the table doesn't
    /// exist.
    pub fn describe_table(&self, table_name: &str) -> Result<QueryResult, Error> {
        let name = TableName::parse(table_name)?;

        let sql = format!(
            "SELECT ddl FROM `{}.{}.INFORMATION_SCHEMA.TABLES` WHERE table_name = @table_name",
            self.project(),
            name.dataset
        );

        let parameters = QueryParameters::new().with("table_name", name.table);

        self.execute_query(&sql, Some(&parameters))
            .map_err(Error::from)
    }

    /// Fetches the schema of a table. Unlike [`QueryGateway::describe_table`], a
    /// leading project segment is honored, which allows reading public datasets.
    pub fn table_schema(&self, table_name: &str) -> Result<TableSchema, Error> {
        let reference = TableName::parse(table_name)?.with_default_project(self.project());

        self.block_on(async {
            debug!(message = "fetching table schema", table = %reference);

            let table = self
                .warehouse
                .get_table(reference)
                .await
                .inspect_err(|error| {
                    error!(message = "failed to fetch table", table = %reference, %error)
                })?;

            Ok::<_, Error>(table.schema.unwrap_or_default())
        })
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime, ConfigurationError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ConfigurationError::Runtime)
}

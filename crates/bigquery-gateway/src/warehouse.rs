use std::future::Future;

use bigquery_resources_rs::query::{QueryRequest, QueryResult};
use bigquery_resources_rs::table::{Table, TableListEntry};
use bigquery_resources_rs::{DatasetReference, TableReference};

use crate::BigQueryClient;
use crate::error::QueryExecutionError;

/// The remote warehouse a [`QueryGateway`] sits in front of.
///
/// [`BigQueryClient`] is the real implementation, anything else is a stand-in
/// (usually for tests).
///
/// [`QueryGateway`]: crate::QueryGateway
pub trait Warehouse: Send + Sync {
    /// Submits a query and waits until every row is available.
    fn query(
        &self,
        request: QueryRequest,
    ) -> impl Future<Output = Result<QueryResult, QueryExecutionError>> + Send + '_;

    /// Lists every table in a dataset.
    fn list_tables<'a>(
        &'a self,
        dataset: DatasetReference<&'a str>,
    ) -> impl Future<Output = Result<Vec<TableListEntry>, QueryExecutionError>> + Send + 'a;

    fn get_table<'a>(
        &'a self,
        table: TableReference<&'a str>,
    ) -> impl Future<Output = Result<Table, QueryExecutionError>> + Send + 'a;
}

impl Warehouse for BigQueryClient {
    fn query(
        &self,
        request: QueryRequest,
    ) -> impl Future<Output = Result<QueryResult, QueryExecutionError>> + Send + '_ {
        BigQueryClient::query(self, request)
    }

    fn list_tables<'a>(
        &'a self,
        dataset: DatasetReference<&'a str>,
    ) -> impl Future<Output = Result<Vec<TableListEntry>, QueryExecutionError>> + Send + 'a {
        BigQueryClient::list_tables(self, dataset)
    }

    fn get_table<'a>(
        &'a self,
        table: TableReference<&'a str>,
    ) -> impl Future<Output = Result<Table, QueryExecutionError>> + Send + 'a {
        BigQueryClient::get_table(self, table)
    }
}

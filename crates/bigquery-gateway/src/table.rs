use bigquery_resources_rs::TableReference;
use bigquery_resources_rs::table::Table;

use crate::BigQueryClient;
use crate::error::QueryExecutionError;

impl BigQueryClient {
    /// Fetches a table resource, including its schema.
    pub async fn get_table(
        &self,
        table: TableReference<&str>,
    ) -> Result<Table, QueryExecutionError> {
        let url = self.inner.make_project_url(table.project_id, [
            "datasets",
            table.dataset_id,
            "tables",
            table.table_id,
        ]);

        self.inner.get_json(url, &[("prettyPrint", "false")]).await
    }
}

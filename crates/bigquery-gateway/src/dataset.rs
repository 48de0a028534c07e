use std::pin::Pin;

use bigquery_resources_rs::DatasetReference;
use bigquery_resources_rs::table::{TableListEntry, TableListPage};
use futures::{Stream, TryStreamExt, stream};

use crate::BigQueryClient;
use crate::error::QueryExecutionError;

/// The largest page `tables.list` will return.
const MAX_PAGE_SIZE: u32 = 1000;

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ListParams<'a> {
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

impl BigQueryClient {
    /// Lists every table in a dataset, following `nextPageToken` until the service
    /// stops returning one. Entries come back in the order the service lists them.
    pub async fn list_tables(
        &self,
        dataset: DatasetReference<&str>,
    ) -> Result<Vec<TableListEntry>, QueryExecutionError> {
        let url = self.inner.make_project_url(dataset.project_id, [
            "datasets",
            dataset.dataset_id,
            "tables",
        ]);

        // 'None' once there are no pages left, 'Some(None)' for the first page.
        let pages: Pin<
            Box<dyn Stream<Item = Result<Vec<TableListEntry>, QueryExecutionError>> + Send + '_>,
        > = Box::pin(stream::try_unfold(Some(None::<Box<str>>), |state| {
            let url = url.clone();
            async move {
                let Some(page_token) = state else {
                    return Ok(None);
                };

                let params = ListParams {
                    max_results: MAX_PAGE_SIZE,
                    page_token: page_token.as_deref(),
                };

                let page: TableListPage = self.inner.get_json(url, &params).await?;
                let next_state = page.next_page().map(|token| Some(Box::from(token)));

                trace!(
                    message = "fetched table list page",
                    dataset = %dataset,
                    tables = page.tables.len()
                );

                Ok::<_, QueryExecutionError>(Some((page.tables, next_state)))
            }
        }));

        pages.try_concat().await
    }
}

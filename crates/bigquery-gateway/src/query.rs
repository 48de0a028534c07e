use bigquery_resources_rs::job::JobReference;
use bigquery_resources_rs::query::{GetQueryResultsParams, QueryRequest, QueryResponse, QueryResult};
use uuid::Uuid;

use crate::BigQueryClient;
use crate::error::QueryExecutionError;

/// How long each `jobs.query`/`getQueryResults` call may wait server side for the
/// job to finish, before returning an incomplete response.
const POLL_TIMEOUT_MS: u64 = 10_000;

impl BigQueryClient {
    /// Runs a query to completion, collecting every page of results.
    ///
    /// The request is bound to the client's location unless it already names one,
    /// and is given a random request id so the service can dedupe it.
    pub async fn query(
        &self,
        mut request: QueryRequest,
    ) -> Result<QueryResult, QueryExecutionError> {
        if request.location.is_none() {
            request.location = Some(Box::from(self.location()));
        }

        if request.request_id.is_none() {
            request.request_id = Some(Uuid::new_v4());
        }

        if request.timeout_ms.is_none() {
            request.timeout_ms = Some(POLL_TIMEOUT_MS);
        }

        let url = self.inner.make_url(["queries"]);
        let mut response: QueryResponse = self.inner.post_json(url, &request).await?;
        log_response_errors(&response);

        if !response.job_complete {
            let job = response.job_reference.clone().ok_or_else(|| {
                QueryExecutionError::protocol("incomplete query returned no job reference")
            })?;

            response = self.wait_for_job(&job).await?;
            response.job_reference.get_or_insert(job);
        }

        let mut rows = response.decode_rows()?;
        let schema = response.schema.take();

        let Some(job) = response.job_reference.take() else {
            // short queries can run without creating a job, in which case there's
            // no way to fetch more pages.
            if response.next_page().is_some() {
                return Err(QueryExecutionError::protocol(
                    "paginated query results returned no job reference",
                ));
            }

            return Ok(QueryResult {
                rows,
                job_reference: None,
                total_bytes_processed: response.total_bytes_processed,
                cache_hit: response.cache_hit,
            });
        };

        let mut page_token = response.next_page().map(Box::<str>::from);

        while let Some(token) = page_token.take() {
            let params = GetQueryResultsParams {
                page_token: Some(&*token),
                location: job.location.as_deref(),
                ..Default::default()
            };

            let mut page = self.get_query_results(&job, params).await?;
            log_response_errors(&page);

            if page.schema.is_none() {
                page.schema = schema.clone();
            }

            rows.extend(page.decode_rows()?);
            page_token = page.next_page().map(Box::<str>::from);

            trace!(message = "fetched query results page", job = %job, rows = rows.len());
        }

        Ok(QueryResult {
            rows,
            job_reference: Some(job),
            total_bytes_processed: response.total_bytes_processed,
            cache_hit: response.cache_hit,
        })
    }

    /// Calls `jobs.getQueryResults` once.
    pub async fn get_query_results(
        &self,
        job: &JobReference,
        params: GetQueryResultsParams<'_>,
    ) -> Result<QueryResponse, QueryExecutionError> {
        let url = self
            .inner
            .make_project_url(&job.project_id, ["queries", &*job.job_id]);

        self.inner.get_json(url, &params).await
    }

    async fn wait_for_job(&self, job: &JobReference) -> Result<QueryResponse, QueryExecutionError> {
        loop {
            debug!(message = "waiting on query job", job = %job);

            let params = GetQueryResultsParams {
                location: job.location.as_deref(),
                timeout_ms: Some(POLL_TIMEOUT_MS),
                ..Default::default()
            };

            let response = self.get_query_results(job, params).await?;

            if response.job_complete {
                log_response_errors(&response);
                return Ok(response);
            }
        }
    }
}

// errors on a successful response are informational, the job itself either
// succeeded or the request would have failed outright.
fn log_response_errors(response: &QueryResponse) {
    for error in &response.errors {
        warn!(message = "query reported an error", %error);
    }
}

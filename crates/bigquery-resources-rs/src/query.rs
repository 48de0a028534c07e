use std::collections::HashMap;
use std::num::NonZeroU64;

use uuid::Uuid;

mod params;
mod rows;

pub use params::{
    ParameterType, ParameterValue, QueryParameter, QueryParameterValue, QueryParameters,
};
pub use rows::{DecodeError, RowDecoder};

use crate::job::JobReference;
use crate::table::TableSchema;
use crate::value::Row;
use crate::{DatasetReference, ErrorProto};

/// Request body for `jobs.query`.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: Box<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<NonZeroU64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_dataset: Option<DatasetReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "crate::util::is_false")]
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_query_cache: Option<bool>,
    pub use_legacy_sql: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_mode: Option<ParameterMode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query_parameters: Vec<QueryParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Box<str>>,
    #[serde(skip_serializing_if = "DataFormatOptions::is_default")]
    pub format_options: DataFormatOptions,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<Box<str>, Box<str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
}

impl QueryRequest {
    /// Builds a standard SQL request. The SQL text is sent as-is, values belong in
    /// [`QueryRequest::with_parameters`].
    pub fn new(query: impl Into<Box<str>>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
            default_dataset: None,
            timeout_ms: None,
            dry_run: false,
            use_query_cache: None,
            use_legacy_sql: false,
            parameter_mode: None,
            query_parameters: Vec::new(),
            location: None,
            format_options: DataFormatOptions::default(),
            labels: HashMap::new(),
            request_id: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<Box<str>>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Binds named parameters. An empty set leaves the request unparameterized.
    pub fn with_parameters(mut self, params: &QueryParameters) -> Self {
        if params.is_empty() {
            self.parameter_mode = None;
            self.query_parameters.clear();
        } else {
            self.parameter_mode = Some(ParameterMode::Named);
            self.query_parameters = params.to_wire();
        }
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&QueryParameter> {
        self.query_parameters
            .iter()
            .find(|param| param.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterMode {
    Named,
    Positional,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFormatOptions {
    #[serde(skip_serializing_if = "crate::util::is_false")]
    pub use_int64_timestamp: bool,
}

impl DataFormatOptions {
    fn is_default(&self) -> bool {
        !self.use_int64_timestamp
    }
}

/// The response of both `jobs.query` and `jobs.getQueryResults`. Rows are left in
/// their wire encoding until [`QueryResponse::decode_rows`] is called with the
/// schema that came back with them.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub job_complete: bool,
    #[serde(default)]
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
    #[serde(default)]
    pub page_token: Option<Box<str>>,
    #[serde(default, with = "crate::util::int64::optional")]
    pub total_rows: Option<u64>,
    #[serde(default, with = "crate::util::int64::optional")]
    pub total_bytes_processed: Option<i64>,
    #[serde(default, with = "crate::util::int64::optional")]
    pub num_dml_affected_rows: Option<i64>,
    #[serde(default)]
    pub cache_hit: bool,
    #[serde(default)]
    pub query_id: Option<Box<str>>,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

impl QueryResponse {
    pub fn next_page(&self) -> Option<&str> {
        self.page_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }

    pub fn decode_rows(&self) -> Result<Vec<Row>, DecodeError> {
        if self.rows.is_empty() {
            return Ok(Vec::new());
        }

        let schema = self.schema.as_ref().ok_or(DecodeError::MissingSchema)?;
        RowDecoder::new(schema).decode_rows(&self.rows)
    }
}

/// Query parameters for `GET /queries/{jobId}`.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetQueryResultsParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u64>,
}

/// Every row produced by a query, in the order the service returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub job_reference: Option<JobReference>,
    pub total_bytes_processed: Option<i64>,
    pub cache_hit: bool,
}

impl QueryResult {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl IntoIterator for QueryResult {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

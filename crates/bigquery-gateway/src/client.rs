use std::fmt;
use std::sync::Arc;

use bigquery_resources_rs::ErrorProto;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{IntoUrl, Response};
use url::Url;

use crate::config::ConnectionConfig;
use crate::credentials::{CredentialProvider, SCOPES, TokenSource};
use crate::error::{ConfigurationError, Error, QueryExecutionError};

/// The Base URL for this service, missing the project id (which is the next path component)
pub(crate) const BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2/projects";

/// Async BigQuery REST client, bound to a single project and location.
///
/// Cheap to clone, every clone shares the same connection pool and token source.
#[derive(Clone)]
pub struct BigQueryClient {
    pub(crate) inner: Arc<InnerClient>,
}

pub(crate) struct InnerClient {
    client: reqwest::Client,
    auth: TokenSource,
    base_url: Url,
    project_id: Box<str>,
    location: Box<str>,
}

impl fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("project_id", &self.inner.project_id)
            .field("location", &self.inner.location)
            .finish_non_exhaustive()
    }
}

impl BigQueryClient {
    pub fn new_from_parts(
        project_id: &str,
        location: &str,
        auth: TokenSource,
        client: reqwest::Client,
    ) -> Self {
        let mut base_url = Url::parse(BASE_URL).expect("base url is valid");

        base_url
            .path_segments_mut()
            .expect("can be a base")
            .push(project_id);

        Self {
            inner: Arc::new(InnerClient {
                client,
                auth,
                base_url,
                project_id: Box::from(project_id),
                location: Box::from(location),
            }),
        }
    }

    pub fn new(
        project_id: &str,
        location: &str,
        auth: TokenSource,
    ) -> Result<Self, ConfigurationError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("bigquery-gateway/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(ConfigurationError::HttpClient)?;

        Ok(Self::new_from_parts(project_id, location, auth, client))
    }

    /// Resolves credentials from `provider` and builds a client for the configured
    /// project and location.
    pub async fn connect<P>(config: &ConnectionConfig, provider: &P) -> Result<Self, Error>
    where
        P: CredentialProvider,
    {
        let auth = provider.resolve().await?;
        Self::new(config.project(), config.location(), auth).map_err(Error::from)
    }

    #[inline]
    pub fn project_id(&self) -> &str {
        &self.inner.project_id
    }

    #[inline]
    pub fn location(&self) -> &str {
        &self.inner.location
    }
}

impl InnerClient {
    async fn get_auth_header(&self) -> Result<HeaderValue, QueryExecutionError> {
        let token = self.auth.token(SCOPES).await?;

        let mut header = HeaderValue::try_from(format!("Bearer {}", token.as_str()))
            .map_err(|_| QueryExecutionError::protocol("access token is not a valid header"))?;
        header.set_sensitive(true);

        Ok(header)
    }

    /// Builds a url under the client's own project.
    pub(crate) fn make_url<P>(&self, path: P) -> Url
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let mut new_url = self.base_url.clone();

        new_url
            .path_segments_mut()
            .expect("can be a base")
            .extend(path);

        new_url
    }

    /// Builds a url under another project, for resources the client's project can
    /// read but doesn't own (i.e public datasets).
    pub(crate) fn make_project_url<P>(&self, project_id: &str, path: P) -> Url
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        if project_id == &*self.project_id {
            return self.make_url(path);
        }

        let mut new_url = Url::parse(BASE_URL).expect("base url is valid");

        new_url
            .path_segments_mut()
            .expect("can be a base")
            .push(project_id)
            .extend(path);

        new_url
    }

    #[inline]
    pub(crate) async fn request(
        &self,
        method: reqwest::Method,
        url: impl IntoUrl,
    ) -> Result<reqwest::RequestBuilder, QueryExecutionError> {
        let header = self.get_auth_header().await?;

        let builder = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, header);

        Ok(builder)
    }

    pub(crate) async fn get_json<Q, T>(&self, url: Url, query: &Q) -> Result<T, QueryExecutionError>
    where
        Q: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let resp = self
            .request(reqwest::Method::GET, url)
            .await?
            .query(query)
            .send()
            .await?;

        handle_json_response(resp).await
    }

    pub(crate) async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, QueryExecutionError>
    where
        B: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let resp = self
            .request(reqwest::Method::POST, url)
            .await?
            .json(body)
            .send()
            .await?;

        handle_json_response(resp).await
    }
}

pub(crate) async fn handle_error(response: Response) -> QueryExecutionError {
    let status = response.status();
    match response.text().await {
        Ok(text) => parse_error_body(status.as_u16(), &text),
        Err(error) => error.into(),
    }
}

/// Parses the body of a non-success response. Google APIs wrap errors as
/// `{"error": {"code", "message", "status", "errors": [ErrorProto]}}`, but a bare
/// `ErrorProto` (or array of them) shows up too, and proxies can return plain text.
pub(crate) fn parse_error_body(status: u16, text: &str) -> QueryExecutionError {
    #[derive(serde::Deserialize)]
    struct Envelope {
        error: EnvelopeBody,
    }

    #[derive(serde::Deserialize)]
    struct EnvelopeBody {
        #[serde(default)]
        message: Option<Box<str>>,
        #[serde(default)]
        status: Option<Box<str>>,
        #[serde(default)]
        errors: Vec<ErrorProto>,
    }

    fn from_array(
        status: u16,
        mut array: Vec<ErrorProto>,
        fallback: ErrorProto,
    ) -> QueryExecutionError {
        let main = if array.is_empty() {
            fallback
        } else {
            array.remove(0)
        };

        QueryExecutionError::Service {
            status,
            main,
            misc: array,
        }
    }

    let trimmed = text.trim_start();

    let parsed = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<ErrorProto>>(trimmed).map(|errors| {
            from_array(
                status,
                errors,
                ErrorProto::new(Box::from("no error information given")),
            )
        })
    } else if trimmed.starts_with('{') {
        match serde_json::from_str::<Envelope>(trimmed) {
            Ok(Envelope { error }) => {
                let message = error
                    .message
                    .unwrap_or_else(|| Box::from("no error information given"));

                let fallback = match error.status {
                    Some(reason) => ErrorProto::new(message).with_reason(reason),
                    None => ErrorProto::new(message),
                };

                Ok(from_array(status, error.errors, fallback))
            }
            Err(_) => serde_json::from_str::<ErrorProto>(trimmed).map(|main| {
                QueryExecutionError::Service {
                    status,
                    main,
                    misc: Vec::new(),
                }
            }),
        }
    } else {
        // plain text, not worth trying to parse
        return QueryExecutionError::Service {
            status,
            main: ErrorProto::new(Box::from(text)),
            misc: Vec::new(),
        };
    };

    match parsed {
        Ok(error) => error,
        Err(error) => {
            warn!(
                message = "failed to deserialize error json, falling back to raw text",
                ?error
            );

            QueryExecutionError::Service {
                status,
                main: ErrorProto::new(Box::from(text)),
                misc: Vec::new(),
            }
        }
    }
}

pub(crate) async fn handle_json_response<T>(response: Response) -> Result<T, QueryExecutionError>
where
    T: serde::de::DeserializeOwned,
{
    if !response.status().is_success() {
        return Err(handle_error(response).await);
    }

    deserialize_json(response).await
}

pub(crate) async fn deserialize_json<T>(response: Response) -> Result<T, QueryExecutionError>
where
    T: serde::de::DeserializeOwned,
{
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(QueryExecutionError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_envelope() {
        const BODY: &str = r#"{
          "error": {
            "code": 404,
            "message": "Not found: Table my-project:sales.missing was not found in location US",
            "errors": [
              {
                "message": "Not found: Table my-project:sales.missing was not found in location US",
                "domain": "global",
                "reason": "notFound"
              },
              {"message": "second", "reason": "backendError"}
            ],
            "status": "NOT_FOUND"
          }
        }"#;

        let err = parse_error_body(404, BODY);

        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));

        match err {
            QueryExecutionError::Service { status, main, misc } => {
                assert_eq!(status, 404);
                assert_eq!(main.reason.as_deref(), Some("notFound"));
                assert_eq!(misc.len(), 1);
                assert_eq!(&*misc[0].message, "second");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_envelope_without_errors() {
        let err = parse_error_body(
            403,
            r#"{"error": {
                "code": 403, "message": "Access Denied", "status": "PERMISSION_DENIED"
            }}"#,
        );

        assert_eq!(err.to_string(), "403: Access Denied: PERMISSION_DENIED");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_parse_bare_and_text_errors() {
        let bare = parse_error_body(400, r#"{"message": "bad query", "reason": "invalidQuery"}"#);
        assert_eq!(bare.to_string(), "400: bad query: invalidQuery");

        let array = parse_error_body(400, r#"[{"message": "first"}, {"message": "second"}]"#);
        assert!(matches!(
            array,
            QueryExecutionError::Service { ref main, ref misc, .. }
                if &*main.message == "first" && misc.len() == 1
        ));

        let text = parse_error_body(502, "Bad Gateway");
        assert_eq!(text.to_string(), "502: Bad Gateway");

        // malformed json falls back to the raw body
        let broken = parse_error_body(500, "{not json");
        assert_eq!(broken.to_string(), "500: {not json");
    }

    #[test]
    fn test_project_urls() {
        struct NoAuth;

        #[async_trait::async_trait]
        impl gcp_auth::TokenProvider for NoAuth {
            async fn token(
                &self,
                _scopes: &[&str],
            ) -> Result<Arc<gcp_auth::Token>, gcp_auth::Error> {
                unreachable!("no requests are sent")
            }

            async fn project_id(&self) -> Result<Arc<str>, gcp_auth::Error> {
                Ok(Arc::from("my-project"))
            }
        }

        let client = BigQueryClient::new_from_parts(
            "my-project",
            "US",
            Arc::new(NoAuth),
            reqwest::Client::new(),
        );

        assert_eq!(
            client.inner.make_url(["datasets", "sales", "tables"]).as_str(),
            "https://bigquery.googleapis.com/bigquery/v2/projects/my-project/datasets/sales/tables"
        );
        assert_eq!(
            client
                .inner
                .make_project_url("bigquery-public-data", [
                    "datasets",
                    "samples",
                    "tables",
                    "shakespeare"
                ])
                .path(),
            "/bigquery/v2/projects/bigquery-public-data/datasets/samples/tables/shakespeare"
        );
    }
}

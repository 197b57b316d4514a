use graphql_client::Response as GraphQLResponse;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::auth::Token;
use crate::error::{Result, TraceError};

const MAX_RETRIES: u32 = 5;
const RETRY_DELAY_SECONDS: u64 = 10;
const API_VERSION: &str = "2022-11-28";

pub struct GitHubClient {
    client: Client,
    api_url: Url,
    graphql_url: Url,
    token: Option<Token>,
    max_retries: u32,
    retry_delay: Duration,
}

impl GitHubClient {
    /// Creates a client for the REST API at `base_url` and the GraphQL
    /// endpoint at `graphql_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Config`] if either URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str, graphql_url: &str, token: Option<Token>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .user_agent(concat!("actions-trace/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| TraceError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Url::join drops the last path segment unless it ends with '/', which
        // would turn GHES's `/api/v3` into `/api/`.
        let mut api_url = Url::parse(base_url)
            .map_err(|e| TraceError::Config(format!("Invalid base URL: {e}")))?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        let graphql_url = Url::parse(graphql_url)
            .map_err(|e| TraceError::Config(format!("Invalid GraphQL URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            graphql_url,
            token,
            max_retries: MAX_RETRIES,
            retry_delay: Duration::from_secs(RETRY_DELAY_SECONDS),
        })
    }

    /// Overrides how often and how long transient failures are retried.
    pub fn with_retry_policy(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// Resolves a path relative to the REST API root.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(path)
            .map_err(|e| TraceError::Config(format!("Invalid API URL for '{path}': {e}")))
    }

    /// GET a REST resource and decode its JSON body.
    pub(super) async fn get_json<T>(&self, url: Url) -> Result<T>
    where
        T: DeserializeOwned,
    {
        debug!("GET {url}");
        let response = self
            .send_with_retry(|| self.auth_request(self.client.get(url.clone())))
            .await?;
        Ok(response.json().await?)
    }

    /// Execute a GraphQL request and return its data after checking for errors.
    pub(super) async fn execute_graphql_request<T>(
        &self,
        request_body: &impl Serialize,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .send_with_retry(|| {
                self.auth_request(self.client.post(self.graphql_url.clone()).json(request_body))
            })
            .await?;

        let response_body: GraphQLResponse<T> = response.json().await?;

        if let Some(errors) = response_body.errors {
            return Err(TraceError::GraphQl {
                query_type: std::any::type_name::<T>().to_string(),
                errors: errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        response_body.data.ok_or(TraceError::NoResponseData)
    }

    /// Sends a request with automatic retry on network errors, rate limits and
    /// server errors. Any other non-success status is returned as an error.
    async fn send_with_retry<F>(&self, build_request: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retry_count = 0;
        loop {
            let response = match build_request().send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                    if retry_count >= self.max_retries {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error ({}), retrying in {}s ({}/{})...",
                        e,
                        self.retry_delay.as_secs(),
                        retry_count + 1,
                        self.max_retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if is_retryable(status, response.headers()) {
                if retry_count >= self.max_retries {
                    return Err(TraceError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: self.max_retries,
                    });
                }

                warn!(
                    "GitHub API error (status {status}). Waiting {}s before retry {}/{}...",
                    self.retry_delay.as_secs(),
                    retry_count + 1,
                    self.max_retries
                );

                tokio::time::sleep(self.retry_delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(TraceError::ApiError {
                    status: status.as_u16(),
                    message: error_text,
                });
            }

            return Ok(response);
        }
    }
}

/// 429, 5xx, and GitHub's primary rate limit (403 with no requests left).
fn is_retryable(status: StatusCode, headers: &HeaderMap) -> bool {
    let rate_limited = status == StatusCode::FORBIDDEN
        && headers
            .get("x-ratelimit-remaining")
            .is_some_and(|remaining| remaining.as_bytes() == b"0");

    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() || rate_limited
}

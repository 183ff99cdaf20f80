//! # Insights HTTP Client
//!
//! [`QueryClient`] implementation speaking the CloudWatch Logs Insights
//! JSON protocol (`X-Amz-Target` dispatch over a single POST endpoint).
//! Built for endpoint-url deployments (localstack, gateways, proxies):
//! request signing and session construction are a collaborator concern,
//! so the client attaches caller-supplied static headers verbatim.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use sw_core::{ExtractError, Row};
use sw_extract::{QueryClient, QueryHandle, QueryPoll, QueryStatus};

const TARGET_START_QUERY: &str = "Logs_20140328.StartQuery";
const TARGET_GET_QUERY_RESULTS: &str = "Logs_20140328.GetQueryResults";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

pub struct InsightsHttpClient {
    http: reqwest::Client,
    endpoint: String,
    headers: HashMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartQueryRequest<'a> {
    log_group_name: &'a str,
    start_time: i64,
    end_time: i64,
    query_string: &'a str,
    limit: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartQueryResponse {
    query_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetQueryResultsRequest<'a> {
    query_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct QueryStatistics {
    records_matched: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetQueryResultsResponse {
    status: String,
    #[serde(default)]
    results: Vec<Row>,
    #[serde(default)]
    statistics: QueryStatistics,
}

impl InsightsHttpClient {
    pub fn new(endpoint: String, headers: HashMap<String, String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            headers,
        }
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        target: &str,
        body: &B,
    ) -> Result<R, ExtractError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(body)
            .header(CONTENT_TYPE, AMZ_JSON)
            .header("X-Amz-Target", target);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExtractError::Backend(format!("transport error: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ExtractError::Authentication(format!(
                "{target} returned HTTP {status}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Backend(format!(
                "{target} returned HTTP {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ExtractError::Backend(format!("malformed {target} response: {e}")))
    }
}

#[async_trait]
impl QueryClient for InsightsHttpClient {
    async fn start_query(
        &self,
        log_group: &str,
        start: i64,
        end: i64,
        query_text: &str,
        limit: usize,
    ) -> Result<QueryHandle, ExtractError> {
        let request = StartQueryRequest {
            log_group_name: log_group,
            start_time: start,
            end_time: end,
            query_string: query_text,
            limit,
        };
        let response: StartQueryResponse = self.post(TARGET_START_QUERY, &request).await?;
        Ok(QueryHandle(response.query_id))
    }

    async fn get_query_status(&self, handle: &QueryHandle) -> Result<QueryPoll, ExtractError> {
        let request = GetQueryResultsRequest { query_id: &handle.0 };
        let response: GetQueryResultsResponse =
            self.post(TARGET_GET_QUERY_RESULTS, &request).await?;
        Ok(QueryPoll {
            status: QueryStatus::parse(&response.status),
            records_matched: response.statistics.records_matched,
            rows: response.results,
        })
    }
}

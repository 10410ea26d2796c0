use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use estimator_core::config::RestCredentials;
use estimator_core::{NewSubmission, RepositoryError, Submission, SubmissionRepository};
use reqwest::header::{AUTHORIZATION, CONTENT_RANGE, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

use crate::error::{classify, transport};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Row as returned by the API. Nullable columns are tolerated here and
/// normalised on conversion.
#[derive(Debug, Deserialize)]
struct RestRow {
    id: i64,
    full_name: String,
    email: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    zip_code: Option<String>,
    #[serde(default)]
    property_type: Option<String>,
    #[serde(default)]
    service_type: Option<String>,
    #[serde(default)]
    materials: Option<Vec<String>>,
    #[serde(default)]
    project_details: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<RestRow> for Submission {
    fn from(row: RestRow) -> Self {
        Submission {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone.unwrap_or_default(),
            address: row.address.unwrap_or_default(),
            zip_code: row.zip_code,
            property_type: row.property_type,
            service_type: row.service_type,
            materials: row.materials.unwrap_or_default(),
            project_details: row.project_details.unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

/// Reads `N` from a `Content-Range` value such as `0-9/42` or `*/0`.
fn parse_total(content_range: &str) -> Option<i64> {
    content_range
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
}

pub struct RestSubmissionRepository {
    client: reqwest::Client,
    endpoint: String,
    table: String,
}

impl RestSubmissionRepository {
    /// `base_url` is the project URL; requests go to
    /// `{base_url}/rest/v1/{table}`.
    pub fn new(
        base_url: &str,
        api_key: &str,
        table: &str,
    ) -> Result<Self, RepositoryError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key)
                .map_err(|e| RepositoryError::Configuration(format!("Invalid API key: {e}")))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| RepositoryError::Configuration(format!("Invalid API key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RepositoryError::Configuration(e.to_string()))?;

        Ok(Self::with_client(client, base_url, table))
    }

    pub fn from_credentials(
        credentials: &RestCredentials,
        table: &str,
    ) -> Result<Self, RepositoryError> {
        Self::new(&credentials.url, &credentials.anon_key, table)
    }

    /// Uses a preconfigured client; auth headers are the caller's job.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        table: &str,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            table: table.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(
        &self,
        request: RequestBuilder,
    ) -> Result<Response, RepositoryError> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(%status, %body, table = %self.table, "request rejected");
        Err(classify(status, &body, &self.table))
    }

    async fn rows(
        &self,
        request: RequestBuilder,
    ) -> Result<Vec<Submission>, RepositoryError> {
        let rows: Vec<RestRow> = self.send(request).await?.json().await.map_err(transport)?;
        Ok(rows.into_iter().map(Submission::from).collect())
    }

    fn total(
        &self,
        response: &Response,
    ) -> Result<i64, RepositoryError> {
        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_total)
            .ok_or_else(|| RepositoryError::Database("response carried no row count".to_string()))
    }
}

#[async_trait]
impl SubmissionRepository for RestSubmissionRepository {
    fn name(&self) -> &str {
        "rest"
    }

    async fn create_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<Submission, RepositoryError> {
        let request = self
            .client
            .post(&self.endpoint)
            .header("Prefer", "return=representation")
            .json(&submission);

        self.rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::Database("insert returned no rows".to_string()))
    }

    async fn get_submission(
        &self,
        id: i64,
    ) -> Result<Submission, RepositoryError> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]);

        self.rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_submissions(&self) -> Result<Vec<Submission>, RepositoryError> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*"), ("order", "created_at.desc")]);

        self.rows(request).await
    }

    async fn count_submissions(&self) -> Result<i64, RepositoryError> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "id"), ("limit", "1")])
            .header("Prefer", "count=exact");

        let response = self.send(request).await?;
        self.total(&response)
    }

    async fn delete_all_submissions(&self) -> Result<u64, RepositoryError> {
        // PostgREST refuses unfiltered deletes.
        let request = self
            .client
            .delete(&self.endpoint)
            .query(&[("id", "gte.0")])
            .header("Prefer", "count=exact");

        let response = self.send(request).await?;
        let deleted = self.total(&response).unwrap_or(0);
        Ok(u64::try_from(deleted).unwrap_or(0))
    }
}

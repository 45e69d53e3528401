//! Export job launch and status polling
//!
//! The export endpoint is asynchronous: submitting a job returns a job id
//! plus an output location, and the job must then be polled until it
//! reaches a terminal status. The poll loop is deliberately unbounded;
//! export jobs complete in bounded wall-clock time in practice, and a
//! failure status terminates the loop immediately.

use crate::client::{api_base, IdmcClient};
use crate::error::ExportError;
use serde::Deserialize;
use std::time::Duration;

/// Default wait between status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Page size submitted with the export query
const EXPORT_PAGE_SIZE: u64 = 10_000;

/// A launched export job
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Job identifier used for status polling
    pub job_id: String,

    /// Location of the finished artifact, relative to the API host
    pub output_uri: String,
}

/// Terminal-state classification of a raw job status string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Terminal success
    Completed,

    /// Terminal failure, carrying the observed status
    Failed(String),

    /// Any other status; the job is still in progress
    Running(String),
}

impl JobStatus {
    /// Classify a raw status value from the jobs endpoint
    pub fn parse(raw: &str) -> JobStatus {
        match raw {
            "COMPLETED" => JobStatus::Completed,
            "FAILED" | "CANCELED" | "ERROR" => JobStatus::Failed(raw.to_string()),
            other => JobStatus::Running(other.to_string()),
        }
    }

    /// Whether no further transition can occur
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running(_))
    }
}

#[derive(Debug, Deserialize)]
struct StartExportResponse {
    #[serde(rename = "jobId")]
    job_id: Option<String>,

    #[serde(rename = "trackingURI")]
    tracking_uri: Option<String>,

    #[serde(rename = "outputURI")]
    output_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: Option<String>,
}

/// Source of raw job status values.
///
/// Splitting the poll loop from the HTTP client keeps the state machine
/// testable with a scripted probe.
#[async_trait::async_trait]
pub trait JobProbe {
    /// Fetch the current raw status string
    async fn fetch_status(&mut self) -> Result<String, ExportError>;
}

/// Poll until the job reaches a terminal status.
///
/// `COMPLETED` returns `Ok(())`; `FAILED`, `CANCELED` and `ERROR` return
/// [`ExportError::JobFailed`] carrying the observed status; anything else
/// sleeps `interval` and polls again.
pub async fn poll_until_complete<P>(probe: &mut P, interval: Duration) -> Result<(), ExportError>
where
    P: JobProbe + Send,
{
    loop {
        let raw = probe.fetch_status().await?;
        match JobStatus::parse(&raw) {
            JobStatus::Completed => {
                tracing::info!("export job completed");
                return Ok(());
            }
            JobStatus::Failed(status) => return Err(ExportError::JobFailed(status)),
            JobStatus::Running(status) => {
                tracing::info!(status = %status, "export job still running");
                tokio::time::sleep(interval).await;
            }
        }
    }
}

impl IdmcClient {
    /// Submit a query-scoped export job.
    ///
    /// The knowledge query is forwarded opaquely; the service owns its
    /// semantics. Fails with [`ExportError::JobStart`] when any of the
    /// job id, tracking URI or output URI is missing from the response.
    pub async fn start_export(
        &self,
        org_id: &str,
        token: &str,
        query: &str,
        filename_hint: &str,
    ) -> Result<ExportJob, ExportError> {
        let url = format!("{}/data360/search/export/v1/assets", api_base(&self.pod));

        let response = self
            .http
            .post(&url)
            .query(&[
                ("knowledgeQuery", query),
                ("segments", "all"),
                ("fileName", filename_hint),
                ("summaryViews", "all"),
            ])
            .header("X-INFA-ORG-ID", org_id)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "from": 0,
                "size": EXPORT_PAGE_SIZE,
            }))
            .send()
            .await
            .map_err(|e| ExportError::JobStart(format!("export request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::JobStart(format!(
                "export endpoint returned status {}: {}",
                status, body
            )));
        }

        let body: StartExportResponse = response
            .json()
            .await
            .map_err(|e| ExportError::JobStart(format!("failed to parse export response: {}", e)))?;

        match (body.job_id, body.tracking_uri, body.output_uri) {
            (Some(job_id), Some(_), Some(output_uri)) => {
                tracing::info!(job_id = %job_id, "started export job");
                Ok(ExportJob { job_id, output_uri })
            }
            _ => Err(ExportError::JobStart(
                "export response missing jobId, trackingURI or outputURI".to_string(),
            )),
        }
    }

    /// A pollable handle for one job
    pub fn job<'a>(&'a self, org_id: &str, token: &str, job_id: &str) -> JobHandle<'a> {
        JobHandle {
            client: self,
            org_id: org_id.to_string(),
            token: token.to_string(),
            job_id: job_id.to_string(),
        }
    }
}

/// Live status probe backed by the jobs endpoint
pub struct JobHandle<'a> {
    client: &'a IdmcClient,
    org_id: String,
    token: String,
    job_id: String,
}

#[async_trait::async_trait]
impl JobProbe for JobHandle<'_> {
    async fn fetch_status(&mut self) -> Result<String, ExportError> {
        let url = format!(
            "{}/data360/observable/v1/jobs/{}",
            api_base(&self.client.pod),
            self.job_id
        );

        let response = self
            .client
            .http
            .get(&url)
            .header("X-INFA-ORG-ID", &self.org_id)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ExportError::JobStart(format!("status request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::JobStart(format!(
                "jobs endpoint returned status {}: {}",
                status, body
            )));
        }

        let body: JobStatusResponse = response
            .json()
            .await
            .map_err(|e| ExportError::JobStart(format!("failed to parse job status: {}", e)))?;

        body.status
            .ok_or_else(|| ExportError::JobStart("job status response missing status".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedProbe {
        statuses: VecDeque<&'static str>,
        polls: usize,
    }

    impl ScriptedProbe {
        fn new(statuses: &[&'static str]) -> Self {
            Self {
                statuses: statuses.iter().copied().collect(),
                polls: 0,
            }
        }
    }

    #[async_trait::async_trait]
    impl JobProbe for ScriptedProbe {
        async fn fetch_status(&mut self) -> Result<String, ExportError> {
            self.polls += 1;
            self.statuses
                .pop_front()
                .map(str::to_string)
                .ok_or_else(|| ExportError::JobStart("probe exhausted".to_string()))
        }
    }

    #[test]
    fn status_classification() {
        assert_eq!(JobStatus::parse("COMPLETED"), JobStatus::Completed);
        assert_eq!(
            JobStatus::parse("FAILED"),
            JobStatus::Failed("FAILED".to_string())
        );
        assert_eq!(
            JobStatus::parse("CANCELED"),
            JobStatus::Failed("CANCELED".to_string())
        );
        assert_eq!(
            JobStatus::parse("ERROR"),
            JobStatus::Failed("ERROR".to_string())
        );
        assert_eq!(
            JobStatus::parse("RUNNING"),
            JobStatus::Running("RUNNING".to_string())
        );
        assert_eq!(
            JobStatus::parse("PENDING"),
            JobStatus::Running("PENDING".to_string())
        );
    }

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed("ERROR".to_string()).is_terminal());
        assert!(!JobStatus::Running("QUEUED".to_string()).is_terminal());
    }

    #[tokio::test]
    async fn poll_loops_until_completed() {
        let mut probe = ScriptedProbe::new(&["RUNNING", "RUNNING", "COMPLETED"]);
        poll_until_complete(&mut probe, Duration::ZERO).await.unwrap();
        // Two in-progress observations plus the terminal one.
        assert_eq!(probe.polls, 3);
    }

    #[tokio::test]
    async fn poll_captures_failure_status() {
        let mut probe = ScriptedProbe::new(&["RUNNING", "CANCELED"]);
        let err = poll_until_complete(&mut probe, Duration::ZERO)
            .await
            .unwrap_err();
        match err {
            ExportError::JobFailed(status) => assert_eq!(status, "CANCELED"),
            other => panic!("expected JobFailed, got {:?}", other),
        }
        assert_eq!(probe.polls, 2);
    }

    #[tokio::test]
    async fn poll_treats_unknown_status_as_running() {
        let mut probe = ScriptedProbe::new(&["QUEUED", "STARTING", "COMPLETED"]);
        poll_until_complete(&mut probe, Duration::ZERO).await.unwrap();
        assert_eq!(probe.polls, 3);
    }

    #[test]
    fn start_export_response_missing_fields() {
        let parsed: StartExportResponse =
            serde_json::from_str(r#"{"jobId": "1", "trackingURI": "/t"}"#).unwrap();
        assert!(parsed.output_uri.is_none());
        assert_eq!(parsed.job_id.as_deref(), Some("1"));
    }
}

//! HTTP front-end running searches as background jobs.
//!
//! `POST /search` registers a job and returns its id straight away; clients
//! poll `GET /status/{id}` and fetch the CSV from `GET /download/{id}` once
//! the job has completed.

use crate::classifier::AffiliationClassifier;
use crate::error::{PubmedError, Result};
use crate::output::write_reports;
use crate::pubmed::PubMedClient;
use crate::report::{build_report, SearchReport};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// `max_results` used when the request omits it
pub const DEFAULT_MAX_RESULTS: usize = 15;

/// Largest `max_results` accepted from clients
pub const MAX_RESULTS_LIMIT: usize = 1000;

/// How long finished jobs stay available for status and download
pub const JOB_RETENTION: Duration = Duration::from_secs(60 * 60);

// ============================================================================
// Job State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Completed,
    Error,
}

/// Entry returned by `GET /status/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: JobState,
    pub progress: String,
    pub results: Option<SearchReport>,
    pub error: Option<String>,
    #[serde(skip)]
    finished_at: Option<Instant>,
}

impl JobStatus {
    fn running(progress: &str) -> Self {
        Self {
            status: JobState::Running,
            progress: progress.to_string(),
            results: None,
            error: None,
            finished_at: None,
        }
    }

    fn expired(&self, retention: Duration) -> bool {
        self.finished_at
            .map(|at| at.elapsed() >= retention)
            .unwrap_or(false)
    }
}

type JobMap = Arc<RwLock<HashMap<String, JobStatus>>>;

/// Write access to one job entry.
///
/// Only the task that owns the handle mutates its entry; terminal
/// transitions consume the handle.
#[derive(Debug)]
pub struct JobHandle {
    id: String,
    jobs: JobMap,
}

impl JobHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Update the progress message of a running job.
    pub async fn progress(&self, message: impl Into<String>) {
        if let Some(job) = self.jobs.write().await.get_mut(&self.id) {
            job.progress = message.into();
        }
    }

    pub async fn complete(self, report: SearchReport, progress: &str) {
        let status = JobStatus {
            status: JobState::Completed,
            progress: progress.to_string(),
            results: Some(report),
            error: None,
            finished_at: Some(Instant::now()),
        };
        self.jobs.write().await.insert(self.id, status);
    }

    pub async fn fail(self, err: &PubmedError) {
        let status = JobStatus {
            status: JobState::Error,
            progress: "Search failed".to_string(),
            results: None,
            error: Some(err.to_string()),
            finished_at: Some(Instant::now()),
        };
        self.jobs.write().await.insert(self.id, status);
    }
}

// ============================================================================
// Shared State
// ============================================================================

/// State shared by all handlers.
pub struct AppState {
    jobs: JobMap,
    classifier: Arc<AffiliationClassifier>,
    email: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    retention: Duration,
    next_id: AtomicU64,
}

impl AppState {
    /// # Arguments
    ///
    /// * `classifier` - Classifier shared by every job
    /// * `email` - Default NCBI contact address, overridable per request
    /// * `api_key` - NCBI API key
    pub fn new(classifier: AffiliationClassifier, email: Option<String>, api_key: Option<String>) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            classifier: Arc::new(classifier),
            email,
            api_key,
            base_url: None,
            retention: JOB_RETENTION,
            next_id: AtomicU64::new(1),
        }
    }

    /// Send E-utilities requests to another base URL.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    /// Keep finished jobs for `retention` instead of [`JOB_RETENTION`].
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Insert a running job and hand out its writer.
    ///
    /// Finished jobs past the retention period are dropped first.
    pub async fn register_job(&self) -> JobHandle {
        let id = format!(
            "search_{}_{}",
            Local::now().timestamp(),
            self.next_id.fetch_add(1, Ordering::Relaxed)
        );

        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !job.expired(self.retention));
        if jobs.len() < before {
            info!(evicted = before - jobs.len(), "Evicted finished jobs");
        }
        jobs.insert(id.clone(), JobStatus::running("Starting search..."));
        drop(jobs);

        JobHandle {
            id,
            jobs: Arc::clone(&self.jobs),
        }
    }

    /// Snapshot of a job entry.
    pub async fn job(&self, id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(id).cloned()
    }

    fn client(&self, email: Option<String>) -> Result<PubMedClient> {
        let email = email
            .filter(|e| !e.trim().is_empty())
            .or_else(|| self.email.clone());
        let client = PubMedClient::new(email, self.api_key.clone())?;
        Ok(match &self.base_url {
            Some(url) => client.with_base_url(url),
            None => client,
        })
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/search", post(search_handler))
        .route("/status/{id}", get(status_handler))
        .route("/download/{id}", get(download_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Search request body
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub email: Option<String>,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl SearchRequest {
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(PubmedError::Validation("Query is required".to_string()));
        }
        if self.max_results == 0 || self.max_results > MAX_RESULTS_LIMIT {
            return Err(PubmedError::Validation(format!(
                "max_results must be between 1 and {}",
                MAX_RESULTS_LIMIT
            )));
        }
        Ok(())
    }
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Local::now().to_rfc3339(),
    }))
}

async fn search_handler(State(state): State<Arc<AppState>>, Json(mut req): Json<SearchRequest>) -> Response {
    if let Err(e) = req.validate() {
        return api_error(StatusCode::BAD_REQUEST, e.to_string());
    }
    req.query = req.query.trim().to_string();

    let handle = state.register_job().await;
    let search_id = handle.id().to_string();
    info!(search_id = %search_id, query = %req.query, max_results = req.max_results, "Search request");

    tokio::spawn(run_job(Arc::clone(&state), handle, req));

    Json(json!({ "search_id": search_id })).into_response()
}

async fn status_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.job(&id).await {
        Some(job) => Json(job).into_response(),
        None => api_error(StatusCode::NOT_FOUND, "Search not found"),
    }
}

async fn download_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let Some(job) = state.job(&id).await else {
        return api_error(StatusCode::NOT_FOUND, "Search not found");
    };
    let report = match (job.status, job.results) {
        (JobState::Completed, Some(report)) => report,
        _ => return api_error(StatusCode::BAD_REQUEST, "No results available"),
    };

    let mut body = Vec::new();
    if let Err(e) = write_reports(&mut body, &report.papers) {
        error!(search_id = %id, error = %e, "CSV export failed");
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    let filename = format!("pubmed_results_{}.csv", Local::now().format("%Y%m%d_%H%M%S"));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

// ============================================================================
// Background Search
// ============================================================================

async fn run_job(state: Arc<AppState>, handle: JobHandle, req: SearchRequest) {
    match perform_search(&state, &handle, &req).await {
        Ok(report) => {
            let progress = if report.summary.total_papers == 0 {
                "No papers found"
            } else {
                "Search completed successfully!"
            };
            info!(
                search_id = %handle.id(),
                papers = report.summary.total_papers,
                with_industry = report.summary.papers_with_industry,
                "Search completed"
            );
            handle.complete(report, progress).await;
        }
        Err(e) => {
            error!(search_id = %handle.id(), error = %e, "Search failed");
            handle.fail(&e).await;
        }
    }
}

async fn perform_search(state: &AppState, handle: &JobHandle, req: &SearchRequest) -> Result<SearchReport> {
    let client = state.client(req.email.clone())?;

    handle.progress("Searching PubMed...").await;
    let ids = client.search(&req.query, req.max_results).await?;
    if ids.is_empty() {
        return Ok(SearchReport::empty(&req.query));
    }

    handle
        .progress(format!("Found {} papers. Fetching details...", ids.len()))
        .await;
    let papers = client.fetch_papers(&ids).await?;

    handle.progress("Filtering for industry authors...").await;
    Ok(build_report(&state.classifier, &req.query, &papers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, Paper};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state() -> Arc<AppState> {
        // nothing listens on the discard port: network calls fail fast
        Arc::new(AppState::new(AffiliationClassifier::default(), None, None).with_base_url("http://127.0.0.1:9"))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn post_search(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/search")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(state()).oneshot(get("/health")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let response = router(state()).oneshot(post_search(r#"{"query":"   "}"#)).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_zero_max_results_is_rejected() {
        let response = router(state())
            .oneshot(post_search(r#"{"query":"cancer","max_results":0}"#))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let app = router(state());
        let status = app.clone().oneshot(get("/status/missing")).await.expect("response");
        assert_eq!(status.status(), StatusCode::NOT_FOUND);

        let download = app.oneshot(get("/download/missing")).await.expect("response");
        assert_eq!(download.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_running_job_cannot_be_downloaded() {
        let state = state();
        let handle = state.register_job().await;
        let app = router(Arc::clone(&state));

        let status = app
            .clone()
            .oneshot(get(&format!("/status/{}", handle.id())))
            .await
            .expect("response");
        assert_eq!(status.status(), StatusCode::OK);
        let json = body_json(status).await;
        assert_eq!(json["status"], "running");
        assert!(json["results"].is_null());

        let download = app
            .oneshot(get(&format!("/download/{}", handle.id())))
            .await
            .expect("response");
        assert_eq!(download.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_completed_job_downloads_csv() {
        let state = state();
        let handle = state.register_job().await;
        let id = handle.id().to_string();

        let papers = vec![Paper {
            pubmed_id: "12345".to_string(),
            title: "Test Paper".to_string(),
            authors: vec![Author::new("Johnson", "Jane", "J", "Pfizer Inc.").with_email("jane@pfizer.com")],
            ..Default::default()
        }];
        let report = build_report(&AffiliationClassifier::default(), "q", &papers);
        handle.complete(report, "done").await;

        let app = router(Arc::clone(&state));
        let status = body_json(app.clone().oneshot(get(&format!("/status/{}", id))).await.expect("response")).await;
        assert_eq!(status["status"], "completed");
        assert_eq!(status["results"]["summary"]["papers_with_industry"], 1);

        let response = app.oneshot(get(&format!("/download/{}", id))).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"pubmed_results_"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let text = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert!(text.starts_with("PubmedID,Title,"));
        assert!(text.contains("12345,Test Paper"));
    }

    #[tokio::test]
    async fn test_failed_search_reports_error() {
        let state = state();
        let app = router(Arc::clone(&state));

        let response = app.oneshot(post_search(r#"{"query":"cancer"}"#)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let id = body_json(response).await["search_id"]
            .as_str()
            .expect("search id")
            .to_string();

        let mut job = state.job(&id).await.expect("registered");
        for _ in 0..100 {
            if job.status != JobState::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            job = state.job(&id).await.expect("registered");
        }
        assert_eq!(job.status, JobState::Error);
        assert!(job.error.is_some());
        assert!(job.results.is_none());
    }

    #[tokio::test]
    async fn test_finished_jobs_are_evicted() {
        let state = AppState::new(AffiliationClassifier::default(), None, None).with_retention(Duration::ZERO);

        let running = state.register_job().await;
        let running_id = running.id().to_string();
        let completed = state.register_job().await;
        let completed_id = completed.id().to_string();
        let failed = state.register_job().await;
        let failed_id = failed.id().to_string();

        completed.complete(SearchReport::empty("q"), "done").await;
        failed.fail(&PubmedError::RateLimited(60)).await;
        assert!(state.job(&completed_id).await.is_some());

        let next = state.register_job().await;
        assert!(state.job(&completed_id).await.is_none());
        assert!(state.job(&failed_id).await.is_none());
        assert!(state.job(&running_id).await.is_some());
        assert!(state.job(next.id()).await.is_some());
    }

    #[tokio::test]
    async fn test_recent_jobs_are_kept() {
        let state = state();
        let handle = state.register_job().await;
        let id = handle.id().to_string();
        handle.complete(SearchReport::empty("q"), "done").await;

        state.register_job().await;
        assert!(state.job(&id).await.is_some());
    }

    #[tokio::test]
    async fn test_job_ids_are_unique() {
        let state = state();
        let a = state.register_job().await;
        let b = state.register_job().await;
        assert_ne!(a.id(), b.id());
    }
}

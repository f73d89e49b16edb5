use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, error, info, trace};

use crate::error::{CrawlError, FetchError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// One unit of fetch work: a single result page.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub task_id: u32,
    pub page: u32,
    pub run_date: String,
    /// Merged over the endpoint's default query parameters.
    pub params: Map<String, Value>,
    /// Merged over the endpoint's default body.
    pub body: Map<String, Value>,
}

impl Task {
    pub fn for_page(page: u32, run_date: &str) -> Self {
        let mut body = Map::new();
        body.insert("PageIndex".to_string(), Value::from(page));
        Task {
            task_id: page,
            page,
            run_date: run_date.to_string(),
            params: Map::new(),
            body,
        }
    }
}

/// Where and how to send requests. Read-only once a fetch starts.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: Map<String, Value>,
    pub body: Map<String, Value>,
    pub timeout: Duration,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, body: Value) -> Self {
        Endpoint {
            url: url.into(),
            headers: Vec::new(),
            params: Map::new(),
            body: match body {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_headers(mut self, headers: &[(&str, &str)]) -> Self {
        self.headers = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Task fields win over endpoint defaults.
    fn request_for(&self, task: &Task) -> (BTreeMap<String, String>, Value) {
        let mut params: BTreeMap<String, String> = self
            .params
            .iter()
            .filter_map(|(k, v)| query_value(v).map(|v| (k.clone(), v)))
            .collect();
        for (k, v) in &task.params {
            match query_value(v) {
                Some(v) => {
                    params.insert(k.clone(), v);
                }
                None => {
                    params.remove(k);
                }
            }
        }

        let mut body = self.body.clone();
        for (k, v) in &task.body {
            body.insert(k.clone(), v.clone());
        }
        (params, Value::Object(body))
    }

    fn header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (k, v) in &self.headers {
            if let (Ok(k), Ok(v)) = (HeaderName::from_bytes(k.as_bytes()), HeaderValue::from_str(v)) {
                headers.insert(k, v);
            }
        }
        headers
    }
}

fn query_value(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Pause before every batch after the first.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Pacing {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Pacing { min_delay, max_delay }
    }

    fn next_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..max))
    }
}

/// A successful fetch, tied to the task that produced it.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub task: Task,
    pub payload: Value,
}

/// Fetch stats returned after completion.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub responses: Vec<PageResponse>,
    pub batches: usize,
    pub failed: usize,
}

pub fn build_client() -> Result<Client, CrawlError> {
    Ok(Client::builder().build()?)
}

pub fn batch_count(tasks: usize, concurrency: usize) -> usize {
    tasks.div_ceil(concurrency.max(1))
}

/// Fetch all tasks in consecutive batches of `concurrency`.
///
/// Requests within a batch run concurrently; a failed task is logged and left
/// out, it never aborts its siblings or later batches. Successful responses
/// keep submission order.
pub async fn fetch_tasks(
    client: &Client,
    endpoint: &Endpoint,
    tasks: &[Task],
    concurrency: usize,
    pacing: Pacing,
) -> FetchOutcome {
    let concurrency = concurrency.max(1);
    let endpoint = Arc::new(endpoint.clone());
    let headers = Arc::new(endpoint.header_map());
    let total_batches = batch_count(tasks.len(), concurrency);
    let mut outcome = FetchOutcome::default();

    let pb = ProgressBar::new(tasks.len() as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("=> "));
    }

    for (index, batch) in tasks.chunks(concurrency).enumerate() {
        info!("Processing batch {}/{}", index + 1, total_batches);

        if index > 0 {
            let delay = pacing.next_delay();
            debug!("Waiting {}ms before next batch...", delay.as_millis());
            tokio::time::sleep(delay).await;
        }

        let handles: Vec<_> = batch
            .iter()
            .cloned()
            .map(|task| {
                let client = client.clone();
                let endpoint = Arc::clone(&endpoint);
                let headers = Arc::clone(&headers);
                tokio::spawn(async move {
                    let result = fetch_one(&client, &endpoint, &headers, &task).await;
                    (task, result)
                })
            })
            .collect();

        for handle in handles {
            match handle.await {
                Ok((task, Ok(payload))) => outcome.responses.push(PageResponse { task, payload }),
                Ok((task, Err(e))) => {
                    error!("Task {} failed: {}", task.task_id, e);
                    outcome.failed += 1;
                }
                Err(e) => {
                    error!("Task failed: {}", FetchError::Join(e.to_string()));
                    outcome.failed += 1;
                }
            }
            pb.inc(1);
        }
        outcome.batches += 1;
    }

    pb.finish_and_clear();
    info!(
        "Fetched {} pages ({} ok, {} failed) in {} batches",
        tasks.len(),
        outcome.responses.len(),
        outcome.failed,
        outcome.batches
    );
    outcome
}

async fn fetch_one(
    client: &Client,
    endpoint: &Endpoint,
    headers: &HeaderMap,
    task: &Task,
) -> Result<Value, FetchError> {
    let (params, body) = endpoint.request_for(task);
    debug!(
        "Fetching task {} (run date {}), PageIndex: {}",
        task.task_id, task.run_date, body["PageIndex"]
    );
    trace!("{}", curl_command(&endpoint.url, &params, &body, &endpoint.headers));

    let response = client
        .post(&endpoint.url)
        .headers(headers.clone())
        .query(&params)
        .body(body.to_string())
        .timeout(endpoint.timeout)
        .send()
        .await
        .map_err(|e| classify(e, endpoint.timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    let text = response
        .text()
        .await
        .map_err(|e| classify(e, endpoint.timeout))?;
    let payload = serde_json::from_str(&text).map_err(FetchError::Decode)?;
    debug!("Task {} completed successfully", task.task_id);
    Ok(payload)
}

fn classify(e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Transport(e)
    }
}

/// Shell-pasteable reproduction of a request, for debugging blocked pages.
pub fn curl_command(
    url: &str,
    params: &BTreeMap<String, String>,
    body: &Value,
    headers: &[(String, String)],
) -> String {
    let url = match reqwest::Url::parse_with_params(url, params) {
        Ok(u) => u.to_string(),
        Err(_) => url.to_string(),
    };
    let header_args = headers
        .iter()
        .map(|(k, v)| format!("-H '{}: {}'", k, v))
        .collect::<Vec<_>>()
        .join(" \\\n  ");
    let body = body.to_string().replace('\'', "'\\''");
    format!(
        "curl -X POST '{}' \\\n  {} \\\n  -d '{}'",
        url, header_args, body
    )
}

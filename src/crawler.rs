use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::info;

use crate::error::CrawlError;
use crate::fetcher::{self, Endpoint, Pacing, Task};
use crate::parser::parse_page;
use crate::products::{Product, HEADERS};
use crate::record::Record;
use crate::settings::Settings;
use crate::store::{self, MergeReport};

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub run_date: NaiveDate,
    pub index_from: u32,
    /// Inclusive; `None` uses the product's default ceiling.
    pub index_to: Option<u32>,
}

#[derive(Debug, Default)]
pub struct CrawlReport {
    pub tasks: usize,
    pub fetched: usize,
    pub failed: usize,
    pub parsed: usize,
    pub merge: MergeReport,
}

/// Crawl one product against the live Vietlott endpoint.
pub async fn crawl(
    product: &Product,
    settings: &Settings,
    opts: &CrawlOptions,
) -> Result<CrawlReport, CrawlError> {
    let endpoint = Endpoint::new(product.url(), product.request_body())
        .with_headers(HEADERS)
        .with_timeout(settings.request_timeout());
    crawl_endpoint(product, endpoint, settings, opts).await
}

pub async fn crawl_endpoint(
    product: &Product,
    endpoint: Endpoint,
    settings: &Settings,
    opts: &CrawlOptions,
) -> Result<CrawlReport, CrawlError> {
    if let Some(field) = product.missing_request_field() {
        return Err(CrawlError::UnconfiguredProduct {
            name: product.name.to_string(),
            field,
        });
    }

    let index_to = opts.index_to.unwrap_or(product.default_index_to);
    let run_date = opts.run_date.format("%Y-%m-%d").to_string();
    let tasks: Vec<Task> = (opts.index_from..=index_to)
        .map(|page| Task::for_page(page, &run_date))
        .collect();
    info!(
        "Crawling {} pages {}..={} for {} with {} workers",
        tasks.len(),
        opts.index_from,
        index_to,
        product.title,
        product.threads
    );

    let client = fetcher::build_client()?;
    let (min_delay, max_delay) = settings.batch_delay();
    let outcome = fetcher::fetch_tasks(
        &client,
        &endpoint,
        &tasks,
        product.threads,
        Pacing::new(min_delay, max_delay),
    )
    .await;
    info!("Received {} responses", outcome.responses.len());

    let extractor = product.extractor();
    let extractor = extractor.as_ref();
    let records: Vec<Record> = outcome
        .responses
        .par_iter()
        .map(|response| parse_page(extractor, &response.payload, response.task.page))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();
    info!("Parsed {} results in total", records.len());

    let mut report = CrawlReport {
        tasks: tasks.len(),
        fetched: outcome.responses.len(),
        failed: outcome.failed,
        parsed: records.len(),
        merge: MergeReport::default(),
    };
    if records.is_empty() {
        info!("No results to save");
        return Ok(report);
    }

    report.merge = store::merge(&product.data_path(&settings.data_dir), records)?;
    if let Some((first, last)) = &report.merge.date_range {
        info!("Date range: {} to {}", first, last);
    }
    if let Some((first, last)) = &report.merge.id_range {
        info!("ID range: {} to {}", first, last);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::lookup;
    use crate::record::DrawResult;
    use serde_json::{json, Value};
    use std::path::Path;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn settings(data_dir: &Path) -> Settings {
        Settings {
            data_dir: data_dir.to_path_buf(),
            batch_delay_min_ms: 0,
            batch_delay_max_ms: 0,
            ..Settings::default()
        }
    }

    fn options(index_to: u32) -> CrawlOptions {
        CrawlOptions {
            run_date: NaiveDate::from_ymd_opt(2025, 10, 14).unwrap(),
            index_from: 0,
            index_to: Some(index_to),
        }
    }

    fn page_is(page: u64) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
        move |request: &Request| {
            serde_json::from_slice::<Value>(&request.body)
                .map(|body| body["PageIndex"] == page)
                .unwrap_or(false)
        }
    }

    /// Page 0 serves the Power 6/55 fixture, page 1 fails, anything else is empty.
    async fn power655_server() -> MockServer {
        let fixture = std::fs::read_to_string("tests/fixtures/power655.json").unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(page_is(0))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(page_is(1))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "value": { "HtmlContent": "" } })),
            )
            .with_priority(5)
            .mount(&server)
            .await;
        server
    }

    fn endpoint(server: &MockServer, product: &Product) -> Endpoint {
        Endpoint::new(server.uri(), product.request_body()).with_headers(HEADERS)
    }

    #[tokio::test]
    async fn power655_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let server = power655_server().await;
        let product = lookup("power_655").unwrap();

        let report = crawl_endpoint(
            product,
            endpoint(&server, product),
            &settings(dir.path()),
            &options(2),
        )
        .await
        .unwrap();

        assert_eq!(report.tasks, 3);
        assert_eq!(report.fetched, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.parsed, 8);
        assert_eq!(report.merge.added, 8);

        let records = store::read_records(&dir.path().join("power655.jsonl")).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            ["01240", "01241", "01242", "01243", "01244", "01245", "01246", "01247"]
        );
        for r in &records {
            assert_eq!(r.page, 0);
            assert_eq!(r.id.len(), 5);
            assert!(NaiveDate::parse_from_str(&r.date, "%Y-%m-%d").is_ok());
            match &r.result {
                DrawResult::Numbers(n) => assert_eq!(n.len(), 7),
                other => panic!("unexpected result {other:?}"),
            }
        }
        assert_eq!(
            report.merge.id_range,
            Some(("01240".to_string(), "01247".to_string()))
        );
    }

    #[tokio::test]
    async fn second_run_adds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let server = power655_server().await;
        let product = lookup("power_655").unwrap();
        let settings = settings(dir.path());

        crawl_endpoint(product, endpoint(&server, product), &settings, &options(0))
            .await
            .unwrap();
        let path = dir.path().join("power655.jsonl");
        let before = std::fs::read(&path).unwrap();

        let report = crawl_endpoint(product, endpoint(&server, product), &settings, &options(0))
            .await
            .unwrap();

        assert_eq!(report.parsed, 8);
        assert_eq!(report.merge.added, 0);
        assert_eq!(report.merge.total, 8);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn nothing_parsed_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let server = power655_server().await;
        let product = lookup("power_655").unwrap();
        let opts = CrawlOptions {
            index_from: 2,
            ..options(4)
        };

        let report = crawl_endpoint(product, endpoint(&server, product), &settings(dir.path()), &opts)
            .await
            .unwrap();

        assert_eq!(report.tasks, 3);
        assert_eq!(report.parsed, 0);
        assert_eq!(report.merge, MergeReport::default());
        assert!(!dir.path().join("power655.jsonl").exists());
    }

    #[tokio::test]
    async fn product_without_key_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let product = lookup("power_645").unwrap();

        let err = crawl_endpoint(product, endpoint(&server, product), &settings(dir.path()), &options(0))
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        assert!(matches!(err, CrawlError::UnconfiguredProduct { field: "Key", .. }));
        assert!(!dir.path().join("power645.jsonl").exists());
        server.verify().await;
    }

    #[tokio::test]
    async fn default_ceiling_comes_from_product() {
        let dir = tempfile::tempdir().unwrap();
        let server = power655_server().await;
        let product = lookup("power_655").unwrap();
        let opts = CrawlOptions {
            index_to: None,
            ..options(0)
        };

        let report = crawl_endpoint(product, endpoint(&server, product), &settings(dir.path()), &opts)
            .await
            .unwrap();

        assert_eq!(report.tasks, product.default_index_to as usize + 1);
    }
}

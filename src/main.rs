mod crawler;
mod error;
mod fetcher;
mod parser;
mod products;
mod record;
mod settings;
mod store;

use std::time::Instant;

use chrono::NaiveDate;
use clap::Parser;
use tracing::{error, info};

use crate::crawler::CrawlOptions;
use crate::error::CrawlError;
use crate::products::{DEFAULT_PRODUCT, PRODUCTS};
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "vietlott_scraper", about = "Crawl Vietlott draw results into JSONL datasets")]
struct Cli {
    /// Product to crawl (see --list)
    #[arg(value_name = "PRODUCT", conflicts_with = "product")]
    positional: Option<String>,

    /// Product to crawl (default: power_645)
    #[arg(short, long)]
    product: Option<String>,

    /// Run date, YYYY-MM-DD (default: today in Vietnam)
    #[arg(long)]
    run_date: Option<NaiveDate>,

    /// First page index
    #[arg(long, default_value_t = 0)]
    index_from: u32,

    /// Last page index, inclusive (default: product-specific)
    #[arg(long)]
    index_to: Option<u32>,

    /// List available products and exit
    #[arg(long)]
    list: bool,
}

impl Cli {
    fn product_name(&self) -> &str {
        self.positional
            .as_deref()
            .or(self.product.as_deref())
            .unwrap_or(DEFAULT_PRODUCT)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    if cli.list {
        print_products();
        return Ok(());
    }

    let settings = Settings::load().unwrap_or_else(|e| exit_configuration(&e));
    let product = products::lookup(cli.product_name()).unwrap_or_else(|e| exit_configuration(&e));

    let opts = CrawlOptions {
        run_date: cli.run_date.unwrap_or_else(record::today),
        index_from: cli.index_from,
        index_to: cli.index_to,
    };
    info!("Starting crawler for {} (run date {})", product.title, opts.run_date);

    let report = match crawler::crawl(product, &settings, &opts).await {
        Ok(report) => report,
        Err(e) if e.is_configuration() => exit_configuration(&e),
        Err(e) => {
            return Err(anyhow::Error::new(e).context(format!("crawl of {} failed", product.name)))
        }
    };

    info!("=== Crawl completed successfully ===");
    println!(
        "{}: {} pages ({} fetched, {} failed), {} parsed, {} new, {} total (was {})",
        product.name,
        report.tasks,
        report.fetched,
        report.failed,
        report.parsed,
        report.merge.added,
        report.merge.total,
        report.merge.existing
    );

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

/// Nothing has touched the network or the dataset yet: one log line, exit 1.
fn exit_configuration(e: &CrawlError) -> ! {
    error!("{}", e);
    std::process::exit(1)
}

fn print_products() {
    println!(
        "{:<10} | {:<12} | {:<16} | {:>7} | {:>5} | {}",
        "Name", "Title", "File", "Workers", "Pages", "Status"
    );
    println!("{}", "-".repeat(76));
    for p in PRODUCTS {
        println!(
            "{:<10} | {:<12} | {:<16} | {:>7} | {:>5} | {}",
            p.name,
            p.title,
            p.file_name,
            p.threads,
            p.default_index_to + 1,
            match p.missing_request_field() {
                Some(field) => format!("needs {}", field),
                None => "ready".to_string(),
            }
        );
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

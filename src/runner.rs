//! Batch driver and single-URL preview.
//!
//! Pages are processed strictly one at a time, in list order: fetch, parse,
//! build records, then move on. A URL that fails to fetch is logged and
//! recorded as a failed [`PageResult`]; it never aborts the run. The parsed
//! document only lives inside [`scrape_page`], never across an `.await`.

use crate::engine::{build, find_containers};
use crate::error::Result;
use crate::fetch::FetchPage;
use crate::models::{
    CONFIG_USED_FIELD, ConfigPreview, FetchStatus, PageResult, Record, SCRAPED_AT_FIELD,
    SOURCE_URL_FIELD, SiteConfig,
};
use crate::outputs::json::{output_path, write_records};
use crate::utils::truncate_for_log;
use chrono::{DateTime, Local};
use futures::stream::{self, StreamExt};
use scraper::Html;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const SCRAPED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Records extracted from one page plus how many containers were seen.
#[derive(Debug, Clone)]
pub struct PageScrape {
    pub containers_found: usize,
    pub records: Vec<Record>,
}

/// Run the Record Builder over one page of HTML and attach metadata.
///
/// `Href`/`Src` values are resolved against `page_url` when the config asks
/// for it, then `_source_url`, `_scraped_at` and `_config_used` are appended.
pub fn scrape_page(
    html: &str,
    page_url: &Url,
    site: &SiteConfig,
    scraped_at: &DateTime<Local>,
) -> PageScrape {
    let document = Html::parse_document(html);
    let containers_found = find_containers(&document, &site.scraper).count();
    if containers_found == 0 {
        debug!(
            url = %page_url,
            html_preview = %truncate_for_log(html, 300),
            "No containers on page"
        );
    }

    let scraped_at = scraped_at.format(SCRAPED_AT_FORMAT).to_string();
    let records = build(&document, &site.scraper)
        .into_iter()
        .map(|record| finish_record(record, page_url, site, &scraped_at))
        .collect();

    PageScrape {
        containers_found,
        records,
    }
}

fn finish_record(record: Record, page_url: &Url, site: &SiteConfig, scraped_at: &str) -> Record {
    let mut values: Vec<(String, Option<String>)> = record
        .into_values()
        .into_iter()
        .zip(site.scraper.fields.iter())
        .map(|((name, value), (_, spec))| {
            let value = if site.scraper.resolve_links && spec.extract.is_link() {
                value.map(|link| absolutize(page_url, link))
            } else {
                value
            };
            (name, value)
        })
        .collect();

    values.push((SOURCE_URL_FIELD.to_string(), Some(page_url.to_string())));
    values.push((SCRAPED_AT_FIELD.to_string(), Some(scraped_at.to_string())));
    values.push((CONFIG_USED_FIELD.to_string(), Some(site.config_label().to_string())));
    Record::from_values(values)
}

/// Join `link` onto `base`; absolute links pass through, unparseable ones
/// are kept as written. A blank link stays blank rather than pointing back
/// at the page itself.
fn absolutize(base: &Url, link: String) -> String {
    if link.trim().is_empty() {
        return link;
    }
    match base.join(&link) {
        Ok(url) => url.to_string(),
        Err(_) => link,
    }
}

/// Fetch one URL and build its [`PageResult`]. Fetch errors are recovered.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn process_url<F: FetchPage>(fetcher: &F, url: &Url, site: &SiteConfig) -> PageResult {
    match fetcher.fetch(url.as_str()).await {
        Ok(html) => {
            let page = scrape_page(&html, url, site, &Local::now());
            if page.records.is_empty() {
                warn!(containers = page.containers_found, "No records extracted from page");
            } else {
                info!(
                    containers = page.containers_found,
                    records = page.records.len(),
                    "Extracted records"
                );
            }
            PageResult {
                url: url.to_string(),
                status: FetchStatus::Ok,
                containers_found: page.containers_found,
                records: page.records,
            }
        }
        Err(e) => {
            warn!(error = %e, "Fetch failed; skipping URL");
            PageResult::failed(url.as_str(), e.to_string())
        }
    }
}

/// Summary of a completed batch run.
#[derive(Debug)]
pub struct BatchSummary {
    pub pages: Vec<PageResult>,
    pub output_path: PathBuf,
}

impl BatchSummary {
    pub fn total_records(&self) -> usize {
        self.pages.iter().map(|page| page.records.len()).sum()
    }

    pub fn successful_pages(&self) -> usize {
        self.pages.iter().filter(|page| page.is_ok()).count()
    }

    pub fn failed_pages(&self) -> usize {
        self.pages.len() - self.successful_pages()
    }
}

/// Process every URL in order and write all records to one output file.
///
/// Partial results are always written, including an empty array when no URL
/// produced anything. Only the final write can fail the batch.
#[instrument(
    level = "info",
    skip_all,
    fields(urls = urls.len(), output_dir = %output_dir.display())
)]
pub async fn run_batch<F: FetchPage>(
    fetcher: &F,
    site: &SiteConfig,
    urls: &[Url],
    output_dir: &Path,
    run_at: &DateTime<Local>,
) -> Result<BatchSummary> {
    let total = urls.len();
    let pages: Vec<PageResult> = stream::iter(urls.iter().enumerate())
        .then(|(i, url)| async move {
            info!(index = i + 1, total, %url, "Processing URL");
            process_url(fetcher, url, site).await
        })
        .collect()
        .await;

    let records: Vec<&Record> = pages.iter().flat_map(|page| page.records.iter()).collect();
    let path = output_path(output_dir, &site.export, &site.site_name, run_at);
    write_records(&records, &path).await?;

    let summary = BatchSummary {
        pages,
        output_path: path,
    };
    info!(
        pages = summary.pages.len(),
        successful = summary.successful_pages(),
        failed = summary.failed_pages(),
        records = summary.total_records(),
        path = %summary.output_path.display(),
        "Batch complete"
    );
    Ok(summary)
}

/// Try `site` against one URL and report up to `max_products` records.
///
/// Never fails: an unparseable URL or a fetch error is reported in the
/// preview with `success = false`.
#[instrument(level = "info", skip(fetcher, site))]
pub async fn test_config_on_url<F: FetchPage>(
    fetcher: &F,
    site: &SiteConfig,
    url: &str,
    max_products: usize,
) -> ConfigPreview {
    let failed = |error: String| ConfigPreview {
        success: false,
        url: url.to_string(),
        config_used: site.config_label().to_string(),
        containers_found: None,
        total_products: None,
        sample_products: Vec::new(),
        error: Some(error),
    };

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => return failed(format!("invalid URL: {e}")),
    };

    match fetcher.fetch(parsed.as_str()).await {
        Ok(html) => {
            let page = scrape_page(&html, &parsed, site, &Local::now());
            let total = page.records.len();
            info!(containers = page.containers_found, records = total, "Config preview");
            ConfigPreview {
                success: true,
                url: url.to_string(),
                config_used: site.config_label().to_string(),
                containers_found: Some(page.containers_found),
                total_products: Some(total),
                sample_products: page.records.into_iter().take(max_products).collect(),
                error: None,
            }
        }
        Err(e) => {
            warn!(error = %e, "Config preview fetch failed");
            failed(e.to_string())
        }
    }
}

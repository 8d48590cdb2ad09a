//! Reading the URL list.
//!
//! One absolute URL per line. Blank lines and lines starting with `#` are
//! ignored; lines that do not parse as a URL with both a scheme and a host
//! are logged with their line number and skipped.

use crate::error::{Result, ScrapeError};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};
use url::Url;

/// Parse URL list text, keeping valid URLs in file order.
pub fn parse_url_list(text: &str) -> Vec<Url> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|(line_num, line)| match parse_absolute(line) {
            Some(url) => Some(url),
            None => {
                warn!(line = line_num, url = %line, "Invalid URL in list; skipping");
                None
            }
        })
        .collect()
}

fn parse_absolute(raw: &str) -> Option<Url> {
    Url::parse(raw).ok().filter(|url| url.host_str().is_some())
}

/// Load and parse a URL list file. A missing or unreadable file is fatal.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_url_list(path: &Path) -> Result<Vec<Url>> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| ScrapeError::UrlList(format!("cannot read {}: {e}", path.display())))?;
    let urls = parse_url_list(&text);
    info!(count = urls.len(), "Loaded URL list");
    Ok(urls)
}

/// Number of URLs per host.
pub fn domain_stats(urls: &[Url]) -> BTreeMap<String, usize> {
    urls.iter()
        .filter_map(|url| url.host_str())
        .map(str::to_string)
        .counts()
        .into_iter()
        .collect()
}

/// URLs whose host contains `domain`, ignoring case.
pub fn filter_by_domain(urls: Vec<Url>, domain: &str) -> Vec<Url> {
    let needle = domain.to_lowercase();
    urls.into_iter()
        .filter(|url| {
            url.host_str()
                .is_some_and(|host| host.to_lowercase().contains(&needle))
        })
        .collect()
}

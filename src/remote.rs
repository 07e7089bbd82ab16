use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::thread;
use std::time::Duration;

use camino::Utf8Path;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::error::SyncError;

/// Result of asking the remote for an organism's latest assembly versions.
/// The tag drives the orchestrator's retry loop: `Retryable` gets exactly
/// one more attempt, `Permanent` skips the organism.
#[derive(Debug)]
pub enum ListingOutcome {
    Listed(Vec<String>),
    Retryable(String),
    Permanent(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransferReport {
    pub fetched: usize,
    pub present: usize,
    pub missing: usize,
}

/// The remote file source: catalog retrieval, per-organism listing, and
/// filtered bulk transfer. Implementations must surface transient and
/// permanent failures distinctly.
pub trait RemoteSource: Send + Sync {
    fn fetch_catalog(&self, destination: &Utf8Path) -> Result<(), SyncError>;

    /// Genome ids under `<organism>/latest_assembly_versions/`.
    fn list_latest(&self, organism: &str) -> ListingOutcome;

    /// Fetch every accepted relative path into `destination`, appending an
    /// itemized line per file to `log_path`. Files already present at the
    /// destination are skipped, not re-fetched.
    fn transfer(
        &self,
        organism: &str,
        accepted: &[String],
        destination: &Utf8Path,
        log_path: &Utf8Path,
    ) -> Result<TransferReport, SyncError>;
}

pub struct HttpRemoteSource {
    client: Client,
    base_url: String,
}

impl HttpRemoteSource {
    pub fn new() -> Result<Self, SyncError> {
        Self::with_base_url("https://ftp.ncbi.nlm.nih.gov/genomes/genbank/bacteria".to_string())
    }

    pub fn with_base_url(base_url: String) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("genbank-mirror/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::RemoteHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|err| SyncError::RemoteHttp(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn send_with_retries(&self, url: &str) -> Result<reqwest::blocking::Response, SyncError> {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(SyncError::TransientTransfer(err.to_string()));
                }
            }
        }
    }

    fn write_response_to_file(
        &self,
        mut response: reqwest::blocking::Response,
        destination: &Utf8Path,
    ) -> Result<(), SyncError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "remote request failed".to_string());
            return Err(SyncError::RemoteStatus { status, message });
        }
        let mut file = File::create(destination.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

impl RemoteSource for HttpRemoteSource {
    fn fetch_catalog(&self, destination: &Utf8Path) -> Result<(), SyncError> {
        let url = format!("{}/assembly_summary.txt", self.base_url);
        let response = self.send_with_retries(&url)?;
        self.write_response_to_file(response, destination)
    }

    fn list_latest(&self, organism: &str) -> ListingOutcome {
        let url = format!("{}/{organism}/latest_assembly_versions/", self.base_url);
        let response = match self.send_with_retries(&url) {
            Ok(response) => response,
            Err(err) => return ListingOutcome::Retryable(err.to_string()),
        };
        let status = response.status();
        if status.as_u16() == 404 {
            return ListingOutcome::Permanent(format!(
                "{organism} has no latest_assembly_versions/ directory"
            ));
        }
        if !status.is_success() {
            return ListingOutcome::Retryable(format!("listing returned status {status}"));
        }
        match response.text() {
            Ok(body) => ListingOutcome::Listed(parse_index_listing(&body)),
            Err(err) => ListingOutcome::Retryable(err.to_string()),
        }
    }

    fn transfer(
        &self,
        organism: &str,
        accepted: &[String],
        destination: &Utf8Path,
        log_path: &Utf8Path,
    ) -> Result<TransferReport, SyncError> {
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path.as_std_path())
            .map_err(|err| SyncError::Filesystem(format!("open {log_path}: {err}")))?;

        let mut report = TransferReport::default();
        for relative in accepted {
            let file_name = relative.rsplit('/').next().unwrap_or(relative.as_str());
            let target = destination.join(file_name);
            if target.as_std_path().exists() {
                report.present += 1;
                writeln!(log, ".f {relative}")
                    .map_err(|err| SyncError::Filesystem(err.to_string()))?;
                continue;
            }

            let url = format!(
                "{}/{organism}/latest_assembly_versions/{relative}",
                self.base_url
            );
            debug!("fetching {url}");
            let response = self.send_with_retries(&url)?;
            if response.status().as_u16() == 404 {
                warn!("{relative} is missing on the remote");
                report.missing += 1;
                writeln!(log, "?f {relative}")
                    .map_err(|err| SyncError::Filesystem(err.to_string()))?;
                continue;
            }
            // Download to a dotted temp name so a dropped connection never
            // leaves a truncated genome looking complete.
            let partial = destination.join(format!(".{file_name}.partial"));
            match self.write_response_to_file(response, &partial) {
                Ok(()) => {
                    fs::rename(partial.as_std_path(), target.as_std_path())
                        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
                    report.fetched += 1;
                    writeln!(log, ">f {relative}")
                        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
                }
                Err(err) => {
                    let _ = fs::remove_file(partial.as_std_path());
                    return Err(err);
                }
            }
        }
        Ok(report)
    }
}

/// Pull directory names out of an HTML index page: the value of each
/// `href="..."`, minus navigation and sort links.
pub fn parse_index_listing(body: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in body.lines() {
        let Some(start) = line.find("href=\"") else {
            continue;
        };
        let rest = &line[start + 6..];
        let Some(end) = rest.find('"') else {
            continue;
        };
        let href = &rest[..end];
        if href.is_empty() || href.starts_with('?') || href.starts_with('/') || href == "../" {
            continue;
        }
        names.push(href.trim_end_matches('/').to_string());
    }
    names
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_listing_skips_navigation_links() {
        let body = concat!(
            "<html><body>\n",
            "<a href=\"?C=N;O=D\">Name</a>\n",
            "<a href=\"/genomes/genbank/bacteria/\">Parent Directory</a>\n",
            "<a href=\"../\">..</a>\n",
            "<a href=\"GCA_000005845.2_ASM584v2/\">GCA_000005845.2_ASM584v2/</a>\n",
            "<a href=\"GCA_000008865.2_ASM886v2/\">GCA_000008865.2_ASM886v2/</a>\n",
            "</body></html>\n",
        );
        let names = parse_index_listing(body);
        assert_eq!(
            names,
            vec!["GCA_000005845.2_ASM584v2", "GCA_000008865.2_ASM886v2"]
        );
    }
}

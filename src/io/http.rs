use async_trait::async_trait;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, RANGE};
use reqwest::{Client, Response, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::ReadAt;
use anyhow::{Context, Result, anyhow, bail};

const DEFAULT_MAX_RETRY: u32 = 10;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_STEP: Duration = Duration::from_millis(500);

/// Byte source backed by HTTP `Range` requests.
///
/// Transient connection failures are retried here, with a linear backoff,
/// so the ZIP layer above never has to.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpRangeReader {
    /// Probe the URL with a HEAD request.
    ///
    /// Fails unless the server advertises byte ranges and a content length.
    pub async fn new(url: String) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let size = probe(&client, &url).await?;
        debug!(%url, size, "opened remote archive");

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
            max_retry: DEFAULT_MAX_RETRY,
        })
    }

    /// Override how many failed connection attempts a single request tolerates.
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry.max(1);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// GET one inclusive byte range, retrying timeouts and refused connections.
    async fn get_range(&self, start: u64, end: u64) -> Result<Response> {
        let range = format!("bytes={}-{}", start, end);
        let mut attempts = 0;
        loop {
            match self.client.get(&self.url).header(RANGE, &range).send().await {
                Ok(resp) if resp.status() == StatusCode::PARTIAL_CONTENT => return Ok(resp),
                Ok(resp) => bail!("range request {} answered with status {}", range, resp.status()),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    attempts += 1;
                    if attempts >= self.max_retry {
                        return Err(e).with_context(|| {
                            format!("giving up on range {} after {} attempts", range, attempts)
                        });
                    }
                    warn!(%range, attempt = attempts, max = self.max_retry, error = %e, "connection error, retrying");
                    tokio::time::sleep(RETRY_STEP * attempts).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// HEAD the URL and return its size.
async fn probe(client: &Client, url: &str) -> Result<u64> {
    let resp = client.head(url).send().await?;
    if !resp.status().is_success() {
        bail!("HEAD {} failed with status: {}", url, resp.status());
    }

    let headers = resp.headers();
    let ranges = headers
        .get(ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");
    if !ranges.contains("bytes") {
        bail!("Remote server does not support Range requests");
    }

    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| anyhow!("Remote server did not return Content-Length"))
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let end = (offset + buf.len() as u64 - 1).min(self.size - 1);
        let wanted = (end - offset + 1) as usize;
        let mut received = 0;

        // A server may cut a 206 response short; ask again for the rest.
        while received < wanted {
            let start = offset + received as u64;
            let body = self.get_range(start, end).await?.bytes().await?;
            if body.is_empty() {
                bail!("range request at {} returned no data", start);
            }
            let n = body.len().min(wanted - received);
            buf[received..received + n].copy_from_slice(&body[..n]);
            received += n;
            self.transferred_bytes.fetch_add(n as u64, Ordering::Relaxed);
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

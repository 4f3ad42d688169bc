use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{FETCH_BACKOFF_MS, FETCH_TIMEOUT_SECS, USER_AGENT};
use crate::error::{AppError, Result};

/// Sorted-by-recency completed+sold search for one set number.
pub fn build_search_url(base_url: &str, product_id: &str, page: u32) -> String {
    format!(
        "{base_url}/sch/i.html?_nkw=LEGO+{product_id}&_sop=12&LH_Complete=1&LH_Sold=1&_pgn={page}"
    )
}

/// The fetch capability: raw HTML for a search URL. Production uses
/// [`HttpFetcher`]; tests script responses.
pub trait SearchPageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("de-DE,de;q=0.9"),
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Transport {
                url: url.to_string(),
                message: format!("HTTP {status}"),
            });
        }
        Ok(resp.text().await?)
    }
}

impl SearchPageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        fetch_with_backoff(url, || self.fetch_once(url)).await
    }
}

/// One initial attempt plus one retry per backoff entry; the schedule
/// being exhausted surfaces the last error to the caller.
async fn fetch_with_backoff<F, Fut>(url: &str, mut attempt: F) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let mut last_err = None;
    for (attempt_no, backoff_ms) in std::iter::once(&0u64)
        .chain(FETCH_BACKOFF_MS.iter())
        .enumerate()
    {
        if *backoff_ms > 0 {
            tokio::time::sleep(Duration::from_millis(*backoff_ms)).await;
        }
        match attempt().await {
            Ok(html) => {
                debug!("fetched {url} (attempt {})", attempt_no + 1);
                return Ok(html);
            }
            Err(e) => {
                warn!("fetch attempt {} for {url} failed: {e}", attempt_no + 1);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| AppError::Transport {
        url: url.to_string(),
        message: "no fetch attempts made".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn search_url_carries_sold_and_page_params() {
        let url = build_search_url("https://www.ebay.de", "75257", 3);
        assert_eq!(
            url,
            "https://www.ebay.de/sch/i.html?_nkw=LEGO+75257&_sop=12&LH_Complete=1&LH_Sold=1&_pgn=3"
        );
    }

    fn down(url: &str) -> AppError {
        AppError::Transport {
            url: url.to_string(),
            message: "connection refused".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_schedule_is_exhausted_before_failing() {
        let attempts = AtomicUsize::new(0);
        let result = fetch_with_backoff("https://test.invalid/1", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(down("https://test.invalid/1")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1 + FETCH_BACKOFF_MS.len());
    }

    #[tokio::test(start_paused = true)]
    async fn success_mid_schedule_stops_retrying() {
        let attempts = AtomicUsize::new(0);
        let result = fetch_with_backoff("https://test.invalid/1", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 2 {
                    Err(down("https://test.invalid/1"))
                } else {
                    Ok("<html></html>".to_string())
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "<html></html>");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}

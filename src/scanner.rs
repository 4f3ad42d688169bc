use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::{Config, PAGE_DELAY_MS};
use crate::error::{AppError, Result};
use crate::extract::{RawListing, SearchPage, Validator};
use crate::fetcher::{build_search_url, SearchPageFetcher};
use crate::types::{ListingRecord, RejectionStats, ScanOutcome};

/// Synthetic first-card titles eBay injects ahead of real results.
const PLACEHOLDER_TITLES: &[&str] = &["Shop on eBay", "Bei eBay shoppen"];

/// Pagination controller states for one identifier.
enum ScanState {
    Fetching(u32),
    Extracting(u32, String),
    Deciding(u32, PageYield),
    Done,
    Failed(AppError),
}

/// What one page contributed, before the continue/stop decision.
#[derive(Default)]
struct PageYield {
    records: Vec<ListingRecord>,
    rejections: RejectionStats,
    fragments_seen: usize,
    has_next: bool,
}

/// Paginate one identifier to completion. Transport failure past the
/// fetcher's retry budget is terminal for this identifier only.
pub async fn scan_one<F: SearchPageFetcher>(
    fetcher: &F,
    cfg: &Config,
    product_id: &str,
) -> Result<ScanOutcome> {
    let now = Utc::now();
    let validator = Validator::new(
        product_id,
        cfg.recency_days,
        cfg.location_filter.clone(),
        cfg.condition_filter.clone(),
    );

    let mut outcome = ScanOutcome {
        product_id: product_id.to_string(),
        ..Default::default()
    };

    let mut state = ScanState::Fetching(1);
    loop {
        state = match state {
            ScanState::Fetching(page) => {
                let url = build_search_url(&cfg.base_url, product_id, page);
                debug!("set {product_id}: fetching page {page}");
                match fetcher.fetch(&url).await {
                    Ok(html) => ScanState::Extracting(page, html),
                    Err(e) => ScanState::Failed(e),
                }
            }
            ScanState::Extracting(page, html) => {
                let yielded = match process_page(&html, &validator, now) {
                    Ok(y) => y,
                    Err(e) => {
                        // Malformed page: surface it, skip the page. Zero
                        // accepted records then ends the scan normally.
                        warn!("set {product_id}: page {page} skipped: {e}");
                        PageYield::default()
                    }
                };
                ScanState::Deciding(page, yielded)
            }
            ScanState::Deciding(page, yielded) => {
                outcome.pages_fetched = page;
                let accepted = yielded.records.len();
                debug!(
                    "set {product_id}: page {page} had {} fragments, {} accepted, {} rejected",
                    yielded.fragments_seen,
                    accepted,
                    yielded.rejections.total(),
                );
                outcome.records.extend(yielded.records);
                outcome.rejections.merge(&yielded.rejections);

                if accepted == 0 || page >= cfg.max_pages || !yielded.has_next {
                    ScanState::Done
                } else {
                    tokio::time::sleep(Duration::from_millis(PAGE_DELAY_MS)).await;
                    ScanState::Fetching(page + 1)
                }
            }
            ScanState::Done => break,
            ScanState::Failed(e) => return Err(e),
        };
    }

    // Newest sales first, matching the export order.
    outcome
        .records
        .sort_by(|a, b| b.sold_at.cmp(&a.sold_at));

    info!(
        "set {product_id}: {} listings accepted over {} page(s), {} rejected ({})",
        outcome.records.len(),
        outcome.pages_fetched,
        outcome.rejections.total(),
        outcome.rejections,
    );
    Ok(outcome)
}

/// Segment, extract and validate one fetched document. Synchronous CPU work;
/// the parsed DOM never crosses an await point.
fn process_page(html: &str, validator: &Validator, now: DateTime<Utc>) -> Result<PageYield> {
    let page = SearchPage::parse(html)?;
    let mut yielded = PageYield {
        has_next: page.has_next_page(),
        ..Default::default()
    };

    for fragment in page.fragments() {
        yielded.fragments_seen += 1;
        let raw = RawListing::from_fragment(&fragment);

        if let Some(title) = &raw.title {
            if PLACEHOLDER_TITLES.contains(&title.as_str()) {
                continue;
            }
        }

        match validator.validate(&raw, now) {
            Ok(record) => yielded.records.push(record),
            Err(reason) => yielded.rejections.record(reason),
        }
    }

    Ok(yielded)
}

/// Scan many identifiers with bounded concurrency. Each identifier's result
/// is independent; a failed scan is reported in place, never fatal to the
/// rest of the run. Output preserves input order.
pub async fn scan_all<F>(
    fetcher: Arc<F>,
    cfg: Arc<Config>,
    product_ids: Vec<String>,
) -> Vec<(String, Result<ScanOutcome>)>
where
    F: SearchPageFetcher + 'static,
{
    let total = product_ids.len();
    let semaphore = Arc::new(Semaphore::new(cfg.max_concurrent.max(1)));
    let mut tasks = JoinSet::new();

    for (idx, product_id) in product_ids.into_iter().enumerate() {
        let fetcher = Arc::clone(&fetcher);
        let cfg = Arc::clone(&cfg);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    return (
                        idx,
                        product_id.clone(),
                        Err(AppError::Config("scanner semaphore closed".to_string())),
                    )
                }
            };
            let result = scan_one(fetcher.as_ref(), &cfg, &product_id).await;
            (idx, product_id, result)
        });
    }

    let mut slots: Vec<Option<(String, Result<ScanOutcome>)>> =
        (0..total).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, product_id, result)) => slots[idx] = Some((product_id, result)),
            Err(e) => error!("scan task panicked: {e}"),
        }
    }
    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RejectReason;
    use std::collections::HashMap;

    struct ScriptedFetcher {
        pages: HashMap<String, String>,
    }

    impl SearchPageFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.pages.get(url).cloned().ok_or_else(|| AppError::Transport {
                url: url.to_string(),
                message: "scripted failure".to_string(),
            })
        }
    }

    fn test_config() -> Config {
        Config {
            base_url: "https://test.invalid".to_string(),
            log_level: "info".to_string(),
            inventory_path: "inventory.csv".to_string(),
            data_dir: "data".to_string(),
            max_pages: 10,
            recency_days: 30,
            max_concurrent: 2,
            location_filter: Some("Deutschland".to_string()),
            condition_filter: None,
        }
    }

    fn item_html(title: &str, price: &str, ended: &str) -> String {
        format!(
            r#"<li class="s-item">
                 <div class="s-item__title">{title}</div>
                 <span class="s-item__price">{price}</span>
                 <span class="s-item__shipping">+ EUR 4,95 Versand</span>
                 <span class="s-item__ended-date">{ended}</span>
                 <div class="s-item__subtitle">Brandneu | Privat</div>
                 <a class="s-item__link" href="https://test.invalid/itm/1"></a>
                 <span class="s-item__location">aus Deutschland</span>
               </li>"#
        )
    }

    fn page_html(items: &[String], has_next: bool) -> String {
        let next = if has_next {
            r##"<a class="pagination__next" href="#">Weiter</a>"##
        } else {
            ""
        };
        format!(
            "<html><body><ul class=\"srp-results\">{}</ul>{next}</body></html>",
            items.join("")
        )
    }

    fn url_for(cfg: &Config, id: &str, page: u32) -> String {
        build_search_url(&cfg.base_url, id, page)
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_page_with_zero_accepted_despite_fragments() {
        let cfg = test_config();
        let page1 = page_html(
            &[item_html("LEGO 75257 Falcon", "EUR 100,00", "vor 3 Tagen")],
            true,
        );
        // Page 2 has fragments, but none validate for this identifier.
        let page2 = page_html(
            &[item_html("LEGO 10300 DeLorean", "EUR 150,00", "vor 2 Tagen")],
            true,
        );
        let mut pages = HashMap::new();
        pages.insert(url_for(&cfg, "75257", 1), page1);
        pages.insert(url_for(&cfg, "75257", 2), page2);
        // Page 3 is deliberately absent: fetching it would fail the scan.
        let fetcher = ScriptedFetcher { pages };

        let outcome = scan_one(&fetcher, &cfg, "75257").await.unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(outcome.rejections.no_identifier_match, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn respects_page_ceiling() {
        let mut cfg = test_config();
        cfg.max_pages = 2;
        let accepted_page = |next| {
            page_html(
                &[item_html("LEGO 75257 Falcon", "EUR 100,00", "vor 3 Tagen")],
                next,
            )
        };
        let mut pages = HashMap::new();
        pages.insert(url_for(&cfg, "75257", 1), accepted_page(true));
        pages.insert(url_for(&cfg, "75257", 2), accepted_page(true));
        // Page 3 exists per the next-link but must never be requested.
        let fetcher = ScriptedFetcher { pages };

        let outcome = scan_one(&fetcher, &cfg, "75257").await.unwrap();
        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(outcome.records.len(), 2);
    }

    #[tokio::test]
    async fn placeholder_card_is_skipped_without_counting() {
        let cfg = test_config();
        let page = page_html(
            &[
                item_html("Shop on eBay", "EUR 20,00", "vor 1 Tag"),
                item_html("LEGO 75257 Falcon", "EUR 100,00", "vor 3 Tagen"),
            ],
            false,
        );
        let mut pages = HashMap::new();
        pages.insert(url_for(&cfg, "75257", 1), page);
        let fetcher = ScriptedFetcher { pages };

        let outcome = scan_one(&fetcher, &cfg, "75257").await.unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.rejections.total(), 0);
    }

    #[tokio::test]
    async fn malformed_page_ends_scan_without_error() {
        let cfg = test_config();
        let mut pages = HashMap::new();
        pages.insert(
            url_for(&cfg, "75257", 1),
            "<html><body><p>Entschuldigung, etwas ist schiefgelaufen</p></body></html>".to_string(),
        );
        let fetcher = ScriptedFetcher { pages };

        let outcome = scan_one(&fetcher, &cfg, "75257").await.unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.pages_fetched, 1);
    }

    #[tokio::test]
    async fn records_are_sorted_newest_first() {
        let cfg = test_config();
        let page = page_html(
            &[
                item_html("LEGO 75257 alt", "EUR 90,00", "vor 10 Tagen"),
                item_html("LEGO 75257 frisch", "EUR 110,00", "vor 1 Tag"),
            ],
            false,
        );
        let mut pages = HashMap::new();
        pages.insert(url_for(&cfg, "75257", 1), page);
        let fetcher = ScriptedFetcher { pages };

        let outcome = scan_one(&fetcher, &cfg, "75257").await.unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.records[0].sold_at > outcome.records[1].sold_at);
        assert_eq!(outcome.records[0].title, "LEGO 75257 frisch");
    }

    #[tokio::test]
    async fn rejection_reasons_are_tallied() {
        let cfg = test_config();
        let mut foreign = item_html("LEGO 75257 US import", "US $99.99", "vor 2 Tagen");
        foreign = foreign.replace("aus Deutschland", "aus den USA");
        let page = page_html(
            &[
                item_html("LEGO 75257 Falcon", "EUR 100,00", "vor 3 Tagen"),
                foreign,
                item_html("LEGO 75257 und 10300", "EUR 80,00", "vor 2 Tagen"),
            ],
            false,
        );
        let mut pages = HashMap::new();
        pages.insert(url_for(&cfg, "75257", 1), page);
        let fetcher = ScriptedFetcher { pages };

        let outcome = scan_one(&fetcher, &cfg, "75257").await.unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.rejections.unsupported_currency, 1);
        assert_eq!(outcome.rejections.total(), 2);
    }

    #[tokio::test]
    async fn failed_identifier_does_not_block_others() {
        let cfg = Arc::new(test_config());
        let page = page_html(
            &[item_html("LEGO 10300 DeLorean", "EUR 150,00", "vor 2 Tagen")],
            false,
        );
        let mut pages = HashMap::new();
        // No pages scripted for 75257: every fetch is a transport error.
        pages.insert(url_for(&cfg, "10300", 1), page);
        let fetcher = Arc::new(ScriptedFetcher { pages });

        let results = scan_all(
            fetcher,
            Arc::clone(&cfg),
            vec!["75257".to_string(), "10300".to_string()],
        )
        .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "75257");
        assert!(results[0].1.is_err());
        let outcome = results[1].1.as_ref().unwrap();
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn accepted_plus_rejected_accounts_for_fragments() {
        let validator = Validator::new("75257", 30, Some("Deutschland".to_string()), None);
        let html = page_html(
            &[
                item_html("Shop on eBay", "EUR 20,00", "vor 1 Tag"),
                item_html("LEGO 75257 Falcon", "EUR 100,00", "vor 3 Tagen"),
                item_html("LEGO 10300 DeLorean", "EUR 150,00", "vor 2 Tagen"),
            ],
            false,
        );
        let yielded = process_page(&html, &validator, Utc::now()).unwrap();
        assert_eq!(yielded.fragments_seen, 3);
        // one placeholder skipped, one accepted, one rejected
        assert_eq!(yielded.records.len() + yielded.rejections.total() + 1, 3);
        assert_eq!(
            yielded.rejections.no_identifier_match, 1,
            "wrong set number must reject as {}",
            RejectReason::NoIdentifierMatch
        );
    }
}

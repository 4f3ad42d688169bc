use crate::error::{AppError, Result};

pub const EBAY_BASE_URL: &str = "https://www.ebay.de";

/// Days back from "now" a sold date may lie and still be accepted.
pub const DEFAULT_RECENCY_DAYS: i64 = 30;

/// Page-count ceiling per identifier. eBay rarely has more than a handful
/// of relevant pages for a single set number.
pub const DEFAULT_MAX_PAGES: u32 = 10;

/// Retry backoff values in milliseconds. One fetch attempt per entry plus
/// the initial try; the schedule being exhausted marks the scan failed.
pub const FETCH_BACKOFF_MS: &[u64] = &[500, 1_000, 2_000];

/// Per-request timeout (seconds).
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Delay between successive result pages of one identifier (milliseconds),
/// to stay within the site's rate tolerance.
pub const PAGE_DELAY_MS: u64 = 2_000;

/// Upper bound on concurrently scanned identifiers.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub log_level: String,
    /// Path to the inventory sheet (INVENTORY_PATH).
    pub inventory_path: String,
    /// Directory for CSV output (DATA_DIR).
    pub data_dir: String,
    /// Page-count ceiling per identifier (SCANNER_MAX_PAGES).
    pub max_pages: u32,
    /// Recency window in days (SCANNER_RECENCY_DAYS).
    pub recency_days: i64,
    /// Max identifiers scanned concurrently (SCANNER_MAX_CONCURRENT).
    pub max_concurrent: usize,
    /// Seller-location substring a listing must match (SCANNER_LOCATION).
    /// Empty disables the location filter.
    pub location_filter: Option<String>,
    /// Optional condition restriction, e.g. "Brandneu" (SCANNER_CONDITION).
    /// Empty disables the condition filter.
    pub condition_filter: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let max_pages = std::env::var("SCANNER_MAX_PAGES")
            .unwrap_or_else(|_| DEFAULT_MAX_PAGES.to_string())
            .parse::<u32>()
            .map_err(|_| AppError::Config("SCANNER_MAX_PAGES must be a positive integer".to_string()))?;
        if max_pages == 0 {
            return Err(AppError::Config("SCANNER_MAX_PAGES must be >= 1".to_string()));
        }

        let recency_days = std::env::var("SCANNER_RECENCY_DAYS")
            .unwrap_or_else(|_| DEFAULT_RECENCY_DAYS.to_string())
            .parse::<i64>()
            .map_err(|_| AppError::Config("SCANNER_RECENCY_DAYS must be an integer".to_string()))?;

        Ok(Self {
            base_url: std::env::var("EBAY_BASE_URL").unwrap_or_else(|_| EBAY_BASE_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            inventory_path: std::env::var("INVENTORY_PATH")
                .unwrap_or_else(|_| "inventory.csv".to_string()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            max_pages,
            recency_days,
            max_concurrent: std::env::var("SCANNER_MAX_CONCURRENT")
                .unwrap_or_else(|_| DEFAULT_MAX_CONCURRENT.to_string())
                .parse::<usize>()
                .unwrap_or(DEFAULT_MAX_CONCURRENT),
            location_filter: non_empty(
                std::env::var("SCANNER_LOCATION").unwrap_or_else(|_| "Deutschland".to_string()),
            ),
            condition_filter: non_empty(std::env::var("SCANNER_CONDITION").unwrap_or_default()),
        })
    }
}

fn non_empty(s: String) -> Option<String> {
    let s = s.trim().to_string();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Listing record
// ---------------------------------------------------------------------------

/// One accepted sold listing, fully normalized. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub title: String,
    pub item_price: f64,
    /// 0.0 when the listing states free shipping or carries no shipping field.
    pub shipping_cost: f64,
    /// Always item_price + shipping_cost.
    pub total_price: f64,
    pub currency: Currency,
    pub sold_at: DateTime<Utc>,
    pub condition: Condition,
    pub seller_type: SellerType,
    pub location: String,
    pub source_url: String,
    pub product_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    Eur,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Eur => write!(f, "EUR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    Used,
    Unknown,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Condition::New => "new",
            Condition::Used => "used",
            Condition::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellerType {
    Private,
    Commercial,
    Unknown,
}

impl std::fmt::Display for SellerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SellerType::Private => "private",
            SellerType::Commercial => "commercial",
            SellerType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Validation rejections
// ---------------------------------------------------------------------------

/// Why a listing fragment was dropped. Rejections are tallied, never raised —
/// a single bad listing must not abort a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No digit run in the title has the target's digit length.
    NoIdentifierMatch,
    /// More than one digit run shares the target's digit length.
    AmbiguousIdentifierMatch,
    UnparseablePrice,
    UnsupportedCurrency,
    UnparseableDate,
    /// Date parsed but falls outside the recency window.
    StaleDate,
    LocationMismatch,
    /// Condition filter configured and the listing's condition differs.
    ConditionMismatch,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::NoIdentifierMatch => "no_identifier_match",
            RejectReason::AmbiguousIdentifierMatch => "ambiguous_identifier_match",
            RejectReason::UnparseablePrice => "unparseable_price",
            RejectReason::UnsupportedCurrency => "unsupported_currency",
            RejectReason::UnparseableDate => "unparseable_date",
            RejectReason::StaleDate => "stale_date",
            RejectReason::LocationMismatch => "location_mismatch",
            RejectReason::ConditionMismatch => "condition_mismatch",
        };
        write!(f, "{s}")
    }
}

/// Per-scan rejection counters, reported alongside accepted counts so
/// silent data loss stays observable.
#[derive(Debug, Default, Clone)]
pub struct RejectionStats {
    pub no_identifier_match: usize,
    pub ambiguous_identifier_match: usize,
    pub unparseable_price: usize,
    pub unsupported_currency: usize,
    pub unparseable_date: usize,
    pub stale_date: usize,
    pub location_mismatch: usize,
    pub condition_mismatch: usize,
}

impl RejectionStats {
    pub fn record(&mut self, reason: RejectReason) {
        match reason {
            RejectReason::NoIdentifierMatch => self.no_identifier_match += 1,
            RejectReason::AmbiguousIdentifierMatch => self.ambiguous_identifier_match += 1,
            RejectReason::UnparseablePrice => self.unparseable_price += 1,
            RejectReason::UnsupportedCurrency => self.unsupported_currency += 1,
            RejectReason::UnparseableDate => self.unparseable_date += 1,
            RejectReason::StaleDate => self.stale_date += 1,
            RejectReason::LocationMismatch => self.location_mismatch += 1,
            RejectReason::ConditionMismatch => self.condition_mismatch += 1,
        }
    }

    pub fn merge(&mut self, other: &RejectionStats) {
        self.no_identifier_match += other.no_identifier_match;
        self.ambiguous_identifier_match += other.ambiguous_identifier_match;
        self.unparseable_price += other.unparseable_price;
        self.unsupported_currency += other.unsupported_currency;
        self.unparseable_date += other.unparseable_date;
        self.stale_date += other.stale_date;
        self.location_mismatch += other.location_mismatch;
        self.condition_mismatch += other.condition_mismatch;
    }

    pub fn total(&self) -> usize {
        self.no_identifier_match
            + self.ambiguous_identifier_match
            + self.unparseable_price
            + self.unsupported_currency
            + self.unparseable_date
            + self.stale_date
            + self.location_mismatch
            + self.condition_mismatch
    }
}

impl std::fmt::Display for RejectionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "no_id={} ambiguous_id={} bad_price={} bad_currency={} bad_date={} stale={} location={} condition={}",
            self.no_identifier_match,
            self.ambiguous_identifier_match,
            self.unparseable_price,
            self.unsupported_currency,
            self.unparseable_date,
            self.stale_date,
            self.location_mismatch,
            self.condition_mismatch,
        )
    }
}

// ---------------------------------------------------------------------------
// Scan results
// ---------------------------------------------------------------------------

/// Accumulated result of paginating one identifier to completion.
#[derive(Debug, Default, Clone)]
pub struct ScanOutcome {
    pub product_id: String,
    pub records: Vec<ListingRecord>,
    pub rejections: RejectionStats,
    pub pages_fetched: u32,
}

// ---------------------------------------------------------------------------
// Inventory & comparison
// ---------------------------------------------------------------------------

/// One row of the user's inventory sheet. Read-only to the scanner.
#[derive(Debug, Clone)]
pub struct InventoryEntry {
    pub product_id: String,
    pub name: String,
    pub series: String,
    pub average_buy_price: f64,
}

/// Market statistics joined with the inventory buy price for one identifier.
/// All statistic fields are None when no market data was found — the row is
/// still emitted, since absence of market data is itself a result.
#[derive(Debug, Clone)]
pub struct ComparisonRow {
    pub product_id: String,
    pub name: String,
    pub series: String,
    pub count: usize,
    pub avg_buy_price: f64,
    pub market_avg_price: Option<f64>,
    pub market_median_price: Option<f64>,
    pub avg_price_diff_pct: Option<f64>,
    pub median_price_diff_pct: Option<f64>,
    pub potential_profit_avg: Option<f64>,
    pub potential_profit_median: Option<f64>,
    pub avg_shipping: Option<f64>,
    pub median_shipping: Option<f64>,
    /// Mean total price over private-seller listings, when any exist.
    pub avg_price_private: Option<f64>,
    /// Mean total price over commercial-seller listings, when any exist.
    pub avg_price_commercial: Option<f64>,
}

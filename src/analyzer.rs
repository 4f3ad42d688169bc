//! Aggregation over accepted listings. All statistics keep full precision;
//! rounding happens only at the export boundary.

use crate::types::{ComparisonRow, InventoryEntry, ListingRecord, SellerType};

/// Join the market records for one identifier with its inventory entry.
/// An empty record set produces a row with null statistics, never a dropped
/// row — zero would wrongly read as a confirmed zero-profit market.
pub fn compare(entry: &InventoryEntry, records: &[ListingRecord]) -> ComparisonRow {
    let totals: Vec<f64> = records.iter().map(|r| r.total_price).collect();
    let shipping: Vec<f64> = records.iter().map(|r| r.shipping_cost).collect();

    let market_avg_price = mean(&totals);
    let market_median_price = median(&totals);

    // A zero buy price has no meaningful percentage; the profit columns
    // still carry the absolute difference.
    let diff_pct = |market: f64| {
        if entry.average_buy_price == 0.0 {
            None
        } else {
            Some((market - entry.average_buy_price) / entry.average_buy_price * 100.0)
        }
    };
    let profit = |market: f64| market - entry.average_buy_price;

    ComparisonRow {
        product_id: entry.product_id.clone(),
        name: entry.name.clone(),
        series: entry.series.clone(),
        count: records.len(),
        avg_buy_price: entry.average_buy_price,
        market_avg_price,
        market_median_price,
        avg_price_diff_pct: market_avg_price.and_then(diff_pct),
        median_price_diff_pct: market_median_price.and_then(diff_pct),
        potential_profit_avg: market_avg_price.map(profit),
        potential_profit_median: market_median_price.map(profit),
        avg_shipping: mean(&shipping),
        median_shipping: median(&shipping),
        avg_price_private: seller_mean(records, SellerType::Private),
        avg_price_commercial: seller_mean(records, SellerType::Commercial),
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Midpoint-average rule for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

fn seller_mean(records: &[ListingRecord], seller_type: SellerType) -> Option<f64> {
    let totals: Vec<f64> = records
        .iter()
        .filter(|r| r.seller_type == seller_type)
        .map(|r| r.total_price)
        .collect();
    mean(&totals)
}

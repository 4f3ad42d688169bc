//! CSV output. This is the presentation boundary: monetary and percentage
//! values are rounded to 2 decimal places here and nowhere earlier.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{ComparisonRow, ListingRecord};

pub const LISTING_HEADERS: [&str; 9] = [
    "Title",
    "Item Price",
    "Shipping Cost",
    "Total Price",
    "Currency",
    "URL",
    "Set Number",
    "End Time",
    "Location",
];

pub const COMPARISON_HEADERS: [&str; 15] = [
    "Set Number",
    "Set Name",
    "Series",
    "Number Sold",
    "My Avg Buy Price",
    "Market Avg Price",
    "Market Median Price",
    "Avg Price Diff %",
    "Median Price Diff %",
    "Potential Profit (Avg)",
    "Potential Profit (Median)",
    "Avg Shipping",
    "Median Shipping",
    "Avg Price (Private)",
    "Avg Price (Commercial)",
];

pub fn listings_path(data_dir: &Path, product_id: &str, now: DateTime<Utc>) -> PathBuf {
    data_dir.join(format!(
        "ebay_sales_{product_id}_{}.csv",
        now.format("%Y%m%d_%H%M%S")
    ))
}

pub fn comparison_path(data_dir: &Path, now: DateTime<Utc>) -> PathBuf {
    data_dir.join(format!(
        "price_analysis_{}.csv",
        now.format("%Y%m%d_%H%M%S")
    ))
}

pub fn manifest_path(data_dir: &Path, now: DateTime<Utc>) -> PathBuf {
    data_dir.join(format!(
        "market_data_manifest_{}.json",
        now.format("%Y%m%d_%H%M%S")
    ))
}

/// JSON manifest of the listing files a run produced.
pub fn write_manifest(path: &Path, now: DateTime<Utc>, files: &[String]) -> Result<()> {
    let manifest = serde_json::json!({
        "timestamp": now.format("%Y%m%d_%H%M%S").to_string(),
        "files": files,
    });
    std::fs::write(path, serde_json::to_string_pretty(&manifest)?)?;
    Ok(())
}

pub fn write_listings_csv(path: &Path, records: &[ListingRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(LISTING_HEADERS)?;
    for r in records {
        writer.write_record(&[
            r.title.clone(),
            money(r.item_price),
            money(r.shipping_cost),
            money(r.total_price),
            r.currency.to_string(),
            r.source_url.clone(),
            r.product_id.clone(),
            r.sold_at.format("%Y-%m-%d").to_string(),
            r.location.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Null statistics are written as empty cells, not zeros.
pub fn write_comparison_csv(path: &Path, rows: &[ComparisonRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(COMPARISON_HEADERS)?;
    for row in rows {
        writer.write_record(&[
            row.product_id.clone(),
            row.name.clone(),
            row.series.clone(),
            row.count.to_string(),
            money(row.avg_buy_price),
            opt_money(row.market_avg_price),
            opt_money(row.market_median_price),
            opt_money(row.avg_price_diff_pct),
            opt_money(row.median_price_diff_pct),
            opt_money(row.potential_profit_avg),
            opt_money(row.potential_profit_median),
            opt_money(row.avg_shipping),
            opt_money(row.median_shipping),
            opt_money(row.avg_price_private),
            opt_money(row.avg_price_commercial),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn opt_money(value: Option<f64>) -> String {
    value.map(money).unwrap_or_default()
}

mod analyzer;
mod config;
mod error;
mod export;
mod extract;
mod fetcher;
mod inventory;
mod scanner;
mod types;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::export::{
    comparison_path, listings_path, manifest_path, write_comparison_csv, write_listings_csv,
    write_manifest,
};
use crate::fetcher::HttpFetcher;
use crate::scanner::scan_all;
use crate::types::InventoryEntry;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(cfg, args).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config, args: Vec<String>) -> Result<()> {
    // Inventory is the only input the run cannot proceed without.
    let entries = inventory::load_inventory(Path::new(&cfg.inventory_path))?;
    info!(
        "Loaded {} inventory entries from {}",
        entries.len(),
        cfg.inventory_path
    );
    let by_id: HashMap<String, InventoryEntry> = entries
        .iter()
        .map(|e| (e.product_id.clone(), e.clone()))
        .collect();

    let product_ids = select_identifiers(&args, &entries)?;
    info!(
        "Scanning {} set(s), up to {} concurrently: {}",
        product_ids.len(),
        cfg.max_concurrent,
        product_ids.join(", ")
    );

    std::fs::create_dir_all(&cfg.data_dir)?;
    let data_dir = Path::new(&cfg.data_dir).to_path_buf();

    let fetcher = Arc::new(HttpFetcher::new()?);
    let results = scan_all(fetcher, Arc::new(cfg.clone()), product_ids).await;

    let now = Utc::now();
    let mut rows = Vec::new();
    let mut listing_files = Vec::new();
    let mut failed = 0usize;

    for (product_id, result) in &results {
        match result {
            Ok(outcome) => {
                info!(
                    "[SCAN] set {product_id}: {} accepted over {} page(s), rejected: {}",
                    outcome.records.len(),
                    outcome.pages_fetched,
                    outcome.rejections,
                );
                if !outcome.records.is_empty() {
                    let path = listings_path(&data_dir, product_id, now);
                    // Listing-file failure is fatal for that artifact only.
                    match write_listings_csv(&path, &outcome.records) {
                        Ok(()) => {
                            info!("[SCAN] set {product_id}: wrote {}", path.display());
                            listing_files.push(path.display().to_string());
                        }
                        Err(e) => error!(
                            "[SCAN] set {product_id}: could not write {}: {e}",
                            path.display()
                        ),
                    }
                }
                match by_id.get(&outcome.product_id) {
                    Some(entry) => rows.push(analyzer::compare(entry, &outcome.records)),
                    None => warn!(
                        "[SCAN] set {product_id}: not in inventory, excluded from comparison report"
                    ),
                }
            }
            Err(e) => {
                failed += 1;
                error!("[SCAN] set {product_id}: failed: {e}");
            }
        }
    }

    if !listing_files.is_empty() {
        let path = manifest_path(&data_dir, now);
        match write_manifest(&path, now, &listing_files) {
            Ok(()) => info!("Manifest written to {}", path.display()),
            Err(e) => error!("Could not write manifest {}: {e}", path.display()),
        }
    }

    if !rows.is_empty() {
        let report_path = comparison_path(&data_dir, now);
        write_comparison_csv(&report_path, &rows)?;
        info!(
            "Comparison report with {} row(s) written to {}",
            rows.len(),
            report_path.display()
        );
    }

    info!(
        "Run complete: {} set(s) scanned, {} failed",
        results.len() - failed,
        failed
    );
    Ok(())
}

/// Identifiers from the command line, or every inventory identifier when none
/// are given. Non-numeric arguments are dropped with a warning.
fn select_identifiers(args: &[String], entries: &[InventoryEntry]) -> Result<Vec<String>> {
    if args.is_empty() {
        return Ok(entries.iter().map(|e| e.product_id.clone()).collect());
    }
    let mut ids = Vec::new();
    for arg in args {
        let arg = arg.trim().trim_end_matches(',');
        if !arg.is_empty() && arg.chars().all(|c| c.is_ascii_digit()) {
            ids.push(arg.to_string());
        } else {
            warn!("Ignoring invalid set number {arg:?}");
        }
    }
    if ids.is_empty() {
        return Err(AppError::Config(
            "no valid set numbers among the arguments".to_string(),
        ));
    }
    Ok(ids)
}

use std::path::Path;

use tracing::warn;

use crate::error::{AppError, Result};
use crate::types::InventoryEntry;

const COL_IDENTIFIER: &str = "identifier";
const COL_NAME: &str = "name";
const COL_PRICE: &str = "average_buy_price";

/// Load the user's inventory sheet. The sheet is CSV with required columns
/// `identifier`, `name`, `average_buy_price`; rows with a non-numeric
/// identifier or unparseable price are skipped with a warning.
pub fn load_inventory(path: &Path) -> Result<Vec<InventoryEntry>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        AppError::Inventory(format!("cannot open {}: {e}", path.display()))
    })?;

    let headers = reader
        .headers()
        .map_err(|e| AppError::Inventory(format!("cannot read header row: {e}")))?
        .clone();
    let col = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| AppError::Inventory(format!("missing required column '{name}'")))
    };
    let id_col = col(COL_IDENTIFIER)?;
    let name_col = col(COL_NAME)?;
    let price_col = col(COL_PRICE)?;

    let mut entries = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(|e| AppError::Inventory(format!("row {}: {e}", line + 2)))?;
        let id = row.get(id_col).unwrap_or("").trim();
        let name = row.get(name_col).unwrap_or("").trim();
        let price_text = row.get(price_col).unwrap_or("").trim();

        if id.is_empty() && name.is_empty() && price_text.is_empty() {
            continue;
        }
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            warn!("inventory row {}: skipping non-numeric identifier {id:?}", line + 2);
            continue;
        }
        let Ok(average_buy_price) = price_text.replace(',', ".").parse::<f64>() else {
            warn!(
                "inventory row {}: skipping set {id}, unparseable price {price_text:?}",
                line + 2
            );
            continue;
        };

        entries.push(InventoryEntry {
            product_id: id.to_string(),
            name: name.to_string(),
            series: derive_series(name),
            average_buy_price,
        });
    }

    if entries.is_empty() {
        return Err(AppError::Inventory(format!(
            "no usable rows in {}",
            path.display()
        )));
    }
    Ok(entries)
}

/// Series is the segment of the set name before the first " - " separator,
/// falling back to the leading word.
fn derive_series(name: &str) -> String {
    if let Some((series, _)) = name.split_once(" - ") {
        return series.trim().to_string();
    }
    name.split_whitespace().next().unwrap_or("").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_sheet(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_rows_and_derives_series() {
        let sheet = write_sheet(
            "identifier,name,average_buy_price\n\
             75257,Star Wars - Millennium Falcon,119.99\n\
             10300,Icons - DeLorean,149.99\n",
        );
        let entries = load_inventory(sheet.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].product_id, "75257");
        assert_eq!(entries[0].series, "Star Wars");
        assert_eq!(entries[1].average_buy_price, 149.99);
    }

    #[test]
    fn skips_bad_rows_and_accepts_comma_decimal() {
        let sheet = write_sheet(
            "identifier,name,average_buy_price\n\
             abc,Not a set,10\n\
             75257,Falcon,\"119,99\"\n\
             10300,DeLorean,n/a\n",
        );
        let entries = load_inventory(sheet.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].average_buy_price, 119.99);
        assert_eq!(entries[0].series, "Falcon");
    }

    #[test]
    fn missing_column_is_an_error() {
        let sheet = write_sheet("identifier,name\n75257,Falcon\n");
        assert!(load_inventory(sheet.path()).is_err());
    }

    #[test]
    fn empty_sheet_is_an_error() {
        let sheet = write_sheet("identifier,name,average_buy_price\n");
        assert!(load_inventory(sheet.path()).is_err());
    }
}

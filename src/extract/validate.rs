use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

use super::fields::RawListing;
use crate::types::{Condition, Currency, ListingRecord, RejectReason, SellerType};

/// Converts extracted field text into a typed [`ListingRecord`], or a counted
/// rejection reason. Rejections never abort a scan.
pub struct Validator {
    target_id: String,
    recency: Duration,
    location_filter: Option<String>,
    condition_filter: Option<String>,
}

impl Validator {
    pub fn new(
        target_id: &str,
        recency_days: i64,
        location_filter: Option<String>,
        condition_filter: Option<String>,
    ) -> Self {
        Self {
            target_id: target_id.to_string(),
            recency: Duration::days(recency_days),
            location_filter,
            condition_filter,
        }
    }

    pub fn validate(
        &self,
        raw: &RawListing,
        now: DateTime<Utc>,
    ) -> Result<ListingRecord, RejectReason> {
        let title = raw.title.as_deref().unwrap_or("");
        validate_title(title, &self.target_id)?;

        let price_text = raw.price.as_deref().ok_or(RejectReason::UnparseablePrice)?;
        let item_price = parse_price(price_text)?;
        let shipping_cost = parse_shipping(raw.shipping.as_deref())?;

        let date_text = raw
            .ended_date
            .as_deref()
            .ok_or(RejectReason::UnparseableDate)?;
        let sold_at = parse_sold_date(date_text, now)?;
        if sold_at > now || sold_at < now - self.recency {
            return Err(RejectReason::StaleDate);
        }

        let condition = map_condition(raw.condition.as_deref());
        if let Some(want) = &self.condition_filter {
            let have = raw.condition.as_deref().unwrap_or("");
            if !have.to_lowercase().contains(&want.to_lowercase()) {
                return Err(RejectReason::ConditionMismatch);
            }
        }

        // Domestic listings often omit the location element entirely; treat
        // that as the filter's home country rather than rejecting.
        let location = match &raw.location {
            Some(l) => l.clone(),
            None => self.location_filter.clone().unwrap_or_default(),
        };
        if let Some(filter) = &self.location_filter {
            if !location.to_lowercase().contains(&filter.to_lowercase()) {
                return Err(RejectReason::LocationMismatch);
            }
        }

        Ok(ListingRecord {
            title: title.to_string(),
            item_price,
            shipping_cost,
            total_price: item_price + shipping_cost,
            currency: Currency::Eur,
            sold_at,
            condition,
            seller_type: map_seller_type(raw.seller_type.as_deref()),
            location,
            source_url: raw.url.clone().unwrap_or_default(),
            product_id: self.target_id.clone(),
        })
    }
}

/// Whole-token identifier check over maximal digit runs. Exactly one run of
/// the target's digit length must exist and equal the target; two same-length
/// runs are ambiguous and reject outright, even if one matches.
pub fn validate_title(title: &str, target: &str) -> Result<(), RejectReason> {
    let mut matching = 0usize;
    let mut last_match_equal = false;

    for run in digit_runs(title) {
        if run.len() == target.len() {
            matching += 1;
            last_match_equal = run == target;
        }
    }

    match matching {
        0 => Err(RejectReason::NoIdentifierMatch),
        1 if last_match_equal => Ok(()),
        1 => Err(RejectReason::NoIdentifierMatch),
        _ => Err(RejectReason::AmbiguousIdentifierMatch),
    }
}

fn digit_runs(s: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in s.char_indices() {
        if ch.is_ascii_digit() {
            start.get_or_insert(i);
        } else if let Some(s0) = start.take() {
            runs.push(&s[s0..i]);
        }
    }
    if let Some(s0) = start {
        runs.push(&s[s0..]);
    }
    runs
}

/// Parse marketplace price text ("EUR 123,45", "123,45 €", "EUR 1.299,00",
/// range text takes the first amount) into a non-negative EUR value.
pub fn parse_price(text: &str) -> Result<f64, RejectReason> {
    let lower = text.to_lowercase();
    if lower.contains('$') || lower.contains('£') {
        return Err(RejectReason::UnsupportedCurrency);
    }
    for marker in ["usd", "gbp", "chf", "pln"] {
        if lower.contains(marker) {
            return Err(RejectReason::UnsupportedCurrency);
        }
    }

    // German numeric format: '.' is a grouping separator, ',' the decimal one.
    let normalized = text.replace('.', "").replace(',', ".");

    let mut num = String::new();
    for ch in normalized.chars() {
        if ch.is_ascii_digit() || (ch == '.' && !num.is_empty() && !num.contains('.')) {
            num.push(ch);
        } else if !num.is_empty() {
            break;
        }
    }

    num.trim_end_matches('.')
        .parse::<f64>()
        .map_err(|_| RejectReason::UnparseablePrice)
}

/// A missing shipping field or free-text shipping ("Kostenloser Versand",
/// "Abholung") normalizes to zero cost, not a rejection.
pub fn parse_shipping(text: Option<&str>) -> Result<f64, RejectReason> {
    let Some(text) = text else { return Ok(0.0) };
    let lower = text.to_lowercase();
    if lower.contains("kostenlos") || lower.contains("gratis") || lower.contains("free") {
        return Ok(0.0);
    }
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return Ok(0.0);
    }
    parse_price(text)
}

/// Parse sold/ended phrasing into an absolute timestamp. Handles the locale's
/// absolute formats ("Verkauft 5. Mär 2025", "Beendet: 28.02.2025") and
/// relative ones ("vor 3 Tagen", "gestern"). Unresolvable text is a rejection,
/// never a default-to-now.
pub fn parse_sold_date(text: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, RejectReason> {
    let lower = text.to_lowercase();

    if let Some(dt) = parse_relative(&lower, now) {
        return Ok(dt);
    }

    let mut day: Option<u32> = None;
    let mut month: Option<u32> = None;
    let mut year: Option<i32> = None;

    for raw_tok in lower.split_whitespace() {
        let tok = raw_tok.trim_matches(|c: char| !c.is_alphanumeric());
        if tok.is_empty() || tok == "verkauft" || tok == "beendet" || tok == "am" {
            continue;
        }
        if let Some(m) = month_from_token(tok) {
            month.get_or_insert(m);
            continue;
        }
        // "28.02.2025" arrives as one token
        let parts: Vec<&str> = tok.split('.').collect();
        if parts.len() == 3 && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
            day.get_or_insert(parts[0].parse().map_err(|_| RejectReason::UnparseableDate)?);
            month.get_or_insert(parts[1].parse().map_err(|_| RejectReason::UnparseableDate)?);
            year.get_or_insert(parts[2].parse().map_err(|_| RejectReason::UnparseableDate)?);
            continue;
        }
        if let Ok(n) = tok.parse::<u32>() {
            if (1900..=2100).contains(&n) {
                year.get_or_insert(n as i32);
            } else if (1..=31).contains(&n) {
                day.get_or_insert(n);
            }
        }
    }

    let (Some(day), Some(month)) = (day, month) else {
        return Err(RejectReason::UnparseableDate);
    };
    let year_defaulted = year.is_none();
    let year = year.unwrap_or_else(|| now.year());

    let mut sold_at = date_at_midnight(year, month, day)?;
    // Day-month text without a year that lands in the future belongs to the
    // previous calendar year.
    if year_defaulted && sold_at > now {
        sold_at = date_at_midnight(year - 1, month, day)?;
    }
    Ok(sold_at)
}

fn date_at_midnight(year: i32, month: u32, day: u32) -> Result<DateTime<Utc>, RejectReason> {
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(RejectReason::UnparseableDate)?;
    let naive = date.and_hms_opt(0, 0, 0).ok_or(RejectReason::UnparseableDate)?;
    Ok(Utc.from_utc_datetime(&naive))
}

fn parse_relative(lower: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if lower.contains("heute") {
        return Some(now);
    }
    if lower.contains("gestern") {
        return Some(now - Duration::days(1));
    }
    if !lower.contains("vor") {
        return None;
    }
    let n: i64 = lower.split_whitespace().find_map(|t| t.parse().ok())?;
    if lower.contains("minute") {
        Some(now - Duration::minutes(n))
    } else if lower.contains("stunde") {
        Some(now - Duration::hours(n))
    } else if lower.contains("woche") {
        Some(now - Duration::weeks(n))
    } else if lower.contains("monat") {
        Some(now - Duration::days(30 * n))
    } else if lower.contains("tag") {
        Some(now - Duration::days(n))
    } else {
        None
    }
}

fn month_from_token(tok: &str) -> Option<u32> {
    let m = match tok {
        "jan" | "jän" | "januar" => 1,
        "feb" | "februar" => 2,
        "mär" | "märz" | "maerz" | "mrz" => 3,
        "apr" | "april" => 4,
        "mai" => 5,
        "jun" | "juni" => 6,
        "jul" | "juli" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "okt" | "oktober" => 10,
        "nov" | "november" => 11,
        "dez" | "dezember" => 12,
        _ => return None,
    };
    Some(m)
}

/// Map locale condition phrases; unrecognized text stays Unknown rather than
/// dropping the listing, since the price data may still be valid.
pub fn map_condition(text: Option<&str>) -> Condition {
    let Some(text) = text else { return Condition::Unknown };
    let lower = text.to_lowercase();
    if lower.contains("brandneu") || lower.contains("neu mit") || lower == "neu" {
        Condition::New
    } else if lower.contains("gebraucht") || lower.contains("neuwertig") {
        Condition::Used
    } else {
        Condition::Unknown
    }
}

pub fn map_seller_type(text: Option<&str>) -> SellerType {
    let Some(text) = text else { return SellerType::Unknown };
    let lower = text.to_lowercase();
    if lower.contains("privat") {
        SellerType::Private
    } else if lower.contains("gewerblich") {
        SellerType::Commercial
    } else {
        SellerType::Unknown
    }
}

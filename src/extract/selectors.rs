//! CSS selectors for the eBay search-results markup.
//!
//! All structural assumptions about the marketplace page live here; when the
//! markup shifts, capture a fixture page and update this table.

use scraper::Selector;
use std::sync::LazyLock;

/// Results container. Its absence means the document is not a search page.
pub static RESULTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul.srp-results").unwrap());

/// One result card.
pub static ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li.s-item").unwrap());

pub static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.s-item__title").unwrap());

pub static PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.s-item__price").unwrap());

pub static SHIPPING: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("span.s-item__shipping, span.s-item__logisticsCost").unwrap()
});

/// Ended/sold date, in any of the variants eBay has used for it.
pub static ENDED_DATE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "span.s-item__ended-date, \
         span.s-item__endedDate, \
         div.s-item__ended-date, \
         span.POSITIVE",
    )
    .unwrap()
});

/// Subtitle carrying condition and seller type, "Brandneu | Gewerblich".
pub static SUBTITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.s-item__subtitle, span.SECONDARY_INFO").unwrap()
});

pub static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.s-item__link").unwrap());

pub static LOCATION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("span.s-item__location, span.s-item__itemLocation").unwrap()
});

pub static NEXT_PAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.pagination__next").unwrap());

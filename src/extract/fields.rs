use scraper::{ElementRef, Selector};

use super::page::ListingFragment;
use super::selectors;

/// Untyped field text pulled from one result card. `None` means the expected
/// sub-element was absent — deliberately distinct from an empty string, so
/// normalization can tell "free shipping stated" from "shipping field missing".
#[derive(Debug, Clone, Default)]
pub struct RawListing {
    pub title: Option<String>,
    pub price: Option<String>,
    pub shipping: Option<String>,
    pub ended_date: Option<String>,
    pub condition: Option<String>,
    pub seller_type: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
}

impl RawListing {
    pub fn from_fragment(fragment: &ListingFragment<'_>) -> Self {
        let el = fragment.0;

        // Subtitle text is "condition | seller type"; split positionally and
        // leave interpretation to the validator.
        let subtitle = text_of(el, &selectors::SUBTITLE);
        let (condition, seller_type) = match &subtitle {
            Some(text) => {
                let mut parts = text.splitn(2, '|').map(|p| p.trim().to_string());
                (parts.next(), parts.next())
            }
            None => (None, None),
        };

        Self {
            title: text_of(el, &selectors::TITLE),
            price: text_of(el, &selectors::PRICE),
            shipping: text_of(el, &selectors::SHIPPING),
            ended_date: text_of(el, &selectors::ENDED_DATE),
            condition,
            seller_type,
            location: text_of(el, &selectors::LOCATION),
            url: el
                .select(&selectors::LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| href.to_string()),
        }
    }
}

fn text_of(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    el.select(selector)
        .next()
        .map(|node| node.text().collect::<String>().trim().to_string())
}

use scraper::{ElementRef, Html};

use super::selectors;
use crate::error::{AppError, Result};

/// One parsed search-results document. Segments the page into result-card
/// fragments; performs no semantic interpretation.
pub struct SearchPage {
    doc: Html,
}

impl SearchPage {
    /// Parse a search-results document. A page without the results container
    /// is malformed — distinct from a well-formed page with zero cards.
    pub fn parse(html: &str) -> Result<Self> {
        let doc = Html::parse_document(html);
        if doc.select(&selectors::RESULTS).next().is_none() {
            return Err(AppError::MalformedDocument(
                "results container not found".to_string(),
            ));
        }
        Ok(Self { doc })
    }

    /// Lazy iterator over result-card fragments. Zero items is valid.
    pub fn fragments(&self) -> impl Iterator<Item = ListingFragment<'_>> {
        self.doc.select(&selectors::ITEM).map(ListingFragment)
    }

    /// Whether the page links to a further results page.
    pub fn has_next_page(&self) -> bool {
        self.doc.select(&selectors::NEXT_PAGE).next().is_some()
    }
}

/// Opaque handle to one result card, prior to field extraction.
pub struct ListingFragment<'a>(pub(crate) ElementRef<'a>);

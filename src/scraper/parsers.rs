use crate::models::Vendor;
use ::scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

use super::cleaner::parse_price;

// ── Selectors ─────────────────────────────────────────────────────────────────

fn selector(css: &str) -> Selector {
    // Only called on the literals below.
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e:?}"))
}

static LI: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static TOTAL_NAME: LazyLock<Selector> = LazyLock::new(|| selector("span.name"));
static TOTAL_PRICE: LazyLock<Selector> = LazyLock::new(|| selector("span.prix"));
static JET_PRICE: LazyLock<Selector> = LazyLock::new(|| {
    selector("div.fuel-price.product-price#product_price_fuel_diesel")
});

/// TOTAL lists several products per station; the truck grade is preferred.
pub const TOTAL_LABELS: [&str; 2] = ["Truck Diesel", "Diesel"];

// ── Extraction ────────────────────────────────────────────────────────────────

/// Pull the diesel price out of a station page. `None` means the page had no
/// readable price; it is never an error.
pub fn extract_price(html: &str, vendor: Vendor) -> Option<f64> {
    let doc = Html::parse_document(html);
    match vendor {
        Vendor::Total => extract_total(&doc),
        Vendor::Jet => extract_jet(&doc),
    }
}

fn extract_total(doc: &Html) -> Option<f64> {
    for label in TOTAL_LABELS {
        if let Some(price) = total_price_for(doc, label) {
            return Some(price);
        }
        debug!("TOTAL: no usable price for {:?}", label);
    }
    None
}

/// Price of the first list item named `label` that has a price element.
fn total_price_for(doc: &Html, label: &str) -> Option<f64> {
    let price_el = doc
        .select(&LI)
        .filter(|li| {
            li.select(&TOTAL_NAME)
                .next()
                .is_some_and(|name| text_of(name) == label)
        })
        .find_map(|li| li.select(&TOTAL_PRICE).next());

    let Some(price_el) = price_el else {
        debug!("TOTAL: no {:?} entry with a price", label);
        return None;
    };

    let raw = text_of(price_el);
    let price = parse_price(&raw);
    if price.is_none() {
        debug!("TOTAL: unparsable price {:?} for {:?}", raw, label);
    }
    price
}

fn extract_jet(doc: &Html) -> Option<f64> {
    let Some(el) = doc.select(&JET_PRICE).next() else {
        debug!("JET: price element not found");
        return None;
    };

    let raw = text_of(el);
    let price = parse_price(&raw);
    if price.is_none() {
        debug!("JET: unparsable price {:?}", raw);
    }
    price
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Storefront filtering and sorting of product listings
//!
//! A [`CatalogueView`] holds the state of a collection page (material chip,
//! search box, sort control) and applies it to any list of products in a
//! fixed order: material filter, free-text search, then an optional sort.
//!
//! Search is case-insensitive. It matches design names from the start of any
//! word ("ra" finds "Rajkot" but not "Surat") and article codes anywhere.
//! Nothing here touches storage; the view is recomputed from scratch on
//! every call.

use serde::Deserialize;
use std::cmp::Ordering;

use crate::model::Item;

/// Anything that can be shown as a product tile.
pub trait Listing {
    fn design_name(&self) -> &str;
    fn article_code(&self) -> &str;
    /// Raw weight text such as `"1.210 gm"`.
    fn net_weight(&self) -> &str;
}

impl Listing for Item {
    fn design_name(&self) -> &str {
        self.design_name.as_deref().unwrap_or_default()
    }

    fn article_code(&self) -> &str {
        self.article_code.as_deref().unwrap_or_default()
    }

    fn net_weight(&self) -> &str {
        self.net_weight.as_deref().unwrap_or_default()
    }
}

/// Material chips shown above a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    #[default]
    All,
    Gold,
    Diamond,
    Platinum,
}

impl Material {
    /// Design-name keywords that place a product in this bucket.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Material::All => &[],
            Material::Gold => &["gold", "yellow"],
            Material::Diamond => &["diamond", "solitaire"],
            Material::Platinum => &["platinum", "white"],
        }
    }

    pub fn matches(self, design_name: &str) -> bool {
        if self == Material::All {
            return true;
        }
        let name = design_name.to_lowercase();
        self.keywords().iter().any(|keyword| name.contains(keyword))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Weight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Parses the leading decimal number of a weight string, the way a browser's
/// `parseFloat` does: `"1.210 gm"` is `1.21`, `"gm"` is `None`.
pub fn parse_weight(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let fraction_start = end + 1;
        let mut cursor = fraction_start;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        digits += cursor - fraction_start;
        if cursor > fraction_start || digits > 0 {
            end = cursor;
        }
    }

    if digits == 0 {
        return None;
    }
    text[..end].trim_end_matches('.').parse().ok()
}

/// True when `needle` occurs in `haystack` starting at the beginning of a word.
fn matches_word_start(haystack: &str, needle: &str) -> bool {
    let mut previous_alphanumeric = false;
    for (idx, ch) in haystack.char_indices() {
        if !previous_alphanumeric && haystack[idx..].starts_with(needle) {
            return true;
        }
        previous_alphanumeric = ch.is_alphanumeric();
    }
    false
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Current state of a collection page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogueView {
    pub material: Material,
    pub search: String,
    pub sort: Option<SortKey>,
    pub order: SortOrder,
}

impl CatalogueView {
    /// Selecting the active key flips the direction; a new key starts ascending.
    pub fn toggle_sort(&mut self, key: SortKey) {
        if self.sort == Some(key) {
            self.order = self.order.toggled();
        } else {
            self.sort = Some(key);
            self.order = SortOrder::Asc;
        }
    }

    /// Back to every product, unsorted.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn keeps<T: Listing>(&self, product: &T, needle: &str) -> bool {
        if !self.material.matches(product.design_name()) {
            return false;
        }
        needle.is_empty()
            || matches_word_start(&product.design_name().to_lowercase(), needle)
            || product.article_code().to_lowercase().contains(needle)
    }

    fn compare<T: Listing>(&self, key: SortKey, a: &T, b: &T) -> Ordering {
        match key {
            SortKey::Name => self.order.apply(compare_names(a.design_name(), b.design_name())),
            SortKey::Weight => {
                match (parse_weight(a.net_weight()), parse_weight(b.net_weight())) {
                    (Some(x), Some(y)) => self.order.apply(x.total_cmp(&y)),
                    // Unreadable weights stay at the bottom in either direction.
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }
        }
    }

    /// Filters and sorts `products`, keeping the input order for ties.
    pub fn apply<T: Listing>(&self, products: Vec<T>) -> Vec<T> {
        let needle = self.search.trim().to_lowercase();
        let mut result: Vec<T> = products
            .into_iter()
            .filter(|product| self.keeps(product, &needle))
            .collect();

        if let Some(key) = self.sort {
            result.sort_by(|a, b| self.compare(key, a, b));
        }
        result
    }
}

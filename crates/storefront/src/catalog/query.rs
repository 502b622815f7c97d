//! Catalog query parameters and their cache fingerprints.

use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopfront_core::CategoryId;

/// Default page size for listings.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Largest page size the backend accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Product sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductOrderBy {
    Date,
    Title,
    Price,
    Popularity,
    Rating,
}

impl ProductOrderBy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Title => "title",
            Self::Price => "price",
            Self::Popularity => "popularity",
            Self::Rating => "rating",
        }
    }
}

/// Filters for a product listing.
///
/// Every field takes part in [`ProductQuery::fingerprint`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductQuery {
    pub category: Option<CategoryId>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Attribute taxonomy, e.g. `pa_color`. Only used together with
    /// `attribute_term`.
    pub attribute: Option<String>,
    pub attribute_term: Option<String>,
    pub on_sale: Option<bool>,
    pub order_by: Option<ProductOrderBy>,
    pub order: Option<SortOrder>,
}

impl ProductQuery {
    /// Products in `category`, first page.
    #[must_use]
    pub fn in_category(category: CategoryId) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    /// 1-based page, defaulting to 1.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, defaulting to [`DEFAULT_PER_PAGE`] and capped at
    /// [`MAX_PER_PAGE`].
    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// Search text with surrounding whitespace removed, `None` if blank.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Cache key covering every filter.
    ///
    /// Normalised values are used (page defaults, trimmed search) so
    /// equivalent queries share an entry. Free-text values are JSON-quoted,
    /// so text containing separators cannot pass for another filter.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut key = format!("products:p={}:n={}", self.page(), self.per_page());
        push_field(&mut key, "cat", self.category);
        push_text(&mut key, "q", self.search_term());
        push_field(&mut key, "feat", self.featured);
        push_field(&mut key, "min", self.min_price);
        push_field(&mut key, "max", self.max_price);
        push_text(&mut key, "attr", self.attribute.as_deref());
        push_text(&mut key, "term", self.attribute_term.as_deref());
        push_field(&mut key, "sale", self.on_sale);
        push_field(&mut key, "by", self.order_by.map(|o| o.as_str()));
        push_field(&mut key, "ord", self.order.map(|o| o.as_str()));
        key
    }
}

/// Filters for a category listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Only children of this category. `Some(0)` selects top-level ones.
    pub parent: Option<CategoryId>,
    pub hide_empty: Option<bool>,
}

impl CategoryQuery {
    /// Top-level categories that have products.
    #[must_use]
    pub fn top_level() -> Self {
        Self {
            parent: Some(CategoryId::new(0)),
            hide_empty: Some(true),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut key = format!("categories:p={}:n={}", self.page(), self.per_page());
        push_field(&mut key, "parent", self.parent);
        push_field(&mut key, "hide", self.hide_empty);
        key
    }
}

/// Cache key for a single product.
#[must_use]
pub fn product_key(id: shopfront_core::ProductId) -> String {
    format!("product:{id}")
}

/// Cache key for the payment method list.
pub const PAYMENT_METHODS_KEY: &str = "payment_methods";

fn push_field(key: &mut String, name: &str, value: Option<impl std::fmt::Display>) {
    if let Some(value) = value {
        // Writing to a String cannot fail.
        let _ = write!(key, ":{name}={value}");
    }
}

fn push_text(key: &mut String, name: &str, value: Option<&str>) {
    push_field(key, name, value.map(serde_json::Value::from));
}

//! Catalog browsing commands.
//!
//! # Usage
//!
//! ```bash
//! shopfront catalog categories --parent 0
//! shopfront catalog products --category 12 --min-price 100 --on-sale
//! shopfront catalog product 131
//! shopfront catalog payment-methods
//! ```

use rust_decimal::Decimal;
use shopfront_core::{CategoryId, ProductId};
use shopfront_storefront::catalog::{CategoryQuery, ProductQuery};
use shopfront_storefront::state::AppState;

use super::{CommandError, print_json};

/// Product listing filters from the command line.
#[derive(Debug, Default)]
pub struct ProductFilters {
    pub category: Option<i64>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub featured: bool,
    pub on_sale: bool,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl From<ProductFilters> for ProductQuery {
    fn from(filters: ProductFilters) -> Self {
        Self {
            category: filters.category.map(CategoryId::new),
            page: filters.page,
            per_page: filters.per_page,
            search: filters.search,
            // Flags only ever narrow the listing
            featured: filters.featured.then_some(true),
            on_sale: filters.on_sale.then_some(true),
            min_price: filters.min_price,
            max_price: filters.max_price,
            ..Self::default()
        }
    }
}

pub async fn categories(
    state: &AppState,
    page: Option<u32>,
    per_page: Option<u32>,
    parent: Option<i64>,
) -> Result<(), CommandError> {
    let query = CategoryQuery {
        page,
        per_page,
        parent: parent.map(CategoryId::new),
        ..CategoryQuery::default()
    };
    print_json(&state.catalog().categories(&query).await?)
}

pub async fn products(state: &AppState, filters: ProductFilters) -> Result<(), CommandError> {
    let query = ProductQuery::from(filters);
    print_json(&state.catalog().products(&query).await?)
}

pub async fn product(state: &AppState, id: i64) -> Result<(), CommandError> {
    print_json(&state.catalog().product(ProductId::new(id)).await?)
}

pub async fn payment_methods(state: &AppState) -> Result<(), CommandError> {
    print_json(&state.catalog().payment_methods().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_flags_do_not_filter() {
        let query = ProductQuery::from(ProductFilters {
            category: Some(12),
            ..ProductFilters::default()
        });
        assert_eq!(query.category, Some(CategoryId::new(12)));
        assert_eq!(query.featured, None);
        assert_eq!(query.on_sale, None);
    }

    #[test]
    fn test_set_flags_narrow_the_listing() {
        let query = ProductQuery::from(ProductFilters {
            featured: true,
            on_sale: true,
            ..ProductFilters::default()
        });
        assert_eq!(query.featured, Some(true));
        assert_eq!(query.on_sale, Some(true));
    }
}

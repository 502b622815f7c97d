//! Pricing engine.
//!
//! Pure functions from a cart snapshot to subtotal, discount, delivery and
//! total. Amounts keep full decimal precision; [`Totals::presented`] is the
//! single place where they are truncated to whole currency units.

use rust_decimal::Decimal;
use serde::Serialize;
use shopfront_core::{CartLine, Money};

/// Pricing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingConfig {
    /// After-discount amount at or above which delivery is free.
    pub free_delivery_threshold: Money,
    /// Delivery fee charged below the threshold.
    pub delivery_fee: Money,
    /// Promotional rate applied to the subtotal on top of per-line markdowns
    /// (e.g. `0.05` for five percent). Zero disables it.
    pub discount_rate: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            free_delivery_threshold: Money::from_units(500),
            delivery_fee: Money::from_units(50),
            discount_rate: Decimal::ZERO,
        }
    }
}

/// Price breakdown for a set of cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub delivery: Money,
    pub total: Money,
}

impl Totals {
    /// The breakdown truncated to whole currency units, for display.
    #[must_use]
    pub fn presented(&self) -> Self {
        Self {
            subtotal: self.subtotal.whole_units(),
            discount: self.discount.whole_units(),
            delivery: self.delivery.whole_units(),
            total: self.total.whole_units(),
        }
    }
}

/// Computes cart totals.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    #[must_use]
    pub const fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Σ `unit_price × quantity`.
    #[must_use]
    pub fn subtotal(&self, lines: &[CartLine]) -> Money {
        lines.iter().map(CartLine::line_total).sum()
    }

    /// Σ `max(0, compare_unit_price − unit_price) × quantity`.
    #[must_use]
    pub fn markdown(&self, lines: &[CartLine]) -> Money {
        lines.iter().map(CartLine::markdown_total).sum()
    }

    /// Flat promotional discount on the subtotal.
    #[must_use]
    pub fn promotion(&self, lines: &[CartLine]) -> Money {
        self.subtotal(lines).scale(self.config.discount_rate)
    }

    /// Markdown plus promotion, capped at the subtotal.
    ///
    /// This is the per-line markdown sum whenever that sum plus the promotion
    /// stays within the subtotal. Past that the cap applies, so the
    /// after-discount amount is never negative.
    #[must_use]
    pub fn discount(&self, lines: &[CartLine]) -> Money {
        let subtotal = self.subtotal(lines);
        let discount = self.markdown(lines) + self.promotion(lines);
        discount.min(subtotal).max(Money::ZERO)
    }

    /// Delivery charge for an after-discount amount.
    ///
    /// Nothing is charged when the amount reaches the free-delivery threshold.
    /// A zero amount is also free: an empty or fully discounted cart owes no
    /// delivery fee, unlike a plain below-threshold rule.
    #[must_use]
    pub fn delivery_charge(&self, after_discount: Money) -> Money {
        if !after_discount.is_positive() || after_discount >= self.config.free_delivery_threshold {
            Money::ZERO
        } else {
            self.config.delivery_fee
        }
    }

    /// `subtotal − discount + delivery_charge(subtotal − discount)`.
    #[must_use]
    pub fn grand_total(&self, lines: &[CartLine]) -> Money {
        self.totals(lines).total
    }

    /// Full breakdown.
    #[must_use]
    pub fn totals(&self, lines: &[CartLine]) -> Totals {
        let subtotal = self.subtotal(lines);
        let discount = self.discount(lines);
        let after_discount = subtotal - discount;
        let delivery = self.delivery_charge(after_discount);

        Totals {
            subtotal,
            discount,
            delivery,
            total: after_discount + delivery,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use shopfront_core::ProductId;

    use super::*;

    fn line(id: i64, unit: Decimal, compare: Decimal, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: String::new(),
            unit_price: Money::new(unit),
            compare_unit_price: Money::new(compare),
            quantity,
        }
    }

    fn engine(threshold: i64, fee: i64, rate: Decimal) -> PricingEngine {
        PricingEngine::new(PricingConfig {
            free_delivery_threshold: Money::from_units(threshold),
            delivery_fee: Money::from_units(fee),
            discount_rate: rate,
        })
    }

    #[test]
    fn test_single_line_without_markdown_pays_delivery() {
        let lines = vec![line(1, Decimal::from(1000), Decimal::from(1000), 2)];
        let engine = engine(50_000, 500, Decimal::ZERO);

        let totals = engine.totals(&lines);
        assert_eq!(totals.subtotal, Money::from_units(2000));
        assert_eq!(totals.discount, Money::ZERO);
        assert_eq!(totals.delivery, Money::from_units(500));
        assert_eq!(totals.total, Money::from_units(2500));
        assert_eq!(engine.grand_total(&lines), Money::from_units(2500));
    }

    #[test]
    fn test_markdown_discount_and_free_delivery() {
        let lines = vec![
            line(1, Decimal::from(400), Decimal::from(500), 2),
            line(2, Decimal::from(100), Decimal::from(90), 1),
        ];
        let engine = engine(500, 40, Decimal::ZERO);

        let totals = engine.totals(&lines);
        assert_eq!(totals.subtotal, Money::from_units(900));
        assert_eq!(totals.discount, Money::from_units(200));
        assert_eq!(totals.delivery, Money::ZERO);
        assert_eq!(totals.total, Money::from_units(700));
    }

    #[test]
    fn test_delivery_threshold_uses_after_discount_amount() {
        // Subtotal 600 clears the threshold, but after the markdown it is 450.
        let lines = vec![line(1, Decimal::from(300), Decimal::from(375), 2)];
        let engine = engine(500, 40, Decimal::ZERO);

        assert_eq!(engine.totals(&lines).delivery, Money::from_units(40));
    }

    #[test]
    fn test_promotion_layers_on_markdown() {
        let lines = vec![line(1, Decimal::from(100), Decimal::from(120), 1)];
        let engine = engine(0, 0, Decimal::new(5, 2));

        assert_eq!(engine.markdown(&lines), Money::from_units(20));
        assert_eq!(engine.promotion(&lines), Money::from_units(5));
        assert_eq!(engine.discount(&lines), Money::from_units(25));
    }

    #[test]
    fn test_discount_is_capped_at_subtotal() {
        let lines = vec![line(1, Decimal::from(10), Decimal::from(1000), 1)];
        let engine = engine(500, 40, Decimal::new(50, 2));

        let totals = engine.totals(&lines);
        assert_eq!(totals.discount, totals.subtotal);
        assert_eq!(totals.delivery, Money::ZERO);
        assert_eq!(totals.total, Money::ZERO);
    }

    #[test]
    fn test_empty_cart_is_all_zero() {
        let engine = engine(500, 40, Decimal::new(5, 2));
        let totals = engine.totals(&[]);
        assert_eq!(
            totals,
            Totals {
                subtotal: Money::ZERO,
                discount: Money::ZERO,
                delivery: Money::ZERO,
                total: Money::ZERO,
            }
        );
    }

    #[test]
    fn test_precision_is_kept_until_presentation() {
        let lines = vec![line(1, Decimal::new(33_33, 2), Decimal::new(33_33, 2), 3)];
        let engine = engine(50, 5, Decimal::ZERO);

        let totals = engine.totals(&lines);
        assert_eq!(totals.subtotal, Money::new(Decimal::new(99_99, 2)));
        assert_eq!(totals.total, Money::new(Decimal::new(99_99, 2)));

        let shown = totals.presented();
        assert_eq!(shown.subtotal, Money::from_units(99));
        assert_eq!(shown.total, Money::from_units(99));
    }

    fn line_strategy() -> impl Strategy<Value = CartLine> {
        (1..50i64, 0..100_000i64, 0..100_000i64, 1..20u32).prop_map(|(id, unit, compare, qty)| {
            line(id, Decimal::new(unit, 2), Decimal::new(compare, 2), qty)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_grand_total_identity(
            lines in prop::collection::vec(line_strategy(), 0..8),
            threshold in 0..2_000i64,
            fee in 0..100i64,
            rate in 0..30i64,
        ) {
            let engine = engine(threshold, fee, Decimal::new(rate, 2));
            let subtotal = engine.subtotal(&lines);
            let discount = engine.discount(&lines);
            let expected = subtotal - discount + engine.delivery_charge(subtotal - discount);

            prop_assert_eq!(engine.grand_total(&lines), expected);
            prop_assert!(discount <= subtotal);
            prop_assert!(engine.grand_total(&lines) >= Money::ZERO);
        }
    }
}

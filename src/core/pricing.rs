//! Pricing policy shared by the cart summary and checkout
//!
//! One policy instance is built from configuration and handed to both the
//! cart service and the checkout engine, so the summary a shopper sees and
//! the totals stored on the order always agree.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;

/// Round a monetary amount to cents, midpoint away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Shipping and tax rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingPolicy {
    /// Subtotals at or above this amount ship for free
    pub free_shipping_threshold: Decimal,
    /// Shipping fee charged below the threshold
    pub flat_shipping_fee: Decimal,
    /// Tax rate applied to the subtotal (0.18 = 18%)
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: dec!(150),
            flat_shipping_fee: dec!(15),
            tax_rate: dec!(0.18),
        }
    }
}

/// Computed totals for a set of lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
}

impl PricingPolicy {
    pub fn shipping_cost(&self, subtotal: Decimal) -> Decimal {
        if subtotal >= self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.flat_shipping_fee
        }
    }

    pub fn tax(&self, subtotal: Decimal) -> Decimal {
        round_money(subtotal * self.tax_rate)
    }

    /// Price a subtotal; `grand_total` is always the sum of the three parts
    pub fn quote(&self, subtotal: Decimal) -> PriceBreakdown {
        let subtotal = round_money(subtotal);
        let shipping_cost = self.shipping_cost(subtotal);
        let tax_amount = self.tax(subtotal);
        PriceBreakdown {
            subtotal,
            shipping_cost,
            tax_amount,
            grand_total: subtotal + shipping_cost + tax_amount,
        }
    }

    /// Price `(unit_price, quantity)` pairs
    pub fn quote_lines<I>(&self, lines: I) -> PriceBreakdown
    where
        I: IntoIterator<Item = (Decimal, i32)>,
    {
        let subtotal = lines
            .into_iter()
            .map(|(unit_price, quantity)| unit_price * Decimal::from(quantity))
            .sum();
        self.quote(subtotal)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("pricing.free_shipping_threshold", self.free_shipping_threshold),
            ("pricing.flat_shipping_fee", self.flat_shipping_fee),
            ("pricing.tax_rate", self.tax_rate),
        ];
        for (field, value) in checks {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    message: "must not be negative".to_string(),
                });
            }
        }
        if self.tax_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                field: "pricing.tax_rate".to_string(),
                value: self.tax_rate.to_string(),
                message: "must be a fraction below 1".to_string(),
            });
        }
        Ok(())
    }
}

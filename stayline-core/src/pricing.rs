use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sell price derived from a supplier net price.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SellPrice {
    pub sell_price: i64,
    pub margin: i64,
}

/// Markup arithmetic for search/detail flows. Never used to price a booking:
/// a booking always carries the supplier's gross quote.
pub trait PricingService: Send + Sync {
    fn calculate_sell_price(&self, net_price: i64, hotel_category: u8) -> SellPrice;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Markup applied when a category has no entry, as a fraction (0.10 = 10%).
    pub default_markup: f64,

    /// Per star-rating markup, keyed by category ("1".."5").
    #[serde(default)]
    pub category_markups: HashMap<String, f64>,

    /// Sell prices are rounded up to a multiple of this (minor units).
    pub rounding_unit: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_markup: 0.10,
            category_markups: {
                let mut m = HashMap::new();
                m.insert("3".to_string(), 0.12);
                m.insert("4".to_string(), 0.15);
                m.insert("5".to_string(), 0.18);
                m
            },
            rounding_unit: 100,
        }
    }
}

/// Category markup engine
pub struct MarkupPricingService {
    config: PricingConfig,
}

impl MarkupPricingService {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    fn markup_for(&self, hotel_category: u8) -> f64 {
        self.config
            .category_markups
            .get(&hotel_category.to_string())
            .copied()
            .unwrap_or(self.config.default_markup)
            .max(0.0)
    }
}

impl PricingService for MarkupPricingService {
    fn calculate_sell_price(&self, net_price: i64, hotel_category: u8) -> SellPrice {
        // Basis points keep the arithmetic exact; i128 keeps it from overflowing.
        let markup_bps = (self.markup_for(hotel_category) * 10_000.0).round() as i128;
        let raw = (i128::from(net_price) * (10_000 + markup_bps) + 9_999) / 10_000;

        let unit = i128::from(self.config.rounding_unit.max(1));
        let remainder = raw % unit;
        let rounded = if remainder == 0 { raw } else { raw + (unit - remainder) };
        let sell_price = i64::try_from(rounded).unwrap_or(i64::MAX);

        SellPrice {
            sell_price,
            margin: sell_price.saturating_sub(net_price),
        }
    }
}

//! Product prices grouped by product id.

use crate::api::record::Record;
use crate::api::response::{envelope_errors, envelope_success};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Deref;
use tracing::warn;

/// The five price points a pricing row may carry.
pub const PRICE_FIELDS: [&str; 5] =
    ["lowPrice", "midPrice", "highPrice", "marketPrice", "directLowPrice"];

/// One subtype's prices for a product (e.g. "Normal", "Holofoil").
///
/// ```text
/// { "productId": 85737, "lowPrice": 4.99, "midPrice": 5.63, "highPrice": 7.73,
///   "marketPrice": 10.35, "directLowPrice": null, "subTypeName": "Reverse Holofoil" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProductPrice(Record);

impl ProductPrice {
    fn new(record: Record) -> Self {
        Self(record)
    }

    pub fn product_id(&self) -> Option<u64> {
        self.0.get_u64("productId")
    }

    pub fn low_price(&self) -> Option<f64> {
        self.0.get_f64("lowPrice")
    }

    pub fn mid_price(&self) -> Option<f64> {
        self.0.get_f64("midPrice")
    }

    pub fn high_price(&self) -> Option<f64> {
        self.0.get_f64("highPrice")
    }

    pub fn market_price(&self) -> Option<f64> {
        self.0.get_f64("marketPrice")
    }

    pub fn direct_low_price(&self) -> Option<f64> {
        self.0.get_f64("directLowPrice")
    }

    pub fn sub_type_name(&self) -> Option<&str> {
        self.0.get_str("subTypeName")
    }

    /// False when every price point is null.
    pub fn has_valid_prices(&self) -> bool {
        PRICE_FIELDS.iter().any(|field| !self.0.is_null(field))
    }

    /// Names of the fields that hold a price point, such as `midPrice`.
    pub fn points(&self) -> Vec<&str> {
        self.0.keys().filter(|key| key.to_lowercase().contains("price")).collect()
    }

    pub fn record(&self) -> &Record {
        &self.0
    }
}

impl Deref for ProductPrice {
    type Target = Record;

    fn deref(&self) -> &Record {
        &self.0
    }
}

/// Prices per product id, in response order within each product.
pub type Prices = BTreeMap<u64, Vec<ProductPrice>>;

/// A pricing response with its rows grouped by product.
#[derive(Debug, Clone)]
pub struct ProductPriceList {
    response: Record,
    prices: Prices,
}

impl ProductPriceList {
    pub fn new(response: Record) -> Self {
        let prices = group_prices(&response);
        Self { response, prices }
    }

    pub fn response(&self) -> &Record {
        &self.response
    }

    pub fn success(&self) -> bool {
        envelope_success(&self.response)
    }

    pub fn errors(&self) -> Vec<String> {
        envelope_errors(&self.response)
    }

    /// All price rows by product id. Empty if the response failed.
    pub fn prices(&self) -> &Prices {
        &self.prices
    }

    pub fn get(&self, product_id: u64) -> Option<&[ProductPrice]> {
        self.prices.get(&product_id).map(Vec::as_slice)
    }

    /// Price rows with at least one price point. Products whose rows are all
    /// empty stay in the map with an empty list.
    pub fn valid_prices(&self) -> BTreeMap<u64, Vec<&ProductPrice>> {
        self.prices
            .iter()
            .map(|(id, rows)| (*id, rows.iter().filter(|p| p.has_valid_prices()).collect()))
            .collect()
    }
}

/// Groups the `results` of a pricing response by `productId`.
///
/// Failed responses and responses without `results` give an empty map. Rows
/// without a numeric `productId` are dropped with a warning.
pub fn group_prices(response: &Record) -> Prices {
    let mut prices = Prices::new();
    if !envelope_success(response) {
        return prices;
    }

    let Some(rows) = response.get_records("results") else {
        return prices;
    };

    for row in rows {
        let price = ProductPrice::new(row.clone());
        match price.product_id() {
            Some(id) => prices.entry(id).or_default().push(price),
            None => warn!("Dropping price row without productId: {}", row.to_value()),
        }
    }

    prices
}

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use utoipa::ToSchema;

/// Subtotal above which domestic shipping is free.
const FREE_SHIPPING_THRESHOLD: Decimal = dec!(100);
const US_RATE: Decimal = dec!(10);
const CANADA_RATE: Decimal = dec!(15);
const INTERNATIONAL_RATE: Decimal = dec!(25);

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    pub shipping_cost: Decimal,
    pub total_with_shipping: Decimal,
}

/// Computes the shipping cost for a destination country and cart subtotal.
///
/// Pure and deterministic. Unrecognized or empty countries take the flat
/// international rate.
pub fn compute(country: &str, subtotal: Decimal) -> ShippingQuote {
    let shipping_cost = match country {
        "United States" => {
            if subtotal > FREE_SHIPPING_THRESHOLD {
                Decimal::ZERO
            } else {
                US_RATE
            }
        }
        "Canada" => {
            if subtotal > FREE_SHIPPING_THRESHOLD {
                Decimal::ZERO
            } else {
                CANADA_RATE
            }
        }
        _ => INTERNATIONAL_RATE,
    };

    ShippingQuote {
        shipping_cost,
        total_with_shipping: subtotal + shipping_cost,
    }
}

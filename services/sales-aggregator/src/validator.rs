//! Event validation for the sales feed
//!
//! Turns a `RawSaleRecord` into an immutable `SaleEvent` or refuses it.
//! Validation has no side effects: on error the caller drops the record
//! and the aggregate state is left untouched.
//!
//! Rules:
//! - The amount is coerced from a JSON number or a numeric string; anything
//!   else (missing, null, non-numeric text) is `InvalidAmount`.
//! - Negative amounts are refused so running totals never decrease.
//! - `product`, `region` and `timestamp` must be present; there is no
//!   fallback bucket for records that lack them.
//! - A missing quantity counts as 0; a malformed one is refused.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;
use types::prelude::*;

use crate::events::RawSaleRecord;

/// Stateless validator for raw sale records.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventValidator;

impl EventValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate one raw record.
    pub fn validate(&self, raw: &RawSaleRecord) -> Result<SaleEvent, EventError> {
        let amount = Self::coerce_amount(raw.sales_amount.as_ref())?;

        let product = raw
            .product
            .as_ref()
            .ok_or(EventError::MissingField("product"))?;
        let region = raw
            .region
            .as_ref()
            .ok_or(EventError::MissingField("region"))?;
        let timestamp_raw = raw
            .timestamp
            .as_ref()
            .ok_or(EventError::MissingField("timestamp"))?;
        let timestamp = parse_instant(timestamp_raw)
            .ok_or_else(|| EventError::InvalidTimestamp(timestamp_raw.clone()))?;

        let quantity = Self::coerce_quantity(raw.quantity_sold.as_ref())?;

        debug!(
            product = %product,
            region = %region,
            amount = %amount,
            "Sale record validated"
        );

        Ok(SaleEvent::new(
            ProductId::new(product.as_str()),
            RegionId::new(region.as_str()),
            timestamp,
            amount,
            quantity,
        ))
    }

    fn coerce_amount(raw: Option<&Value>) -> Result<Amount, EventError> {
        let value = raw.ok_or_else(|| EventError::InvalidAmount("missing".to_string()))?;
        let decimal =
            coerce_decimal(value).ok_or_else(|| EventError::InvalidAmount(value.to_string()))?;
        Amount::try_new(decimal).ok_or_else(|| EventError::NegativeAmount(decimal.to_string()))
    }

    fn coerce_quantity(raw: Option<&Value>) -> Result<u32, EventError> {
        let value = match raw {
            None | Some(Value::Null) => return Ok(0),
            Some(value) => value,
        };
        coerce_decimal(value)
            .filter(|d| *d >= Decimal::ZERO && d.fract().is_zero())
            .and_then(|d| d.to_u32())
            .ok_or_else(|| EventError::InvalidQuantity(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn raw(amount: Value) -> RawSaleRecord {
        RawSaleRecord {
            product: Some("Widget".to_string()),
            region: Some("East".to_string()),
            timestamp: Some("2025-01-01T09:00:00+00:00".to_string()),
            sales_amount: Some(amount),
            quantity_sold: Some(json!(3)),
        }
    }

    #[test]
    fn test_numeric_string_amount() {
        let event = EventValidator::new().validate(&raw(json!("19.999"))).unwrap();
        assert_eq!(event.amount, "19.999".parse().unwrap());
        assert_eq!(event.quantity, 3);
        assert_eq!(event.product.as_str(), "Widget");
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_numeric_amount() {
        let event = EventValidator::new().validate(&raw(json!(250.5))).unwrap();
        assert_eq!(event.amount.to_string(), "250.50");
    }

    #[test]
    fn test_non_numeric_amount_rejected() {
        let err = EventValidator::new()
            .validate(&raw(json!("not-a-number")))
            .unwrap_err();
        assert!(matches!(err, EventError::InvalidAmount(_)));

        let err = EventValidator::new().validate(&raw(json!(null))).unwrap_err();
        assert!(matches!(err, EventError::InvalidAmount(_)));

        let err = EventValidator::new().validate(&raw(json!(true))).unwrap_err();
        assert!(matches!(err, EventError::InvalidAmount(_)));
    }

    #[test]
    fn test_tiny_scientific_amount_rounds_to_zero() {
        let event = EventValidator::new().validate(&raw(json!("1e-30"))).unwrap();
        assert_eq!(event.amount, Amount::ZERO);

        let plain = EventValidator::new()
            .validate(&raw(json!("0.0000000000000000000000000000001")))
            .unwrap();
        assert_eq!(plain.amount.rounded(), event.amount.rounded());
    }

    #[test]
    fn test_oversized_amount_saturates() {
        let event = EventValidator::new().validate(&raw(json!(1e30))).unwrap();
        assert_eq!(event.amount.as_decimal(), Decimal::MAX);

        let event = EventValidator::new().validate(&raw(json!("1e30"))).unwrap();
        assert_eq!(event.amount.as_decimal(), Decimal::MAX);

        let err = EventValidator::new().validate(&raw(json!(-1e30))).unwrap_err();
        assert!(matches!(err, EventError::NegativeAmount(_)));
    }

    #[test]
    fn test_missing_amount_rejected() {
        let mut record = raw(json!(1));
        record.sales_amount = None;
        let err = EventValidator::new().validate(&record).unwrap_err();
        assert_eq!(err, EventError::InvalidAmount("missing".to_string()));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = EventValidator::new().validate(&raw(json!(-4))).unwrap_err();
        assert!(matches!(err, EventError::NegativeAmount(_)));
    }

    #[test]
    fn test_missing_fields_rejected() {
        let mut record = raw(json!(1));
        record.region = None;
        assert_eq!(
            EventValidator::new().validate(&record).unwrap_err(),
            EventError::MissingField("region")
        );

        let mut record = raw(json!(1));
        record.timestamp = None;
        assert_eq!(
            EventValidator::new().validate(&record).unwrap_err(),
            EventError::MissingField("timestamp")
        );
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let mut record = raw(json!(1));
        record.timestamp = Some("half past nine".to_string());
        assert!(matches!(
            EventValidator::new().validate(&record).unwrap_err(),
            EventError::InvalidTimestamp(_)
        ));
    }

    #[test]
    fn test_quantity_coercion() {
        let mut record = raw(json!(1));
        record.quantity_sold = Some(json!("4"));
        assert_eq!(EventValidator::new().validate(&record).unwrap().quantity, 4);

        record.quantity_sold = None;
        assert_eq!(EventValidator::new().validate(&record).unwrap().quantity, 0);

        record.quantity_sold = Some(json!(1.5));
        assert!(matches!(
            EventValidator::new().validate(&record).unwrap_err(),
            EventError::InvalidQuantity(_)
        ));

        record.quantity_sold = Some(json!(-2));
        assert!(matches!(
            EventValidator::new().validate(&record).unwrap_err(),
            EventError::InvalidQuantity(_)
        ));
    }
}

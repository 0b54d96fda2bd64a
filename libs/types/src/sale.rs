//! Validated sale event and timestamp parsing
//!
//! A `SaleEvent` only exists once the raw wire record has passed
//! validation; it is immutable from then on.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ProductId, RegionId};
use crate::numeric::Amount;

/// One validated, discrete sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleEvent {
    pub product: ProductId,
    pub region: RegionId,
    /// Instant the sale happened (exchange of goods, not arrival time).
    pub timestamp: DateTime<Utc>,
    pub amount: Amount,
    pub quantity: u32,
}

impl SaleEvent {
    pub fn new(
        product: ProductId,
        region: RegionId,
        timestamp: DateTime<Utc>,
        amount: Amount,
        quantity: u32,
    ) -> Self {
        Self {
            product,
            region,
            timestamp,
            amount,
            quantity,
        }
    }

    /// Copy of this event with the amount rounded to the money scale.
    pub fn rounded(&self) -> Self {
        Self {
            amount: self.amount.rounded(),
            ..self.clone()
        }
    }
}

/// Parse an ISO-8601 instant.
///
/// Accepts RFC 3339 (with offset) and naive date-times, which are taken
/// as UTC.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Parse an instant or a bare `YYYY-MM-DD` date (UTC midnight).
pub fn parse_instant_or_date(text: &str) -> Option<DateTime<Utc>> {
    parse_instant(text).or_else(|| {
        NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let ts = parse_instant("2025-03-01T12:30:00.250+02:00").unwrap();
        assert_eq!(
            ts,
            Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 0).unwrap()
                + chrono::Duration::milliseconds(250)
        );
    }

    #[test]
    fn test_parse_naive_is_utc() {
        let ts = parse_instant("2025-03-01T12:30:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_instant("yesterday").is_none());
        assert!(parse_instant("").is_none());
    }

    #[test]
    fn test_parse_bare_date() {
        let ts = parse_instant_or_date("2025-01-15").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap());
        assert!(parse_instant("2025-01-15").is_none());
    }

    #[test]
    fn test_rounded_copy() {
        let event = SaleEvent::new(
            ProductId::new("Widget"),
            RegionId::new("East"),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            "19.999".parse().unwrap(),
            3,
        );
        let rounded = event.rounded();
        assert_eq!(rounded.amount.to_string(), "20.00");
        assert_eq!(rounded.quantity, 3);
        assert_eq!(rounded.product, event.product);
    }
}

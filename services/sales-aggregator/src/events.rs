//! Wire-level event definitions for the sales feed
//!
//! Defines the three named feed channels and the untyped sale record
//! delivered on `new_sale`. Nothing here is validated yet; see
//! `validator` for the step that turns a `RawSaleRecord` into a
//! `SaleEvent`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named channels of the event feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedChannel {
    /// Handshake acknowledgment, informational only.
    Connected,
    /// A new sale; the sole driver of the aggregation engine.
    NewSale,
    /// Informational data-change notice, no aggregation effect.
    DataUpdate,
}

impl FeedChannel {
    /// All channels a session attaches to.
    pub fn all() -> &'static [FeedChannel] {
        &[
            FeedChannel::Connected,
            FeedChannel::NewSale,
            FeedChannel::DataUpdate,
        ]
    }

    /// Parse a channel name (`connected`, `new_sale`, `data_update`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "connected" => Some(FeedChannel::Connected),
            "new_sale" => Some(FeedChannel::NewSale),
            "data_update" => Some(FeedChannel::DataUpdate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedChannel::Connected => "connected",
            FeedChannel::NewSale => "new_sale",
            FeedChannel::DataUpdate => "data_update",
        }
    }
}

/// Untyped sale record as pushed on `new_sale`.
///
/// Every field is optional at the wire level; the amount and quantity keep
/// their raw JSON shape because both numbers and numeric strings occur.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSaleRecord {
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// ISO-8601 string.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, alias = "amount")]
    pub sales_amount: Option<Value>,
    #[serde(default, alias = "quantity")]
    pub quantity_sold: Option<Value>,
}

/// One message delivered by the feed.
///
/// Wire envelope: `{"event": "<channel>", "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum FeedMessage {
    Connected(Value),
    NewSale(RawSaleRecord),
    DataUpdate(Value),
}

impl FeedMessage {
    /// Channel this message was delivered on.
    pub fn channel(&self) -> FeedChannel {
        match self {
            FeedMessage::Connected(_) => FeedChannel::Connected,
            FeedMessage::NewSale(_) => FeedChannel::NewSale,
            FeedMessage::DataUpdate(_) => FeedChannel::DataUpdate,
        }
    }

    /// Parse one line of the line-delimited transport.
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}

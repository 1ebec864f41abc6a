//! Typed records returned by the Betfair betting API
//!
//! Every record is a pure projection of one remote JSON object. Remote keys
//! are camelCase; records serialize back out in snake_case so they can be
//! handed to other consumers (e.g. an LLM tool result) as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A sport category, e.g. Soccer or Tennis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventType {
    /// Event type id
    #[serde(deserialize_with = "de_id")]
    pub id: i64,
    /// Display name
    pub name: String,
}

/// A competition such as the English Premier League
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    /// Competition id
    #[serde(deserialize_with = "de_id")]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Region, when the service reports one
    #[serde(default)]
    pub region: Option<String>,
}

/// A sporting event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct Event {
    /// Event id
    #[serde(deserialize_with = "de_id")]
    pub id: i64,
    /// Event name, e.g. "Arsenal v Chelsea"
    pub name: String,
    /// ISO country code
    #[serde(default)]
    pub country_code: Option<String>,
    /// Timezone the event takes place in
    pub timezone: String,
    /// Scheduled start
    pub open_date: DateTime<Utc>,
}

/// One entry of the market catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct MarketCatalogueEntry {
    /// Market id, e.g. "1.234567"
    pub market_id: String,
    /// Market name, e.g. "Match Odds"
    pub market_name: String,
    /// Amount matched so far
    #[serde(default)]
    pub total_matched: f64,
}

/// A market type with the number of markets of that type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct MarketTypeResult {
    /// Market type code, e.g. "MATCH_ODDS"
    pub market_type: String,
    /// Number of markets matching the filter
    pub market_count: i64,
}

/// A price and the amount available or traded at it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSize {
    /// Decimal odds
    pub price: f64,
    /// Stake amount
    pub size: f64,
}

/// Best offers and traded volume for a runner
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct ExchangePrices {
    /// Best prices to back
    #[serde(default)]
    pub available_to_back: Vec<PriceSize>,
    /// Best prices to lay
    #[serde(default)]
    pub available_to_lay: Vec<PriceSize>,
    /// Volume traded per price
    #[serde(default)]
    pub traded_volume: Vec<PriceSize>,
}

/// One runner of a market book, merged with the market-level fields it belongs to.
///
/// Produced by [`crate::flatten_market_book`]: where a key exists on both the
/// market and the runner (`status`, `totalMatched`), the runner's value wins.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct MarketBookSelection {
    pub market_id: String,
    pub is_market_data_delayed: bool,
    pub status: String,
    pub bet_delay: i64,
    pub bsp_reconciled: bool,
    pub complete: bool,
    pub inplay: bool,
    pub number_of_winners: i64,
    pub number_of_runners: i64,
    pub number_of_active_runners: i64,
    #[serde(default)]
    pub total_matched: f64,
    pub total_available: f64,
    pub cross_matching: bool,
    pub runners_voidable: bool,
    pub version: i64,
    pub selection_id: i64,
    #[serde(default)]
    pub handicap: f64,
    #[serde(default)]
    pub last_price_traded: Option<f64>,
    #[serde(default)]
    pub ex: Option<ExchangePrices>,
}

/// Betfair sends ids as strings ("1") for most entities and as numbers for a few.
fn de_id<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Str(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Int(id) => Ok(id),
        RawId::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid id: {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_accepts_string_and_numeric_ids() {
        let a: EventType = serde_json::from_value(json!({"id": "1", "name": "Soccer"})).unwrap();
        let b: EventType = serde_json::from_value(json!({"id": 2, "name": "Tennis"})).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn test_event_type_rejects_non_numeric_id() {
        let result = serde_json::from_value::<EventType>(json!({"id": "abc", "name": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_competition_region_optional() {
        let c: Competition =
            serde_json::from_value(json!({"id": "10932509", "name": "English Premier League"}))
                .unwrap();
        assert_eq!(c.region, None);
    }

    #[test]
    fn test_event_decodes_camel_case_and_serializes_snake_case() {
        let event: Event = serde_json::from_value(json!({
            "id": "33000001",
            "name": "Arsenal v Chelsea",
            "countryCode": "GB",
            "timezone": "Europe/London",
            "openDate": "2025-03-01T15:00:00.000Z",
            "venue": "ignored"
        }))
        .unwrap();

        assert_eq!(event.country_code.as_deref(), Some("GB"));
        assert_eq!(event.open_date.to_rfc3339(), "2025-03-01T15:00:00+00:00");

        let out = serde_json::to_value(&event).unwrap();
        assert_eq!(out["country_code"], "GB");
        assert!(out.get("countryCode").is_none());
    }

    #[test]
    fn test_event_missing_timezone_is_an_error() {
        let result = serde_json::from_value::<Event>(json!({
            "id": "1",
            "name": "x",
            "openDate": "2025-03-01T15:00:00Z"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_market_catalogue_total_matched_defaults_to_zero() {
        let entry: MarketCatalogueEntry =
            serde_json::from_value(json!({"marketId": "1.2", "marketName": "Match Odds"}))
                .unwrap();
        assert_eq!(entry.total_matched, 0.0);
    }
}

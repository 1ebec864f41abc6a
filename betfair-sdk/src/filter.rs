//! Market filter construction
//!
//! Betfair treats a missing filter key as "any", but may reject an empty
//! collection. Absent values, empty collections and empty text are therefore
//! all left out of the serialized filter.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// A time window over market start times.
///
/// Either bound may be missing; only supplied bounds are serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeRange {
    /// Inclusive lower bound
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_time")]
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_time")]
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Build a range from optional bounds, or `None` when neither is given
    pub fn between(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Option<Self> {
        if from.is_none() && to.is_none() {
            None
        } else {
            Some(Self { from, to })
        }
    }
}

/// The `filter` object sent with every list operation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketFilter {
    /// Free-text query
    #[serde(skip_serializing_if = "blank")]
    pub text_query: Option<String>,
    /// Exchange ids
    #[serde(skip_serializing_if = "empty")]
    pub exchange_ids: Option<Vec<i64>>,
    /// Event type (sport) ids
    #[serde(skip_serializing_if = "empty")]
    pub event_type_ids: Option<Vec<i64>>,
    /// Event ids
    #[serde(skip_serializing_if = "empty")]
    pub event_ids: Option<Vec<i64>>,
    /// Competition ids
    #[serde(skip_serializing_if = "empty")]
    pub competition_ids: Option<Vec<i64>>,
    /// Market ids
    #[serde(skip_serializing_if = "empty")]
    pub market_ids: Option<Vec<String>>,
    /// Venues (horse racing)
    #[serde(skip_serializing_if = "empty")]
    pub venues: Option<Vec<String>>,
    /// Market start time window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_start_time: Option<TimeRange>,
}

impl MarketFilter {
    /// Create an empty (unfiltered) filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text query
    pub fn text_query(mut self, query: impl Into<String>) -> Self {
        self.text_query = Some(query.into());
        self
    }

    /// Set the exchange ids
    pub fn exchange_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.exchange_ids = Some(ids.into_iter().collect());
        self
    }

    /// Set the event type ids
    pub fn event_type_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.event_type_ids = Some(ids.into_iter().collect());
        self
    }

    /// Set the event ids
    pub fn event_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.event_ids = Some(ids.into_iter().collect());
        self
    }

    /// Set the competition ids
    pub fn competition_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.competition_ids = Some(ids.into_iter().collect());
        self
    }

    /// Set the market ids
    pub fn market_ids<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.market_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Set the venues
    pub fn venues<S: Into<String>>(mut self, venues: impl IntoIterator<Item = S>) -> Self {
        self.venues = Some(venues.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict market start times; a no-op when both bounds are `None`
    pub fn market_start_time(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.market_start_time = TimeRange::between(from, to);
        self
    }

    /// Serialize into the JSON object Betfair expects
    pub fn to_json(&self) -> serde_json::Value {
        // A struct of strings, numbers and optional vectors cannot fail to serialize.
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}

fn empty<T>(value: &Option<Vec<T>>) -> bool {
    value.as_ref().is_none_or(Vec::is_empty)
}

fn ser_time<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(t) => serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_default_filter_is_empty_object() {
        assert_eq!(MarketFilter::new().to_json(), json!({}));
    }

    #[test]
    fn test_empty_values_are_omitted() {
        let filter = MarketFilter::new()
            .text_query("  ")
            .event_type_ids(Vec::<i64>::new())
            .venues(Vec::<String>::new())
            .market_start_time(None, None);
        assert_eq!(filter.to_json(), json!({}));
    }

    #[test]
    fn test_populated_filter_uses_camel_case_keys() {
        let filter = MarketFilter::new()
            .text_query("Premier")
            .event_type_ids([1])
            .competition_ids([10932509])
            .market_ids(["1.23"]);

        assert_eq!(
            filter.to_json(),
            json!({
                "textQuery": "Premier",
                "eventTypeIds": [1],
                "competitionIds": [10932509],
                "marketIds": ["1.23"]
            })
        );
    }

    #[test]
    fn test_time_range_start_only() {
        let filter = MarketFilter::new().market_start_time(Some(t(12)), None);
        assert_eq!(
            filter.to_json(),
            json!({"marketStartTime": {"from": "2025-03-01T12:00:00Z"}})
        );
    }

    #[test]
    fn test_time_range_end_only() {
        let filter = MarketFilter::new().market_start_time(None, Some(t(18)));
        assert_eq!(
            filter.to_json(),
            json!({"marketStartTime": {"to": "2025-03-01T18:00:00Z"}})
        );
    }

    #[test]
    fn test_time_range_both_bounds() {
        let filter = MarketFilter::new().market_start_time(Some(t(12)), Some(t(18)));
        assert_eq!(
            filter.to_json(),
            json!({"marketStartTime": {
                "from": "2025-03-01T12:00:00Z",
                "to": "2025-03-01T18:00:00Z"
            }})
        );
    }
}

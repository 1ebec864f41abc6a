//! Market book flattening
//!
//! `listMarketBook` nests a `runners` array inside each market. Consumers
//! want one row per runner, so each runner is merged onto a copy of its
//! market's other fields.

use serde::de::Error as _;
use serde_json::{Map, Value};

use crate::errors::{BetfairError, Result};

const OPERATION: &str = "listMarketBook";
const RUNNERS_KEY: &str = "runners";

/// Flatten market objects into one merged object per (market, runner) pair.
///
/// For every market, all keys except `runners` form the base; each runner
/// yields the base overlaid with the runner's own keys. A market with R
/// runners yields exactly R objects, in runner order, and a market without a
/// `runners` key yields none. A market or runner that is not an object, or a
/// `runners` value that is not an array, is a [`BetfairError::Structure`].
pub fn flatten_market_book(markets: Vec<Value>) -> Result<Vec<Map<String, Value>>> {
    let mut rows = Vec::new();

    for market in markets {
        let Value::Object(mut base) = market else {
            return Err(malformed(format!("market is not an object: {market}")));
        };

        let runners = match base.remove(RUNNERS_KEY) {
            None => continue,
            Some(Value::Array(runners)) => runners,
            Some(other) => {
                return Err(malformed(format!("`runners` is not an array: {other}")));
            },
        };

        for runner in runners {
            let Value::Object(runner) = runner else {
                return Err(malformed(format!("runner is not an object: {runner}")));
            };
            let mut row = base.clone();
            row.extend(runner);
            rows.push(row);
        }
    }

    Ok(rows)
}

fn malformed(message: String) -> BetfairError {
    BetfairError::structure(OPERATION, serde_json::Error::custom(message))
}

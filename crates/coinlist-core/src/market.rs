//! Market snapshot rows returned by `/coins/markets`.
//!
//! Only the fields the table keys on or renders are typed. Everything else
//! the endpoint returns (volume, 24h changes, ATH/ATL, ROI, timestamps)
//! is carried through untouched in `extra`.
//!
//! Numeric fields are lenient: `null`, unparsable or out-of-range values
//! (dead coins report supplies beyond `Decimal::MAX`) decode as `None`
//! instead of failing the whole page.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// One asset's market snapshot.
///
/// Rows are immutable once received and are replaced wholesale on each
/// successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEntry {
    /// Asset identifier (e.g., "bitcoin"). Unique per asset.
    pub id: String,
    /// Ticker symbol (e.g., "btc").
    pub symbol: String,
    /// Display name (e.g., "Bitcoin").
    pub name: String,
    /// Logo URL.
    #[serde(rename = "image")]
    pub image_url: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub current_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub market_cap: Option<Decimal>,
    /// Rank by market cap. Unranked assets come back as null.
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub circulating_supply: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub total_supply: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub max_supply: Option<Decimal>,
    /// Remaining descriptive fields, passed through as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MarketEntry {
    /// Whether the asset has a hard supply cap.
    pub fn is_capped(&self) -> bool {
        self.max_supply.is_some()
    }

    /// Look up a pass-through field by its wire name.
    pub fn extra_field(&self, name: &str) -> Option<&serde_json::Value> {
        self.extra.get(name)
    }
}

/// Decode a JSON number or numeric string, mapping anything that does not
/// fit a `Decimal` to `None`.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(decimal_from_json))
}

fn decimal_from_json(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

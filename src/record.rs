use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

/// Vietlott publishes in Asia/Ho_Chi_Minh, which has no DST.
const VN_OFFSET_SECS: i32 = 7 * 3600;

/// One normalized draw result, the unit stored in a dataset file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub date: String,
    pub id: String,
    pub result: DrawResult,
    pub page: u32,
    pub process_time: String,
    /// Product-specific fields (`total`, `big_small`, ...), flattened into the JSON line.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    pub fn new(date: String, id: String, result: DrawResult, page: u32) -> Self {
        Record {
            date,
            id,
            result,
            page,
            process_time: current_timestamp(),
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DrawResult {
    Numbers(Vec<u32>),
    Tiers(PrizeTiers),
}

/// Prize tier name -> winning numbers, kept in declared tier order.
#[derive(Debug, Clone, PartialEq)]
pub struct PrizeTiers(pub Vec<(String, Vec<String>)>);

#[cfg(test)]
impl PrizeTiers {
    pub fn get(&self, tier: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(name, _)| name == tier)
            .map(|(_, numbers)| numbers.as_slice())
    }
}

impl Serialize for PrizeTiers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, numbers) in &self.0 {
            map.serialize_entry(name, numbers)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PrizeTiers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TiersVisitor;

        impl<'de> Visitor<'de> for TiersVisitor {
            type Value = PrizeTiers;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of prize tier to numbers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PrizeTiers, A::Error> {
                let mut tiers = Vec::with_capacity(access.size_hint().unwrap_or(4));
                while let Some((name, numbers)) = access.next_entry::<String, Vec<String>>()? {
                    tiers.push((name, numbers));
                }
                Ok(PrizeTiers(tiers))
            }
        }

        deserializer.deserialize_map(TiersVisitor)
    }
}

/// Fixed token cardinality a product's draw must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub expected: usize,
}

impl Shape {
    pub const fn exactly(expected: usize) -> Self {
        Shape { expected }
    }

    /// Logs and returns false when the token count is off. Never panics.
    pub fn accepts(&self, found: usize, id: &str, page: u32) -> bool {
        if found == self.expected {
            return true;
        }
        warn!(
            "Invalid number count ({}, expected {}) for ID {} on page {}",
            found, self.expected, id, page
        );
        false
    }
}

/// `DD/MM/YYYY` -> `YYYY-MM-DD`, keeping the source padding.
///
/// Returns `None` unless there are exactly three all-digit parts.
pub fn normalize_date(raw: &str) -> Option<String> {
    let mut parts = raw.trim().split('/');
    let day = parts.next()?;
    let month = parts.next()?;
    let year = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !(numeric(day) && numeric(month) && numeric(year)) {
        return None;
    }
    Some(format!("{}-{}-{}", year, month, day))
}

fn vn_now() -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(VN_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    Utc::now().with_timezone(&offset)
}

/// Wall-clock time in Vietnam, microsecond precision.
pub fn current_timestamp() -> String {
    vn_now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

pub fn today() -> NaiveDate {
    vn_now().date_naive()
}

//! Wire types for the schedule server's pull endpoints.
//!
//! The server has grown several record shapes over time (string or integer ids,
//! OPD slots as plain strings or `{range,count}` / `{r,c}` objects, counts that may be
//! missing or non-numeric). Everything here deserializes leniently: a bad fragment is
//! dropped, never the whole payload.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Entity identifier. The server emits either strings or integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Int(i64),
            Float(f64),
        }
        Ok(match Repr::deserialize(d)? {
            Repr::Text(s) => EntityId(s),
            Repr::Int(i) => EntityId(i.to_string()),
            Repr::Float(f) => EntityId(f.to_string()),
        })
    }
}

/// One OPD slot as sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSlot {
    Text(String),
    Object(RawSlotObject),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawSlotObject {
    #[serde(default, alias = "r", deserialize_with = "lenient_text")]
    pub range: Option<String>,
    #[serde(default, alias = "c", deserialize_with = "lenient_count")]
    pub count: Option<u32>,
}

impl RawSlot {
    /// Range text and optional patient count.
    pub fn parts(&self) -> (Option<&str>, Option<u32>) {
        match self {
            RawSlot::Text(s) => (Some(s.as_str()), None),
            RawSlot::Object(o) => (o.range.as_deref(), o.count),
        }
    }
}

/// A duty-status record exactly as the server sends it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawEntity {
    pub id: EntityId,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub specialty: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub designation: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status_reason: Option<String>,
    /// Older servers send the reason under this name.
    #[serde(default, deserialize_with = "lenient_text")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub room: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub patient_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub opd: Option<Vec<RawSlot>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub breaks: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub before_break_opd: Option<Vec<RawSlot>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub after_break_opd: Option<Vec<RawSlot>>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub before_break_opd_patients: Option<u32>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub after_break_opd_patients: Option<u32>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub after_break_note: Option<String>,
    #[serde(default, deserialize_with = "lenient_version")]
    pub image_version: Option<u64>,
}

/// `GET /api/day` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayPayload {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "entities", deserialize_with = "lenient_vec")]
    pub doctors: Vec<RawEntity>,
}

/// One day inside a `GET /api/window` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowDay {
    pub date: NaiveDate,
    #[serde(default, alias = "entities", deserialize_with = "lenient_vec")]
    pub doctors: Vec<RawEntity>,
}

/// `GET /api/window` response: `{window:[...]}` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WindowPayload {
    Wrapped { window: Vec<WindowDay> },
    Bare(Vec<WindowDay>),
}

impl WindowPayload {
    pub fn into_days(self) -> Vec<WindowDay> {
        match self {
            WindowPayload::Wrapped { window } => window,
            WindowPayload::Bare(days) => days,
        }
    }
}

/// A closure entry: current reason plus the history of reasons.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ClosureRecord {
    pub reason: Option<String>,
    pub reasons: Vec<String>,
}

impl<'de> Deserialize<'de> for ClosureRecord {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(match v {
            Value::String(s) => ClosureRecord {
                reasons: vec![s.clone()],
                reason: Some(s),
            },
            Value::Array(items) => {
                let reasons: Vec<String> = items
                    .into_iter()
                    .filter_map(|i| i.as_str().map(String::from))
                    .collect();
                ClosureRecord {
                    reason: reasons.last().cloned(),
                    reasons,
                }
            }
            Value::Object(map) => ClosureRecord {
                reason: map.get("reason").and_then(|r| r.as_str()).map(String::from),
                reasons: map
                    .get("reasons")
                    .and_then(|r| r.as_array())
                    .map(|a| a.iter().filter_map(|i| i.as_str().map(String::from)).collect())
                    .unwrap_or_default(),
            },
            _ => ClosureRecord::default(),
        })
    }
}

/// `GET /api/closures` response. Keys are ISO dates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClosuresPayload {
    #[serde(default)]
    pub dates: BTreeMap<String, ClosureRecord>,
}

// ─── Lenient field helpers ──────────────────────────────────

/// Numbers count; anything else (strings, null, negatives) is "no count".
pub fn count_from_value(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .map(|x| x.min(u32::MAX as u64) as u32)
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u32)
            }),
        _ => None,
    }
}

fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(count_from_value))
}

fn lenient_version<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.and_then(|v| match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }))
}

fn lenient_list<'de, D, T>(d: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    })
}

fn lenient_vec<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(lenient_list(d)?.unwrap_or_default())
}

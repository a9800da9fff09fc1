//! Typed push events decoded from SSE frames.

use crate::sse::SseFrame;
use chrono::NaiveDate;
use dutyboard_core::error::{DutyBoardError, Result};
use dutyboard_core::types::{EntityId, RawEntity};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Push topic names as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    EntityUpdate,
    EntityCreated,
    EntityDeleted,
    ClosureUpdate,
    BrandingUpdate,
    OrderUpdate,
    ScheduleCleared,
    BulkScheduleClear,
    Other,
}

impl Topic {
    pub fn from_wire(name: &str) -> Self {
        match name {
            "doctor_update" => Self::EntityUpdate,
            "doctor_create" => Self::EntityCreated,
            "doctor_delete" => Self::EntityDeleted,
            "closure_update" => Self::ClosureUpdate,
            "branding_updated" => Self::BrandingUpdate,
            "specialty_order_updated" => Self::OrderUpdate,
            "schedule_cleared" => Self::ScheduleCleared,
            "bulk_schedule_clear" => Self::BulkScheduleClear,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// A record changed. `date` scopes it; `entity` is an optional embedded copy.
    EntityUpdate {
        entity_id: Option<EntityId>,
        date: Option<NaiveDate>,
        entity: Option<Box<RawEntity>>,
    },
    EntityCreated { entity_id: Option<EntityId> },
    EntityDeleted { entity_id: Option<EntityId> },
    /// The closure registry changed; refetch it.
    ClosureUpdate,
    BrandingUpdate { version: Option<u64> },
    OrderUpdate { order: Vec<String> },
    /// Schedules were wiped for these dates.
    ScheduleCleared { dates: Vec<NaiveDate> },
    Other { topic: String },
}

#[derive(Deserialize)]
struct EntityUpdateWire {
    #[serde(default, alias = "entity_id")]
    doctor_id: Option<EntityId>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default, alias = "entity")]
    doctor: Option<Value>,
}

#[derive(Deserialize)]
struct EntityIdWire {
    #[serde(default, alias = "entity_id", alias = "id")]
    doctor_id: Option<EntityId>,
}

#[derive(Deserialize)]
struct BrandingWire {
    #[serde(default)]
    logo_version: Option<Value>,
}

#[derive(Deserialize)]
struct OrderWire {
    order: Vec<String>,
}

#[derive(Deserialize)]
struct ClearWire {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    dates: Vec<String>,
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| DutyBoardError::Decode(format!("bad date '{raw}': {e}")))
}

fn parse<T: for<'de> Deserialize<'de>>(frame: &SseFrame) -> Result<T> {
    Ok(serde_json::from_str(&frame.data)?)
}

impl PushEvent {
    pub fn topic(&self) -> Topic {
        match self {
            Self::EntityUpdate { .. } => Topic::EntityUpdate,
            Self::EntityCreated { .. } => Topic::EntityCreated,
            Self::EntityDeleted { .. } => Topic::EntityDeleted,
            Self::ClosureUpdate => Topic::ClosureUpdate,
            Self::BrandingUpdate { .. } => Topic::BrandingUpdate,
            Self::OrderUpdate { .. } => Topic::OrderUpdate,
            Self::ScheduleCleared { .. } => Topic::ScheduleCleared,
            Self::Other { .. } => Topic::Other,
        }
    }

    /// Decode one SSE frame. Malformed payloads are errors; the caller logs and skips.
    pub fn from_frame(frame: &SseFrame) -> Result<Self> {
        Ok(match Topic::from_wire(&frame.event) {
            Topic::EntityUpdate => {
                let wire: EntityUpdateWire = parse(frame)?;
                let date = wire.date.as_deref().map(parse_date).transpose()?;
                let entity = wire
                    .doctor
                    .and_then(|v| serde_json::from_value::<RawEntity>(v).ok())
                    .map(Box::new);
                Self::EntityUpdate {
                    entity_id: wire.doctor_id.or_else(|| entity.as_ref().map(|e| e.id.clone())),
                    date,
                    entity,
                }
            }
            Topic::EntityCreated => Self::EntityCreated {
                entity_id: parse::<EntityIdWire>(frame)?.doctor_id,
            },
            Topic::EntityDeleted => Self::EntityDeleted {
                entity_id: parse::<EntityIdWire>(frame)?.doctor_id,
            },
            Topic::ClosureUpdate => Self::ClosureUpdate,
            Topic::BrandingUpdate => {
                let wire: BrandingWire = parse(frame)?;
                let version = wire.logo_version.and_then(|v| match v {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                });
                Self::BrandingUpdate { version }
            }
            Topic::OrderUpdate => Self::OrderUpdate {
                order: parse::<OrderWire>(frame)?.order,
            },
            Topic::ScheduleCleared | Topic::BulkScheduleClear => {
                let wire: ClearWire = parse(frame)?;
                let dates = wire
                    .date
                    .iter()
                    .chain(wire.dates.iter())
                    .map(|d| parse_date(d))
                    .collect::<Result<Vec<_>>>()?;
                Self::ScheduleCleared { dates }
            }
            Topic::Other => Self::Other {
                topic: frame.event.clone(),
            },
        })
    }
}

/// Push-channel connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Reconnecting { delay: Duration, attempt: u32 },
}

/// Everything the push client emits.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Push(PushEvent),
    Connection(ConnectionState),
}

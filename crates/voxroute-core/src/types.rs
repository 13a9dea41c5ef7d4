//! Conversation records, date filters and aggregate statistics

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Sentinel used when a grouping key is absent from the source record
pub const UNKNOWN_KEY: &str = "unknown";

/// One upstream call/session
///
/// Known fields are lifted out of the upstream JSON for aggregation;
/// everything else stays in `extra`. A record built by `from_upstream`
/// keeps the object it was built from and serializes back to it unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct ConversationRecord {
    pub conversation_id: Option<String>,

    pub agent_id: Option<String>,

    pub agent_name: Option<String>,

    /// Call start, epoch seconds
    pub start_time_unix_secs: Option<i64>,

    /// Call end, epoch seconds (only some upstream shapes carry it)
    pub end_time_unix_secs: Option<i64>,

    pub call_duration_secs: Option<u64>,

    /// Remaining upstream fields, untouched
    pub extra: Map<String, Value>,

    /// Upstream object exactly as received
    pub upstream: Option<Map<String, Value>>,
}

impl ConversationRecord {
    /// Build a record from an upstream JSON value without failing
    ///
    /// Missing or wrongly-typed known fields become `None`; wrongly-typed
    /// values stay in `extra` under their original key. A non-object value
    /// yields an empty record.
    pub fn from_upstream(value: Value) -> Self {
        let Value::Object(source) = value else {
            tracing::warn!("Skipping fields of non-object conversation record");
            return Self::default();
        };

        let mut map = source.clone();
        let conversation_id = take_string(&mut map, "conversation_id");
        let agent_id = take_string(&mut map, "agent_id");
        let agent_name = take_string(&mut map, "agent_name");
        let start_time_unix_secs = take_i64(&mut map, "start_time_unix_secs");
        let end_time_unix_secs = take_i64(&mut map, "end_time_unix_secs");
        let call_duration_secs =
            take_i64(&mut map, "call_duration_secs").and_then(|d| u64::try_from(d).ok());

        Self {
            conversation_id,
            agent_id,
            agent_name,
            start_time_unix_secs,
            end_time_unix_secs,
            call_duration_secs,
            extra: map,
            upstream: Some(source),
        }
    }

    /// Duration in seconds: explicit duration, else end - start, else 0
    pub fn duration_secs(&self) -> u64 {
        if let Some(duration) = self.call_duration_secs {
            return duration;
        }

        match (self.start_time_unix_secs, self.end_time_unix_secs) {
            (Some(start), Some(end)) if end >= start => end.abs_diff(start),
            _ => 0,
        }
    }

    /// Grouping key for per-agent counts
    pub fn agent_key(&self) -> &str {
        self.agent_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| self.agent_id.as_deref().filter(|id| !id.is_empty()))
            .unwrap_or(UNKNOWN_KEY)
    }

    /// UTC calendar day of the call start
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_time_unix_secs
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.date_naive())
    }

    /// UTC calendar day of the call start, as `YYYY-MM-DD`
    pub fn start_day(&self) -> String {
        self.start_date()
            .map(|day| day.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN_KEY.to_string())
    }

    fn typed_fields(&self) -> Map<String, Value> {
        let mut map = self.extra.clone();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                map.insert(key.to_string(), value);
            }
        };
        put("conversation_id", self.conversation_id.clone().map(Value::from));
        put("agent_id", self.agent_id.clone().map(Value::from));
        put("agent_name", self.agent_name.clone().map(Value::from));
        put("start_time_unix_secs", self.start_time_unix_secs.map(Value::from));
        put("end_time_unix_secs", self.end_time_unix_secs.map(Value::from));
        put("call_duration_secs", self.call_duration_secs.map(Value::from));
        map
    }
}

impl From<Value> for ConversationRecord {
    fn from(value: Value) -> Self {
        Self::from_upstream(value)
    }
}

impl Serialize for ConversationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match &self.upstream {
            Some(source) => source.serialize(serializer),
            None => self.typed_fields().serialize(serializer),
        }
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => None,
        other => {
            map.insert(key.to_string(), other);
            None
        }
    }
}

fn take_i64(map: &mut Map<String, Value>, key: &str) -> Option<i64> {
    let value = map.remove(key)?;
    let parsed = match &value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    if parsed.is_none() && !value.is_null() {
        map.insert(key.to_string(), value);
    }
    parsed
}

/// Number of calls that started on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: u64,
}

/// Summary statistics derived from a set of conversation records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_calls: u64,
    pub total_duration_secs: u64,
    pub average_duration_secs: f64,
    pub calls_by_agent: BTreeMap<String, u64>,
    /// Ascending by date
    pub calls_by_day: Vec<DailyCount>,
    /// Descending by start time
    pub conversations: Vec<ConversationRecord>,
}

/// Optional inclusive range of UTC calendar days
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// The unfiltered range
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse `YYYY-MM-DD` bounds; empty strings count as absent
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let range = Self {
            start: parse_day("startDate", start)?,
            end: parse_day("endDate", end)?,
        };

        if let (Some(start), Some(end)) = (range.start, range.end)
            && start > end
        {
            return Err(Error::InvalidRequest(format!(
                "startDate {} is after endDate {}",
                start, end
            )));
        }

        Ok(range)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Lower bound for `call_start_after_unix` (00:00:00 UTC of the start day)
    pub fn start_after_unix(&self) -> Option<i64> {
        self.start
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp())
    }

    /// Upper bound for `call_start_before_unix` (00:00:00 UTC of the day after end)
    pub fn start_before_unix(&self) -> Option<i64> {
        self.end
            .and_then(|day| day.succ_opt())
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp())
    }

    /// Cache key segment: `all`, or `{start}_{end}` with `open` for a missing side
    pub fn cache_segment(&self) -> String {
        if self.is_unbounded() {
            return "all".to_string();
        }

        let side = |day: Option<NaiveDate>| {
            day.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "open".to_string())
        };
        format!("{}_{}", side(self.start), side(self.end))
    }
}

fn parse_day(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                Error::InvalidRequest(format!("{} must be YYYY-MM-DD, got '{}'", name, raw))
            }),
    }
}

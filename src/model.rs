use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashSet;

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const LIVE_NOW: &str = "直播中";
pub const MISSING: &str = "—";

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIME_FORMAT).ok()
}

pub fn format_timestamp(moment: NaiveDateTime) -> String {
    moment.format(TIME_FORMAT).to_string()
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(value_to_i64(&Value::deserialize(deserializer)?).unwrap_or(0))
}

// Null and unreadable values stay absent; only real numbers become Some.
fn lenient_i64_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(value_to_i64(&Value::deserialize(deserializer)?))
}

fn lenient_string_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let s = lenient_string(deserializer)?;
    Ok(if s.is_empty() { None } else { Some(s) })
}

fn zero_hms() -> String {
    "00:00:00".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub anchor_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub room_id: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub attention: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub status: i64,
    #[serde(default = "zero_hms", deserialize_with = "lenient_string")]
    pub live_duration: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub effective_days: String,
    #[serde(default, deserialize_with = "lenient_i64_opt")]
    pub guard_1: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64_opt")]
    pub guard_2: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64_opt")]
    pub guard_3: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64_opt")]
    pub fans_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64_opt")]
    pub blind_box_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub blind_box_profit: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gift: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub super_chat: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub guard: f64,
}

impl StatRecord {
    // Any upstream `total` is ignored.
    pub fn total(&self) -> f64 {
        self.gift + self.guard + self.super_chat
    }

    pub fn is_live(&self) -> bool {
        self.status == 1
    }

    pub fn matches(&self, keyword: &str) -> bool {
        self.anchor_name.contains(keyword)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoomStatus {
    #[serde(default, deserialize_with = "lenient_string")]
    pub anchor_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub room_id: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub status: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub live_time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
}

impl RoomStatus {
    pub fn is_live(&self) -> bool {
        self.status == 1
    }

    pub fn matches(&self, keyword: &str) -> bool {
        self.anchor_name.contains(keyword)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub start_time: String,
    #[serde(default, deserialize_with = "lenient_string_opt")]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub danmaku_count: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_concurrency: f64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub max_concurrency: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub blind_box_count: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub blind_box_profit: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gift: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub guard: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub super_chat: f64,
}

impl SessionRecord {
    pub fn subtotal(&self) -> f64 {
        self.gift + self.guard + self.super_chat
    }

    // end - start, or now - start while the end is missing or unreadable;
    // 0 when start is unreadable.
    pub fn duration_seconds(&self, now: NaiveDateTime) -> i64 {
        let Some(start) = parse_timestamp(&self.start_time) else {
            return 0;
        };
        let end = self.end_time.as_deref().and_then(parse_timestamp).unwrap_or(now);
        (end - start).num_seconds().max(0)
    }

    pub fn start_display(&self) -> String {
        if self.start_time.is_empty() {
            MISSING.to_string()
        } else {
            self.start_time.clone()
        }
    }

    pub fn end_display(&self) -> String {
        let started = parse_timestamp(&self.start_time).is_some();
        match self.end_time.as_deref() {
            Some(end) if parse_timestamp(end).is_some() => end.to_string(),
            _ if started => LIVE_NOW.to_string(),
            Some(end) if !end.is_empty() => end.to_string(),
            _ => MISSING.to_string(),
        }
    }

    pub fn avg_concurrency_rounded(&self) -> i64 {
        self.avg_concurrency.round() as i64
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionTotals {
    pub count: usize,
    pub seconds: i64,
    pub danmaku: i64,
    pub blind_box_count: i64,
    pub blind_box_profit: f64,
    pub gift: f64,
    pub guard: f64,
    pub super_chat: f64,
    pub sum: f64,
}

impl SessionTotals {
    pub fn add(&mut self, session: &SessionRecord, now: NaiveDateTime) {
        self.count += 1;
        self.seconds += session.duration_seconds(now);
        self.danmaku += session.danmaku_count;
        self.blind_box_count += session.blind_box_count;
        self.blind_box_profit += session.blind_box_profit;
        self.gift += session.gift;
        self.guard += session.guard;
        self.super_chat += session.super_chat;
        self.sum += session.subtotal();
    }

    pub fn of(sessions: &[SessionRecord], now: NaiveDateTime) -> Self {
        let mut totals = Self::default();
        for session in sessions {
            totals.add(session, now);
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SuperChatEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub send_time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub uname: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub uid: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
}

// Stable ascending sort; unreadable times count as the earliest.
pub fn sort_by_send_time(entries: &mut [SuperChatEntry]) {
    entries.sort_by_key(|entry| parse_timestamp(&entry.send_time).unwrap_or(NaiveDateTime::MIN));
}

pub fn dedup_by_anchor_room(records: Vec<StatRecord>) -> Vec<StatRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((r.anchor_name.clone(), r.room_id.clone())))
        .collect()
}

// `[...]` or `{key: [...]}`; anything else is an empty list.
pub fn list_or_field(payload: Value, key: &str) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

// Only `{key: [...]}` is accepted.
pub fn field_list(payload: Value, key: &str) -> Vec<Value> {
    match payload {
        Value::Object(_) => list_or_field(payload, key),
        _ => Vec::new(),
    }
}

// Non-object items are skipped.
pub fn parse_records<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable record");
                None
            }
        })
        .collect()
}

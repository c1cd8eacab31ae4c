//! Coercion of loosely typed store rows into the typed records in [`crate::model`].
//!
//! Every parser returns `None` instead of failing; callers drop the row.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::model::{Event, FinishedEvent, OddsRow, Winner};

const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub sport_key: Value,
    #[serde(default)]
    pub commence_time_utc: Value,
    #[serde(default)]
    pub home_name: Value,
    #[serde(default)]
    pub away_name: Value,
}

impl RawEvent {
    pub fn normalize(&self) -> Option<Event> {
        Some(Event {
            id: parse_id(&self.id)?,
            sport_key: parse_text(&self.sport_key).unwrap_or_default(),
            commence_time: parse_instant(&self.commence_time_utc)?,
            home_name: parse_text(&self.home_name).unwrap_or_default(),
            away_name: parse_text(&self.away_name).unwrap_or_default(),
        })
    }
}

/// A result joined to its event metadata, as the `results` table returns it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFinishedRow {
    #[serde(default)]
    pub event_id: Value,
    #[serde(default)]
    pub winner_key: Value,
    #[serde(default)]
    pub events: Option<RawEvent>,
}

impl RawFinishedRow {
    pub fn normalize(&self) -> Option<FinishedEvent> {
        let meta = self.events.clone().unwrap_or_default();
        let event = RawEvent {
            id: self.event_id.clone(),
            ..meta
        }
        .normalize()?;
        let winner = parse_text(&self.winner_key)
            .map(|key| Winner::from_key(&key))
            .unwrap_or(Winner::Other);
        Some(FinishedEvent { event, winner })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOddsRow {
    #[serde(default)]
    pub event_id: Value,
    #[serde(default)]
    pub outcome_key: Value,
    #[serde(default)]
    pub outcome_name: Value,
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub snapshot_time_utc: Value,
}

impl RawOddsRow {
    pub fn normalize(&self) -> Option<OddsRow> {
        Some(OddsRow {
            event_id: parse_id(&self.event_id)?,
            outcome_key: parse_text(&self.outcome_key),
            outcome_name: parse_text(&self.outcome_name),
            price: parse_price(&self.price)?,
            snapshot_time: parse_instant(&self.snapshot_time_utc)?,
        })
    }
}

pub fn normalize_all<R, T>(raw: &[R], f: impl Fn(&R) -> Option<T>) -> (Vec<T>, usize) {
    let mut out = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;
    for row in raw {
        match f(row) {
            Some(row) => out.push(row),
            None => dropped += 1,
        }
    }
    (out, dropped)
}

pub fn parse_instant(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => parse_instant_str(s),
        Value::Number(n) => n.as_f64().and_then(instant_from_epoch),
        _ => None,
    }
}

pub fn parse_instant_str(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    // Postgres renders offsets as "+00" without minutes.
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }
    trimmed.parse::<f64>().ok().and_then(instant_from_epoch)
}

fn instant_from_epoch(raw: f64) -> Option<DateTime<Utc>> {
    if !raw.is_finite() {
        return None;
    }
    let millis = if raw.abs() >= EPOCH_MILLIS_THRESHOLD {
        raw
    } else {
        raw * 1000.0
    };
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis.round() as i64)
}

pub fn parse_price(v: &Value) -> Option<f64> {
    let price = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    price.is_finite().then_some(price)
}

pub fn parse_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn parse_id(v: &Value) -> Option<String> {
    parse_text(v)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

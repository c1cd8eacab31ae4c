use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MARKET_H2H: &str = "h2h";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Home,
    Away,
    Other,
}

impl Winner {
    /// Anything except a home or away winner (draws, voids, unknown keys) maps to `Other`.
    pub fn from_key(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "home" => Winner::Home,
            "away" => Winner::Away,
            _ => Winner::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub sport_key: String,
    pub commence_time: DateTime<Utc>,
    pub home_name: String,
    pub away_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinishedEvent {
    pub event: Event,
    pub winner: Winner,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OddsRow {
    pub event_id: String,
    pub outcome_key: Option<String>,
    pub outcome_name: Option<String>,
    pub price: f64,
    pub snapshot_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRecord {
    pub event_id: String,
    pub p_home_novig: f64,
    pub home_won: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub event_id: String,
    pub market_key: String,
    pub outcome_key: Side,
    pub line: Option<f64>,
    pub model_version: String,
    pub predicted_prob: f64,
    pub generated_time_utc: DateTime<Utc>,
}

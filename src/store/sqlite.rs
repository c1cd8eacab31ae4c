use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params, params_from_iter};
use serde_json::Value;

use super::{FinishedQuery, PredictionStore, UpcomingQuery};
use crate::model::{Event, FinishedEvent, OddsRow, Prediction};
use crate::normalize::{RawEvent, RawFinishedRow, RawOddsRow};

/// Embedded store with the same tables the remote store exposes.
pub struct SqliteStore {
    conn: Connection,
}

/// A single quoted outcome, as written by an ingestion job.
#[derive(Debug, Clone)]
pub struct OddsQuote<'a> {
    pub event_id: &'a str,
    pub bookmaker: &'a str,
    pub market_key: &'a str,
    pub outcome_key: Option<&'a str>,
    pub outcome_name: Option<&'a str>,
    pub price: f64,
    pub snapshot_time_utc: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredPrediction {
    pub event_id: String,
    pub market_key: String,
    pub outcome_key: String,
    pub line: Option<f64>,
    pub model_version: String,
    pub predicted_prob: f64,
    pub generated_time_utc: String,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn insert_event(
        &self,
        id: &str,
        sport_key: &str,
        commence_time_utc: &str,
        home_name: &str,
        away_name: &str,
    ) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO events (id, sport_key, commence_time_utc, home_name, away_name)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    sport_key = excluded.sport_key,
                    commence_time_utc = excluded.commence_time_utc,
                    home_name = excluded.home_name,
                    away_name = excluded.away_name
                "#,
                params![id, sport_key, commence_time_utc, home_name, away_name],
            )
            .context("upsert event")?;
        Ok(())
    }

    pub fn insert_result(&self, event_id: &str, winner_key: &str, created_at: &str) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO results (event_id, winner_key, created_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(event_id) DO UPDATE SET
                    winner_key = excluded.winner_key,
                    created_at = excluded.created_at
                "#,
                params![event_id, winner_key, created_at],
            )
            .context("upsert result")?;
        Ok(())
    }

    pub fn insert_odds(&self, quote: &OddsQuote<'_>) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO odds_snapshots (
                    event_id, bookmaker, market_key, outcome_key, outcome_name, price, snapshot_time_utc
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    quote.event_id,
                    quote.bookmaker,
                    quote.market_key,
                    quote.outcome_key,
                    quote.outcome_name,
                    quote.price,
                    quote.snapshot_time_utc,
                ],
            )
            .context("insert odds snapshot")?;
        Ok(())
    }

    pub fn load_predictions(&self, model_version: &str) -> Result<Vec<StoredPrediction>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT event_id, market_key, outcome_key, line, model_version,
                       predicted_prob, generated_time_utc
                FROM predictions
                WHERE model_version = ?1
                ORDER BY event_id ASC, outcome_key DESC
                "#,
            )
            .context("prepare load predictions query")?;
        let rows = stmt
            .query_map(params![model_version], |row| {
                Ok(StoredPrediction {
                    event_id: row.get(0)?,
                    market_key: row.get(1)?,
                    outcome_key: row.get(2)?,
                    line: row.get(3)?,
                    model_version: row.get(4)?,
                    predicted_prob: row.get(5)?,
                    generated_time_utc: row.get(6)?,
                })
            })
            .context("query load predictions")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode prediction row")?);
        }
        Ok(out)
    }

    pub fn prediction_count(&self) -> Result<usize> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM predictions", [], |row| {
                row.get::<_, i64>(0)
            })
            .context("count predictions")?;
        Ok(usize::try_from(n).unwrap_or_default())
    }
}

impl PredictionStore for SqliteStore {
    fn finished_events(&self, query: &FinishedQuery) -> Result<Vec<FinishedEvent>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT r.event_id, r.winner_key,
                       e.sport_key, e.commence_time_utc, e.home_name, e.away_name
                FROM results r
                JOIN events e ON e.id = r.event_id
                WHERE substr(e.sport_key, 1, length(?1)) = ?1
                ORDER BY r.created_at DESC
                LIMIT ?2
                "#,
            )
            .context("prepare finished events query")?;
        let rows = stmt
            .query_map(
                params![query.sport_prefix, limit_param(query.limit)],
                |row| {
                    Ok(RawFinishedRow {
                        event_id: json_at(row, 0)?,
                        winner_key: json_at(row, 1)?,
                        events: Some(RawEvent {
                            id: Value::Null,
                            sport_key: json_at(row, 2)?,
                            commence_time_utc: json_at(row, 3)?,
                            home_name: json_at(row, 4)?,
                            away_name: json_at(row, 5)?,
                        }),
                    })
                },
            )
            .context("query finished events")?;

        let mut out = Vec::new();
        for row in rows {
            let raw = row.context("decode finished event row")?;
            if let Some(finished) = raw.normalize() {
                out.push(finished);
            }
        }
        Ok(out)
    }

    fn odds_for_events(&self, event_ids: &[String], market_key: &str) -> Result<Vec<OddsRow>> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; event_ids.len()].join(", ");
        let sql = format!(
            "SELECT event_id, outcome_key, outcome_name, price, snapshot_time_utc
             FROM odds_snapshots
             WHERE market_key = ? AND event_id IN ({placeholders})
             ORDER BY id ASC"
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare odds query")?;
        let bind = std::iter::once(market_key).chain(event_ids.iter().map(String::as_str));
        let rows = stmt
            .query_map(params_from_iter(bind), |row| {
                Ok(RawOddsRow {
                    event_id: json_at(row, 0)?,
                    outcome_key: json_at(row, 1)?,
                    outcome_name: json_at(row, 2)?,
                    price: json_at(row, 3)?,
                    snapshot_time_utc: json_at(row, 4)?,
                })
            })
            .context("query odds")?;

        let mut out = Vec::new();
        for row in rows {
            let raw = row.context("decode odds row")?;
            if let Some(odds) = raw.normalize() {
                out.push(odds);
            }
        }
        Ok(out)
    }

    fn upcoming_events(&self, query: &UpcomingQuery) -> Result<Vec<Event>> {
        // Stored instants may use mixed text formats, so the window is applied
        // after normalization rather than in SQL.
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT id, sport_key, commence_time_utc, home_name, away_name
                FROM events
                WHERE substr(sport_key, 1, length(?1)) = ?1
                "#,
            )
            .context("prepare upcoming events query")?;
        let rows = stmt
            .query_map(params![query.sport_prefix], |row| {
                Ok(RawEvent {
                    id: json_at(row, 0)?,
                    sport_key: json_at(row, 1)?,
                    commence_time_utc: json_at(row, 2)?,
                    home_name: json_at(row, 3)?,
                    away_name: json_at(row, 4)?,
                })
            })
            .context("query upcoming events")?;

        let mut out = Vec::new();
        for row in rows {
            let raw = row.context("decode event row")?;
            if let Some(event) = raw.normalize()
                && event.commence_time >= query.from
                && event.commence_time <= query.to
            {
                out.push(event);
            }
        }
        out.sort_by(|a, b| {
            a.commence_time
                .cmp(&b.commence_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        out.truncate(query.limit);
        Ok(out)
    }

    fn replace_predictions(
        &mut self,
        model_version: &str,
        event_ids: &[String],
        rows: &[Prediction],
    ) -> Result<()> {
        if event_ids.is_empty() && rows.is_empty() {
            return Ok(());
        }
        let tx = self
            .conn
            .transaction()
            .context("begin predictions transaction")?;

        if !event_ids.is_empty() {
            let placeholders = vec!["?"; event_ids.len()].join(", ");
            let sql = format!(
                "DELETE FROM predictions WHERE model_version = ? AND event_id IN ({placeholders})"
            );
            let bind = std::iter::once(model_version).chain(event_ids.iter().map(String::as_str));
            tx.execute(&sql, params_from_iter(bind))
                .context("delete stale predictions")?;
        }

        for p in rows {
            tx.execute(
                r#"
                INSERT INTO predictions (
                    event_id, market_key, outcome_key, line, model_version,
                    predicted_prob, generated_time_utc
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    p.event_id,
                    p.market_key,
                    p.outcome_key.as_str(),
                    p.line,
                    p.model_version,
                    p.predicted_prob,
                    p.generated_time_utc.to_rfc3339(),
                ],
            )
            .context("insert prediction")?;
        }

        tx.commit().context("commit predictions transaction")?;
        Ok(())
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            sport_key TEXT NOT NULL,
            commence_time_utc TEXT NULL,
            home_name TEXT NULL,
            away_name TEXT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_events_sport ON events(sport_key);

        CREATE TABLE IF NOT EXISTS results (
            event_id TEXT PRIMARY KEY,
            winner_key TEXT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_results_created ON results(created_at);

        CREATE TABLE IF NOT EXISTS odds_snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT NOT NULL,
            bookmaker TEXT NOT NULL,
            market_key TEXT NOT NULL,
            outcome_key TEXT NULL,
            outcome_name TEXT NULL,
            price,
            snapshot_time_utc TEXT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_odds_event_market ON odds_snapshots(event_id, market_key);

        CREATE TABLE IF NOT EXISTS predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT NOT NULL,
            market_key TEXT NOT NULL,
            outcome_key TEXT NOT NULL,
            line REAL NULL,
            model_version TEXT NOT NULL,
            predicted_prob REAL NOT NULL,
            generated_time_utc TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_predictions_key ON predictions(model_version, event_id);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn json_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Value> {
    Ok(sql_to_json(row.get::<_, SqlValue>(idx)?))
}

fn sql_to_json(v: SqlValue) -> Value {
    match v {
        SqlValue::Null | SqlValue::Blob(_) => Value::Null,
        SqlValue::Integer(i) => Value::from(i),
        SqlValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
    }
}

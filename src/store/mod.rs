//! Query/command capabilities the pipeline needs from the external store.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::{Event, FinishedEvent, OddsRow, Prediction};

pub mod rest;
pub mod sqlite;

/// Finished events that carry a result, newest result first.
#[derive(Debug, Clone)]
pub struct FinishedQuery {
    pub sport_prefix: String,
    pub limit: usize,
}

/// Events starting inside `[from, to]`, earliest first.
#[derive(Debug, Clone)]
pub struct UpcomingQuery {
    pub sport_prefix: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub limit: usize,
}

pub trait PredictionStore {
    fn finished_events(&self, query: &FinishedQuery) -> Result<Vec<FinishedEvent>>;

    /// Odds rows for one bounded batch of event ids in a single market.
    fn odds_for_events(&self, event_ids: &[String], market_key: &str) -> Result<Vec<OddsRow>>;

    fn upcoming_events(&self, query: &UpcomingQuery) -> Result<Vec<Event>>;

    /// Deletes every prediction keyed by `model_version` and an id in
    /// `event_ids`, then inserts `rows`.
    fn replace_predictions(
        &mut self,
        model_version: &str,
        event_ids: &[String],
        rows: &[Prediction],
    ) -> Result<()>;
}

pub fn fetch_odds_chunked<S: PredictionStore + ?Sized>(
    store: &S,
    event_ids: &[String],
    market_key: &str,
    chunk_size: usize,
) -> Result<Vec<OddsRow>> {
    let mut out = Vec::new();
    for chunk in event_ids.chunks(chunk_size.max(1)) {
        let rows = store.odds_for_events(chunk, market_key)?;
        debug!(ids = chunk.len(), rows = rows.len(), "fetched odds chunk");
        out.extend(rows);
    }
    Ok(out)
}

/// Event ids in first-seen order without repeats.
pub fn unique_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        if seen.insert(id) {
            out.push(id.to_string());
        }
    }
    out
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::OddsRow;

/// Odds rows grouped by event id.
#[derive(Debug, Default)]
pub struct OddsIndex<'a> {
    by_event: HashMap<&'a str, Vec<&'a OddsRow>>,
}

impl<'a> OddsIndex<'a> {
    pub fn new(rows: &'a [OddsRow]) -> Self {
        let mut by_event: HashMap<&'a str, Vec<&'a OddsRow>> = HashMap::new();
        for row in rows {
            by_event.entry(row.event_id.as_str()).or_default().push(row);
        }
        Self { by_event }
    }

    pub fn rows_for(&self, event_id: &str) -> &[&'a OddsRow] {
        self.by_event
            .get(event_id)
            .map(|rows| rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn event_count(&self) -> usize {
        self.by_event.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_event.is_empty()
    }
}

/// Latest snapshot instant not after `reference`; when every snapshot is later
/// than the reference, the latest one available. `None` when there are no rows.
pub fn select_snapshot<'r>(
    rows: impl IntoIterator<Item = &'r OddsRow>,
    reference: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let mut latest_before: Option<DateTime<Utc>> = None;
    let mut latest_any: Option<DateTime<Utc>> = None;
    for row in rows {
        let t = row.snapshot_time;
        latest_any = Some(latest_any.map_or(t, |cur| cur.max(t)));
        if t <= reference {
            latest_before = Some(latest_before.map_or(t, |cur| cur.max(t)));
        }
    }
    latest_before.or(latest_any)
}

pub fn rows_at<'r>(
    rows: &[&'r OddsRow],
    snapshot_time: DateTime<Utc>,
) -> impl Iterator<Item = &'r OddsRow> {
    rows.iter()
        .copied()
        .filter(move |row| row.snapshot_time == snapshot_time)
}

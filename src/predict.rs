use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::calibration::Calibrator;
use crate::model::{Event, MARKET_H2H, Prediction, Side};
use crate::no_vig::no_vig_home_probability;
use crate::snapshot::OddsIndex;
use crate::store::PredictionStore;

/// Home and away rows for every upcoming event that has a usable no-vig price.
pub fn stage_predictions<C: Calibrator + ?Sized>(
    upcoming: &[Event],
    index: &OddsIndex<'_>,
    model: &C,
    model_version: &str,
    generated_at: DateTime<Utc>,
) -> Vec<Prediction> {
    let mut out = Vec::with_capacity(upcoming.len() * 2);
    for event in upcoming {
        let Some(p_novig) = no_vig_home_probability(index, event) else {
            continue;
        };
        let p_home = model.predict_probability(p_novig).clamp(0.0, 1.0);
        for (side, prob) in [(Side::Home, p_home), (Side::Away, 1.0 - p_home)] {
            out.push(Prediction {
                event_id: event.id.clone(),
                market_key: MARKET_H2H.to_string(),
                outcome_key: side,
                line: None,
                model_version: model_version.to_string(),
                predicted_prob: prob,
                generated_time_utc: generated_at,
            });
        }
    }
    out
}

/// Replaces stored predictions for `model_version` and the events in `rows`,
/// chunk by chunk. Returns the number of rows written; an empty batch never
/// touches the store.
pub fn write_predictions<S: PredictionStore + ?Sized>(
    store: &mut S,
    model_version: &str,
    rows: &[Prediction],
    chunk_size: usize,
) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut by_event: BTreeMap<&str, Vec<Prediction>> = BTreeMap::new();
    for row in rows {
        by_event
            .entry(row.event_id.as_str())
            .or_default()
            .push(row.clone());
    }
    let event_ids: Vec<String> = by_event.keys().map(|id| id.to_string()).collect();

    let mut written = 0usize;
    for chunk in event_ids.chunks(chunk_size.max(1)) {
        let chunk_rows: Vec<Prediction> = chunk
            .iter()
            .filter_map(|id| by_event.get(id.as_str()))
            .flatten()
            .cloned()
            .collect();
        store.replace_predictions(model_version, chunk, &chunk_rows)?;
        debug!(events = chunk.len(), rows = chunk_rows.len(), "replaced prediction chunk");
        written += chunk_rows.len();
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::stage_predictions;
    use crate::calibration::IdentityCalibrator;
    use crate::model::{Event, OddsRow, Side};
    use crate::snapshot::OddsIndex;

    #[test]
    fn stages_complementary_rows_per_event() {
        let kickoff = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        let events = vec![
            Event {
                id: "e1".to_string(),
                sport_key: "tennis_atp".to_string(),
                commence_time: kickoff,
                home_name: "H".to_string(),
                away_name: "A".to_string(),
            },
            Event {
                id: "no_odds".to_string(),
                sport_key: "tennis_atp".to_string(),
                commence_time: kickoff,
                home_name: "X".to_string(),
                away_name: "Y".to_string(),
            },
        ];
        let at = kickoff - Duration::hours(3);
        let odds = vec![
            OddsRow {
                event_id: "e1".to_string(),
                outcome_key: Some("home".to_string()),
                outcome_name: None,
                price: 1.8,
                snapshot_time: at,
            },
            OddsRow {
                event_id: "e1".to_string(),
                outcome_key: None,
                outcome_name: Some("a".to_string()),
                price: 2.2,
                snapshot_time: at,
            },
        ];
        let index = OddsIndex::new(&odds);
        let rows = stage_predictions(&events, &index, &IdentityCalibrator, "v1", kickoff);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].outcome_key, Side::Home);
        assert_eq!(rows[1].outcome_key, Side::Away);
        assert!((rows[0].predicted_prob - 0.55).abs() < 1e-9);
        assert!((rows[0].predicted_prob + rows[1].predicted_prob - 1.0).abs() < 1e-12);
        assert!(rows.iter().all(|r| r.line.is_none() && r.model_version == "v1"));
    }
}

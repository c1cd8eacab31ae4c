use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

use h2h_calibrator::calibration::{Calibrator, LogisticCalibrator};
use h2h_calibrator::model::{Event, FinishedEvent, OddsRow, Winner};
use h2h_calibrator::store::rest::parse_odds_json;
use h2h_calibrator::training::build_training_set;

const EVENTS: usize = 1500;
const SNAPSHOTS: i64 = 4;
const BOOKS: usize = 5;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

fn synthetic_history(seed: u64) -> (Vec<FinishedEvent>, Vec<OddsRow>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut finished = Vec::with_capacity(EVENTS);
    let mut odds = Vec::with_capacity(EVENTS * SNAPSHOTS as usize * BOOKS * 2);

    for i in 0..EVENTS {
        let id = format!("ev-{i}");
        let kickoff = base_time() + Duration::hours(i as i64 * 3);
        let p_home: f64 = rng.gen_range(0.15..0.85);
        let winner = if rng.gen_bool(p_home) {
            Winner::Home
        } else {
            Winner::Away
        };
        finished.push(FinishedEvent {
            event: Event {
                id: id.clone(),
                sport_key: "tennis_atp".to_string(),
                commence_time: kickoff,
                home_name: format!("Home {i}"),
                away_name: format!("Away {i}"),
            },
            winner,
        });

        for s in 0..SNAPSHOTS {
            // One snapshot lands after kickoff.
            let at = kickoff + Duration::minutes(45 * (s - SNAPSHOTS + 2));
            for b in 0..BOOKS {
                let margin = 1.0 + rng.gen_range(0.02..0.08);
                let home_price = 1.0 / (p_home * margin);
                let away_price = 1.0 / ((1.0 - p_home) * margin);
                let (home_key, away_key) = if b % 2 == 0 {
                    (Some("home".to_string()), Some("away".to_string()))
                } else {
                    (None, None)
                };
                odds.push(OddsRow {
                    event_id: id.clone(),
                    outcome_key: home_key,
                    outcome_name: Some(format!("home {i}")),
                    price: home_price,
                    snapshot_time: at,
                });
                odds.push(OddsRow {
                    event_id: id.clone(),
                    outcome_key: away_key,
                    outcome_name: Some(format!("AWAY {i}")),
                    price: away_price,
                    snapshot_time: at,
                });
            }
        }
    }
    (finished, odds)
}

fn bench_training_set_build(c: &mut Criterion) {
    let (finished, odds) = synthetic_history(7);
    c.bench_function("training_set_build", |b| {
        b.iter(|| {
            let set = build_training_set(black_box(&finished), black_box(&odds));
            black_box(set.len());
        })
    });
}

fn bench_logistic_fit(c: &mut Criterion) {
    let (finished, odds) = synthetic_history(11);
    let set = build_training_set(&finished, &odds);
    let features = set.features();
    let labels = set.labels();
    c.bench_function("logistic_fit", |b| {
        b.iter(|| {
            let mut model = LogisticCalibrator::default();
            model
                .fit(black_box(&features), black_box(&labels))
                .expect("non-empty training set");
            black_box(model.weight);
        })
    });
}

fn bench_odds_json_parse(c: &mut Criterion) {
    let mut rows = Vec::with_capacity(1000);
    for i in 0..1000 {
        rows.push(format!(
            r#"{{"event_id":"ev-{}","outcome_key":"{}","outcome_name":null,"price":{:.2},"snapshot_time_utc":"2026-01-01T{:02}:00:00+00:00"}}"#,
            i / 10,
            if i % 2 == 0 { "home" } else { "away" },
            1.5 + (i % 7) as f64 * 0.1,
            i % 24
        ));
    }
    let body = format!("[{}]", rows.join(","));
    c.bench_function("odds_json_parse", |b| {
        b.iter(|| {
            let rows = parse_odds_json(black_box(&body)).unwrap();
            black_box(rows.len());
        })
    });
}

criterion_group!(
    perf,
    bench_training_set_build,
    bench_logistic_fit,
    bench_odds_json_parse
);
criterion_main!(perf);

//! Single-pass batch job: train on finished events, predict upcoming ones.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::calibration::{Calibrator, Metrics, evaluate};
use crate::config::PipelineConfig;
use crate::predict::{stage_predictions, write_predictions};
use crate::snapshot::OddsIndex;
use crate::store::{
    FinishedQuery, PredictionStore, UpcomingQuery, fetch_odds_chunked, unique_ids,
};
use crate::training::{BuildStats, TrainingSet, build_training_set};

/// Expected steady-state reasons for a run to end without writing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    NoFinishedResults,
    NoTrainableRows,
    NoUpcomingEvents,
    NoUpcomingOdds,
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            NoOpReason::NoFinishedResults => "no finished results found; cannot train",
            NoOpReason::NoTrainableRows => "not enough aligned odds and results to train",
            NoOpReason::NoUpcomingEvents => "no upcoming events found",
            NoOpReason::NoUpcomingOdds => "no upcoming odds rows found; run ingestion first",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub model_version: String,
    pub train_rows: usize,
    pub train_stats: BuildStats,
    pub metrics: Metrics,
    pub upcoming_events: usize,
    pub pred_rows: usize,
    pub ran_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Written(RunSummary),
    NoOp(NoOpReason),
}

/// Result of the training half of a run.
#[derive(Debug, Clone)]
pub struct Trained {
    pub training: TrainingSet,
    pub metrics: Metrics,
}

/// Loads finished events and their odds, builds the training set and fits
/// `calibrator` on it. `Err(NoOpReason)` inside `Ok` when there is nothing to fit.
pub fn train<S, C>(
    store: &S,
    calibrator: &mut C,
    cfg: &PipelineConfig,
) -> Result<std::result::Result<Trained, NoOpReason>>
where
    S: PredictionStore + ?Sized,
    C: Calibrator + ?Sized,
{
    let finished = store.finished_events(&FinishedQuery {
        sport_prefix: cfg.sport_prefix.clone(),
        limit: cfg.train_limit,
    })?;
    if finished.is_empty() {
        return Ok(Err(NoOpReason::NoFinishedResults));
    }

    let event_ids = unique_ids(finished.iter().map(|f| f.event.id.as_str()));
    let odds = fetch_odds_chunked(store, &event_ids, &cfg.market_key, cfg.chunk_size)?;
    let training = build_training_set(&finished, &odds);
    info!(
        finished = finished.len(),
        odds_rows = odds.len(),
        kept = training.stats.kept,
        unusable_result = training.stats.unusable_result,
        no_snapshot = training.stats.no_snapshot,
        no_probability = training.stats.no_probability,
        "built training set"
    );
    if training.is_empty() {
        return Ok(Err(NoOpReason::NoTrainableRows));
    }

    let features = training.features();
    let labels = training.labels();
    calibrator
        .fit(&features, &labels)
        .context("fit calibration model")?;
    let fitted: Vec<f64> = features
        .iter()
        .map(|x| calibrator.predict_probability(*x))
        .collect();
    let metrics = evaluate(&fitted, &labels);
    info!(
        samples = metrics.samples,
        brier = metrics.brier,
        log_loss = metrics.log_loss,
        accuracy = metrics.accuracy,
        "fitted calibration model"
    );

    Ok(Ok(Trained { training, metrics }))
}

pub fn run<S, C>(
    store: &mut S,
    calibrator: &mut C,
    cfg: &PipelineConfig,
    now: DateTime<Utc>,
) -> Result<RunOutcome>
where
    S: PredictionStore + ?Sized,
    C: Calibrator + ?Sized,
{
    let trained = match train(&*store, calibrator, cfg)? {
        Ok(trained) => trained,
        Err(reason) => return Ok(RunOutcome::NoOp(reason)),
    };

    let upcoming = store.upcoming_events(&UpcomingQuery {
        sport_prefix: cfg.sport_prefix.clone(),
        from: now,
        to: now + Duration::hours(cfg.hours_ahead),
        limit: cfg.upcoming_limit,
    })?;
    if upcoming.is_empty() {
        return Ok(RunOutcome::NoOp(NoOpReason::NoUpcomingEvents));
    }

    let upcoming_ids = unique_ids(upcoming.iter().map(|e| e.id.as_str()));
    let upcoming_odds =
        fetch_odds_chunked(&*store, &upcoming_ids, &cfg.market_key, cfg.chunk_size)?;
    if upcoming_odds.is_empty() {
        return Ok(RunOutcome::NoOp(NoOpReason::NoUpcomingOdds));
    }

    let index = OddsIndex::new(&upcoming_odds);
    let staged = stage_predictions(&upcoming, &index, &*calibrator, &cfg.model_version, now);
    let pred_rows = write_predictions(store, &cfg.model_version, &staged, cfg.chunk_size)?;
    info!(
        upcoming = upcoming.len(),
        with_odds = index.event_count(),
        pred_rows,
        model_version = %cfg.model_version,
        "wrote predictions"
    );

    Ok(RunOutcome::Written(RunSummary {
        model_version: cfg.model_version.clone(),
        train_rows: trained.training.len(),
        train_stats: trained.training.stats,
        metrics: trained.metrics,
        upcoming_events: upcoming.len(),
        pred_rows,
        ran_at: now,
    }))
}

use std::process::ExitCode;

use chrono::Utc;
use tracing::{error, info};

use h2h_calibrator::calibration::LogisticCalibrator;
use h2h_calibrator::cli::{self, EXIT_CONFIG, EXIT_FAILURE};
use h2h_calibrator::config::PipelineConfig;
use h2h_calibrator::pipeline::{self, RunOutcome};

fn main() -> ExitCode {
    cli::init_process();
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let cfg = match PipelineConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("configuration error: {err}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    let mut store = match cli::open_store(cli::db_path_arg(&args)) {
        Ok(store) => store,
        Err(err) => {
            error!("startup failed: {err}");
            return err.exit_code();
        }
    };

    let mut model = LogisticCalibrator::default();
    match pipeline::run(&mut *store, &mut model, &cfg, Utc::now()) {
        Ok(RunOutcome::NoOp(reason)) => {
            println!("Nothing to do: {reason}");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Written(summary)) => {
            info!(
                weight = model.weight,
                intercept = model.intercept,
                "calibration parameters"
            );
            println!("ML trained and wrote predictions");
            println!("Model version: {}", summary.model_version);
            println!(
                "Train rows: {} (of {} finished)",
                summary.train_rows, summary.train_stats.considered
            );
            println!(
                "In-sample: brier={:.4} log_loss={:.4} accuracy={:.3}",
                summary.metrics.brier, summary.metrics.log_loss, summary.metrics.accuracy
            );
            println!(
                "Prediction rows: {} for {} upcoming events",
                summary.pred_rows, summary.upcoming_events
            );
            println!("Ran at: {}", summary.ran_at.to_rfc3339());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("run failed: {err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

use std::process::ExitCode;

use h2h_calibrator::calibration::{
    CalibrationBin, Calibrator, LogisticCalibrator, calibration_bins,
};
use h2h_calibrator::cli::{self, EXIT_CONFIG, EXIT_FAILURE};
use h2h_calibrator::config::PipelineConfig;
use h2h_calibrator::pipeline;

const DEFAULT_BINS: usize = 10;

// Fits the model exactly as a pipeline run would, prints how well it tracks
// outcomes, and writes nothing back.
fn main() -> ExitCode {
    cli::init_process();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let bins = cli::flag_value(&args, "bins")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_BINS)
        .clamp(2, 50);

    let cfg = match PipelineConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    let store = match cli::open_store(cli::db_path_arg(&args)) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("startup failed: {err}");
            return err.exit_code();
        }
    };

    let mut model = LogisticCalibrator::default();
    let trained = match pipeline::train(&*store, &mut model, &cfg) {
        Ok(Ok(trained)) => trained,
        Ok(Err(reason)) => {
            println!("Nothing to report: {reason}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("report failed: {err:#}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let features = trained.training.features();
    let labels = trained.training.labels();
    let market = calibration_bins(&features, &labels, bins);
    let fitted: Vec<f64> = features
        .iter()
        .map(|x| model.predict_probability(*x))
        .collect();
    let calibrated = calibration_bins(&fitted, &labels, bins);

    let stats = trained.training.stats;
    println!("Model version: {}", cfg.model_version);
    println!(
        "Finished: {} kept={} void={} no_snapshot={} no_probability={}",
        stats.considered, stats.kept, stats.unusable_result, stats.no_snapshot, stats.no_probability
    );
    println!(
        "Fit: p = sigmoid({:.4} * p_novig + {:.4})",
        model.weight, model.intercept
    );
    println!(
        "In-sample: brier={:.4} log_loss={:.4} accuracy={:.3}",
        trained.metrics.brier, trained.metrics.log_loss, trained.metrics.accuracy
    );
    print_bins("No-vig market probability", &market);
    print_bins("Calibrated probability", &calibrated);

    ExitCode::SUCCESS
}

fn print_bins(title: &str, bins: &[CalibrationBin]) {
    println!();
    println!("{title}");
    println!("bucket          n    pred  actual");
    for bin in bins.iter().filter(|b| b.count > 0) {
        println!(
            "{:.2}-{:.2} {:>7}   {:.3}   {:.3}",
            bin.bucket_start, bin.bucket_end, bin.count, bin.avg_pred, bin.actual_rate
        );
    }
}

// Radar Ego-Motion Estimator - Main Entry Point

use radar_egomotion::config::Config;
use radar_egomotion::kalman::FilterTuning;
use radar_egomotion::output::{self, CsvReport, ReportHandler, RunSummary};
use radar_egomotion::runner::{self, SensorRun};
use std::path::{Path, PathBuf};
use clap::Parser;
use tracing::{info, error};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    info!("Starting radar ego-motion estimation");
    info!("Scene: {}", config.scene);

    let sensors = config.sensors()?;
    let scene_dir = PathBuf::from(&config.data_dir).join(&config.scene);

    // One independent filter per radar. Contexts share no state, so the
    // sensors run concurrently; each task is synchronous file + math work.
    let mut tasks = Vec::new();
    for sensor in sensors {
        let scene_dir = scene_dir.clone();
        let handle = tokio::task::spawn_blocking(move || {
            runner::run_sensor(&scene_dir, sensor, FilterTuning::default())
        });
        tasks.push((sensor, handle));
    }

    let mut runs: Vec<SensorRun> = Vec::new();
    for (sensor, handle) in tasks {
        match handle.await? {
            Ok(run) => runs.push(run),
            Err(e) => error!("{} run failed: {}", sensor, e),
        }
    }

    if runs.is_empty() {
        return Err("all sensor runs failed".into());
    }

    // Per-frame comparison CSVs
    if let Some(prefix) = &config.write_csv {
        for run in &runs {
            let path = format!("{}{}.csv", prefix, run.sensor);
            let mut report = CsvReport::create(Path::new(&path))?;
            for sample in &run.samples {
                report.handle_sample(sample)?;
            }
            report.finish()?;
            info!("Wrote {} rows to {}", run.samples.len(), path);
        }
    }

    // JSON run summary
    let summaries: Vec<RunSummary> = runs.iter().map(RunSummary::from_run).collect();
    if let Some(path) = &config.write_summary {
        output::write_summaries(Path::new(path), &summaries)?;
        info!("Wrote summary to {}", path);
    }

    // Report final statistics
    for summary in &summaries {
        info!(
            "{}: {} frames, vx rms {:.3} m/s, yaw rate rms {:.3} deg/s",
            summary.sensor, summary.frames, summary.vx_rms_error, summary.yawrate_rms_error_deg
        );
    }

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;

    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_span_events(if verbose {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        });

    if verbose {
        subscriber
            .with_max_level(tracing::Level::DEBUG)
            .init();
        info!("Verbose logging enabled (DEBUG level)");
    } else {
        subscriber
            .with_max_level(tracing::Level::INFO)
            .init();
    }
}

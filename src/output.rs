// Report output: per-frame comparison rows and run summaries
//
// Downstream plotting consumes these files; nothing renders in-process.

use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::runner::{MotionSample, SensorRun};

/// Sink for per-frame estimate samples
pub trait ReportHandler {
    /// Handle one sample of a run
    fn handle_sample(&mut self, sample: &MotionSample) -> std::io::Result<()>;

    /// Flush any buffered output
    fn finish(&mut self) -> std::io::Result<()>;
}

/// CSV comparison report, one row per frame
pub struct CsvReport {
    writer: BufWriter<std::fs::File>,
}

impl CsvReport {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(
            writer,
            "timestamp,vx_est,yawrate_est_deg,vx_odom,yawrate_odom_deg"
        )?;
        Ok(CsvReport { writer })
    }

    /// Row formatting, split out so tests can check it without a file
    fn format_row(sample: &MotionSample) -> String {
        format!(
            "{:.6},{:.4},{:.4},{:.4},{:.4}",
            sample.timestamp,
            sample.vx_est,
            sample.yawrate_est_deg,
            sample.vx_odom,
            sample.yawrate_odom_deg
        )
    }
}

impl ReportHandler for CsvReport {
    fn handle_sample(&mut self, sample: &MotionSample) -> std::io::Result<()> {
        writeln!(self.writer, "{}", Self::format_row(sample))
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Run statistics and aggregate error for one sensor, serialized to JSON
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub sensor: String,
    pub frames: usize,
    pub empty_frames: usize,
    pub discarded_corrections: usize,
    pub skipped_frames: usize,
    /// RMS of (vx_est - vx_odom) over the run (m/s)
    pub vx_rms_error: f64,
    /// RMS of the yaw-rate residual vs odometry (deg/s)
    pub yawrate_rms_error_deg: f64,
}

impl RunSummary {
    pub fn from_run(run: &SensorRun) -> Self {
        let (vx_rms_error, yawrate_rms_error_deg) = rms_errors(&run.samples);
        RunSummary {
            sensor: run.sensor.to_string(),
            frames: run.stats.frames,
            empty_frames: run.stats.empty_frames,
            discarded_corrections: run.stats.discarded_corrections,
            skipped_frames: run.stats.skipped_frames,
            vx_rms_error,
            yawrate_rms_error_deg,
        }
    }
}

/// RMS residuals of the estimate against the odometry reference
fn rms_errors(samples: &[MotionSample]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let (sum_vx, sum_yaw) = samples.iter().fold((0.0f64, 0.0f64), |(vx, yaw), s| {
        let dv = s.vx_est - s.vx_odom;
        let dy = s.yawrate_est_deg - s.yawrate_odom_deg;
        (vx + dv * dv, yaw + dy * dy)
    });
    ((sum_vx / n).sqrt(), (sum_yaw / n).sqrt())
}

/// Write all sensor summaries as one pretty-printed JSON document.
pub fn write_summaries(path: &Path, summaries: &[RunSummary]) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, summaries)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

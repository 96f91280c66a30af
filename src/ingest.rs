// Scene data ingestion: radar frame CSVs and the odometry table
//
// Dataset layout per scene and sensor:
//   <data_dir>/<scene>/<sensor>/timestamp_and_odom.csv
//   <data_dir>/<scene>/<sensor>/1.csv ... <N>.csv   (one file per frame)
//
// The odometry table carries reference motion and ground-truth pose for
// comparison output; none of it ever reaches the filter.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::kalman::Detection;

/// Errors raised while loading scene data
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("odometry table {path} has no rows")]
    EmptyOdometry { path: PathBuf },
}

fn io_err(path: &Path, source: std::io::Error) -> IngestError {
    IngestError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn csv_err(path: &Path, source: csv::Error) -> IngestError {
    IngestError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// One row of `timestamp_and_odom.csv`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OdometryRecord {
    /// Radar frame timestamp (s)
    pub timestamp_rad: f64,
    /// Odometry sample timestamp (s)
    pub timestamp_odom: f64,
    /// Reference longitudinal speed from wheel odometry (m/s)
    pub vx_odom: f64,
    /// Reference yaw rate (rad/s)
    pub yawrate_odom: f64,
    /// Ground-truth pose x (m)
    pub x_loc: f64,
    /// Ground-truth pose y (m)
    pub y_loc: f64,
    /// Ground-truth pose yaw (rad)
    pub yaw_loc: f64,
}

/// One row of a radar frame CSV: a polar return in the sensor frame
#[derive(Debug, Clone, Copy, Deserialize)]
struct ReturnRecord {
    /// Radial distance (m)
    range: f64,
    /// Azimuth angle (rad, CCW from boresight)
    azimuth: f64,
    /// Raw range-rate (m/s, positive for a receding target)
    range_rate: f64,
    /// Return amplitude (dB)
    amplitude: f64,
}

impl ReturnRecord {
    fn is_finite(&self) -> bool {
        self.range.is_finite()
            && self.azimuth.is_finite()
            && self.range_rate.is_finite()
            && self.amplitude.is_finite()
    }
}

/// Load the odometry table for one sensor.
pub fn load_odometry(path: &Path) -> Result<Vec<OdometryRecord>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_err(path, e))?;

    let mut records = Vec::new();
    for row in reader.deserialize::<OdometryRecord>() {
        records.push(row.map_err(|e| csv_err(path, e))?);
    }
    if records.is_empty() {
        return Err(IngestError::EmptyOdometry {
            path: path.to_path_buf(),
        });
    }
    Ok(records)
}

/// Load one radar frame and convert its returns to filter detections.
///
/// The raw range-rate is positive for receding targets; the filter's
/// Doppler convention is positive toward the target, so the sign flips
/// here, at the ingestion boundary. Rows with non-finite values are
/// dropped and counted.
pub fn load_frame(path: &Path) -> Result<Vec<Detection>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_err(path, e))?;

    let mut detections = Vec::new();
    let mut dropped = 0usize;
    for row in reader.deserialize::<ReturnRecord>() {
        let record = row.map_err(|e| csv_err(path, e))?;
        if !record.is_finite() {
            dropped += 1;
            continue;
        }
        detections.push(Detection {
            azimuth: record.azimuth,
            doppler: -record.range_rate,
        });
    }
    if dropped > 0 {
        warn!(path = %path.display(), dropped, "dropped non-finite radar returns");
    }
    Ok(detections)
}

/// Number of numbered frame files (`1.csv`, `2.csv`, ...) in a sensor
/// directory. The odometry table is not numbered and does not count.
pub fn count_frames(dir: &Path) -> Result<usize, IngestError> {
    let mut count = 0;
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(stem) = name.strip_suffix(".csv") {
            if stem.parse::<usize>().is_ok() {
                count += 1;
            }
        }
    }
    Ok(count)
}

/// Path of frame `frameid` (1-based) inside a sensor directory
pub fn frame_path(dir: &Path, frameid: usize) -> PathBuf {
    dir.join(format!("{frameid}.csv"))
}

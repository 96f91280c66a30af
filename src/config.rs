use clap::Parser;

use crate::mounts::{SensorId, UnknownSensor};

/// Radar Ego-Motion Estimator Configuration
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Root directory of the recorded dataset.
    #[arg(long, value_name = "DIR", default_value = "data")]
    pub data_dir: String,

    /// Scene (recording) to process.
    #[arg(long, default_value = "105")]
    pub scene: String,

    /// Sensor to run (radar1..radar4); repeat for several. Default: all four.
    #[arg(long, value_name = "SENSOR")]
    pub sensor: Vec<String>,

    /// Write per-frame comparison rows to <PREFIX><sensor>.csv.
    #[arg(long, value_name = "PREFIX")]
    pub write_csv: Option<String>,

    /// Write a JSON run summary to this file.
    #[arg(long, value_name = "FILE")]
    pub write_summary: Option<String>,

    /// Verbose logging (DEBUG level)
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Sensors requested on the command line, or all four when omitted.
    pub fn sensors(&self) -> Result<Vec<SensorId>, UnknownSensor> {
        if self.sensor.is_empty() {
            return Ok(SensorId::ALL.to_vec());
        }
        self.sensor.iter().map(|name| name.parse()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_sensors(sensors: &[&str]) -> Config {
        Config {
            data_dir: "data".to_string(),
            scene: "105".to_string(),
            sensor: sensors.iter().map(|s| s.to_string()).collect(),
            write_csv: None,
            write_summary: None,
            verbose: false,
        }
    }

    #[test]
    fn test_default_is_all_sensors() {
        let sensors = config_with_sensors(&[]).sensors().unwrap();
        assert_eq!(sensors, SensorId::ALL.to_vec());
    }

    #[test]
    fn test_explicit_sensors() {
        let sensors = config_with_sensors(&["radar3", "radar1"]).sensors().unwrap();
        assert_eq!(sensors, vec![SensorId::Radar3, SensorId::Radar1]);
    }

    #[test]
    fn test_unknown_sensor_rejected() {
        assert!(config_with_sensors(&["radar9"]).sensors().is_err());
    }
}

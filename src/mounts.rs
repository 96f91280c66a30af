// Radar sensor identities and mount geometry
//
// Each radar is rigidly mounted at a fixed offset and boresight rotation
// relative to the vehicle reference frame (+x forward, +y left, yaw CCW).
// The table below is calibration data for the recorded dataset and is
// immutable for the lifetime of a run.

use std::f64::consts::{FRAC_PI_4, PI};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Mounting geometry of one radar relative to the vehicle reference frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountParameters {
    /// Longitudinal offset of the sensor from the reference point (m)
    pub l_x: f64,
    /// Lateral offset of the sensor from the reference point (m)
    pub l_y: f64,
    /// Boresight yaw relative to the vehicle x axis (rad)
    pub psi_mount: f64,
}

impl MountParameters {
    pub const fn new(l_x: f64, l_y: f64, psi_mount: f64) -> Self {
        MountParameters { l_x, l_y, psi_mount }
    }

    /// Non-finite mount values poison every observation row built from
    /// them, so they are rejected before the filter is constructed.
    pub fn is_valid(&self) -> bool {
        self.l_x.is_finite() && self.l_y.is_finite() && self.psi_mount.is_finite()
    }
}

/// Error for sensor names that do not match any mounted radar
#[derive(Debug, Error)]
#[error("unknown radar sensor '{0}', expected one of radar1..radar4")]
pub struct UnknownSensor(pub String);

/// The four corner radars of the test vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorId {
    /// Front-left corner radar
    Radar1,
    /// Front-right corner radar
    Radar2,
    /// Rear-left corner radar
    Radar3,
    /// Rear-right corner radar
    Radar4,
}

impl SensorId {
    pub const ALL: [SensorId; 4] = [
        SensorId::Radar1,
        SensorId::Radar2,
        SensorId::Radar3,
        SensorId::Radar4,
    ];

    /// Directory name of this sensor inside a scene
    pub fn dir_name(&self) -> &'static str {
        match self {
            SensorId::Radar1 => "radar1",
            SensorId::Radar2 => "radar2",
            SensorId::Radar3 => "radar3",
            SensorId::Radar4 => "radar4",
        }
    }

    /// Fixed mount calibration for this sensor.
    ///
    /// Front pair sits ahead of the reference point yawed 45 degrees
    /// outward, rear pair behind it yawed 135 degrees outward.
    pub fn mount(&self) -> MountParameters {
        match self {
            SensorId::Radar1 => MountParameters::new(3.41, 0.80, FRAC_PI_4),
            SensorId::Radar2 => MountParameters::new(3.41, -0.80, -FRAC_PI_4),
            SensorId::Radar3 => MountParameters::new(-0.50, 0.70, 3.0 * FRAC_PI_4),
            SensorId::Radar4 => MountParameters::new(-0.50, -0.70, -3.0 * FRAC_PI_4),
        }
    }
}

impl FromStr for SensorId {
    type Err = UnknownSensor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "radar1" => Ok(SensorId::Radar1),
            "radar2" => Ok(SensorId::Radar2),
            "radar3" => Ok(SensorId::Radar3),
            "radar4" => Ok(SensorId::Radar4),
            _ => Err(UnknownSensor(s.to_string())),
        }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

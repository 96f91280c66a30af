// Shared constants: unit conversions and default filter tuning

use std::f64::consts::PI;

/// Radians to degrees. Yaw rate is reported in deg/s outside the filter;
/// the filter itself works in rad/s only.
pub const RAD2DEG: f64 = 180.0 / PI;

/// Degrees to radians
pub const DEG2RAD: f64 = PI / 180.0;

/// Default process noise density for longitudinal speed, (m/s)^2 per second
/// of elapsed time. Sized for piecewise-constant motion between radar
/// frames spaced 50-100 ms apart.
pub const PROCESS_NOISE_SPEED: f64 = 0.5;

/// Default process noise density for yaw rate, (rad/s)^2 per second
pub const PROCESS_NOISE_YAW_RATE: f64 = 0.1;

/// Default per-detection Doppler measurement variance, (m/s)^2.
/// 0.5 m/s standard deviation, typical automotive short-range radar
/// Doppler resolution.
pub const DOPPLER_VARIANCE: f64 = 0.25;

/// Prior variance on longitudinal speed before any frame, (m/s)^2
pub const INITIAL_SPEED_VARIANCE: f64 = 100.0;

/// Prior variance on yaw rate before any frame, (rad/s)^2
pub const INITIAL_YAW_RATE_VARIANCE: f64 = 1.0;

/// Minimum accepted frame spacing in seconds. A smaller (or negative) dt
/// between consecutive frames violates the timestamp contract.
pub const MIN_DT: f64 = 1e-3;

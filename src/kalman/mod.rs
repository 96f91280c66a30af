// Kalman filter module
// Provides ego-motion estimation from single-radar Doppler measurements

pub mod filter;
pub mod measurement;

pub use filter::{EgoCovariance, EgoMotionFilter, EgoState, FilterContext, FilterTuning, StepError, StepKind};
pub use measurement::{observation_row, predicted_doppler, stack_observations, Detection};

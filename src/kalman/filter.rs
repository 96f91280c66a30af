// Ego-motion Kalman filter
//
// Fuses one radar's Doppler returns, frame by frame, into an estimate of
// the host vehicle's forward speed and yaw rate. The process model is
// identity (speed and yaw rate assumed piecewise-constant between frames),
// so prediction only inflates covariance by the elapsed time; all
// information enters through the batched Doppler correction.

use nalgebra::{DMatrix, DVector, Matrix2, Vector2};
use thiserror::Error;
use tracing::warn;

use crate::constants::{
    DOPPLER_VARIANCE, INITIAL_SPEED_VARIANCE, INITIAL_YAW_RATE_VARIANCE, MIN_DT,
    PROCESS_NOISE_SPEED, PROCESS_NOISE_YAW_RATE,
};
use crate::kalman::measurement::{stack_observations, Detection};
use crate::mounts::MountParameters;

/// Ego-motion state: longitudinal speed (m/s) and yaw rate (rad/s)
pub type EgoState = Vector2<f64>;

/// 2x2 covariance over (v_x, omega)
pub type EgoCovariance = Matrix2<f64>;

/// Ratio below which the innovation covariance counts as near-singular
/// (smallest over largest Cholesky pivot)
const MIN_PIVOT_RATIO: f64 = 1e-9;

/// Noise and prior configuration, one per filter instance.
///
/// Kept explicit so several independent filters (one per sensor) can never
/// share or race on tunables through process-wide globals.
#[derive(Debug, Clone, Copy)]
pub struct FilterTuning {
    /// Process noise density for v_x, (m/s)^2 per second of elapsed time
    pub process_noise_speed: f64,
    /// Process noise density for omega, (rad/s)^2 per second
    pub process_noise_yaw_rate: f64,
    /// Per-detection Doppler measurement variance, (m/s)^2
    pub doppler_variance: f64,
    /// Prior variance on v_x before the first frame, (m/s)^2
    pub initial_speed_variance: f64,
    /// Prior variance on omega before the first frame, (rad/s)^2
    pub initial_yaw_rate_variance: f64,
    /// Frames spaced closer than this (seconds) violate the timestamp
    /// contract
    pub min_dt: f64,
}

impl Default for FilterTuning {
    fn default() -> Self {
        FilterTuning {
            process_noise_speed: PROCESS_NOISE_SPEED,
            process_noise_yaw_rate: PROCESS_NOISE_YAW_RATE,
            doppler_variance: DOPPLER_VARIANCE,
            initial_speed_variance: INITIAL_SPEED_VARIANCE,
            initial_yaw_rate_variance: INITIAL_YAW_RATE_VARIANCE,
            min_dt: MIN_DT,
        }
    }
}

/// Recursive state threaded through consecutive `step` calls.
///
/// The "no prior yet" case is a structural flag, not a numeric sentinel:
/// until the first frame has been absorbed, `last_timestamp` is
/// meaningless and prediction is skipped.
#[derive(Debug, Clone)]
pub struct FilterContext {
    /// False only before the first frame is processed
    pub initialized: bool,
    /// Current estimate of (v_x, omega)
    pub state: EgoState,
    /// Current estimation uncertainty; always symmetric, finite, PSD
    pub covariance: EgoCovariance,
    /// Timestamp of the last absorbed frame (s); undefined until
    /// `initialized`
    pub last_timestamp: f64,
}

impl FilterContext {
    /// Fresh context holding the vague default prior: zero motion with
    /// large diagonal covariance.
    pub fn new(tuning: &FilterTuning) -> Self {
        FilterContext {
            initialized: false,
            state: EgoState::zeros(),
            covariance: EgoCovariance::from_diagonal(&Vector2::new(
                tuning.initial_speed_variance,
                tuning.initial_yaw_rate_variance,
            )),
            last_timestamp: 0.0,
        }
    }
}

/// What a step did, for accounting at the run level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// First frame: correction against the default prior, no prediction
    Initialized,
    /// Empty frame: prediction only, covariance grew without correction
    Predicted,
    /// Normal frame: prediction followed by a batched correction
    Corrected,
    /// Correction attempted but discarded (near-singular innovation
    /// covariance or non-finite posterior); the post-prediction estimate
    /// was kept
    CorrectionDiscarded,
}

/// Errors that invalidate a single frame. The caller keeps the prior
/// context and decides whether to skip the frame or abort the run;
/// skipping is the safer default.
#[derive(Debug, Error)]
pub enum StepError {
    /// Timestamps must be strictly increasing once a prior exists
    #[error("non-monotonic radar timestamp: dt = {dt:.6} s")]
    NonMonotonicTimestamp { dt: f64 },
    /// Mount parameters contained non-finite values
    #[error("mount parameters contain non-finite values")]
    InvalidMount,
}

/// Single-sensor ego-motion Kalman filter.
///
/// Radar-only by construction: odometry never enters this type, so the
/// estimate stays an independent cross-check of the wheel-based motion.
/// One instance per sensor; instances share nothing and may run in
/// parallel.
#[derive(Debug, Clone)]
pub struct EgoMotionFilter {
    mount: MountParameters,
    tuning: FilterTuning,
}

impl EgoMotionFilter {
    /// Create a filter for a sensor with the given mount geometry.
    ///
    /// Rejects non-finite mount parameters up front; every observation
    /// row would inherit them otherwise.
    pub fn new(mount: MountParameters, tuning: FilterTuning) -> Result<Self, StepError> {
        if !mount.is_valid() {
            return Err(StepError::InvalidMount);
        }
        Ok(EgoMotionFilter { mount, tuning })
    }

    pub fn tuning(&self) -> &FilterTuning {
        &self.tuning
    }

    /// Fresh context carrying this filter's default prior.
    pub fn context(&self) -> FilterContext {
        FilterContext::new(&self.tuning)
    }

    /// Absorb one radar frame.
    ///
    /// Prediction inflates covariance in proportion to the elapsed time
    /// since the last frame (skipped on the very first call, which
    /// corrects the default prior instead). All detections of the frame
    /// are then applied as one batched linear correction; an empty frame
    /// is a prediction-only step. The returned context is always finite,
    /// symmetric and PSD.
    ///
    /// # Arguments
    /// * `ctx` - prior context, consumed by reference
    /// * `detections` - zero or more returns of this frame, any order
    /// * `timestamp` - sensor-reported frame time (s)
    pub fn step(
        &self,
        ctx: &FilterContext,
        detections: &[Detection],
        timestamp: f64,
    ) -> Result<(FilterContext, StepKind), StepError> {
        let mut state = ctx.state;
        let mut covariance = ctx.covariance;
        let had_prior = ctx.initialized;

        if had_prior {
            let dt = timestamp - ctx.last_timestamp;
            if dt < self.tuning.min_dt {
                return Err(StepError::NonMonotonicTimestamp { dt });
            }
            covariance += Matrix2::from_diagonal(&Vector2::new(
                self.tuning.process_noise_speed * dt,
                self.tuning.process_noise_yaw_rate * dt,
            ));
        }

        let kind = match stack_observations(detections, &self.mount) {
            None => {
                if had_prior {
                    StepKind::Predicted
                } else {
                    StepKind::Initialized
                }
            }
            Some((h, z)) => match self.correct(&state, &covariance, &h, &z) {
                Some((corrected_state, corrected_covariance)) => {
                    state = corrected_state;
                    covariance = corrected_covariance;
                    if had_prior {
                        StepKind::Corrected
                    } else {
                        StepKind::Initialized
                    }
                }
                None => {
                    warn!(
                        detections = detections.len(),
                        "discarding ill-conditioned correction, keeping predicted state"
                    );
                    StepKind::CorrectionDiscarded
                }
            },
        };

        Ok((
            FilterContext {
                initialized: true,
                state,
                covariance,
                last_timestamp: timestamp,
            },
            kind,
        ))
    }

    /// Batched linear Kalman correction over a frame's stacked
    /// observations.
    ///
    /// Returns `None` when the innovation covariance is not safely
    /// invertible or the candidate posterior contains non-finite values;
    /// the caller then keeps the post-prediction estimate.
    fn correct(
        &self,
        state: &EgoState,
        covariance: &EgoCovariance,
        h: &DMatrix<f64>,
        z: &DVector<f64>,
    ) -> Option<(EgoState, EgoCovariance)> {
        let x = DVector::from_column_slice(state.as_slice());
        let p = DMatrix::from_column_slice(2, 2, covariance.as_slice());
        let r = DMatrix::from_diagonal(&DVector::from_element(
            z.len(),
            self.tuning.doppler_variance,
        ));

        let ht = h.transpose();
        let s = h * &p * &ht + &r;
        // Cholesky doubles as the conditioning gate: a non-SPD innovation
        // covariance fails here and the correction is discarded.
        let chol = s.cholesky()?;
        let l = chol.l();
        let mut pivot_min = f64::INFINITY;
        let mut pivot_max = 0.0f64;
        for i in 0..l.nrows() {
            pivot_min = pivot_min.min(l[(i, i)]);
            pivot_max = pivot_max.max(l[(i, i)]);
        }
        if !(pivot_min > pivot_max * MIN_PIVOT_RATIO) {
            return None;
        }

        let innovation = z - h * &x;
        let s_inv = chol.inverse();
        let gain = &p * &ht * &s_inv;
        let x_new = &x + &gain * &innovation;

        // Joseph form keeps the posterior symmetric PSD under roundoff;
        // an explicit symmetrization removes what little asymmetry is left
        let identity = DMatrix::<f64>::identity(2, 2);
        let ikh = &identity - &gain * h;
        let p_joseph = &ikh * &p * ikh.transpose() + &gain * &r * gain.transpose();
        let p_new = (&p_joseph + p_joseph.transpose()) * 0.5;

        if !x_new.iter().all(|v| v.is_finite()) || !p_new.iter().all(|v| v.is_finite()) {
            return None;
        }

        Some((
            EgoState::new(x_new[0], x_new[1]),
            EgoCovariance::new(p_new[(0, 0)], p_new[(0, 1)], p_new[(1, 0)], p_new[(1, 1)]),
        ))
    }
}

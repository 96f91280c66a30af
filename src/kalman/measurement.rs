// Doppler measurement model for radar ego-motion
//
// A rigid body moving with (v_x, omega) carries a sensor mounted at
// (l_x, l_y) with boresight yaw psi. The sensor's own velocity in the
// vehicle frame is (v_x - omega * l_y, omega * l_x); projecting that onto
// the line of sight of a detection at azimuth theta (sensor frame) gives
// the Doppler a stationary target produces. For fixed theta the relation
// is linear in (v_x, omega), so each detection contributes one row of a
// linear observation matrix.

use nalgebra::{DMatrix, DVector, RowVector2, Vector2};

use crate::mounts::MountParameters;

/// One radar return: azimuth in the sensor frame plus signed Doppler.
///
/// Sign convention: `doppler` is positive when the ego vehicle moves
/// toward the detected point. The raw sensor range-rate (positive for a
/// receding target) is negated at ingestion to match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Azimuth angle in the sensor frame (rad, CCW from boresight)
    pub azimuth: f64,
    /// Radial velocity along the line of sight (m/s)
    pub doppler: f64,
}

/// Observation-matrix row for a single detection.
///
/// With `a = azimuth + psi_mount` (line-of-sight angle in the vehicle
/// frame), the row is `[cos(a), l_x * sin(a) - l_y * cos(a)]` so that
/// `row . [v_x, omega]` is the Doppler of a stationary target.
pub fn observation_row(mount: &MountParameters, azimuth: f64) -> RowVector2<f64> {
    let a = azimuth + mount.psi_mount;
    RowVector2::new(a.cos(), mount.l_x * a.sin() - mount.l_y * a.cos())
}

/// Doppler a stationary target at `azimuth` would produce for `state`
pub fn predicted_doppler(
    state: &Vector2<f64>,
    mount: &MountParameters,
    azimuth: f64,
) -> f64 {
    let row = observation_row(mount, azimuth);
    row[0] * state[0] + row[1] * state[1]
}

/// Stack a frame's detections into one observation matrix and vector.
///
/// All detections correct the state in a single batch, so the result is
/// independent of detection order. Returns `None` for an empty frame,
/// which degenerates to a prediction-only step.
pub fn stack_observations(
    detections: &[Detection],
    mount: &MountParameters,
) -> Option<(DMatrix<f64>, DVector<f64>)> {
    if detections.is_empty() {
        return None;
    }
    let n = detections.len();
    let mut h = DMatrix::zeros(n, 2);
    let mut z = DVector::zeros(n);
    for (i, detection) in detections.iter().enumerate() {
        let row = observation_row(mount, detection.azimuth);
        h[(i, 0)] = row[0];
        h[(i, 1)] = row[1];
        z[i] = detection.doppler;
    }
    Some((h, z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_6, PI};

    /// Doppler from first principles: sensor velocity in the vehicle
    /// frame, dotted with the line-of-sight unit vector.
    fn rigid_body_doppler(
        state: &Vector2<f64>,
        mount: &MountParameters,
        azimuth: f64,
    ) -> f64 {
        let (v_x, omega) = (state[0], state[1]);
        let sensor_vx = v_x - omega * mount.l_y;
        let sensor_vy = omega * mount.l_x;
        let los = azimuth + mount.psi_mount;
        sensor_vx * los.cos() + sensor_vy * los.sin()
    }

    #[test]
    fn test_boresight_zero_mount_reads_speed() {
        let mount = MountParameters::new(0.0, 0.0, 0.0);
        let state = Vector2::new(7.5, 0.3);
        // Detection dead ahead sees pure v_x regardless of yaw rate
        assert_relative_eq!(
            predicted_doppler(&state, &mount, 0.0),
            7.5,
            epsilon = 1e-12
        );
        // Detection dead astern sees -v_x
        assert_relative_eq!(
            predicted_doppler(&state, &mount, PI),
            -7.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_offset_geometry_fixtures() {
        // Three distinct (l_x, l_y, theta) combinations, each checked
        // against the hand-derived rigid-body projection.
        let cases = [
            (MountParameters::new(2.0, 0.5, 0.0), 0.0, Vector2::new(10.0, 0.3)),
            (MountParameters::new(1.5, -0.4, FRAC_PI_2), 0.0, Vector2::new(6.0, 0.4)),
            (
                MountParameters::new(-0.5, -0.7, 3.0 * PI / 4.0),
                FRAC_PI_6,
                Vector2::new(8.0, -0.25),
            ),
        ];
        for (mount, azimuth, state) in cases {
            assert_relative_eq!(
                predicted_doppler(&state, &mount, azimuth),
                rigid_body_doppler(&state, &mount, azimuth),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_sideways_sensor_sees_lever_arm_only() {
        // A sensor looking along +y sees omega * l_x and no v_x at all
        let mount = MountParameters::new(1.5, 0.0, FRAC_PI_2);
        let state = Vector2::new(20.0, 0.4);
        assert_relative_eq!(
            predicted_doppler(&state, &mount, 0.0),
            0.4 * 1.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_stack_shapes() {
        let mount = MountParameters::new(1.0, 0.2, 0.1);
        let detections = vec![
            Detection { azimuth: 0.0, doppler: 5.0 },
            Detection { azimuth: 0.5, doppler: 4.2 },
            Detection { azimuth: -0.5, doppler: 4.1 },
        ];
        let (h, z) = stack_observations(&detections, &mount).unwrap();
        assert_eq!(h.nrows(), 3);
        assert_eq!(h.ncols(), 2);
        assert_eq!(z.len(), 3);
        for (i, detection) in detections.iter().enumerate() {
            let row = observation_row(&mount, detection.azimuth);
            assert_eq!(h[(i, 0)], row[0]);
            assert_eq!(h[(i, 1)], row[1]);
            assert_eq!(z[i], detection.doppler);
        }
    }

    #[test]
    fn test_stack_empty_frame() {
        let mount = MountParameters::new(0.0, 0.0, 0.0);
        assert!(stack_observations(&[], &mount).is_none());
    }
}

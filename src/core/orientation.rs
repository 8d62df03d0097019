//! TL-007: Quaternion → roll/pitch/yaw conversion.
//!
//! Roll about x, pitch about y, yaw about z, from a unit quaternion
//! `(qx, qy, qz, qw)`. Pitch saturates at ±π/2 when the sine argument
//! leaves [-1, 1] (gimbal lock).

use std::f64::consts::FRAC_PI_2;

/// Euler angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Euler {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Euler {
    pub const fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }
}

/// Orientation written for a Place without an explicit orientation.
pub const DEFAULT_PLACE_ORIENTATION: Euler = Euler::new(0.0, 0.0, 1.0);

/// Plain trigonometric conversion, no default-orientation handling.
pub fn quaternion_to_euler(q: [f64; 4]) -> Euler {
    let [qx, qy, qz, qw] = q;

    let sinr_cosp = 2.0 * (qw * qx + qy * qz);
    let cosr_cosp = 1.0 - 2.0 * (qx * qx + qy * qy);
    let roll = sinr_cosp.atan2(cosr_cosp);

    let sinp = 2.0 * (qw * qy - qz * qx);
    let pitch = if sinp.abs() >= 1.0 {
        FRAC_PI_2.copysign(sinp)
    } else {
        sinp.asin()
    };

    let siny_cosp = 2.0 * (qw * qz + qx * qy);
    let cosy_cosp = 1.0 - 2.0 * (qy * qy + qz * qz);
    let yaw = siny_cosp.atan2(cosy_cosp);

    Euler { roll, pitch, yaw }
}

/// Default-orientation marker: an all-zero result is reported as yaw 1.0.
pub fn apply_default_yaw(e: Euler) -> Euler {
    if e.roll == 0.0 && e.pitch == 0.0 && e.yaw == 0.0 {
        Euler { yaw: 1.0, ..e }
    } else {
        e
    }
}

/// Conversion used for stored container orientations.
pub fn orientation_from_quaternion(q: [f64; 4]) -> Euler {
    apply_default_yaw(quaternion_to_euler(q))
}

/// Round to 3 decimals on the exact binary value (`1.0005` is stored just
/// below the tie and rounds down). Negative zero becomes zero.
pub fn round3(v: f64) -> f64 {
    format!("{:.3}", v).parse::<f64>().unwrap_or(v) + 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_1_SQRT_2, PI};

    const EPS: f64 = 1e-9;

    fn close(a: Euler, b: Euler) -> bool {
        (a.roll - b.roll).abs() < EPS && (a.pitch - b.pitch).abs() < EPS && (a.yaw - b.yaw).abs() < EPS
    }

    #[test]
    fn test_tl007_vectors() {
        let h = FRAC_1_SQRT_2;
        let table: [([f64; 4], Euler); 6] = [
            ([0.0, 0.0, 0.0, 1.0], Euler::new(0.0, 0.0, 0.0)),
            ([h, 0.0, 0.0, h], Euler::new(FRAC_PI_2, 0.0, 0.0)),
            ([0.0, 0.0, h, h], Euler::new(0.0, 0.0, FRAC_PI_2)),
            ([0.0, 0.0, 1.0, 0.0], Euler::new(0.0, 0.0, PI)),
            ([1.0, 0.0, 0.0, 0.0], Euler::new(PI, 0.0, 0.0)),
            ([0.0, 0.0, -h, h], Euler::new(0.0, 0.0, -FRAC_PI_2)),
        ];
        for (q, expected) in table {
            let got = quaternion_to_euler(q);
            assert!(close(got, expected), "{:?} → {:?}, expected {:?}", q, got, expected);
        }
    }

    #[test]
    fn test_tl007_pitch_clamps_at_gimbal_lock() {
        let h = FRAC_1_SQRT_2;
        assert!((quaternion_to_euler([0.0, h, 0.0, h]).pitch - FRAC_PI_2).abs() < 1e-6);
        // Non-unit quaternion pushes sinp past 1
        assert_eq!(quaternion_to_euler([0.0, 0.9, 0.0, 0.9]).pitch, FRAC_PI_2);
        assert_eq!(quaternion_to_euler([0.0, -0.9, 0.0, 0.9]).pitch, -FRAC_PI_2);
    }

    #[test]
    fn test_tl007_default_yaw_only_when_all_zero() {
        assert_eq!(
            orientation_from_quaternion([0.0, 0.0, 0.0, 1.0]),
            Euler::new(0.0, 0.0, 1.0)
        );
        let h = FRAC_1_SQRT_2;
        let e = orientation_from_quaternion([h, 0.0, 0.0, h]);
        assert!((e.roll - FRAC_PI_2).abs() < EPS);
        assert_eq!(e.yaw, 0.0);
    }

    #[test]
    fn test_tl007_round3() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(FRAC_PI_2), 1.571);
        assert_eq!(round3(-0.0001), 0.0);
        assert!(round3(-0.0001).is_sign_positive());
        assert_eq!(round3(-2.5), -2.5);
    }

    #[test]
    fn test_tl007_round3_single_rounding() {
        assert_eq!(round3(1.0005), 1.0);
        assert_eq!(round3(-1.0005), -1.0);
        assert_eq!(round3(2.0015), 2.002);
        assert_eq!(round3(1.5705), 1.571);
    }
}

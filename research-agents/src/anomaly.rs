// Volume anomaly
// z-score of the latest volume against the most recent window

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnomaly {
    pub z_score: f64,
    pub anomalous: bool,
}

impl VolumeAnomaly {
    pub const NONE: VolumeAnomaly = VolumeAnomaly {
        z_score: 0.0,
        anomalous: false,
    };
}

/// Mean and sample standard deviation over the last `window` volumes.
///
/// z is 0 when the deviation is zero or undefined (fewer than two samples).
pub fn volume_anomaly(volumes: &[f64], window: usize, z_threshold: f64) -> VolumeAnomaly {
    let start = volumes.len().saturating_sub(window);
    let recent = &volumes[start..];
    let Some(&last) = recent.last() else {
        return VolumeAnomaly::NONE;
    };

    let mean = recent.iter().copied().mean();
    let std_dev = recent.iter().copied().std_dev();

    let z_score = if std_dev.is_finite() && std_dev > 0.0 {
        (last - mean) / std_dev
    } else {
        0.0
    };

    VolumeAnomaly {
        z_score,
        anomalous: z_score.abs() > z_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spike_is_anomalous() {
        let mut volumes = vec![10.0; 19];
        volumes.push(100.0);
        let result = volume_anomaly(&volumes, 20, 2.0);
        // mean 14.5, sample std sqrt(405)
        assert!((result.z_score - 85.5 / 405f64.sqrt()).abs() < 1e-9);
        assert!(result.anomalous);
    }

    #[test]
    fn test_constant_volume_has_zero_z() {
        let result = volume_anomaly(&[500.0; 30], 20, 2.0);
        assert_eq!(result, VolumeAnomaly::NONE);
    }

    #[test]
    fn test_short_series() {
        let result = volume_anomaly(&[1.0, 2.0, 3.0, 4.0, 5.0], 20, 2.0);
        assert!((result.z_score - 2.0 / 2.5f64.sqrt()).abs() < 1e-9);
        assert!(!result.anomalous);

        assert_eq!(volume_anomaly(&[42.0], 20, 2.0), VolumeAnomaly::NONE);
        assert_eq!(volume_anomaly(&[], 20, 2.0), VolumeAnomaly::NONE);
    }

    #[test]
    fn test_only_latest_window_counts() {
        let mut volumes = vec![1_000_000.0; 5];
        volumes.extend([1.0, 2.0, 3.0, 4.0, 5.0]);
        let windowed = volume_anomaly(&volumes, 5, 2.0);
        let plain = volume_anomaly(&[1.0, 2.0, 3.0, 4.0, 5.0], 5, 2.0);
        assert_eq!(windowed, plain);
    }

    #[test]
    fn test_negative_deviation_uses_absolute_value() {
        let mut volumes = vec![100.0; 19];
        volumes.push(0.0);
        let result = volume_anomaly(&volumes, 20, 2.0);
        assert!(result.z_score < -2.0);
        assert!(result.anomalous);
    }
}

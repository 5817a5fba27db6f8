// Indicator Library
// Pure functions over an ordered numeric series. Outputs are index-aligned with
// the input; when the input is too short (or a period is zero) the result is
// empty rather than partial.

/// Exponential moving average, alpha = 2 / (period + 1), seeded with the first value
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0];
    out.push(prev);
    for &x in &values[1..] {
        prev = alpha * x + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Wilder RSI (alpha = 1 / period) over first differences.
///
/// Position 0 has no prior bar and is `None`. Smoothing is seeded with the
/// first difference. When the average loss is zero the RSI is pinned to 100.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let alpha = 1.0 / period as f64;
    let mut out = Vec::with_capacity(values.len());
    out.push(None);

    let mut avg: Option<(f64, f64)> = None;
    for w in values.windows(2) {
        let delta = w[1] - w[0];
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        let (avg_gain, avg_loss) = match avg {
            None => (gain, loss),
            Some((g, l)) => (alpha * gain + (1.0 - alpha) * g, alpha * loss + (1.0 - alpha) * l),
        };
        avg = Some((avg_gain, avg_loss));
        out.push(Some(rsi_from_averages(avg_gain, avg_loss)));
    }
    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// MACD line, signal line and histogram
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    /// Latest (line, signal, histogram)
    pub fn last(&self) -> Option<(f64, f64, f64)> {
        Some((*self.line.last()?, *self.signal.last()?, *self.histogram.last()?))
    }
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    if fast == 0 || slow == 0 || signal == 0 || values.len() < fast.max(slow) + signal {
        return Macd::default();
    }

    let line: Vec<f64> = ema(values, fast)
        .iter()
        .zip(ema(values, slow))
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&line, signal);
    let histogram = line.iter().zip(&signal_line).map(|(m, s)| m - s).collect();

    Macd {
        line,
        signal: signal_line,
        histogram,
    }
}

/// Simple rolling mean; positions before the first full window are `None`
pub fn volume_ma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let mut out = vec![None; period - 1];
    let mut sum: f64 = values[..period].iter().sum();
    out.push(Some(sum / period as f64));
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out.push(Some(sum / period as f64));
    }
    out
}

/// Last defined value of an aligned output
pub fn last_defined(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_ema_recursion_from_first_value() {
        let out = ema(&[1.0, 2.0, 3.0], 2);
        assert_eq!(out.len(), 3);
        assert!((out[0] - 1.0).abs() < EPS);
        assert!((out[1] - 5.0 / 3.0).abs() < EPS);
        assert!((out[2] - 23.0 / 9.0).abs() < EPS);
    }

    #[test]
    fn test_insufficient_data_is_empty() {
        let short = [1.0, 2.0, 3.0];
        assert!(ema(&short, 4).is_empty());
        assert!(ema(&short, 0).is_empty());
        assert!(rsi(&short, 4).is_empty());
        assert!(rsi(&short, 0).is_empty());
        assert!(volume_ma(&short, 4).is_empty());
        assert!(macd(&short, 2, 3, 1).is_empty());
        assert!(macd(&[1.0; 10], 12, 26, 9).is_empty());
        assert!(ema(&[], 1).is_empty());
    }

    #[test]
    fn test_rsi_is_exactly_100_for_strictly_increasing() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let out = rsi(&closes, 14);
        assert_eq!(out.len(), closes.len());
        assert_eq!(out[0], None);
        for value in &out[1..] {
            let v = value.unwrap();
            assert!(!v.is_nan());
            assert_eq!(v, 100.0);
        }
    }

    #[test]
    fn test_rsi_strictly_decreasing_is_zero() {
        let closes: Vec<f64> = (0..20).map(|i| 50.0 - i as f64).collect();
        assert_eq!(last_defined(&rsi(&closes, 14)), Some(0.0));
    }

    #[test]
    fn test_rsi_wilder_smoothing() {
        // deltas: +1, -1 ; alpha = 1/2
        // step 1: gain 1, loss 0 -> 100
        // step 2: gain 0.5, loss 0.5 -> 50
        let out = rsi(&[1.0, 2.0, 1.0], 2);
        assert_eq!(out[1], Some(100.0));
        assert!((out[2].unwrap() - 50.0).abs() < EPS);
    }

    #[test]
    fn test_macd_aligned_and_consistent() {
        let closes: Vec<f64> = (0..40).map(|i| (i as f64 * 0.3).sin() * 5.0 + 100.0).collect();
        let m = macd(&closes, 12, 26, 9);
        assert_eq!(m.line.len(), closes.len());
        assert_eq!(m.signal.len(), closes.len());
        assert_eq!(m.histogram.len(), closes.len());
        for i in 0..closes.len() {
            assert!((m.histogram[i] - (m.line[i] - m.signal[i])).abs() < EPS);
        }
    }

    #[test]
    fn test_macd_downtrend_line_below_signal() {
        let closes = [10.0, 9.8, 9.6, 9.4, 9.2, 9.0, 8.8, 8.6];
        let (line, signal, hist) = macd(&closes, 2, 4, 2).last().unwrap();
        assert!(line < signal);
        assert!(hist < 0.0);
    }

    #[test]
    fn test_volume_ma_rolling_mean() {
        let out = volume_ma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
        assert_eq!(last_defined(&out), Some(4.0));
    }
}

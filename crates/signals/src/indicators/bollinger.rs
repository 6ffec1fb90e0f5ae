use super::trend::sma;

/// Bollinger bands around a simple moving average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bands {
    /// Band width as a percentage of the middle band.
    pub fn width_pct(&self) -> f64 {
        if self.middle <= 0.0 {
            return 0.0;
        }
        (self.upper - self.lower) / self.middle * 100.0
    }
}

/// Compute bands over the last `period` closes with `dev_mult` standard
/// deviations. Returns `None` with fewer than `period` values.
pub fn bollinger(closes: &[f64], period: usize, dev_mult: f64) -> Option<Bands> {
    let middle = sma(closes, period)?;
    let tail = &closes[closes.len() - period..];
    let variance =
        tail.iter().map(|v| (v - middle) * (v - middle)).sum::<f64>() / period as f64;
    let dev = variance.sqrt() * dev_mult;
    Some(Bands {
        upper: middle + dev,
        middle,
        lower: middle - dev,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_series_collapses_bands() {
        let closes = vec![2.0; 25];
        let b = bollinger(&closes, 20, 2.0).unwrap();
        assert_eq!(b.upper, 2.0);
        assert_eq!(b.lower, 2.0);
        assert_eq!(b.width_pct(), 0.0);
    }

    #[test]
    fn bands_bracket_the_mean() {
        let closes: Vec<f64> = (0..30).map(|i| 10.0 + (i % 5) as f64).collect();
        let b = bollinger(&closes, 20, 2.0).unwrap();
        assert!(b.lower < b.middle && b.middle < b.upper);
    }

    #[test]
    fn needs_enough_values() {
        assert!(bollinger(&[1.0, 2.0, 3.0], 20, 2.0).is_none());
    }
}

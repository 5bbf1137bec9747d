//! Decibel conversions.

/// Voltage (amplitude) ratio to dB: `20 log10 |x|`.
pub fn db_v(x: f64) -> f64 {
    20.0 * x.abs().log10()
}

/// Power ratio to dB: `10 log10 |x|`.
pub fn db_p(x: f64) -> f64 {
    10.0 * x.abs().log10()
}

/// dB to voltage (amplitude) ratio.
pub fn undb_v(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// dB to power ratio.
pub fn undb_p(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_decibels() {
        assert_relative_eq!(db_v(10.0), 20.0);
        assert_relative_eq!(db_p(10.0), 10.0);
        assert_relative_eq!(undb_v(-6.0), 0.501_187_233_627_272_2, epsilon = 1e-15);
        assert_relative_eq!(undb_p(db_p(0.37)), 0.37, epsilon = 1e-14);
        assert_eq!(db_v(0.0), f64::NEG_INFINITY);
    }
}

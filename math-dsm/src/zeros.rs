//! Root sets used to build NTF numerators and denominators.

use crate::error::{DsmError, Result};
use crate::merit::rms_gain;
use crate::optimize::{NelderMeadOptions, nelder_mead};
use crate::tf::Tf;
use num_complex::Complex64;
use std::f64::consts::PI;

/// Roots of the maximally flat polynomial scaled by `x`, reflected into
/// the unit disk.
pub(crate) fn maxflat_roots(order: usize, x: f64) -> Vec<Complex64> {
    let n = order as f64;
    let me2 = -0.5 * x.powf(2.0 / n);
    (1..=order)
        .map(|k| {
            let w = (2 * k + 1) as f64 * PI / n;
            let mb2 = 1.0 + me2 * Complex64::from_polar(1.0, w);
            let p = mb2 - (mb2 * mb2 - 1.0).sqrt();
            if p.norm() > 1.0 { p.inv() } else { p }
        })
        .collect()
}

/// Zeros of a maximally flat FIR filter.
///
/// `alpha` sets the steepness of the magnitude response; these are the
/// denominators the classical synthesiser starts from.
pub fn maxflat_fir_zeros(order: usize, alpha: f64) -> Result<Vec<Complex64>> {
    if order == 0 {
        return Err(DsmError::invalid("order must be at least 1"));
    }
    if !(alpha > 0.0) {
        return Err(DsmError::invalid(format!("alpha must be positive, got {alpha}")));
    }
    Ok(maxflat_roots(order, 1.0 / alpha.sqrt()))
}

/// Unit-circle zeros of a lowpass FIR NTF minimising its in-band RMS
/// gain.
///
/// The zeros come in conjugate pairs with angles in `[0, π/OSR]`; odd
/// orders add one zero at DC.
pub fn spread_fir_uc_zeros(order: usize, osr: f64) -> Result<Vec<Complex64>> {
    if order == 0 {
        return Err(DsmError::invalid("order must be at least 1"));
    }
    if !(osr >= 1.0 && osr.is_finite()) {
        return Err(DsmError::invalid(format!(
            "oversampling ratio must be at least 1, got {osr}"
        )));
    }
    let half = order / 2;
    let edge = PI / osr;
    let to_zeros = |angles: &[f64]| -> Vec<Complex64> {
        let mut z: Vec<Complex64> = angles.iter().map(|&a| Complex64::from_polar(1.0, a)).collect();
        z.extend(angles.iter().map(|&a| Complex64::from_polar(1.0, -a)));
        if order % 2 != 0 {
            z.push(Complex64::new(1.0, 0.0));
        }
        z
    };
    if half == 0 {
        return Ok(to_zeros(&[]));
    }
    let cost = |angles: &[f64]| {
        let tf = Tf::zpk(to_zeros(angles), vec![Complex64::new(0.0, 0.0); order], 1.0);
        rms_gain(&tf, 0.0, 0.5 / osr, 100).log10()
    };
    let x0: Vec<f64> = (0..half)
        .map(|i| {
            let start = edge / order as f64;
            if half == 1 {
                start
            } else {
                start + (edge - start) * i as f64 / (half - 1) as f64
            }
        })
        .collect();
    let opts = NelderMeadOptions::default().with_bounds(vec![(0.0, edge); half]);
    let m = nelder_mead(cost, &x0, &opts)?;
    log::debug!(
        "spread zeros: in-band RMS gain {:e} after {} evaluations",
        10f64.powf(m.fun),
        m.nfev
    );
    Ok(to_zeros(&m.x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poly::poly;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_maxflat_zeros_are_conjugate_and_stable() {
        let z = maxflat_fir_zeros(5, 10.0).unwrap();
        assert_eq!(z.len(), 5);
        assert!(z.iter().all(|v| v.norm() <= 1.0));
        for c in poly(&z) {
            assert_abs_diff_eq!(c.im, 0.0, epsilon = 1e-12);
        }
        assert!(maxflat_fir_zeros(3, 0.0).is_err());
    }

    #[test]
    fn test_spread_zeros_lower_the_in_band_gain() {
        let osr = 32.0;
        let z = spread_fir_uc_zeros(4, osr).unwrap();
        assert_eq!(z.len(), 4);
        for v in &z {
            assert_abs_diff_eq!(v.norm(), 1.0, epsilon = 1e-12);
            assert!(v.arg().abs() <= PI / osr + 1e-12);
        }
        let p = vec![Complex64::new(0.0, 0.0); 4];
        let spread = rms_gain(&Tf::zpk(z, p.clone(), 1.0), 0.0, 0.5 / osr, 100);
        let dc = rms_gain(&Tf::zpk(vec![Complex64::new(1.0, 0.0); 4], p, 1.0), 0.0, 0.5 / osr, 100);
        assert!(spread < dc);
    }

    #[test]
    fn test_spread_first_order_is_dc() {
        assert_eq!(spread_fir_uc_zeros(1, 64.0).unwrap(), vec![Complex64::new(1.0, 0.0)]);
    }
}

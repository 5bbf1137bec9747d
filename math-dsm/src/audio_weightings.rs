//! Standard audio weighting curves.
//!
//! A, B, C and D follow the IEC/ANSI analogue definitions and are scaled to
//! unit amplitude at 1 kHz (D is defined with unit gain there already). F is
//! Wannamaker's psychoacoustically optimal noise shaping weighting, a
//! rational function of the frequency in kHz scaled to unit power at 1 kHz.
//!
//! All frequencies are in Hz.

use crate::analog::AnalogZpk;
use crate::error::{DsmError, Result};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

/// An audio weighting curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AudioWeighting {
    /// IEC 61672 A-weighting
    A,
    /// B-weighting
    B,
    /// C-weighting
    C,
    /// IEC 537 D-weighting
    D,
    /// Wannamaker's F-weighting
    #[default]
    F,
}

impl FromStr for AudioWeighting {
    type Err = DsmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a" => Ok(AudioWeighting::A),
            "b" => Ok(AudioWeighting::B),
            "c" => Ok(AudioWeighting::C),
            "d" => Ok(AudioWeighting::D),
            "f" => Ok(AudioWeighting::F),
            _ => Err(DsmError::invalid(format!("unknown audio weighting '{s}'"))),
        }
    }
}

const F_HI: f64 = 12200.0;
const F_LO: f64 = 20.6;

fn a_raw(f: f64) -> f64 {
    let f2 = f * f;
    F_HI * F_HI * f2 * f2
        / ((f2 + F_LO * F_LO)
            * ((f2 + 107.7 * 107.7) * (f2 + 737.9 * 737.9)).sqrt()
            * (f2 + F_HI * F_HI))
}

fn b_raw(f: f64) -> f64 {
    let f2 = f * f;
    F_HI * F_HI * f2 * f
        / ((f2 + F_LO * F_LO) * (f2 + 158.5 * 158.5).sqrt() * (f2 + F_HI * F_HI))
}

fn c_raw(f: f64) -> f64 {
    let f2 = f * f;
    F_HI * F_HI * f2 / ((f2 + F_LO * F_LO) * (f2 + F_HI * F_HI))
}

fn d_raw(f: f64) -> f64 {
    let f2 = f * f;
    let h = ((1_037_918.48 - f2).powi(2) + 1_080_768.16 * f2)
        / ((9_837_328.0 - f2).powi(2) + 11_723_776.0 * f2);
    f / 6.896_688_849_647_6e-5 * (h / ((f2 + 79_919.29) * (f2 + 1_345_600.0))).sqrt()
}

/// Wannamaker's power weighting, with quadratic factors written as
/// `(a² + b² - x²)² + 4a²x²` for a pole/zero pair at `-a ± jb` kHz.
fn f_raw_power(f: f64) -> f64 {
    let quad = |a: f64, b: f64, z1: f64| (a * a + b * b - z1).powi(2) + 4.0 * a * a * z1;
    let fx = f / 1000.0;
    let z1 = fx * fx;
    let z2 = quad(0.58, 1.03, z1);
    let z3 = quad(3.18, 8.75, z1);
    let p1 = 0.18 * 0.18 + z1;
    let p2 = 1.63 * 1.63 + z1;
    let p3 = quad(2.51, 3.85, z1);
    let p4 = quad(6.62, 14.29, z1);
    2.536e-5 * (z1.powi(3) * z2 * z3.powi(3)) / (p1.powi(3) * p2.powi(2) * p3.powi(4))
        * (1e5 / p4).powi(20)
}

impl AudioWeighting {
    /// Amplitude weighting at `f` Hz, unit at 1 kHz when `normal`.
    pub fn amplitude(&self, f: f64, normal: bool) -> f64 {
        let raw: fn(f64) -> f64 = match self {
            AudioWeighting::A => a_raw,
            AudioWeighting::B => b_raw,
            AudioWeighting::C => c_raw,
            AudioWeighting::D => return d_raw(f),
            AudioWeighting::F => return self.power(f, normal).sqrt(),
        };
        if normal { raw(f) / raw(1000.0) } else { raw(f) }
    }

    /// Power weighting at `f` Hz, unit at 1 kHz when `normal`.
    pub fn power(&self, f: f64, normal: bool) -> f64 {
        match self {
            AudioWeighting::F if normal => f_raw_power(f) / f_raw_power(1000.0),
            AudioWeighting::F => f_raw_power(f),
            _ => self.amplitude(f, normal).powi(2),
        }
    }

    /// Analogue filter realising the (unnormalised) amplitude weighting,
    /// with `s` in rad/s. Only defined for A to D.
    pub fn analog_zpk(&self) -> Option<AnalogZpk> {
        let w = |hz: &[(f64, f64)]| -> Vec<Complex64> {
            hz.iter()
                .map(|&(re, im)| Complex64::new(2.0 * PI * re, 2.0 * PI * im))
                .collect()
        };
        let hi_gain = (2.0 * PI * F_HI).powi(2);
        let zpk = match self {
            AudioWeighting::A => AnalogZpk {
                zeros: w(&[(0.0, 0.0); 4]),
                poles: w(&[
                    (-F_LO, 0.0),
                    (-F_LO, 0.0),
                    (-107.7, 0.0),
                    (-737.9, 0.0),
                    (-F_HI, 0.0),
                    (-F_HI, 0.0),
                ]),
                gain: hi_gain,
            },
            AudioWeighting::B => AnalogZpk {
                zeros: w(&[(0.0, 0.0); 3]),
                poles: w(&[(-F_LO, 0.0), (-F_LO, 0.0), (-158.5, 0.0), (-F_HI, 0.0), (-F_HI, 0.0)]),
                gain: hi_gain,
            },
            AudioWeighting::C => AnalogZpk {
                zeros: w(&[(0.0, 0.0); 2]),
                poles: w(&[(-F_LO, 0.0), (-F_LO, 0.0), (-F_HI, 0.0), (-F_HI, 0.0)]),
                gain: hi_gain,
            },
            AudioWeighting::D => AnalogZpk {
                zeros: w(&[(0.0, 0.0), (-519.8, 876.2), (-519.8, -876.2)]),
                poles: w(&[(-282.7, 0.0), (-1160.0, 0.0), (-1712.0, 2628.0), (-1712.0, -2628.0)]),
                gain: 91_104.32,
            },
            AudioWeighting::F => return None,
        };
        Some(zpk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn analog_amplitude(zpk: &AnalogZpk, f: f64) -> f64 {
        let s = Complex64::new(0.0, 2.0 * PI * f);
        let num = zpk.zeros.iter().fold(Complex64::new(zpk.gain, 0.0), |acc, z| acc * (s - z));
        let den = zpk.poles.iter().fold(Complex64::new(1.0, 0.0), |acc, p| acc * (s - p));
        (num / den).norm()
    }

    #[test]
    fn test_unit_gain_at_1khz() {
        for w in [AudioWeighting::A, AudioWeighting::B, AudioWeighting::C, AudioWeighting::F] {
            assert_relative_eq!(w.amplitude(1000.0, true), 1.0, epsilon = 1e-12);
            assert_relative_eq!(w.power(1000.0, true), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(AudioWeighting::D.amplitude(1000.0, true), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_a_weighting_reference_points() {
        // IEC 61672 nominal values
        let a = AudioWeighting::A;
        assert_relative_eq!(20.0 * a.amplitude(100.0, true).log10(), -19.1, epsilon = 0.1);
        assert_relative_eq!(20.0 * a.amplitude(10_000.0, true).log10(), -2.5, epsilon = 0.1);
    }

    #[test]
    fn test_f_weighting_favours_midrange() {
        let f = AudioWeighting::F;
        // the ear is most sensitive around 3-4 kHz, i.e. the weighting is largest
        assert!(f.power(3500.0, true) > f.power(1000.0, true));
        assert!(f.power(100.0, true) < 0.05);
        assert!(f.power(20_000.0, true) < f.power(1000.0, true));
        assert_relative_eq!(f.amplitude(3000.0, true).powi(2), f.power(3000.0, true));
    }

    #[test]
    fn test_analog_filters_match_formulae() {
        for w in [AudioWeighting::B, AudioWeighting::C] {
            let zpk = w.analog_zpk().unwrap();
            for f in [50.0, 1000.0, 8000.0] {
                assert_relative_eq!(analog_amplitude(&zpk, f), w.amplitude(f, false), max_relative = 1e-9);
            }
        }
        let zpk = AudioWeighting::A.analog_zpk().unwrap();
        assert_relative_eq!(
            analog_amplitude(&zpk, 2000.0),
            AudioWeighting::A.amplitude(2000.0, false),
            max_relative = 1e-9
        );
        assert!(AudioWeighting::F.analog_zpk().is_none());
    }

    #[test]
    fn test_parse() {
        assert_eq!("a".parse::<AudioWeighting>().unwrap(), AudioWeighting::A);
        assert_eq!("F".parse::<AudioWeighting>().unwrap(), AudioWeighting::F);
        assert!("z".parse::<AudioWeighting>().unwrap_err().is_argument_error());
    }
}

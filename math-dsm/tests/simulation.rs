//! Simulator against an independent difference-equation model, plus the
//! transfer-function identities the designs rely on.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use math_audio_dsm::{
    Complex64, IrLength, Modulator, NoiseGainOptions, QuadOptions, SimulateOptions, Tf,
    Weighting, conv, ds_quantize, impulse_response, q0_weighting, quantization_noise_gain,
    simulate_dsm, toeplitz,
};
use std::f64::consts::PI;

/// Fifth order NTF for OSR 32 with optimised zeros, as tabulated.
fn reference_ntf() -> Tf {
    let c = Complex64::new;
    Tf::zpk(
        vec![
            c(0.99604531, 0.08884669),
            c(0.99604531, -0.08884669),
            c(0.99860302, 0.05283948),
            c(0.99860302, -0.05283948),
            c(1.0, 0.0),
        ],
        vec![
            c(0.80655696, 0.11982271),
            c(0.80655696, -0.11982271),
            c(0.89807098, 0.21981939),
            c(0.89807098, -0.21981939),
            c(0.77776708, 0.0),
        ],
        1.0,
    )
}

fn test_input() -> Vec<f64> {
    (0..8192)
        .map(|n| 0.5 * (2.0 * PI * 85.0 * n as f64 / 8192.0).sin())
        .collect()
}

/// `v = u + NTF e` with `e = v - y`, written directly on the numerator and
/// denominator coefficients.
fn difference_equation(ntf: &Tf, u: &[f64], nlev: u32) -> Vec<i32> {
    let (num, den) = ntf.ba_coefficients().unwrap();
    let order = den.len() - 1;
    let mut e = vec![0.0; u.len()];
    let mut w = vec![0.0; u.len()];
    let mut v_out = Vec::with_capacity(u.len());
    for n in 0..u.len() {
        let mut y = u[n];
        for k in 1..=order.min(n) {
            y += num[k] / num[0] * e[n - k] - den[k] / den[0] * w[n - k];
        }
        let v = ds_quantize(y, nlev);
        e[n] = v - y;
        w[n] = v - u[n];
        v_out.push(v as i32);
    }
    v_out
}

#[test]
fn test_simulator_matches_difference_equation() {
    let ntf = reference_ntf();
    let u = test_input();
    let sim = simulate_dsm(&u, &Modulator::Ntf(ntf.clone()), &SimulateOptions::default()).unwrap();
    let expected = difference_equation(&ntf, &u, 2);
    assert_eq!(sim.v.to_vec(), expected);
    assert_eq!(sim.y.len(), u.len());
    assert!(sim.xmax.iter().all(|v| v.is_finite()));
}

#[test]
fn test_simulation_is_deterministic_and_resumable() {
    let ntf = Modulator::Ntf(reference_ntf());
    let u = test_input();
    let opts = SimulateOptions::default();
    let full = simulate_dsm(&u, &ntf, &opts).unwrap();

    let first = simulate_dsm(&u[..4096], &ntf, &opts).unwrap();
    let resumed = SimulateOptions {
        x0: Some(first.xn.to_vec()),
        ..SimulateOptions::default()
    };
    let second = simulate_dsm(&u[4096..], &ntf, &resumed).unwrap();
    let mut joined = first.v.to_vec();
    joined.extend(second.v.iter());
    assert_eq!(full.v.to_vec(), joined);
}

#[test]
fn test_multibit_simulation() {
    let ntf = reference_ntf();
    let u: Vec<f64> = test_input().iter().map(|v| 6.0 * v).collect();
    let opts = SimulateOptions {
        nlev: 9,
        ..SimulateOptions::default()
    };
    let sim = simulate_dsm(&u, &Modulator::Ntf(ntf.clone()), &opts).unwrap();
    assert!(sim.v.iter().all(|&v| v % 2 != 0 && v.abs() <= 8));
    assert_eq!(sim.v.to_vec(), difference_equation(&ntf, &u, 9));
}

#[test]
fn test_ba_and_zpk_evaluation_agree() {
    let ntf = reference_ntf();
    let ba = ntf.to_ba();
    for k in 0..16 {
        let z = Complex64::from_polar(0.9 + 0.02 * k as f64, 0.37 * k as f64);
        let a = ntf.eval(z);
        let b = ba.eval(z);
        assert_relative_eq!(a.re, b.re, epsilon = 1e-12, max_relative = 1e-10);
        assert_relative_eq!(a.im, b.im, epsilon = 1e-12, max_relative = 1e-10);
    }
}

#[test]
fn test_truncated_impulse_response_reconvolves() {
    let ntf = reference_ntf();
    let ir = impulse_response(&ntf, &IrLength::Db(100.0)).unwrap();
    let mut impulse = vec![0.0; ir.len()];
    impulse[0] = 1.0;
    let again = conv(&ir, &impulse);
    assert_eq!(&again[..ir.len()], &ir[..]);

    let fixed = impulse_response(&ntf, &IrLength::Samples(ir.len())).unwrap();
    assert_eq!(fixed, ir);
}

#[test]
fn test_toeplitz_form_matches_weighted_integral() {
    let w = Weighting::function(|f| 1.0 / (1.0 + (40.0 * f).powi(2)));
    let quad = QuadOptions::default();
    let b = [1.0, -2.1, 1.7, -0.45];
    let q = toeplitz(&q0_weighting(3, &w, &quad));
    let quadratic: f64 = (0..4)
        .flat_map(|i| (0..4).map(move |j| (i, j)))
        .map(|(i, j)| b[i] * q[[i, j]] * b[j])
        .sum();
    let fir = Tf::fir(&b);
    let opts = NoiseGainOptions {
        quad,
        ..NoiseGainOptions::default()
    };
    let integral = quantization_noise_gain(&fir, Some(&w), &opts).unwrap();
    assert_relative_eq!(quadratic, integral, max_relative = 1e-7);
    assert_abs_diff_eq!(fir.eval(Complex64::new(1.0, 0.0)).re, b.iter().sum::<f64>(), epsilon = 1e-12);
}

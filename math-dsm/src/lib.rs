//! Noise transfer function design for delta-sigma modulators
//!
//! This library synthesises noise transfer functions (NTFs) for single
//! quantiser delta-sigma modulators and simulates the resulting loops.
//!
//! # Features
//!
//! - **Weighted FIR and hybrid designs**: minimise the noise power seen
//!   through an arbitrary spectral weighting, subject to a bound on the
//!   out-of-band gain (semidefinite programming via `math-audio-sdp`)
//! - **Min-max designs**: minimise the worst in-band gain over one or
//!   more signal bands
//! - **Classical synthesis**: Schreier's pole placement with optimised
//!   zeros, inverse Chebyshev NTFs and CLANS
//! - **Psychoacoustic designs**: Dunn's zeros and audio weighted FIR NTFs
//! - **Simulation**: bit-exact time-domain simulation of the modulator
//! - **Figures of merit**: weighted noise gains and RMS gains
//!
//! # Example
//!
//! ```
//! use math_audio_dsm::{Modulator, SimulateOptions, SynthesizeNtf, simulate_dsm, synthesize_ntf};
//!
//! let ntf = synthesize_ntf(&SynthesizeNtf::default()).unwrap();
//! let u: Vec<f64> = (0..1000)
//!     .map(|n| 0.5 * (2.0 * std::f64::consts::PI * n as f64 / 256.0).sin())
//!     .collect();
//! let sim = simulate_dsm(&u, &Modulator::Ntf(ntf), &SimulateOptions::default()).unwrap();
//! assert!(sim.v.iter().all(|&v| v == 1 || v == -1));
//! ```

#![warn(missing_docs)]

mod analog;
pub mod audio_weightings;
mod correlations;
mod cplxpair;
mod db;
pub mod delsig;
pub mod error;
mod fir_weighting;
mod ir;
pub mod legacy;
mod lmi;
mod merit;
mod minmax;
mod optimize;
mod padding;
mod parallel;
mod poly;
mod psychoacoustic;
mod quadrature;
mod simulate;
mod tf;
mod weighting;
mod zeros;

pub use analog::{
    AnalogZpk, FilterBand, bilinear, buttap, butter_zpk, cheb2ap, cheby2_zpk, lp2bp, lp2bs, lp2hp,
    lp2lp,
};
pub use audio_weightings::AudioWeighting;
pub use correlations::{raw_acorr, raw_xcorr};
pub use cplxpair::{CPLXPAIR_TOL, cplxpair, cplxpair_tol};
pub use db::{db_p, db_v, undb_p, undb_v};
pub use delsig::{
    ChebyshevNtf, Clans, MAX_OPTZEROS_ORDER, SynthesizeNtf, ZeroOpt, clans, ds_f1f2, ds_optzeros,
    ds_syn_ntf_obj1, dsclans_ntf, synthesize_chebyshev_ntf, synthesize_ntf,
};
pub use error::{DsmError, Result};
pub use fir_weighting::{
    WeightingOptions, ntf_fir_from_q0, ntf_fir_weighting, ntf_hybrid_from_q0, ntf_hybrid_weighting,
};
pub use ir::{IrLength, guess_ir_length, impulse_response, lfilter};
pub use merit::{
    NoiseGainOptions, quantization_noise_gain, quantization_noise_gain_by_conv, rms, rms_gain,
};
pub use minmax::{Band, MinmaxOptions, ntf_fir_minmax};
pub use optimize::{Minimum, NelderMeadOptions, nelder_mead};
pub use padding::{padb, padl, padr, padt};
pub use parallel::{is_parallel_available, parallel_map, parallel_map_indexed};
pub use poly::{conv, eval_roots, poly, poly_real, polyval, polyval_complex, roots};
pub use psychoacoustic::{
    AudioWeightingOptions, MAX_DUNN_ORDER, audio_noise_weighting, dunn_optzeros,
    dunn_optzeros_cplx, ntf_dunn, ntf_fir_audio_weighting,
};
pub use quadrature::{QuadOptions, QuadResult, quad};
pub use simulate::{
    DEFAULT_OVERFLOW_LIMIT, Modulator, SimulateOptions, Simulation, ds_quantize, simulate_dsm,
};
pub use tf::{Tf, eval_tf, freq_response};
pub use weighting::{
    Normalize, Weighting, mult_weightings, q0_from_filter_ir, q0_weighting, toeplitz,
    weighting_sqrt,
};
pub use zeros::{maxflat_fir_zeros, spread_fir_uc_zeros};

pub use math_audio_sdp::{Backend, SdpOptions};
pub use num_complex::Complex64;

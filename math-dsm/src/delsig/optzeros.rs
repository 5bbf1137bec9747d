//! NTF zero placement for the classical synthesiser.
//!
//! Zero positions are expressed relative to the signal band: a value `x`
//! in the optimisation tables corresponds to an angle `x · π / OSR` from
//! the band centre (half that for bandpass designs, whose order is split
//! between both sides of `f0`).

use crate::db::db_v;
use crate::error::{DsmError, Result};
use crate::merit::rms_gain;
use crate::padding::{padl, padr};
use crate::tf::Tf;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// How the NTF zeros are placed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ZeroOpt {
    /// All zeros at the band centre
    #[default]
    Dc,
    /// Zeros minimising the in-band noise power of a pure differentiator
    /// chain (Legendre roots)
    Optimized,
    /// As [`ZeroOpt::Optimized`], keeping at least one zero at the centre
    OptimizedWithCentre,
    /// [`ZeroOpt::Optimized`] zeros re-optimised together with the poles
    Reoptimized,
    /// [`ZeroOpt::OptimizedWithCentre`] zeros re-optimised with the poles
    ReoptimizedWithCentre,
    /// User supplied zeros, one per order
    Explicit(Vec<Complex64>),
}

impl ZeroOpt {
    /// Index into the optimisation table (0, 1 or 2), `None` for explicit
    /// zeros.
    pub fn table(&self) -> Option<u8> {
        match self {
            ZeroOpt::Dc => Some(0),
            ZeroOpt::Optimized | ZeroOpt::Reoptimized => Some(1),
            ZeroOpt::OptimizedWithCentre | ZeroOpt::ReoptimizedWithCentre => Some(2),
            ZeroOpt::Explicit(_) => None,
        }
    }

    /// Whether the zeros are refined inside the pole iteration.
    pub fn reoptimize(&self) -> bool {
        matches!(self, ZeroOpt::Reoptimized | ZeroOpt::ReoptimizedWithCentre)
    }
}

/// Largest order covered by the optimisation tables.
pub const MAX_OPTZEROS_ORDER: usize = 14;

fn optzeros_table(n: usize, opt: u8) -> Vec<f64> {
    let with_centre = opt == 2;
    match n {
        1 => vec![0.0],
        2 if with_centre => vec![0.0],
        2 => vec![(1.0f64 / 3.0).sqrt()],
        3 => vec![(3.0f64 / 5.0).sqrt(), 0.0],
        4 if with_centre => vec![0.0, (5.0f64 / 7.0).sqrt()],
        4 => {
            let d = (9.0f64 / 49.0 - 3.0 / 35.0).sqrt();
            vec![(3.0 / 7.0 + d).sqrt(), (3.0 / 7.0 - d).sqrt()]
        }
        5 => {
            let d = (25.0f64 / 81.0 - 5.0 / 21.0).sqrt();
            vec![(5.0 / 9.0 + d).sqrt(), (5.0 / 9.0 - d).sqrt(), 0.0]
        }
        6 if with_centre => {
            let d = 56f64.sqrt() / 33.0;
            vec![0.0, (7.0 / 11.0 + d).sqrt(), (7.0 / 11.0 - d).sqrt()]
        }
        6 => vec![0.238_620_59, 0.661_209_88, 0.932_469_6],
        7 => vec![0.0, 0.405_843_71, 0.741_530_78, 0.949_107_85],
        8 if with_centre => vec![0.0, 0.505_631_61, 0.790_172_86, 0.959_147_31],
        8 => vec![0.183_437_09, 0.525_533_45, 0.796_666_84, 0.960_289_93],
        9 => vec![0.0, 0.324_251_01, 0.613_370_56, 0.836_030_82, 0.968_160_2],
        10 if with_centre => vec![0.0, 0.415_722_67, 0.672_086_82, 0.862_388_94, 0.973_421_21],
        10 => vec![
            0.148_874_339_0,
            0.433_395_394_1,
            0.679_409_568_3,
            0.865_063_366_7,
            0.973_906_528_5,
        ],
        11 => vec![
            0.0,
            0.269_539_55,
            0.519_094_68,
            0.730_151_37,
            0.887_062_38,
            0.978_228_64,
        ],
        12 if with_centre => vec![
            0.0,
            0.352_223_63,
            0.580_062_51,
            0.766_479_93,
            0.902_813_26,
            0.981_320_47,
        ],
        12 => vec![
            0.125_238_75,
            0.367_834_03,
            0.587_319_21,
            0.769_903_3,
            0.904_117_53,
            0.981_560_7,
        ],
        13 => vec![
            0.0,
            0.230_453_31,
            0.448_490_63,
            0.642_348_28,
            0.801_577_6,
            0.917_598_24,
            0.984_183_06,
        ],
        14 if with_centre => vec![
            0.0,
            0.305_243_84,
            0.508_366_49,
            0.683_606_6,
            0.825_372_39,
            0.927_723_36,
            0.986_151_67,
        ],
        _ => vec![
            0.108_062_12,
            0.319_115_86,
            0.515_250_46,
            0.687_293_92,
            0.827_201_85,
            0.928_435_13,
            0.986_283_89,
        ],
    }
}

/// Optimal zero positions of an order-`n` NTF, normalised to the band edge.
///
/// `opt` selects the table: 0 puts every zero at the centre, 1 minimises
/// the in-band noise power and 2 does the same with a zero kept at the
/// centre. Odd orders list the centre zero first, then `±x` pairs in
/// increasing order.
pub fn ds_optzeros(n: usize, opt: u8) -> Result<Vec<f64>> {
    if n == 0 {
        return Err(DsmError::invalid("zero placement needs an order of at least 1"));
    }
    if opt > 2 {
        return Err(DsmError::invalid(format!("unknown zero table {opt}")));
    }
    if opt == 0 {
        return Ok(vec![0.0; n]);
    }
    if n > MAX_OPTZEROS_ORDER {
        return Err(DsmError::invalid(format!(
            "optimized zeros are tabulated up to order {MAX_OPTZEROS_ORDER}, got {n}"
        )));
    }
    let mut z = optzeros_table(n, opt);
    z.sort_by(f64::total_cmp);

    let mut out = Vec::with_capacity(n);
    let pairs = if n % 2 == 1 {
        out.push(z[0]);
        &z[1..]
    } else {
        &z[..]
    };
    for &v in pairs {
        out.push(v);
        out.push(-v);
    }
    Ok(out)
}

/// Band edges `(f1, f2)` of a band of centre `f0`.
///
/// Complex modulators use the full `f0 ± 1/(2 OSR)`; real bandpass bands
/// are `f0 ± 1/(4 OSR)`; anything closer to DC than that is treated as
/// the lowpass band `[0, 1/(2 OSR)]`.
pub fn ds_f1f2(osr: f64, f0: f64, complex: bool) -> (f64, f64) {
    if complex {
        (f0 - 0.5 / osr, f0 + 0.5 / osr)
    } else if f0 > 0.25 / osr {
        (f0 - 0.25 / osr, f0 + 0.25 / osr)
    } else {
        (0.0, 0.5 / osr)
    }
}

/// Zeros described by normalised offsets `x` from the band centre, for an
/// NTF with `order` zeros.
///
/// Each `x` gives the zero `e^{j2π(f0 + x/(2 OSR))}` and its conjugate;
/// missing zeros are placed at the band centre.
pub(crate) fn zeros_from_offsets(x: &[f64], order: usize, osr: f64, f0: f64) -> Vec<Complex64> {
    let zero_at = |f: f64| Complex64::from_polar(1.0, 2.0 * PI * f);
    let mut half: Vec<Complex64> = x.iter().map(|&xi| zero_at(f0 + 0.5 / osr * xi)).collect();
    if f0 > 0.0 {
        half = padl(&half, order / 2, zero_at(f0));
    }
    let mut z = half.clone();
    z.extend(half.iter().map(|v| v.conj()));
    if f0 == 0.0 {
        z = padr(&z, order, Complex64::new(1.0, 0.0));
    }
    z
}

/// In-band RMS gain, in dB, of the NTF with poles `p` and zeros given by
/// the offsets `x` (see [`zeros_from_offsets`]).
pub fn ds_syn_ntf_obj1(x: &[f64], p: &[Complex64], osr: f64, f0: f64) -> f64 {
    let z = zeros_from_offsets(x, p.len(), osr, f0);
    let (f1, f2) = ds_f1f2(osr, f0, false);
    db_v(rms_gain(&Tf::zpk(z, p.to_vec(), 1.0), f1, f2, 100))
}

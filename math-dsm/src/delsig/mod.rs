//! Classical NTF synthesis in the style of Schreier's toolbox.
//!
//! - [`synthesize_ntf`]: pole placement by a secant iteration on the
//!   out-of-band gain, with tabulated or optimised zeros;
//! - [`synthesize_chebyshev_ntf`]: inverse Chebyshev NTFs;
//! - [`clans`]: pole optimisation for multibit quantisers.

mod chebyshev;
mod clans;
mod optzeros;
mod synthesize;

pub use chebyshev::{ChebyshevNtf, synthesize_chebyshev_ntf};
pub use clans::{Clans, clans, dsclans_ntf};
pub use optzeros::{MAX_OPTZEROS_ORDER, ZeroOpt, ds_f1f2, ds_optzeros, ds_syn_ntf_obj1};
pub use synthesize::{SynthesizeNtf, synthesize_ntf};

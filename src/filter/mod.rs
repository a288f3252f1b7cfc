//! Region filtering: finite-value quality mask plus optional BPT-style
//! contamination cuts.
//!
//! Step 1 removes regions whose abundance, uncertainty, or Hα equivalent
//! width is non-finite, keeping every carried array index-aligned. Step 2
//! applies the selected dividing curve on the `[NII]/Hα` vs `[OIII]/Hβ`
//! plane. An empty result is a valid outcome, not an error.

use crate::domain::{Criterion, RegionAbundance};

/// The filtered radial profile: index-aligned (r, 12+log(O/H), error).
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilePoints {
    pub r: Vec<f64>,
    pub oh: Vec<f64>,
    pub oh_err: Vec<f64>,
}

impl ProfilePoints {
    pub fn len(&self) -> usize {
        self.r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }
}

/// Apply the quality mask and the selected criterion.
///
/// `radii`, `abundances`, and `ew_ha` must be index-aligned.
pub fn profile_points(
    criterion: Criterion,
    radii: &[f64],
    abundances: &[RegionAbundance],
    ew_ha: &[f64],
) -> ProfilePoints {
    debug_assert_eq!(radii.len(), abundances.len());
    debug_assert_eq!(radii.len(), ew_ha.len());

    let mut r = Vec::new();
    let mut oh = Vec::new();
    let mut oh_err = Vec::new();

    for ((&ri, a), &ew) in radii.iter().zip(abundances.iter()).zip(ew_ha.iter()) {
        if !(a.oh.is_finite() && a.oh_err.is_finite() && ew.is_finite()) {
            continue;
        }

        let x = a.nii_cor - a.ha_cor;
        if !passes(criterion, x, a.oiii_cor, ew) {
            continue;
        }

        r.push(ri);
        oh.push(a.oh);
        oh_err.push(a.oh_err);
    }

    ProfilePoints { r, oh, oh_err }
}

/// The criterion mask for a single region.
///
/// `x` is `[NII]_cor − Hα_cor`, `oiii` is the corrected [OIII] log ratio.
fn passes(criterion: Criterion, x: f64, oiii: f64, ew: f64) -> bool {
    match criterion {
        Criterion::None => true,
        Criterion::St06 => {
            x <= -0.30
                && oiii <= (-30.787 + 1.1358 * x + 0.27297 * x * x) * (5.7409 * x).tanh() - 31.093
        }
        Criterion::Ka03 => x <= 0.61 / (-1.7 - 1.3) + 0.05 && oiii <= 0.61 / (x - 0.05) + 1.3,
        Criterion::Ke01 => x <= 0.61 / (-1.7 - 1.19) + 0.47 && oiii <= 0.61 / (x - 0.47) + 1.19,
        Criterion::Ke6a => {
            x <= 0.61 / (-1.7 - 1.19) + 0.47 && oiii <= 0.61 / (x - 0.47) + 1.19 && ew >= 6.0
        }
        Criterion::Cf11 => ew >= 3.0 && x <= -0.4,
    }
}

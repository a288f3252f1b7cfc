//! Extinction-corrected abundance calibration.
//!
//! For each region we:
//!
//! 1. derive the color excess from the observed Hα/Hβ ratio against the
//!    theoretical recombination value 2.86
//! 2. correct each line flux into a log ratio relative to Hβ, propagating the
//!    relative flux errors
//! 3. form the O3N2 and N2 diagnostic indices
//! 4. evaluate all five published calibrations (each defined only inside a
//!    closed index interval; outside it the estimate is NaN, never clamped)
//! 5. gate the chosen calibration by the per-line reliability test
//!
//! The corrected-flux uncertainty deliberately carries no term for the color
//! excess; the upstream relative-error approximation is preserved verbatim so
//! results stay comparable with the published profiles.

pub mod extinction;

use crate::domain::{Calibrator, CorrectedFlux, LineFlux, Region, RegionAbundance, RegionRecord};

use self::extinction::{
    HA6562_UM, HB4861_UM, NII6583_UM, OIII5006_UM, SII6716_UM, SII6730_UM, extinction,
};

/// Theoretical Hα/Hβ recombination ratio (case B).
const BALMER_RATIO: f64 = 2.86;

/// Everything the calibration stage produces: the per-region values the
/// filter consumes, plus the archival rows for the table sink.
#[derive(Debug, Clone)]
pub struct CalibrationOutput {
    pub abundances: Vec<RegionAbundance>,
    pub records: Vec<RegionRecord>,
}

/// Calibrate every region. `radii` must be index-aligned with `regions`.
pub fn calibrate(regions: &[Region], radii: &[f64], calibrator: Calibrator) -> CalibrationOutput {
    debug_assert_eq!(regions.len(), radii.len());

    let av_hb = extinction(HB4861_UM);
    let av_ha = extinction(HA6562_UM);
    let av_oiii = extinction(OIII5006_UM);
    let av_nii = extinction(NII6583_UM);
    let av_sii_a = extinction(SII6716_UM);
    let av_sii_b = extinction(SII6730_UM);

    let mut abundances = Vec::with_capacity(regions.len());
    let mut records = Vec::with_capacity(regions.len());

    for (region, &r) in regions.iter().zip(radii.iter()) {
        let excess = color_excess(region.ha6562.flux, region.hb4861.flux, av_ha, av_hb);

        let ha = flux_cor(region.ha6562, region.hb4861, av_ha, av_hb, excess);
        let oiii = flux_cor(region.oiii5006, region.hb4861, av_oiii, av_hb, excess);
        let nii = flux_cor(region.nii6583, region.hb4861, av_nii, av_hb, excess);
        let sii_a = flux_cor(region.sii6716, region.hb4861, av_sii_a, av_hb, excess);
        let sii_b = flux_cor(region.sii6730, region.hb4861, av_sii_b, av_hb, excess);

        // O3N2 (Alloin et al. 1979) and N2 (Storchi-Bergmann et al. 1994).
        let o3n2 = CorrectedFlux {
            value: oiii.value + ha.value - nii.value,
            err: (oiii.err.powi(2) + ha.err.powi(2) + nii.err.powi(2)).sqrt(),
        };
        let n2 = CorrectedFlux {
            value: nii.value - ha.value,
            err: (nii.err.powi(2) + ha.err.powi(2)).sqrt(),
        };

        let pp04_o3n2 = linear_calibration(o3n2, -1.0, 1.9, 8.73, -0.32);
        let pp04_n2 = linear_calibration(n2, -2.5, -0.3, 8.90, 0.57);
        let m13_o3n2 = linear_calibration(o3n2, -1.1, 1.7, 8.533, -0.214);
        let m13_n2 = linear_calibration(n2, -1.6, -0.2, 8.743, 0.462);
        let d16 = d16_calibration(ha, nii, sii_a, sii_b);

        let reliable = match calibrator {
            Calibrator::Pp04O3n2 | Calibrator::M13O3n2 => {
                region.hb4861.is_reliable()
                    && region.ha6562.is_reliable()
                    && region.oiii5006.is_reliable()
                    && region.nii6583.is_reliable()
            }
            Calibrator::Pp04N2 | Calibrator::M13N2 => {
                region.ha6562.is_reliable() && region.nii6583.is_reliable()
            }
            Calibrator::D16 => {
                region.ha6562.is_reliable()
                    && region.nii6583.is_reliable()
                    && region.sii6716.is_reliable()
                    && region.sii6730.is_reliable()
            }
        };

        let chosen = match calibrator {
            Calibrator::Pp04O3n2 => pp04_o3n2,
            Calibrator::Pp04N2 => pp04_n2,
            Calibrator::M13O3n2 => m13_o3n2,
            Calibrator::M13N2 => m13_n2,
            Calibrator::D16 => d16,
        };
        let (oh, oh_err) = if reliable {
            (chosen.0, chosen.1.abs())
        } else {
            (f64::NAN, f64::NAN)
        };

        abundances.push(RegionAbundance {
            oh,
            oh_err,
            ha_cor: ha.value,
            oiii_cor: oiii.value,
            nii_cor: nii.value,
        });

        // The archival row keeps every calibration ungated; the audit trail
        // shows what each formula produced, not what the run kept.
        records.push(RegionRecord {
            id: region.id.clone(),
            r,
            ew_ha: region.ew_ha,
            ha_cor: ha.value,
            e_ha_cor: ha.err,
            oiii_cor: oiii.value,
            e_oiii_cor: oiii.err,
            nii_cor: nii.value,
            e_nii_cor: nii.err,
            sii6716_cor: sii_a.value,
            e_sii6716_cor: sii_a.err,
            sii6730_cor: sii_b.value,
            e_sii6730_cor: sii_b.err,
            oh_pp04_o3n2: pp04_o3n2.0,
            e_oh_pp04_o3n2: pp04_o3n2.1,
            oh_pp04_n2: pp04_n2.0,
            e_oh_pp04_n2: pp04_n2.1,
            oh_m13_o3n2: m13_o3n2.0,
            e_oh_m13_o3n2: m13_o3n2.1,
            oh_m13_n2: m13_n2.0,
            e_oh_m13_n2: m13_n2.1,
            oh_d16: d16.0,
            e_oh_d16: d16.1,
        });
    }

    CalibrationOutput {
        abundances,
        records,
    }
}

/// Color excess from the Balmer decrement.
fn color_excess(ha: f64, hb: f64, av_ha: f64, av_hb: f64) -> f64 {
    (BALMER_RATIO.log10() - (ha / hb).log10()) / (0.4 * (av_ha - av_hb))
}

/// Extinction-correct one line into a log ratio relative to Hβ.
///
/// The uncertainty is the relative-error approximation; it is independent of
/// the excess term.
fn flux_cor(line: LineFlux, hb: LineFlux, av_line: f64, av_hb: f64, excess: f64) -> CorrectedFlux {
    let value = (line.flux / hb.flux).log10() + 0.4 * excess * (av_line - av_hb);
    let err = (1.0 / std::f64::consts::LN_10)
        * ((line.err / line.flux).powi(2) + (hb.err / hb.flux).powi(2)).sqrt();
    CorrectedFlux { value, err }
}

/// Apply a linear calibration `a + b·index`, valid only on the closed
/// interval `[lo, hi]`. Outside it both the estimate and its uncertainty are
/// NaN.
fn linear_calibration(index: CorrectedFlux, lo: f64, hi: f64, a: f64, b: f64) -> (f64, f64) {
    if lo <= index.value && index.value <= hi {
        (a + b * index.value, b.abs() * index.err)
    } else {
        (f64::NAN, f64::NAN)
    }
}

/// Sum the two [SII] lines in linear flux space and return the summed log
/// flux with its propagated uncertainty.
fn sii_sum(sii_a: CorrectedFlux, sii_b: CorrectedFlux) -> CorrectedFlux {
    let ln10 = std::f64::consts::LN_10;
    let f1 = 10f64.powf(sii_a.value);
    let f2 = 10f64.powf(sii_b.value);
    let sigma1 = ln10 * f1 * sii_a.err;
    let sigma2 = ln10 * f2 * sii_b.err;

    let total = f1 + f2;
    let sigma_total = (sigma1.powi(2) + sigma2.powi(2)).sqrt();

    CorrectedFlux {
        value: total.log10(),
        err: sigma_total / (total * ln10),
    }
}

/// Dopita et al. (2016): `8.77 + (NII − SII) + 0.264·(NII − Hα)`.
fn d16_calibration(
    ha: CorrectedFlux,
    nii: CorrectedFlux,
    sii_a: CorrectedFlux,
    sii_b: CorrectedFlux,
) -> (f64, f64) {
    let sii = sii_sum(sii_a, sii_b);
    let value = 8.77 + (nii.value - sii.value) + 0.264 * (nii.value - ha.value);
    let err = (nii.err.powi(2)
        + sii.err.powi(2)
        + 0.264f64.powi(2) * (nii.err.powi(2) + ha.err.powi(2)))
    .sqrt();
    (value, err)
}

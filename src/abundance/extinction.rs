//! Galactic extinction curve.
//!
//! Seven-term polynomial in inverse microns (Cavichia et al. 2010). The
//! coefficients are physical constants shared by every calibration and must
//! not be altered.

/// Rest-frame wavelengths in microns.
pub const HB4861_UM: f64 = 4861.32e-4;
pub const HA6562_UM: f64 = 6562.68e-4;
pub const OIII5006_UM: f64 = 5006.84e-4;
pub const NII6583_UM: f64 = 6583.41e-4;
pub const SII6716_UM: f64 = 6716.39e-4;
pub const SII6730_UM: f64 = 6730.74e-4;

/// Extinction coefficient at wavelength `x` (microns).
pub fn extinction(x: f64) -> f64 {
    0.00001 + 0.22707 / x + 1.95243 / x.powi(2) - 2.67596 / x.powi(3) + 2.6507 / x.powi(4)
        - 1.26812 / x.powi(5)
        + 0.27549 / x.powi(6)
        - 0.02212 / x.powi(7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extinction_decreases_toward_red() {
        // Dust extinguishes blue light more than red.
        assert!(extinction(HB4861_UM) > extinction(HA6562_UM));
        assert!(extinction(OIII5006_UM) > extinction(NII6583_UM));
    }

    #[test]
    fn extinction_is_finite_at_all_pipeline_wavelengths() {
        for x in [
            HB4861_UM, HA6562_UM, OIII5006_UM, NII6583_UM, SII6716_UM, SII6730_UM,
        ] {
            assert!(extinction(x).is_finite());
        }
    }
}

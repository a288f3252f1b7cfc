//! Deprojected galactocentric radii.
//!
//! Sky offsets from the galaxy center are rotated into the major/minor-axis
//! frame, the minor-axis component is stretched by the inclination, and the
//! in-plane distance is scaled to units of the effective radius.

use crate::domain::GalaxyGeometry;

/// Minimum intrinsic flattening of a disk galaxy. Axis ratios below this make
/// the deprojection cosine imaginary and the radii NaN.
const INTRINSIC_FLATTENING: f64 = 0.13;

/// Project sky positions into dimensionless galactocentric radii (r/re).
///
/// `ra`/`dec` are in degrees and must have equal length. The output keeps
/// index correspondence with the inputs; invalid geometry (`ba < 0.13`)
/// yields NaN entries rather than an error.
pub fn project(ra: &[f64], dec: &[f64], geom: &GalaxyGeometry) -> Vec<f64> {
    debug_assert_eq!(ra.len(), dec.len());

    let deg = std::f64::consts::PI / 180.0;
    let ra0 = geom.ra0 * deg;
    let dec0 = geom.dec0 * deg;
    let pa = geom.pa * deg;

    let cos_i = ((geom.ba.powi(2) - INTRINSIC_FLATTENING.powi(2))
        / (1.0 - INTRINSIC_FLATTENING.powi(2)))
    .sqrt();

    let d_kpc = geom.dist_mpc * 1e3;

    ra.iter()
        .zip(dec.iter())
        .map(|(&ra_deg, &dec_deg)| {
            let ra = ra_deg * deg;
            let dec = dec_deg * deg;

            // Major-axis and inclination-corrected minor-axis offsets. The RA
            // offset carries the cos(dec) compression of the sky grid.
            let r1 = -(ra - ra0) * pa.sin() * dec.cos() + (dec - dec0) * pa.cos();
            let r2 = (-(ra - ra0) * pa.cos() * dec.cos() - (dec - dec0) * pa.sin()) / cos_i;

            (r1 * r1 + r2 * r2).sqrt() * d_kpc / geom.re_kpc
        })
        .collect()
}

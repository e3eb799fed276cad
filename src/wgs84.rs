/*! Geodesics on the WGS-84 ellipsoid.

Distance and forward bearing between two positions, using Vincenty's
inverse formula. Used by the decoder to report how far away, and in
which direction, each decoded station is from the receiver.
*/

/// WGS-84 equatorial radius, meters.
const SEMI_MAJOR: f64 = 6_378_137.0;

/// WGS-84 polar radius, meters.
const SEMI_MINOR: f64 = 6_356_752.314245;

/// WGS-84 flattening.
const FLATTENING: f64 = 1.0 / 298.257223563;

/// Convergence tolerance on the longitude auxiliary, radians.
const TOLERANCE: f64 = 1e-12;

/// Iteration cap for nearly antipodal point pairs.
const MAX_ITER: usize = 20;

/// Geodesic distance in meters and forward bearing in degrees
/// (0..360) from point 1 to point 2. Coordinates in degrees,
/// longitude first.
///
/// Coincident points give (0, 0).
#[must_use]
pub fn distance_bearing(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> (f64, f64) {
    if lon1 == lon2 && lat1 == lat2 {
        return (0.0, 0.0);
    }

    let l = (lon2 - lon1).to_radians();
    let u1 = ((1.0 - FLATTENING) * lat1.to_radians().tan()).atan();
    let u2 = ((1.0 - FLATTENING) * lat2.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lam = l;
    let mut sin_lam;
    let mut cos_lam;
    let mut sin_sig;
    let mut cos_sig;
    let mut sig;
    let mut cos_alpha2;
    let mut cos2_sig_m;
    let mut iter = 0;
    loop {
        sin_lam = lam.sin();
        cos_lam = lam.cos();
        sin_sig = ((cos_u2 * sin_lam).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lam).powi(2))
        .sqrt();
        if sin_sig == 0.0 {
            // Co-incident points.
            return (0.0, 0.0);
        }
        cos_sig = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lam;
        sig = sin_sig.atan2(cos_sig);
        let sin_alpha = cos_u1 * cos_u2 * sin_lam / sin_sig;
        cos_alpha2 = 1.0 - sin_alpha * sin_alpha;
        cos2_sig_m = if cos_alpha2 == 0.0 {
            // Equatorial line.
            0.0
        } else {
            cos_sig - 2.0 * sin_u1 * sin_u2 / cos_alpha2
        };
        let c = FLATTENING / 16.0 * cos_alpha2 * (4.0 + FLATTENING * (4.0 - 3.0 * cos_alpha2));
        let prev = lam;
        lam = l
            + (1.0 - c)
                * FLATTENING
                * sin_alpha
                * (sig
                    + c * sin_sig
                        * (cos2_sig_m + c * cos_sig * (-1.0 + 2.0 * cos2_sig_m * cos2_sig_m)));
        iter += 1;
        if (lam - prev).abs() <= TOLERANCE || iter >= MAX_ITER {
            break;
        }
    }

    let u_sq = cos_alpha2 * (SEMI_MAJOR * SEMI_MAJOR - SEMI_MINOR * SEMI_MINOR)
        / (SEMI_MINOR * SEMI_MINOR);
    let a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
    let delta_sig = b
        * sin_sig
        * (cos2_sig_m
            + 0.25
                * b
                * (cos_sig * (-1.0 + 2.0 * cos2_sig_m * cos2_sig_m)
                    - b / 6.0
                        * cos2_sig_m
                        * (-3.0 + 4.0 * sin_sig * sin_sig)
                        * (-3.0 + 4.0 * cos2_sig_m * cos2_sig_m)));
    let dist = SEMI_MINOR * a * (sig - delta_sig);

    let az = (cos_u2 * sin_lam)
        .atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lam)
        .to_degrees()
        .rem_euclid(360.0);

    (dist, az)
}

/// Break decimal degrees into degrees, minutes and seconds of arc.
#[must_use]
pub fn to_dms(deg: f64) -> (u32, u32, f64) {
    let d = deg.abs().trunc();
    let dm = (deg.abs() - d) * 60.0;
    let m = dm.trunc();
    let s = (dm - m) * 60.0;
    (d as u32, m as u32, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_north() {
        let (dist, az) = distance_bearing(0.0, 0.0, 0.0, 1.0);
        assert!((dist - 110574.389).abs() < 1.0, "dist {dist}");
        assert!(az.abs() < 0.001, "az {az}");
    }

    #[test]
    fn coincident() {
        assert_eq!(distance_bearing(11.97, 57.70, 11.97, 57.70), (0.0, 0.0));
    }

    #[test]
    fn symmetric_distance() {
        let (d1, _) = distance_bearing(21.5593, 63.1587, 11.850585, 47.920742);
        let (d2, _) = distance_bearing(11.850585, 47.920742, 21.5593, 63.1587);
        assert!((d1 - d2).abs() < 0.001);
        assert!(d1 > 1_000_000.0 && d1 < 2_500_000.0, "dist {d1}");
    }

    #[test]
    fn due_east_bearing() {
        let (_, az) = distance_bearing(0.0, 0.0, 1.0, 0.0);
        assert!((az - 90.0).abs() < 0.001, "az {az}");
    }

    #[test]
    fn dms() {
        let (d, m, s) = to_dms(11.850585);
        assert_eq!((d, m), (11, 51));
        assert!((s - 2.106).abs() < 0.001);
    }
}

use super::softcore::SoftcoreCoefficients;
use std::f64::consts::PI;

/// Repulsive buffering constant of the 14-7 potential.
pub const BUFFER_DELTA: f64 = 0.07;
/// Attractive buffering constant of the 14-7 potential.
pub const BUFFER_GAMMA: f64 = 0.12;
/// `(1 + BUFFER_DELTA)^7`.
const T1_NUMERATOR: f64 = 1.605_781_476_478_43;
/// `1 + BUFFER_GAMMA`.
const T2_NUMERATOR: f64 = 1.12;

/// Intermediate terms of one buffered 14-7 pair evaluation.
///
/// `t1` and `t2` are the repulsive and attractive buffered factors; the
/// potential is `eps * sc2 * t1 * t2`. The `*_dr` members are the negated
/// radial derivatives of `t1` and `t2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Buffered147 {
    pub t1: f64,
    pub t2: f64,
    t1d: f64,
    t2d: f64,
    t2a: f64,
    dt1_dr: f64,
    dt2_dr: f64,
}

impl Buffered147 {
    /// Evaluates the buffered terms at separation `r` for a combined R-min
    /// `radius` and softcore offset `alpha` (0 for hard pairs).
    #[inline]
    pub fn new(r: f64, radius: f64, alpha: f64) -> Self {
        let rho = r / radius;
        let rho3 = rho * rho * rho;
        let rho6 = rho3 * rho3;
        let rho7 = rho6 * rho;
        let rho_07 = rho + BUFFER_DELTA;
        let rho_07_2 = rho_07 * rho_07;
        let rho_07_6 = rho_07_2 * rho_07_2 * rho_07_2;
        let rho_07_7 = rho_07_6 * rho_07;
        let t1d = 1.0 / (alpha + rho_07_7);
        let t2d = 1.0 / (alpha + rho7 + BUFFER_GAMMA);
        let t1 = T1_NUMERATOR * t1d;
        let t2a = T2_NUMERATOR * t2d;
        let t2 = t2a - 2.0;
        Self {
            t1,
            t2,
            t1d,
            t2d,
            t2a,
            dt1_dr: t1 * 7.0 * rho_07_6 / radius * t1d,
            dt2_dr: t2a * 7.0 * rho6 / radius * t2d,
        }
    }

    /// Pair energy for a prefactor `eps * sc2`.
    #[inline]
    pub fn energy(&self, eps_lambda: f64) -> f64 {
        eps_lambda * self.t1 * self.t2
    }

    /// Radial derivative of [`Self::energy`].
    #[inline]
    pub fn denergy_dr(&self, eps_lambda: f64) -> f64 {
        -eps_lambda * (self.dt1_dr * self.t2 + self.t1 * self.dt2_dr)
    }

    /// Lambda derivatives of a soft pair with combined well depth `eps`.
    ///
    /// The results are untapered; callers apply the switch.
    pub fn lambda_derivatives(&self, eps: f64, sc: &SoftcoreCoefficients) -> LambdaDerivatives {
        let Self {
            t1,
            t2,
            t1d,
            t2d,
            t2a,
            dt1_dr,
            dt2_dr,
        } = *self;
        let dt1 = -t1 * t1d * sc.dsc1_dl;
        let dt2 = -t2a * t2d * sc.dsc1_dl;
        let dedl = eps * (sc.dsc2_dl * t1 * t2 + sc.sc2 * dt1 * t2 + sc.sc2 * t1 * dt2);

        let t1d2 = -sc.dsc1_dl * t1d * t1d;
        let t2d2 = -sc.dsc1_dl * t2d * t2d;
        let d2t1 = -dt1 * t1d * sc.dsc1_dl - t1 * t1d * sc.d2sc1_dl2 - t1 * t1d2 * sc.dsc1_dl;
        let d2t2 = -dt2 * t2d * sc.dsc1_dl - t2a * t2d * sc.d2sc1_dl2 - t2a * t2d2 * sc.dsc1_dl;
        let df1 = sc.d2sc2_dl2 * t1 * t2 + sc.dsc2_dl * dt1 * t2 + sc.dsc2_dl * t1 * dt2;
        let df2 = sc.dsc2_dl * dt1 * t2 + sc.sc2 * d2t1 * t2 + sc.sc2 * dt1 * dt2;
        let df3 = sc.dsc2_dl * t1 * dt2 + sc.sc2 * dt1 * dt2 + sc.sc2 * t1 * d2t2;
        let d2edl2 = eps * (df1 + df2 + df3);

        let dedldr = eps
            * (-sc.dsc2_dl * t2 * dt1_dr - sc.sc2 * dt2 * dt1_dr
                + 2.0 * sc.sc2 * t2 * dt1_dr * sc.dsc1_dl * t1d
                - sc.dsc2_dl * t1 * dt2_dr
                - sc.sc2 * dt1 * dt2_dr
                + 2.0 * sc.sc2 * t1 * dt2_dr * sc.dsc1_dl * t2d);

        LambdaDerivatives {
            dedl,
            d2edl2,
            dedldr,
        }
    }
}

/// First and second lambda derivatives of a pair energy, and the mixed
/// lambda/radial derivative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LambdaDerivatives {
    pub dedl: f64,
    pub d2edl2: f64,
    pub dedldr: f64,
}

/// Convenience evaluation of a tapered-free buffered 14-7 pair energy.
#[inline]
pub fn buffered_14_7(r: f64, radius: f64, eps: f64, alpha: f64, lambda5: f64) -> f64 {
    Buffered147::new(r, radius, alpha).energy(eps * lambda5)
}

/// Pairwise descreening integral of `1/x^6` over the part of a descreening
/// sphere of radius `sk`, at distance `r`, lying outside a base sphere of
/// `radius`.
pub fn descreening_integral(r: f64, radius: f64, sk: f64) -> f64 {
    if radius >= r + sk {
        return 0.0;
    }
    let upper = r + sk;
    let (full_shells, lower) = if radius + r < sk {
        let inner = sk - r;
        (
            4.0 * PI / 3.0 * (1.0 / radius.powi(3) - 1.0 / inner.powi(3)),
            inner,
        )
    } else if r < radius + sk {
        (0.0, radius)
    } else {
        (0.0, r - sk)
    };
    full_shells + shell_antiderivative(upper, r, sk) - shell_antiderivative(lower, r, sk)
}

fn shell_antiderivative(x: f64, r: f64, sk: f64) -> f64 {
    let x2 = x * x;
    let x3 = x2 * x;
    let x4 = x2 * x2;
    PI / r * (-(sk * sk - r * r) / (4.0 * x4) - 2.0 * r / (3.0 * x3) + 1.0 / (2.0 * x2))
}

/// Derivative of [`descreening_integral`] with respect to the separation `r`.
///
/// `r2` is `r * r`. The descreener fully inside the base sphere contributes
/// nothing; otherwise one of three closed forms applies (base sphere inside
/// the descreener, overlapping spheres, disjoint spheres) minus the
/// contribution of the fixed upper bound `r + sk`.
#[inline]
pub fn descreening_integral_derivative(r: f64, r2: f64, radius: f64, sk: f64) -> f64 {
    if radius >= r + sk {
        return 0.0;
    }
    let quarter_pi = 0.25 * PI;
    let sk2 = sk * sk;
    let mut de = if radius + r < sk {
        let u = sk - r;
        let u4 = u * u * u * u;
        -4.0 * PI / u4 + quarter_pi * (sk2 - 4.0 * sk * r + 17.0 * r2) / (r2 * u4)
    } else if r < radius + sk {
        let radius2 = radius * radius;
        let radius4 = radius2 * radius2;
        quarter_pi * (2.0 * radius2 - sk2 - r2) / (r2 * radius4)
    } else {
        let l = r - sk;
        let l4 = l * l * l * l;
        quarter_pi * (sk2 - 4.0 * sk * r + r2) / (r2 * l4)
    };
    let u = r + sk;
    let u4 = u * u * u * u;
    de -= quarter_pi * (sk2 + 4.0 * sk * r + r2) / (r2 * u4);
    de
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn central_difference(f: impl Fn(f64) -> f64, x: f64, h: f64) -> f64 {
        (f(x + h) - f(x - h)) / (2.0 * h)
    }

    #[test]
    fn buffered_14_7_at_minimum_distance_returns_negative_well_depth() {
        let energy = buffered_14_7(3.5, 3.5, 0.1, 0.0, 1.0);
        let expected = 0.1 * (T1_NUMERATOR / T1_NUMERATOR) * (1.12 / (1.0 + 0.12) - 2.0);
        assert!(f64_approx_equal(energy, expected));
        assert!(f64_approx_equal(energy, -0.1));
    }

    #[test]
    fn t1_numerator_matches_buffer_delta() {
        assert!((T1_NUMERATOR - (1.0 + BUFFER_DELTA).powi(7)).abs() < 1e-14);
    }

    #[test]
    fn buffered_14_7_is_repulsive_at_short_range() {
        assert!(buffered_14_7(2.0, 3.5, 0.1, 0.0, 1.0) > 0.0);
    }

    #[test]
    fn radial_derivative_matches_finite_difference() {
        let (radius, eps, alpha) = (3.6, 0.12, 0.3);
        let terms = Buffered147::new(4.1, radius, alpha);
        let numeric = central_difference(|r| Buffered147::new(r, radius, alpha).energy(eps), 4.1, 1e-6);
        assert!((numeric - terms.denergy_dr(eps)).abs() < 1e-7);
    }

    #[test]
    fn lambda_derivatives_match_finite_differences() {
        let (r, radius, eps, alpha, exponent, lambda) = (3.9, 3.6, 0.12, 0.7, 3.0, 0.63);
        let h = 1e-5;
        let energy = |l: f64, r: f64| {
            let sc = SoftcoreCoefficients::new(l, alpha, exponent).unwrap();
            Buffered147::new(r, radius, sc.sc1).energy(eps * sc.sc2)
        };
        let sc = SoftcoreCoefficients::new(lambda, alpha, exponent).unwrap();
        let derivs = Buffered147::new(r, radius, sc.sc1).lambda_derivatives(eps, &sc);

        let dedl = central_difference(|l| energy(l, r), lambda, h);
        assert!((dedl - derivs.dedl).abs() < 1e-7);

        let d2edl2 = (energy(lambda + h, r) - 2.0 * energy(lambda, r) + energy(lambda - h, r)) / (h * h);
        assert!((d2edl2 - derivs.d2edl2).abs() < 1e-4);

        let dedr = |l: f64| {
            let sc = SoftcoreCoefficients::new(l, alpha, exponent).unwrap();
            Buffered147::new(r, radius, sc.sc1).denergy_dr(eps * sc.sc2)
        };
        let dedldr = central_difference(dedr, lambda, h);
        assert!((dedldr - derivs.dedldr).abs() < 1e-7);
    }

    #[test]
    fn soft_pair_vanishes_at_zero_lambda_regardless_of_alpha() {
        for alpha in [0.05, 0.5, 2.0] {
            let sc = SoftcoreCoefficients::new(0.0, alpha, 1.0).unwrap();
            assert_eq!(buffered_14_7(1.0, 3.5, 0.2, sc.sc1, sc.sc2), 0.0);
        }
    }

    #[test]
    fn descreening_derivative_in_engulfed_branch_is_finite_and_negative() {
        let de = descreening_integral_derivative(1.0, 1.0, 1.0, 5.0);
        assert!(de.is_finite());
        assert!(de < 0.0);
        assert!((de + 0.009_469_017_209_17).abs() < 1e-12);
    }

    #[test]
    fn descreening_derivative_is_zero_when_descreener_is_inside_base_sphere() {
        assert_eq!(descreening_integral_derivative(0.5, 0.25, 3.0, 1.0), 0.0);
        assert_eq!(descreening_integral(0.5, 3.0, 1.0), 0.0);
    }

    #[test]
    fn descreening_derivative_matches_finite_difference_in_every_branch() {
        // (r, radius, sk): base inside descreener, overlap, disjoint.
        for (r, radius, sk) in [(1.0, 1.0, 5.0), (2.0, 1.7, 1.5), (4.0, 1.7, 1.5)] {
            let analytic = descreening_integral_derivative(r, r * r, radius, sk);
            let numeric = central_difference(|x| descreening_integral(x, radius, sk), r, 1e-6);
            assert!(
                (analytic - numeric).abs() < 1e-7,
                "r={r} radius={radius} sk={sk}: {analytic} vs {numeric}"
            );
        }
    }
}

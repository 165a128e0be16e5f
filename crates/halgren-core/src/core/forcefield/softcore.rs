//! Alchemical softcore scaling of van der Waals pairs.
//!
//! A soft pair is evaluated with a buffered distance offset `sc1` and an
//! energy prefactor `sc2`:
//!
//! - `sc1 = alpha * (1 - lambda)^2`
//! - `sc2 = lambda^exponent`
//!
//! so that `lambda = 1` recovers the unscaled potential and `lambda = 0`
//! removes the soft pair altogether.

/// Softcore coefficients and their first and second lambda derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftcoreCoefficients {
    pub lambda: f64,
    pub sc1: f64,
    pub dsc1_dl: f64,
    pub d2sc1_dl2: f64,
    pub sc2: f64,
    pub dsc2_dl: f64,
    pub d2sc2_dl2: f64,
}

impl SoftcoreCoefficients {
    /// Derives the coefficients for `lambda`, or `None` if it lies outside `[0, 1]`.
    pub fn new(lambda: f64, alpha: f64, exponent: f64) -> Option<Self> {
        if !(0.0..=1.0).contains(&lambda) {
            return None;
        }
        let one_minus = 1.0 - lambda;
        let d2sc2_dl2 = if exponent >= 2.0 {
            exponent * (exponent - 1.0) * lambda.powf(exponent - 2.0)
        } else {
            0.0
        };
        Some(Self {
            lambda,
            sc1: alpha * one_minus * one_minus,
            dsc1_dl: -2.0 * alpha * one_minus,
            d2sc1_dl2: 2.0 * alpha,
            sc2: lambda.powf(exponent),
            dsc2_dl: exponent * lambda.powf(exponent - 1.0),
            d2sc2_dl2,
        })
    }

    /// Coefficients of a fully coupled system; soft pairs behave as hard ones.
    pub fn fully_coupled() -> Self {
        Self {
            lambda: 1.0,
            sc1: 0.0,
            dsc1_dl: 0.0,
            d2sc1_dl2: 0.0,
            sc2: 1.0,
            dsc2_dl: 0.0,
            d2sc2_dl2: 0.0,
        }
    }
}

/// Per-atom softcore participation, indexed by whether the outer atom is soft.
///
/// For an outer atom in state `s`, `row(s)[k]` tells whether inner atom `k`
/// makes the pair soft. A soft atom is soft against hard atoms only; two soft
/// atoms interact with full strength, like two hard atoms do.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftcoreMask {
    hard: Vec<bool>,
    soft: Vec<bool>,
}

impl SoftcoreMask {
    pub fn from_flags(is_soft: &[bool]) -> Self {
        Self {
            hard: is_soft.to_vec(),
            soft: is_soft.iter().map(|s| !s).collect(),
        }
    }

    #[inline]
    pub fn row(&self, outer_is_soft: bool) -> &[bool] {
        if outer_is_soft { &self.soft } else { &self.hard }
    }

    pub fn len(&self) -> usize {
        self.hard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hard.is_empty()
    }
}

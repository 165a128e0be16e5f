use super::potentials::Buffered147;
use super::switch::MultiplicativeSwitch;
use super::type_table::VdwTypeTable;
use std::f64::consts::PI;

/// Upper limit of the tail integral in Angstroms.
const MAX_INTEGRATION_RADIUS: f64 = 60.0;
/// Number of integration steps per Angstrom.
const STEPS_PER_ANGSTROM: f64 = 100.0;

/// Tail integral `int 4 pi r^2 u(r) (1 - S(r)) dr` from the switch start to
/// the integration limit, for one type pair, by the trapezoidal rule.
pub fn tail_integral(table: &VdwTypeTable, switch: &MultiplicativeSwitch, ti: usize, tk: usize) -> f64 {
    let cut = switch.cut();
    let steps = (STEPS_PER_ANGSTROM * (MAX_INTEGRATION_RADIUS - cut)) as usize;
    if steps == 0 {
        return 0.0;
    }
    let del_r = (MAX_INTEGRATION_RADIUS - cut) / steps as f64;
    let radius = table.radius(ti, tk);
    let eps = table.epsilon(ti, tk);
    let off2 = switch.off2();

    let sum: f64 = (0..=steps)
        .map(|k| {
            let r = cut + k as f64 * del_r;
            let r2 = r * r;
            let eij = Buffered147::new(r, radius, 0.0).energy(eps);
            let outside = if r2 < off2 {
                1.0 - switch.evaluate(r, r2).0
            } else {
                1.0
            };
            let e = 4.0 * PI * r2 * eij * outside;
            if k == 0 || k == steps { 0.5 * e } else { e }
        })
        .sum();
    del_r * sum
}

/// Counts of atoms per vdW type used by the long-range correction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeCounts {
    pub all: Vec<usize>,
    pub soft: Vec<usize>,
}

impl TypeCounts {
    pub fn new(num_types: usize) -> Self {
        Self {
            all: vec![0; num_types],
            soft: vec![0; num_types],
        }
    }

    pub fn add(&mut self, type_index: usize, soft: bool) {
        self.all[type_index] += 1;
        if soft {
            self.soft[type_index] += 1;
        }
    }
}

/// Isotropic long-range dispersion correction per asymmetric unit.
///
/// The pair sum over type counts is scaled by `num_sym_ops / volume`. Soft
/// atoms are removed in proportion to `1 - lambda`.
pub fn long_range_correction(
    table: &VdwTypeTable,
    switch: &MultiplicativeSwitch,
    counts: &TypeCounts,
    lambda: f64,
    num_sym_ops: usize,
    volume: f64,
) -> f64 {
    let n = table.num_types();
    let mut total = 0.0;
    for i in 0..n {
        for j in 0..n {
            if counts.all[i] == 0 || counts.all[j] == 0 {
                continue;
            }
            let trapezoid = tail_integral(table, switch, i, j);
            let (ni, nj) = (counts.all[i] as f64, counts.all[j] as f64);
            let (si, sj) = (counts.soft[i] as f64, counts.soft[j] as f64);
            total += ni * nj * trapezoid;
            if lambda < 1.0 {
                total -= (si * nj + (ni - si) * sj) * (1.0 - lambda) * trapezoid;
            }
        }
    }
    0.5 * total * num_sym_ops as f64 / volume
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::{Forcefield, VdwClassParam};

    fn table() -> VdwTypeTable {
        let params = [(1, 3.8, 0.1), (2, 3.0, 0.05)].into_iter().map(|(class, radius, well_depth)| {
            VdwClassParam {
                class,
                radius,
                well_depth,
                reduction: 0.0,
            }
        });
        VdwTypeTable::from_forcefield(&Forcefield::from_params(params, "test").unwrap())
    }

    #[test]
    fn tail_integral_is_attractive_and_matches_dispersion_estimate() {
        let table = table();
        let switch = MultiplicativeSwitch::from_taper(12.0, 0.9);
        let tail = tail_integral(&table, &switch, 0, 0);
        assert!(tail < 0.0);
        // Far from contact the potential approaches -2 eps t1n rv^7 / r^7.
        let rv7 = 3.8f64.powi(7);
        let c7 = 2.0 * 0.1 * 1.07f64.powi(7) * rv7;
        let analytic_tail = -4.0 * PI * c7 / (4.0 * 12.0f64.powi(4));
        assert!(tail > 2.0 * analytic_tail && tail < 0.0);
    }

    #[test]
    fn correction_is_symmetric_in_type_order_and_scales_with_volume() {
        let table = table();
        let switch = MultiplicativeSwitch::from_taper(9.0, 0.9);
        let mut counts = TypeCounts::new(2);
        for _ in 0..10 {
            counts.add(0, false);
        }
        for _ in 0..4 {
            counts.add(1, false);
        }
        let small = long_range_correction(&table, &switch, &counts, 1.0, 1, 1000.0);
        let large = long_range_correction(&table, &switch, &counts, 1.0, 1, 2000.0);
        assert!((small - 2.0 * large).abs() < 1e-12 * small.abs());

        let expected = 0.5
            * (100.0 * tail_integral(&table, &switch, 0, 0)
                + 40.0 * tail_integral(&table, &switch, 0, 1)
                + 40.0 * tail_integral(&table, &switch, 1, 0)
                + 16.0 * tail_integral(&table, &switch, 1, 1))
            / 1000.0;
        assert!((small - expected).abs() < 1e-12 * expected.abs());
    }

    #[test]
    fn soft_atoms_are_removed_at_zero_lambda() {
        let table = table();
        let switch = MultiplicativeSwitch::from_taper(9.0, 0.9);
        let mut counts = TypeCounts::new(2);
        counts.add(0, false);
        counts.add(0, false);
        counts.add(1, true);

        let coupled = long_range_correction(&table, &switch, &counts, 1.0, 2, 500.0);
        let decoupled = long_range_correction(&table, &switch, &counts, 0.0, 2, 500.0);
        // Only pairs of hard atoms survive.
        let t00 = tail_integral(&table, &switch, 0, 0);
        let expected = 0.5 * 4.0 * t00 * 2.0 / 500.0;
        assert!((decoupled - expected).abs() < 1e-12 * expected.abs());
        assert!(coupled < decoupled);
    }
}

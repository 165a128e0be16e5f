//! Chain-rule gradient of Generalized Kirkwood Born radii.
//!
//! With Grycuk's descreening, `4pi/3 / b_i^3 = 4pi/3 / r_i^3 - sum_k I_ik`,
//! where `I_ik` is the integral of `1/x^6` over the part of descreener `k`'s
//! scaled sphere outside atom `i`'s base sphere. Given `dE/db_i` from the
//! solvation pass, this module scatters `dE/db_i * db_i/dx` onto Cartesian
//! gradients, reusing the van der Waals neighbor lists.

use super::accumulator::ThreadAccumulator;
use super::config::NonbondedConfig;
use super::coordinates::{ReductionMap, SymmetryCopies};
use super::error::EngineError;
use super::schedule::{LoadBalancedSchedule, WorkRange};
use super::vdw::VanDerWaals;
use crate::core::crystal::Crystal;
use crate::core::forcefield::potentials::descreening_integral_derivative;
use crate::core::models::system::MolecularSystem;
use nalgebra::{Matrix3, Point3, Vector3};
use rayon::prelude::*;
use std::f64::consts::PI;
use tracing::{debug, error, instrument, warn};

/// Born radii at or above this size are treated as fully desolvated.
pub const MAX_BORN_RADIUS: f64 = 50.0;

const PI4_3: f64 = 4.0 * PI / 3.0;

/// Per-atom inputs of the chain-rule pass, all indexed by atom.
#[derive(Debug, Clone, Copy)]
pub struct BornInputs<'a> {
    pub born_radii: &'a [f64],
    /// `dE/db_i`, already summed over every pairwise radius contribution.
    pub born_gradient: &'a [f64],
    pub base_radii: &'a [f64],
    pub overlap_scales: &'a [f64],
}

#[derive(Debug)]
pub struct BornGradient {
    cutoff: f64,
    descreen_vdw: bool,
    descreen_hydrogen: bool,
    descreen_12: bool,
    native_environment_approximation: bool,
    unreduced: ReductionMap,
    copies: SymmetryCopies,
    schedule: LoadBalancedSchedule,
    workers: Vec<ThreadAccumulator>,
}

impl BornGradient {
    /// Creates the pass for the atoms and lists of `vdw`.
    ///
    /// The Born cutoff is clamped to the vdW neighbor-list radius, since
    /// pairs beyond it are never listed.
    pub fn new(system: &MolecularSystem, vdw: &VanDerWaals, config: &NonbondedConfig) -> Self {
        let mut cutoff = config.gk_cutoff_for(vdw.crystal());
        let list_radius = vdw.neighbor_list().radius_in(vdw.crystal());
        if cutoff > list_radius {
            warn!(
                cutoff,
                list_radius, "Born gradient cutoff exceeds the vdW neighbor-list radius; clamped."
            );
            cutoff = list_radius;
        }
        let threads = vdw.team().threads();
        let n = system.num_atoms();
        Self {
            cutoff,
            descreen_vdw: config.descreen_vdw,
            descreen_hydrogen: config.descreen_hydrogen,
            descreen_12: config.descreen_12,
            native_environment_approximation: config.native_environment_approximation,
            unreduced: ReductionMap::new(system, &[]),
            copies: SymmetryCopies::new(),
            schedule: LoadBalancedSchedule::new(threads, vec![0; n], config.load_balance),
            workers: vec![ThreadAccumulator::new(n); threads],
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Adds the Born-radius chain-rule gradient to every atom of `system`.
    ///
    /// The vdW neighbor list is refreshed first if atoms moved too far.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NonFiniteBornGradient`] if `dE/db` of a
    /// participating atom is not finite, and [`EngineError::TopologyMismatch`]
    /// if an input array does not match the atom count.
    #[instrument(skip_all, name = "born_gradient")]
    pub fn compute(
        &mut self,
        system: &mut MolecularSystem,
        vdw: &mut VanDerWaals,
        inputs: &BornInputs<'_>,
    ) -> Result<(), EngineError> {
        let n = system.num_atoms();
        for (what, len) in [
            ("born radii", inputs.born_radii.len()),
            ("born gradient", inputs.born_gradient.len()),
            ("base radii", inputs.base_radii.len()),
            ("overlap scales", inputs.overlap_scales.len()),
            ("vdw atoms", vdw.atom_types().len()),
        ] {
            if len != n {
                return Err(EngineError::TopologyMismatch {
                    what,
                    expected: n,
                    found: len,
                });
            }
        }

        let native = self.native_environment_approximation;
        let use_flags = vdw.use_flags();
        if let Some((atom, &value)) = inputs
            .born_gradient
            .iter()
            .enumerate()
            .find(|(i, g)| (native || use_flags[*i]) && !g.is_finite())
        {
            error!(atom, value, "Born radius chain-rule term is not finite.");
            return Err(EngineError::NonFiniteBornGradient { atom, value });
        }

        vdw.update_neighbor_list(system, false)?;

        let atoms = system.atoms();
        let descreen_radii: Vec<f64> = (0..n)
            .map(|i| {
                let radius = if self.descreen_vdw {
                    vdw.type_table().class_radius(vdw.atom_types()[i]) / 2.0
                } else {
                    inputs.base_radii[i]
                };
                radius * inputs.overlap_scales[i]
            })
            .collect();
        let factor = -PI.cbrt() * 6.0f64.powf(2.0 / 3.0) / 9.0;
        let terms: Vec<f64> = inputs
            .born_radii
            .iter()
            .map(|&rb| factor / (PI4_3 / (rb * rb * rb)).powf(4.0 / 3.0))
            .collect();
        let hydrogen: Vec<bool> = atoms.iter().map(|a| a.hydrogen).collect();
        let bonded: Vec<&[usize]> = (0..n).map(|i| system.bonded_neighbors(i).unwrap_or(&[])).collect();

        let positions = system.positions();
        {
            let (copies, crystal, unreduced) = (&mut self.copies, vdw.crystal(), &self.unreduced);
            vdw.team().install(|| copies.update(crystal, unreduced, &positions));
        }

        for worker in &mut self.workers {
            worker.reset(n, true, false);
        }
        let threads = vdw.team().threads();
        self.schedule.set_weights(vdw.schedule_weights().to_vec());
        self.schedule.start(threads, WorkRange::of_len(n));

        let kernel = BornKernel {
            crystal: vdw.crystal(),
            transforms: vdw.transforms(),
            coordinates: self.copies.copies(),
            lists: vdw.neighbor_list().lists(),
            use_flags: vdw.use_flags(),
            native,
            cut2: self.cutoff * self.cutoff,
            descreen_hydrogen: self.descreen_hydrogen,
            descreen_12: self.descreen_12,
            inputs,
            descreen_radii: &descreen_radii,
            terms: &terms,
            hydrogen: &hydrogen,
            bonded: &bonded,
        };
        let schedule = &self.schedule;
        vdw.team().execute(&mut self.workers, |thread, acc| {
            if let Some(range) = schedule.next(thread) {
                kernel.run(range, acc);
            }
            Ok(())
        })?;

        let workers = &self.workers;
        let atoms = system.atoms_mut();
        vdw.team().install(|| {
            atoms.par_iter_mut().enumerate().for_each(|(i, atom)| {
                for w in workers {
                    atom.add_to_gradient(&w.gradient[i]);
                }
            });
        });
        debug!(atoms = n, cutoff = self.cutoff, "Born radii chain-rule gradient complete.");
        Ok(())
    }
}

struct BornKernel<'a> {
    crystal: &'a Crystal,
    transforms: &'a [Matrix3<f64>],
    coordinates: &'a [Vec<Point3<f64>>],
    lists: &'a [Vec<Vec<usize>>],
    use_flags: &'a [bool],
    native: bool,
    cut2: f64,
    descreen_hydrogen: bool,
    descreen_12: bool,
    inputs: &'a BornInputs<'a>,
    descreen_radii: &'a [f64],
    terms: &'a [f64],
    hydrogen: &'a [bool],
    bonded: &'a [&'a [usize]],
}

impl BornKernel<'_> {
    #[inline]
    fn active(&self, atom: usize) -> bool {
        self.native || self.use_flags[atom]
    }

    #[inline]
    fn descreens(&self, descreener: usize) -> bool {
        self.descreen_hydrogen || !self.hydrogen[descreener]
    }

    fn run(&self, range: WorkRange, acc: &mut ThreadAccumulator) {
        let Some(unit) = self.coordinates.first() else {
            return;
        };
        for (s, (image, lists)) in self.coordinates.iter().zip(self.lists).enumerate() {
            let transform = &self.transforms[s];
            for i in range.iter() {
                if !self.active(i) {
                    continue;
                }
                let rbi = self.inputs.born_radii[i];
                for &k in &lists[i] {
                    if !self.active(k) {
                        continue;
                    }
                    if k == i {
                        // A self image only descreens the atom itself.
                        if s > 0 && rbi < MAX_BORN_RADIUS && self.descreens(k) {
                            if let Some((dx, r, r2)) = self.separation(&unit[i], &image[k]) {
                                self.descreen(acc, i, k, i, k, &dx, r, r2, transform);
                            }
                        }
                        continue;
                    }
                    // Bonds join atoms of the asymmetric unit only; an image of a
                    // bonded partner is a different atom and still descreens.
                    if s == 0 && !self.descreen_12 && self.bonded[i].contains(&k) {
                        continue;
                    }
                    let Some((dx, r, r2)) = self.separation(&unit[i], &image[k]) else {
                        continue;
                    };
                    if rbi < MAX_BORN_RADIUS && self.descreens(k) {
                        self.descreen(acc, i, k, i, k, &dx, r, r2, transform);
                    }
                    if self.inputs.born_radii[k] < MAX_BORN_RADIUS && self.descreens(i) {
                        self.descreen(acc, i, k, k, i, &dx, r, r2, transform);
                    }
                }
            }
        }
    }

    /// Separation `x_k - x_i` (minimum image) if within the cutoff.
    #[inline]
    fn separation(&self, xi: &Point3<f64>, xk: &Point3<f64>) -> Option<(Vector3<f64>, f64, f64)> {
        let mut dx = xk - xi;
        let r2 = self.crystal.image(&mut dx);
        (r2 <= self.cut2).then(|| (dx, r2.sqrt(), r2))
    }

    /// Adds the gradient of `descreened`'s Born radius due to `descreener`.
    ///
    /// `i` is the outer atom and `k` the listed partner; the force acts along
    /// `dx = x_k - x_i` regardless of which of the two is descreened.
    #[allow(clippy::too_many_arguments)]
    #[inline]
    fn descreen(
        &self,
        acc: &mut ThreadAccumulator,
        i: usize,
        k: usize,
        descreened: usize,
        descreener: usize,
        dx: &Vector3<f64>,
        r: f64,
        r2: f64,
        transform: &Matrix3<f64>,
    ) {
        let de = descreening_integral_derivative(
            r,
            r2,
            self.inputs.base_radii[descreened],
            self.descreen_radii[descreener],
        );
        let de = self.terms[descreened] * de / r * self.inputs.born_gradient[descreened];
        if !de.is_finite() {
            warn!(descreened, descreener, r, de, "Born radii chain-rule term is unstable.");
            return;
        }
        let ded = dx * de;
        acc.gradient[i] += ded;
        acc.gradient[k] -= transform.transpose() * ded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::{Forcefield, VdwClassParam};
    use crate::core::forcefield::potentials::descreening_integral;
    use crate::core::models::atom::Atom;

    fn forcefield() -> Forcefield {
        let params = [(1, 3.4, 0.1, 0.0), (2, 2.6, 0.02, 0.0)].into_iter().map(
            |(class, radius, well_depth, reduction)| VdwClassParam {
                class,
                radius,
                well_depth,
                reduction,
            },
        );
        Forcefield::from_params(params, "test").unwrap()
    }

    fn config() -> NonbondedConfig {
        NonbondedConfig {
            threads: Some(2),
            ..NonbondedConfig::default()
        }
    }

    fn molecule() -> MolecularSystem {
        let mut system = MolecularSystem::new();
        let positions = [
            (0.0, 0.0, 0.0, false),
            (1.5, 0.2, 0.0, false),
            (2.1, 1.6, 0.3, false),
            (-0.6, -0.9, 0.5, true),
            (3.4, 1.9, -0.8, false),
            (0.4, 2.5, 1.7, true),
        ];
        for (i, (x, y, z, h)) in positions.into_iter().enumerate() {
            let class = if h { 2 } else { 1 };
            system.add_atom(
                Atom::new(&format!("A{i}"), Point3::new(x, y, z))
                    .with_vdw_class(class)
                    .with_hydrogen(h),
            );
        }
        system.add_bond(0, 1).unwrap();
        system.add_bond(1, 2).unwrap();
        system.add_bond(0, 3).unwrap();
        system.add_bond(2, 4).unwrap();
        system.add_bond(2, 5).unwrap();
        system
    }

    fn base_radii(system: &MolecularSystem) -> Vec<f64> {
        system.atoms().iter().map(|a| if a.hydrogen { 1.1 } else { 1.7 }).collect()
    }

    /// Grycuk Born radii summed over every ordered pair.
    fn born_radii(system: &MolecularSystem, base: &[f64], scales: &[f64]) -> Vec<f64> {
        let atoms = system.atoms();
        (0..atoms.len())
            .map(|i| {
                let descreening: f64 = (0..atoms.len())
                    .filter(|&k| k != i)
                    .map(|k| {
                        let r = (atoms[k].position - atoms[i].position).norm();
                        descreening_integral(r, base[i], base[k] * scales[k])
                    })
                    .sum();
                let tsum = PI4_3 / base[i].powi(3) - descreening;
                (PI4_3 / tsum).cbrt()
            })
            .collect()
    }

    fn setup(system: &MolecularSystem, cfg: &NonbondedConfig) -> (VanDerWaals, BornGradient) {
        let vdw = VanDerWaals::new(system, &forcefield(), Crystal::aperiodic(40.0), cfg.clone()).unwrap();
        let born = BornGradient::new(system, &vdw, cfg);
        (vdw, born)
    }

    #[test]
    fn gradient_matches_finite_difference_of_weighted_born_radii() {
        let mut system = molecule();
        let n = system.num_atoms();
        let base = base_radii(&system);
        let scales = vec![0.69; n];
        let weights = [0.8, -1.3, 0.4, 2.0, -0.7, 1.1];
        let (mut vdw, mut born) = setup(&system, &config());

        let radii = born_radii(&system, &base, &scales);
        let inputs = BornInputs {
            born_radii: &radii,
            born_gradient: &weights,
            base_radii: &base,
            overlap_scales: &scales,
        };
        born.compute(&mut system, &mut vdw, &inputs).unwrap();
        let analytic: Vec<Vector3<f64>> = system.atoms().iter().map(|a| *a.gradient()).collect();

        let objective = |s: &MolecularSystem| -> f64 {
            born_radii(s, &base, &scales)
                .iter()
                .zip(&weights)
                .map(|(b, w)| b * w)
                .sum()
        };
        let h = 1e-6;
        for atom in 0..n {
            for axis in 0..3 {
                let original = system.atoms()[atom].position;
                system.atoms_mut()[atom].position[axis] = original[axis] + h;
                let plus = objective(&system);
                system.atoms_mut()[atom].position[axis] = original[axis] - h;
                let minus = objective(&system);
                system.atoms_mut()[atom].position = original;
                let numeric = (plus - minus) / (2.0 * h);
                assert!(
                    (numeric - analytic[atom][axis]).abs() < 1e-6,
                    "atom {atom} axis {axis}: numeric {numeric} analytic {}",
                    analytic[atom][axis]
                );
            }
        }
        let total: Vector3<f64> = analytic.iter().sum();
        assert!(total.norm() < 1e-10);
    }

    /// Born radii with every symmetry image within `cutoff` descreening.
    fn periodic_born_radii(
        system: &MolecularSystem,
        crystal: &Crystal,
        base: &[f64],
        scales: &[f64],
        cutoff: f64,
    ) -> Vec<f64> {
        let positions = system.positions();
        let images: Vec<Vec<Point3<f64>>> = crystal
            .sym_ops()
            .iter()
            .map(|op| positions.iter().map(|p| crystal.apply_sym_op(p, op)).collect())
            .collect();
        (0..positions.len())
            .map(|i| {
                let bonded = system.bonded_neighbors(i).unwrap_or(&[]);
                let mut descreening = 0.0;
                for (s, image) in images.iter().enumerate() {
                    for (k, xk) in image.iter().enumerate() {
                        if s == 0 && (k == i || bonded.contains(&k)) {
                            continue;
                        }
                        let mut dx = xk - positions[i];
                        let r2 = crystal.image(&mut dx);
                        if r2 <= cutoff * cutoff {
                            descreening += descreening_integral(r2.sqrt(), base[i], base[k] * scales[k]);
                        }
                    }
                }
                (PI4_3 / (PI4_3 / base[i].powi(3) - descreening)).cbrt()
            })
            .collect()
    }

    #[test]
    fn periodic_gradient_matches_finite_difference_over_symmetry_images() {
        let cutoff = 4.4;
        let offset = Vector3::new(1.2, 1.0, 0.9);
        for space_group in ["P21", "P-1"] {
            let crystal = Crystal::new(9.0, 10.0, 11.0, 90.0, 101.0, 90.0, space_group).unwrap();
            let mut system = molecule();
            for atom in system.atoms_mut() {
                atom.position += offset;
            }
            let n = system.num_atoms();
            let base = base_radii(&system);
            let scales = vec![0.69; n];
            let weights = [0.8, -1.3, 0.4, 2.0, -0.7, 1.1];
            let cfg = NonbondedConfig {
                vdw_cutoff: Some(cutoff),
                descreen_12: false,
                ..config()
            };
            let mut vdw = VanDerWaals::new(&system, &forcefield(), crystal.clone(), cfg.clone()).unwrap();
            let mut born = BornGradient::new(&system, &vdw, &cfg);
            assert_eq!(born.cutoff(), cutoff);

            let radii = periodic_born_radii(&system, &crystal, &base, &scales, cutoff);
            let inputs = BornInputs {
                born_radii: &radii,
                born_gradient: &weights,
                base_radii: &base,
                overlap_scales: &scales,
            };
            born.compute(&mut system, &mut vdw, &inputs).unwrap();
            let analytic: Vec<Vector3<f64>> = system.atoms().iter().map(|a| *a.gradient()).collect();

            let objective = |s: &MolecularSystem| -> f64 {
                periodic_born_radii(s, &crystal, &base, &scales, cutoff)
                    .iter()
                    .zip(&weights)
                    .map(|(b, w)| b * w)
                    .sum()
            };
            let h = 1e-6;
            for atom in 0..n {
                for axis in 0..3 {
                    let original = system.atoms()[atom].position;
                    system.atoms_mut()[atom].position[axis] = original[axis] + h;
                    let plus = objective(&system);
                    system.atoms_mut()[atom].position[axis] = original[axis] - h;
                    let minus = objective(&system);
                    system.atoms_mut()[atom].position = original;
                    let numeric = (plus - minus) / (2.0 * h);
                    assert!(
                        (numeric - analytic[atom][axis]).abs() < 1e-6,
                        "{space_group} atom {atom} axis {axis}: numeric {numeric} analytic {}",
                        analytic[atom][axis]
                    );
                }
            }
        }
    }

    #[test]
    fn self_image_descreens_its_atom_once() {
        let crystal = Crystal::new(9.0, 10.0, 11.0, 90.0, 101.0, 90.0, "P-1").unwrap();
        let mut system = MolecularSystem::new();
        system.add_atom(Atom::new("C", Point3::new(1.2, 1.0, 0.9)).with_vdw_class(1));
        let cfg = NonbondedConfig {
            vdw_cutoff: Some(4.4),
            ..config()
        };
        let mut vdw = VanDerWaals::new(&system, &forcefield(), crystal.clone(), cfg.clone()).unwrap();
        let mut born = BornGradient::new(&system, &vdw, &cfg);
        let (base, scales, weights) = ([1.7], [0.69], [1.0]);
        let radii = periodic_born_radii(&system, &crystal, &base, &scales, 4.4);
        let inputs = BornInputs {
            born_radii: &radii,
            born_gradient: &weights,
            base_radii: &base,
            overlap_scales: &scales,
        };
        born.compute(&mut system, &mut vdw, &inputs).unwrap();

        // The inversion image sits at -x; moving x moves the image the other way.
        let x = Vector3::new(1.2, 1.0, 0.9);
        let dx: Vector3<f64> = -2.0 * x;
        let r = dx.norm();
        let de = descreening_integral_derivative(r, r * r, 1.7, 1.7 * 0.69);
        let factor = -PI.cbrt() * 6.0f64.powf(2.0 / 3.0) / 9.0;
        let term = factor / (PI4_3 / radii[0].powi(3)).powf(4.0 / 3.0);
        let expected = dx * (2.0 * term * de / r);
        assert!((system.atoms()[0].gradient() - expected).norm() < 1e-12);
    }

    #[test]
    fn non_finite_chain_rule_input_aborts_with_the_atom() {
        let mut system = molecule();
        let n = system.num_atoms();
        let base = base_radii(&system);
        let scales = vec![0.69; n];
        let radii = born_radii(&system, &base, &scales);
        let mut weights = vec![1.0; n];
        weights[4] = f64::NAN;
        let (mut vdw, mut born) = setup(&system, &config());
        let inputs = BornInputs {
            born_radii: &radii,
            born_gradient: &weights,
            base_radii: &base,
            overlap_scales: &scales,
        };
        let result = born.compute(&mut system, &mut vdw, &inputs);
        assert!(matches!(result, Err(EngineError::NonFiniteBornGradient { atom: 4, .. })));
        assert!(system.atoms().iter().all(|a| *a.gradient() == Vector3::zeros()));
    }

    #[test]
    fn exemptions_remove_bonded_and_hydrogen_descreening() {
        let mut system = MolecularSystem::new();
        system.add_atom(Atom::new("C", Point3::origin()).with_vdw_class(1));
        system.add_atom(
            Atom::new("H", Point3::new(1.1, 0.0, 0.0))
                .with_vdw_class(2)
                .with_hydrogen(true),
        );
        system.add_bond(0, 1).unwrap();
        let base = [1.7, 1.1];
        let scales = [0.69, 0.69];
        let radii = born_radii(&system, &base, &scales);
        let weights = [1.0, 1.0];
        let inputs = BornInputs {
            born_radii: &radii,
            born_gradient: &weights,
            base_radii: &base,
            overlap_scales: &scales,
        };

        let cfg = NonbondedConfig {
            descreen_12: false,
            ..config()
        };
        let (mut vdw, mut born) = setup(&system, &cfg);
        born.compute(&mut system, &mut vdw, &inputs).unwrap();
        assert!(system.atoms().iter().all(|a| *a.gradient() == Vector3::zeros()));

        // Without hydrogen descreening only the hydrogen feels the carbon.
        let cfg = NonbondedConfig {
            descreen_hydrogen: false,
            ..config()
        };
        let (mut vdw, mut born) = setup(&system, &cfg);
        born.compute(&mut system, &mut vdw, &inputs).unwrap();
        let r = 1.1;
        let de = descreening_integral_derivative(r, r * r, 1.1, 1.7 * 0.69);
        let factor = -PI.cbrt() * 6.0f64.powf(2.0 / 3.0) / 9.0;
        let term = factor / (PI4_3 / radii[1].powi(3)).powf(4.0 / 3.0);
        let expected = term * de / r * 1.1;
        assert!((system.atoms()[0].gradient().x - expected).abs() < 1e-12);
        assert!((system.atoms()[1].gradient().x + expected).abs() < 1e-12);
    }

    #[test]
    fn fully_desolvated_atoms_are_skipped() {
        let mut system = molecule();
        let n = system.num_atoms();
        let base = base_radii(&system);
        let scales = vec![0.69; n];
        let radii = vec![MAX_BORN_RADIUS; n];
        let weights = vec![1.0; n];
        let (mut vdw, mut born) = setup(&system, &config());
        let inputs = BornInputs {
            born_radii: &radii,
            born_gradient: &weights,
            base_radii: &base,
            overlap_scales: &scales,
        };
        born.compute(&mut system, &mut vdw, &inputs).unwrap();
        assert!(system.atoms().iter().all(|a| *a.gradient() == Vector3::zeros()));
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let mut system = molecule();
        let (mut vdw, mut born) = setup(&system, &config());
        let short = [1.0; 2];
        let inputs = BornInputs {
            born_radii: &short,
            born_gradient: &short,
            base_radii: &short,
            overlap_scales: &short,
        };
        assert!(matches!(
            born.compute(&mut system, &mut vdw, &inputs),
            Err(EngineError::TopologyMismatch { what: "born radii", .. })
        ));
    }

    #[test]
    fn cutoff_is_clamped_to_the_list_radius() {
        let system = molecule();
        let cfg = NonbondedConfig {
            vdw_cutoff: Some(6.0),
            gk_cutoff: Some(12.0),
            ..config()
        };
        let (vdw, born) = setup(&system, &cfg);
        assert_eq!(born.cutoff(), vdw.neighbor_list().radius());
    }
}

use super::accumulator::{ThreadAccumulator, reduce_scalars, reduce_vectors};
use super::config::NonbondedConfig;
use super::coordinates::{ReductionMap, SymmetryCopies};
use super::error::EngineError;
use super::neighbors::NeighborList;
use super::schedule::{LoadBalancedSchedule, WorkRange};
use super::team::ParallelTeam;
use crate::core::crystal::Crystal;
use crate::core::forcefield::long_range::{TypeCounts, long_range_correction};
use crate::core::forcefield::params::Forcefield;
use crate::core::forcefield::potentials::Buffered147;
use crate::core::forcefield::softcore::{SoftcoreCoefficients, SoftcoreMask};
use crate::core::forcefield::switch::MultiplicativeSwitch;
use crate::core::forcefield::type_table::VdwTypeTable;
use crate::core::models::system::MolecularSystem;
use nalgebra::{Matrix3, Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info, instrument, trace, warn};

/// Buffered 14-7 van der Waals energy, gradient and lambda derivatives.
///
/// The engine is built once per topology and then evaluated many times as
/// coordinates, lambda or the unit cell change. Each evaluation runs the same
/// fixed phases: reduce and expand coordinates, refresh the neighbor list if
/// it went stale, run the pair kernel over the load-balanced schedule, and
/// merge the per-worker accumulators in thread order.
#[derive(Debug)]
pub struct VanDerWaals {
    config: NonbondedConfig,
    crystal: Crystal,
    table: VdwTypeTable,
    switch: MultiplicativeSwitch,
    types: Vec<usize>,
    is_soft: Vec<bool>,
    softcore_mask: Option<SoftcoreMask>,
    molecules: Vec<usize>,
    exclusions: Vec<Vec<usize>>,
    reduction: ReductionMap,
    use_flags: Vec<bool>,
    intermolecular_softcore: bool,
    softcore: SoftcoreCoefficients,
    type_counts: TypeCounts,
    long_range: f64,
    dlong_range_dl: f64,
    transforms: Vec<Matrix3<f64>>,
    copies: SymmetryCopies,
    neighbors: NeighborList,
    force_rebuild: bool,
    schedule: LoadBalancedSchedule,
    team: ParallelTeam,
    workers: Vec<ThreadAccumulator>,
    energy: f64,
    interactions: usize,
    dedl: f64,
    d2edl2: f64,
    lambda_gradient: Vec<Vector3<f64>>,
}

impl VanDerWaals {
    /// Builds the engine for `system`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingVdwType`] for the first atom without a
    /// vdW class or without parameters for its class, and
    /// [`EngineError::Config`] for configuration values that cannot be used.
    pub fn new(
        system: &MolecularSystem,
        forcefield: &Forcefield,
        crystal: Crystal,
        config: NonbondedConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let config = config.normalized();
        let table = VdwTypeTable::from_forcefield(forcefield);
        let n = system.num_atoms();

        let types = system
            .atoms()
            .iter()
            .enumerate()
            .map(|(atom, a)| {
                a.vdw_class
                    .and_then(|class| table.type_index(class))
                    .ok_or(EngineError::MissingVdwType {
                        atom,
                        class: a.vdw_class,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let is_soft: Vec<bool> = system.atoms().iter().map(|a| a.softcore).collect();
        let exclusions = (0..n)
            .map(|i| {
                let mut excluded = system.bonded_neighbors(i).unwrap_or(&[]).to_vec();
                excluded.extend(system.angle_partners(i));
                excluded.sort_unstable();
                excluded.dedup();
                excluded
            })
            .collect();
        let factors: Vec<f64> = types.iter().map(|&t| table.reduction(t)).collect();
        let reduction = ReductionMap::new(system, &factors);

        let mut type_counts = TypeCounts::new(table.num_types());
        for (&t, &soft) in types.iter().zip(&is_soft) {
            type_counts.add(t, soft);
        }

        let off = config.vdw_cutoff_for(&crystal);
        let switch = MultiplicativeSwitch::from_taper(off, config.vdw_taper);
        let threads = config.resolved_threads();
        let team = ParallelTeam::new(threads)?;

        info!(
            switch_start = switch.cut(),
            cutoff = switch.off(),
            buffer = config.vdw_buffer,
            threads,
            "Van der Waals (buffered 14-7) engine initialized."
        );
        if config.lambda_term {
            info!(
                alpha = config.vdw_lambda_alpha,
                exponent = config.vdw_lambda_exponent,
                intermolecular = config.intermolecular_softcore,
                "Softcore lambda coupling enabled."
            );
        }

        let mut engine = Self {
            intermolecular_softcore: config.intermolecular_softcore,
            neighbors: NeighborList::new(off, config.vdw_buffer),
            schedule: LoadBalancedSchedule::new(threads, vec![0; n], config.load_balance),
            transforms: transforms_of(&crystal),
            config,
            crystal,
            table,
            switch,
            types,
            is_soft,
            softcore_mask: None,
            molecules: system.molecule_ids(),
            exclusions,
            reduction,
            use_flags: vec![true; n],
            softcore: SoftcoreCoefficients::fully_coupled(),
            type_counts,
            long_range: 0.0,
            dlong_range_dl: 0.0,
            copies: SymmetryCopies::new(),
            force_rebuild: true,
            team,
            workers: vec![ThreadAccumulator::new(n); threads],
            energy: 0.0,
            interactions: 0,
            dedl: 0.0,
            d2edl2: 0.0,
            lambda_gradient: Vec::new(),
        };
        engine.update_long_range();
        Ok(engine)
    }

    /// Evaluates the total vdW energy of `system`.
    ///
    /// With `gradient`, the Cartesian gradient is added to each atom's
    /// gradient accumulator and, when lambda terms are enabled, the lambda
    /// gradient is stored for [`Self::add_lambda_gradient`]; any other call
    /// leaves it empty. The returned energy includes the long-range
    /// correction.
    #[instrument(skip_all, name = "vdw_energy")]
    pub fn energy(&mut self, system: &mut MolecularSystem, gradient: bool) -> Result<f64, EngineError> {
        let n = self.types.len();
        if system.num_atoms() != n {
            return Err(EngineError::TopologyMismatch {
                what: "atoms",
                expected: n,
                found: system.num_atoms(),
            });
        }
        let lambda_term = self.config.lambda_term;
        let threads = self.team.threads();
        self.lambda_gradient.clear();

        for worker in &mut self.workers {
            worker.reset(n, gradient, gradient && lambda_term);
        }

        self.update_neighbor_list(system, false)?;
        self.schedule.start(threads, WorkRange::of_len(n));

        let kernel = PairKernel {
            crystal: &self.crystal,
            table: &self.table,
            switch: &self.switch,
            types: &self.types,
            is_soft: &self.is_soft,
            softcore_mask: self.softcore_mask.as_ref(),
            molecules: &self.molecules,
            exclusions: &self.exclusions,
            reduction: &self.reduction,
            use_flags: &self.use_flags,
            intermolecular_softcore: self.intermolecular_softcore,
            softcore: self.softcore,
            transforms: &self.transforms,
            coordinates: self.copies.copies(),
            lists: self.neighbors.lists(),
            gradient,
            lambda_term,
        };
        let schedule = &self.schedule;
        self.team.execute(&mut self.workers, |thread, acc| {
            if let Some(range) = schedule.next(thread) {
                kernel.run(range, acc);
            }
            Ok(())
        })?;

        let totals = reduce_scalars(&self.workers);
        self.energy = totals.energy + self.long_range;
        self.interactions = totals.interactions;
        self.dedl = totals.dedl + self.dlong_range_dl;
        self.d2edl2 = totals.d2edl2;

        if gradient {
            let workers = &self.workers;
            let atoms = system.atoms_mut();
            self.team.install(|| {
                atoms.par_iter_mut().enumerate().for_each(|(i, atom)| {
                    for w in workers {
                        atom.add_to_gradient(&w.gradient[i]);
                    }
                });
            });
            if lambda_term {
                self.lambda_gradient.resize(n, Vector3::zeros());
                let target = &mut self.lambda_gradient;
                self.team
                    .install(|| reduce_vectors(workers, |w| w.lambda_gradient.as_slice(), target));
            }
        }

        debug!(
            energy = self.energy,
            interactions = self.interactions,
            dedl = self.dedl,
            d2edl2 = self.d2edl2,
            "Van der Waals evaluation complete."
        );
        Ok(self.energy)
    }

    /// Sets the alchemical coupling parameter.
    ///
    /// The softcore masks are derived from the atoms' softcore flags the
    /// first time this is called and kept afterwards. The long-range
    /// correction is recomputed for the new lambda.
    pub fn set_lambda(&mut self, lambda: f64) -> Result<(), EngineError> {
        self.softcore = SoftcoreCoefficients::new(
            lambda,
            self.config.vdw_lambda_alpha,
            self.config.vdw_lambda_exponent,
        )
        .ok_or(EngineError::InvalidLambda(lambda))?;
        if self.softcore_mask.is_none() {
            self.softcore_mask = Some(SoftcoreMask::from_flags(&self.is_soft));
        }
        self.update_long_range();
        Ok(())
    }

    /// Restricts the evaluation to atoms whose flag is `true`.
    pub fn set_use(&mut self, use_flags: &[bool]) -> Result<(), EngineError> {
        if use_flags.len() != self.types.len() {
            return Err(EngineError::TopologyMismatch {
                what: "use flags",
                expected: self.types.len(),
                found: use_flags.len(),
            });
        }
        self.use_flags.copy_from_slice(use_flags);
        Ok(())
    }

    /// Replaces the unit cell and symmetry; the next evaluation rebuilds the
    /// neighbor list from scratch.
    pub fn set_crystal(&mut self, crystal: Crystal) {
        if crystal.num_sym_ops() != self.crystal.num_sym_ops() {
            self.copies.reset();
        }
        self.transforms = transforms_of(&crystal);
        self.crystal = crystal;
        self.neighbors.invalidate();
        self.force_rebuild = true;
        self.update_long_range();
    }

    /// Regenerates the symmetry copies of `system` and rebuilds the neighbor
    /// list if it is stale, forced, or a crystal change is pending. Returns
    /// whether the list was rebuilt.
    pub fn update_neighbor_list(&mut self, system: &MolecularSystem, force: bool) -> Result<bool, EngineError> {
        let positions = system.positions();
        {
            let (copies, crystal, reduction) = (&mut self.copies, &self.crystal, &self.reduction);
            self.team.install(|| copies.update(crystal, reduction, &positions));
        }
        let rebuilt = self
            .neighbors
            .update(&self.crystal, self.copies.copies(), force || self.force_rebuild)?;
        if rebuilt {
            self.schedule.set_weights(self.neighbors.counts().to_vec());
        }
        self.force_rebuild = false;
        Ok(rebuilt)
    }

    pub fn set_intermolecular_softcore(&mut self, enabled: bool) {
        self.intermolecular_softcore = enabled;
    }

    /// Adds dE/dX/dlambda of the last gradient evaluation to `target`.
    pub fn add_lambda_gradient(&self, target: &mut [Vector3<f64>]) {
        for (t, g) in target.iter_mut().zip(&self.lambda_gradient) {
            *t += g;
        }
    }

    pub fn energy_value(&self) -> f64 {
        self.energy
    }

    pub fn interactions(&self) -> usize {
        self.interactions
    }

    pub fn dedl(&self) -> f64 {
        self.dedl
    }

    pub fn d2edl2(&self) -> f64 {
        self.d2edl2
    }

    pub fn lambda(&self) -> f64 {
        self.softcore.lambda
    }

    pub fn buffer(&self) -> f64 {
        self.neighbors.buffer()
    }

    pub fn cutoff(&self) -> f64 {
        self.switch.off()
    }

    pub fn switch(&self) -> &MultiplicativeSwitch {
        &self.switch
    }

    pub fn long_range_correction(&self) -> f64 {
        self.long_range
    }

    pub fn config(&self) -> &NonbondedConfig {
        &self.config
    }

    pub fn crystal(&self) -> &Crystal {
        &self.crystal
    }

    pub fn type_table(&self) -> &VdwTypeTable {
        &self.table
    }

    /// Dense vdW type index of every atom.
    pub fn atom_types(&self) -> &[usize] {
        &self.types
    }

    pub fn use_flags(&self) -> &[bool] {
        &self.use_flags
    }

    pub fn neighbor_list(&self) -> &NeighborList {
        &self.neighbors
    }

    /// Cartesian rotation of each symmetry operator, identity first.
    pub fn transforms(&self) -> &[Matrix3<f64>] {
        &self.transforms
    }

    /// Per-atom work estimates used to balance the pair loop.
    pub fn schedule_weights(&self) -> &[usize] {
        self.schedule.weights()
    }

    pub fn team(&self) -> &ParallelTeam {
        &self.team
    }

    fn update_long_range(&mut self) {
        if !self.config.vdw_lr_term {
            self.long_range = 0.0;
            self.dlong_range_dl = 0.0;
            return;
        }
        let Some(volume) = self.crystal.volume() else {
            warn!("Long-range vdW correction needs a periodic cell; it is set to zero.");
            self.long_range = 0.0;
            self.dlong_range_dl = 0.0;
            return;
        };
        let num_ops = self.crystal.num_sym_ops();
        let correction = |lambda: f64| {
            long_range_correction(&self.table, &self.switch, &self.type_counts, lambda, num_ops, volume)
        };
        let value = correction(self.softcore.lambda);
        // The soft-atom term is linear in lambda.
        let slope = if self.config.lambda_term {
            correction(1.0) - correction(0.0)
        } else {
            0.0
        };
        self.long_range = value;
        self.dlong_range_dl = slope;
        info!(
            correction = value,
            lambda = self.softcore.lambda,
            "Long-range vdW correction (kcal/mol)."
        );
    }
}

fn transforms_of(crystal: &Crystal) -> Vec<Matrix3<f64>> {
    crystal
        .sym_ops()
        .iter()
        .map(|op| crystal.transformation_operator(op))
        .collect()
}

/// Read-only view of everything the pair loop needs.
struct PairKernel<'a> {
    crystal: &'a Crystal,
    table: &'a VdwTypeTable,
    switch: &'a MultiplicativeSwitch,
    types: &'a [usize],
    is_soft: &'a [bool],
    softcore_mask: Option<&'a SoftcoreMask>,
    molecules: &'a [usize],
    exclusions: &'a [Vec<usize>],
    reduction: &'a ReductionMap,
    use_flags: &'a [bool],
    intermolecular_softcore: bool,
    softcore: SoftcoreCoefficients,
    transforms: &'a [Matrix3<f64>],
    coordinates: &'a [Vec<Point3<f64>>],
    lists: &'a [Vec<Vec<usize>>],
    gradient: bool,
    lambda_term: bool,
}

impl PairKernel<'_> {
    fn run(&self, range: WorkRange, acc: &mut ThreadAccumulator) {
        let Some(unit) = self.coordinates.first() else {
            return;
        };
        let Some(identity_lists) = self.lists.first() else {
            return;
        };

        for i in range.iter() {
            if !self.use_flags[i] {
                continue;
            }
            let excluded = &self.exclusions[i];
            acc.mask.exclude(excluded);
            let row = self.softcore_row(i);
            for &k in &identity_lists[i] {
                if !self.use_flags[k] || !acc.mask.allows(k) {
                    continue;
                }
                let soft = row.is_some_and(|r| r[k])
                    || (self.intermolecular_softcore && self.molecules[i] != self.molecules[k]);
                self.interact(acc, i, k, &unit[i], &unit[k], soft, 1.0, None);
            }
            acc.mask.restore(excluded);
        }

        // Images are never bonded to the asymmetric unit, so no mask here.
        for (s, (image, lists)) in self.coordinates.iter().zip(self.lists).enumerate().skip(1) {
            let transform = &self.transforms[s];
            for i in range.iter() {
                if !self.use_flags[i] {
                    continue;
                }
                let row = self.softcore_row(i);
                let outer_soft = row.is_some() && self.is_soft[i];
                for &k in &lists[i] {
                    if !self.use_flags[k] {
                        continue;
                    }
                    // A symmetry mate is another molecule, even when it is an
                    // image of the outer atom's own molecule or of the atom itself.
                    let soft = outer_soft || row.is_some_and(|r| r[k]) || self.intermolecular_softcore;
                    let scale = if i == k { 0.5 } else { 1.0 };
                    self.interact(acc, i, k, &unit[i], &image[k], soft, scale, Some(transform));
                }
            }
        }
    }

    #[inline]
    fn softcore_row(&self, i: usize) -> Option<&[bool]> {
        self.softcore_mask.map(|mask| mask.row(self.is_soft[i]))
    }

    #[allow(clippy::too_many_arguments)]
    #[inline]
    fn interact(
        &self,
        acc: &mut ThreadAccumulator,
        i: usize,
        k: usize,
        xi: &Point3<f64>,
        xk: &Point3<f64>,
        soft: bool,
        scale: f64,
        transform: Option<&Matrix3<f64>>,
    ) {
        let mut dx = xi - xk;
        let r2 = self.crystal.image(&mut dx);
        if r2 > self.switch.off2() {
            return;
        }
        let r = r2.sqrt();
        let (ti, tk) = (self.types[i], self.types[k]);
        let radius = self.table.radius(ti, tk);
        let eps = self.table.epsilon(ti, tk);
        let (alpha, lambda5) = if soft {
            (self.softcore.sc1, self.softcore.sc2)
        } else {
            (0.0, 1.0)
        };

        let terms = Buffered147::new(r, radius, alpha);
        let eij = terms.energy(eps * lambda5);
        let (taper, dtaper) = self.switch.evaluate(r, r2);
        acc.energy += scale * eij * taper;
        acc.interactions += 1;
        log_interaction(i, k, radius, r, eij);

        if self.lambda_term && soft {
            let ld = terms.lambda_derivatives(eps, &self.softcore);
            acc.dedl += scale * ld.dedl * taper;
            acc.d2edl2 += scale * ld.d2edl2 * taper;
            if self.gradient {
                let dedldr = ld.dedl * dtaper + ld.dedldr * taper;
                let ded = dx * (scale * dedldr / r);
                self.scatter(&mut acc.lambda_gradient, i, k, &ded, transform, r);
            }
        }

        if self.gradient {
            let dedr = eij * dtaper + terms.denergy_dr(eps * lambda5) * taper;
            let ded = dx * (scale * dedr / r);
            self.scatter(&mut acc.gradient, i, k, &ded, transform, r);
        }
    }

    /// Adds `ded` (dE/dx_i) to atom `i` and its reaction, rotated back into
    /// the asymmetric unit, to atom `k`.
    #[inline]
    fn scatter(
        &self,
        buffer: &mut [Vector3<f64>],
        i: usize,
        k: usize,
        ded: &Vector3<f64>,
        transform: Option<&Matrix3<f64>>,
        r: f64,
    ) {
        if !ded.iter().all(|c| c.is_finite()) {
            warn!(i, k, r, "Unstable van der Waals derivative; pair gradient skipped.");
            return;
        }
        let dedk = match transform {
            Some(t) => t.transpose() * ded,
            None => *ded,
        };
        self.reduction.scatter(buffer, i, ded);
        self.reduction.scatter(buffer, k, &(-dedk));
    }
}

#[inline]
fn log_interaction(i: usize, k: usize, radius: f64, r: f64, energy: f64) {
    trace!(i, k, radius, r, energy, "vdW interaction");
}

use crate::core::crystal::Crystal;
use crate::core::models::system::MolecularSystem;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::warn;

/// Hydrogen position reduction toward the bonded heavy atom.
///
/// An atom whose reduction factor is positive and which has exactly one bond
/// is placed at `anchor + factor * (x - anchor)`. Every other atom keeps its
/// position and anchors to itself with a factor of zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionMap {
    anchor: Vec<usize>,
    factor: Vec<f64>,
}

impl ReductionMap {
    /// # Arguments
    ///
    /// * `system` - Supplies the bond adjacency.
    /// * `factors` - Per-atom reduction factor from the force field.
    pub fn new(system: &MolecularSystem, factors: &[f64]) -> Self {
        let (anchor, factor) = (0..system.num_atoms())
            .map(|i| {
                let f = factors.get(i).copied().unwrap_or(0.0);
                match system.bonded_neighbors(i) {
                    Some([heavy]) if f > 0.0 => (*heavy, f),
                    _ => (i, 0.0),
                }
            })
            .unzip();
        Self { anchor, factor }
    }

    pub fn len(&self) -> usize {
        self.anchor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchor.is_empty()
    }

    /// The anchor atom and reduction factor of `atom`.
    ///
    /// A force `f` on the reduced site splits as `factor * f` on the atom and
    /// `(1 - factor) * f` on its anchor. For unreduced atoms both shares land
    /// on the atom itself.
    #[inline]
    pub fn share(&self, atom: usize) -> (usize, f64) {
        (self.anchor[atom], self.factor[atom])
    }

    pub fn reduce(&self, positions: &[Point3<f64>], out: &mut Vec<Point3<f64>>) {
        out.clear();
        out.extend(positions.iter().enumerate().map(|(i, x)| {
            let (anchor, factor) = self.share(i);
            if anchor == i {
                *x
            } else {
                let h = positions[anchor];
                h + (x - h) * factor
            }
        }));
    }

    /// Scatters a force on the reduced site of `atom` into `gradient`.
    #[inline]
    pub fn scatter(&self, gradient: &mut [Vector3<f64>], atom: usize, force: &Vector3<f64>) {
        let (anchor, factor) = self.share(atom);
        gradient[atom] += force * factor;
        gradient[anchor] += force * (1.0 - factor);
    }
}

/// Reduced coordinates for every symmetry copy of the asymmetric unit.
///
/// `copies()[0]` is the asymmetric unit; `copies()[s]` is copy 0 under
/// symmetry operator `s`.
#[derive(Debug, Clone, Default)]
pub struct SymmetryCopies {
    copies: Vec<Vec<Point3<f64>>>,
    flagged: Vec<bool>,
}

impl SymmetryCopies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copies(&self) -> &[Vec<Point3<f64>>] {
        &self.copies
    }

    pub fn asymmetric_unit(&self) -> &[Point3<f64>] {
        self.copies.first().map_or(&[][..], Vec::as_slice)
    }

    /// Drops all copies, e.g. after the symmetry operator count changed.
    pub fn reset(&mut self) {
        self.copies.clear();
        self.flagged.clear();
    }

    /// Reduces `positions` and regenerates every symmetry copy.
    ///
    /// Atoms that come within the crystal's special-position cutoff of one of
    /// their own images are reported once each.
    pub fn update(&mut self, crystal: &Crystal, reduction: &ReductionMap, positions: &[Point3<f64>]) {
        let num_ops = crystal.num_sym_ops();
        self.copies.resize_with(num_ops, Vec::new);
        self.copies.truncate(num_ops);
        if self.flagged.len() != positions.len() {
            self.flagged = vec![false; positions.len()];
        }

        let (unit, images) = match self.copies.split_first_mut() {
            Some(split) => split,
            None => return,
        };
        reduction.reduce(positions, unit);

        let cutoff = crystal.special_position_cutoff();
        let cutoff2 = cutoff * cutoff;
        let ops = crystal.sym_ops();
        let unit: &[Point3<f64>] = unit;
        let special: Vec<(usize, usize)> = images
            .par_iter_mut()
            .enumerate()
            .flat_map_iter(|(offset, image)| {
                let s = offset + 1;
                image.clear();
                image.extend(unit.iter().map(|x| crystal.apply_sym_op(x, &ops[s])));
                image
                    .iter()
                    .zip(unit)
                    .enumerate()
                    .filter_map(|(i, (xs, x))| {
                        let mut dx = xs - x;
                        (crystal.image(&mut dx) < cutoff2).then_some((i, s))
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        for (atom, sym_op) in special {
            if !self.flagged[atom] {
                self.flagged[atom] = true;
                warn!(atom, sym_op, cutoff, "Atom may be at a special position.");
            }
        }
    }

    /// Atoms reported as sitting on a special position so far.
    pub fn special_positions(&self) -> Vec<usize> {
        self.flagged
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| f.then_some(i))
            .collect()
    }
}

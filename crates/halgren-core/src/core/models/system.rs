use super::atom::Atom;
use nalgebra::Point3;
use std::collections::VecDeque;

/// A covalent bond between two atoms, stored by atom index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub atom1: usize,
    pub atom2: usize,
}

impl Bond {
    pub fn new(atom1: usize, atom2: usize) -> Self {
        Self { atom1, atom2 }
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.atom1 == atom || self.atom2 == atom
    }
}

/// An ordered arena of atoms with their bond connectivity.
///
/// Atom indices are stable and 0-based; they are the identity used by the
/// neighbor list, the kernels and the gradient accumulators. Derived
/// topology (1-3 partners, molecule numbering) is computed from the bond
/// adjacency rather than stored in global counters.
#[derive(Debug, Clone, Default)]
pub struct MolecularSystem {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    bond_adjacency: Vec<Vec<usize>>,
}

impl MolecularSystem {
    /// Creates a new, empty molecular system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an atom and returns its index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.bond_adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    /// Adds a bond between two atoms.
    ///
    /// # Arguments
    ///
    /// * `atom1` - Index of the first atom.
    /// * `atom2` - Index of the second atom.
    ///
    /// # Return
    ///
    /// Returns `Some(())` if the bond exists afterwards (adding an existing
    /// bond is idempotent), or `None` if either index is out of range or the
    /// two indices are equal.
    pub fn add_bond(&mut self, atom1: usize, atom2: usize) -> Option<()> {
        if atom1 == atom2 || atom1 >= self.atoms.len() || atom2 >= self.atoms.len() {
            return None;
        }
        if self.bond_adjacency[atom1].contains(&atom2) {
            return Some(());
        }
        self.bonds.push(Bond::new(atom1, atom2));
        self.bond_adjacency[atom1].push(atom2);
        self.bond_adjacency[atom2].push(atom1);
        Some(())
    }

    #[inline]
    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn atom_mut(&mut self, index: usize) -> Option<&mut Atom> {
        self.atoms.get_mut(index)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Current Cartesian coordinates of every atom, in index order.
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    /// Atoms directly bonded to `index` (1-2 partners).
    pub fn bonded_neighbors(&self, index: usize) -> Option<&[usize]> {
        self.bond_adjacency.get(index).map(Vec::as_slice)
    }

    /// Atoms two bonds away from `index` (1-3 partners), sorted and unique.
    ///
    /// Atoms that are also 1-2 partners (three-membered rings) are excluded.
    pub fn angle_partners(&self, index: usize) -> Vec<usize> {
        let Some(direct) = self.bond_adjacency.get(index) else {
            return Vec::new();
        };
        let mut partners: Vec<usize> = direct
            .iter()
            .flat_map(|&j| self.bond_adjacency[j].iter().copied())
            .filter(|&k| k != index && !direct.contains(&k))
            .collect();
        partners.sort_unstable();
        partners.dedup();
        partners
    }

    /// Molecule number of each atom, assigned by connected component in
    /// order of the lowest atom index of each component.
    pub fn molecule_ids(&self) -> Vec<usize> {
        let mut ids = vec![usize::MAX; self.atoms.len()];
        let mut next = 0;
        let mut queue = VecDeque::new();
        for start in 0..self.atoms.len() {
            if ids[start] != usize::MAX {
                continue;
            }
            ids[start] = next;
            queue.push_back(start);
            while let Some(i) = queue.pop_front() {
                for &j in &self.bond_adjacency[i] {
                    if ids[j] == usize::MAX {
                        ids[j] = next;
                        queue.push_back(j);
                    }
                }
            }
            next += 1;
        }
        ids
    }

    /// Resets every atom's gradient accumulator to zero.
    pub fn clear_gradients(&mut self) {
        self.atoms.iter_mut().for_each(Atom::clear_gradient);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water_dimer() -> MolecularSystem {
        let mut system = MolecularSystem::new();
        for (name, x) in [("O", 0.0), ("H1", 0.96), ("H2", -0.24), ("O", 3.0), ("H1", 3.96), ("H2", 2.76)] {
            system.add_atom(Atom::new(name, Point3::new(x, 0.0, 0.0)));
        }
        system.add_bond(0, 1).unwrap();
        system.add_bond(0, 2).unwrap();
        system.add_bond(3, 4).unwrap();
        system.add_bond(3, 5).unwrap();
        system
    }

    #[test]
    fn add_bond_is_idempotent_and_rejects_invalid_indices() {
        let mut system = water_dimer();
        assert_eq!(system.bonds().len(), 4);
        assert_eq!(system.add_bond(1, 0), Some(()));
        assert_eq!(system.bonds().len(), 4);
        assert_eq!(system.add_bond(0, 0), None);
        assert_eq!(system.add_bond(0, 99), None);
    }

    #[test]
    fn angle_partners_are_two_bonds_away() {
        let system = water_dimer();
        assert_eq!(system.angle_partners(1), vec![2]);
        assert_eq!(system.angle_partners(2), vec![1]);
        assert!(system.angle_partners(0).is_empty());
        assert!(system.angle_partners(42).is_empty());
    }

    #[test]
    fn three_membered_ring_partners_are_not_duplicated_as_angle_partners() {
        let mut system = MolecularSystem::new();
        for i in 0..3 {
            system.add_atom(Atom::new("C", Point3::new(i as f64, 0.0, 0.0)));
        }
        system.add_bond(0, 1).unwrap();
        system.add_bond(1, 2).unwrap();
        system.add_bond(2, 0).unwrap();
        assert!(system.angle_partners(0).is_empty());
    }

    #[test]
    fn molecule_ids_follow_connected_components() {
        let mut system = water_dimer();
        system.add_atom(Atom::new("NA", Point3::new(10.0, 0.0, 0.0)));
        assert_eq!(system.molecule_ids(), vec![0, 0, 0, 1, 1, 1, 2]);
    }

    #[test]
    fn positions_are_returned_in_index_order() {
        let system = water_dimer();
        let positions = system.positions();
        assert_eq!(positions.len(), 6);
        assert_eq!(positions[3], Point3::new(3.0, 0.0, 0.0));
    }
}

use nalgebra::{Point3, Vector3};

/// Represents an atom as seen by the non-bonded engine.
///
/// The topology model owns atoms; the engine only reads their parameters and
/// coordinates, and scatter-adds into the persistent gradient accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "HW1").
    pub name: String,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// The van der Waals class used to look up force field parameters.
    ///
    /// An atom without a class cannot be evaluated; the engine rejects it
    /// at construction time.
    pub vdw_class: Option<u32>,
    /// Whether the atom is alchemically perturbed (softcore scaled).
    pub softcore: bool,
    /// Whether the atom is a hydrogen.
    pub hydrogen: bool,
    gradient: Vector3<f64>,
}

impl Atom {
    /// Creates a new hard, non-hydrogen `Atom` without a van der Waals class.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            position,
            vdw_class: None,
            softcore: false,
            hydrogen: false,
            gradient: Vector3::zeros(),
        }
    }

    pub fn with_vdw_class(mut self, class: u32) -> Self {
        self.vdw_class = Some(class);
        self
    }

    pub fn with_softcore(mut self, softcore: bool) -> Self {
        self.softcore = softcore;
        self
    }

    pub fn with_hydrogen(mut self, hydrogen: bool) -> Self {
        self.hydrogen = hydrogen;
        self
    }

    /// The accumulated Cartesian gradient (kcal/mol/Angstrom).
    #[inline]
    pub fn gradient(&self) -> &Vector3<f64> {
        &self.gradient
    }

    /// Adds to the gradient accumulator; it is never overwritten by the engine.
    #[inline]
    pub fn add_to_gradient(&mut self, delta: &Vector3<f64>) {
        self.gradient += delta;
    }

    pub fn clear_gradient(&mut self) {
        self.gradient = Vector3::zeros();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_has_expected_default_fields() {
        let atom = Atom::new("CA", Point3::new(1.0, 2.0, 3.0));

        assert_eq!(atom.name, "CA");
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.vdw_class, None);
        assert!(!atom.softcore);
        assert!(!atom.hydrogen);
        assert_eq!(*atom.gradient(), Vector3::zeros());
    }

    #[test]
    fn builder_methods_set_fields() {
        let atom = Atom::new("H1", Point3::origin())
            .with_vdw_class(7)
            .with_softcore(true)
            .with_hydrogen(true);
        assert_eq!(atom.vdw_class, Some(7));
        assert!(atom.softcore);
        assert!(atom.hydrogen);
    }

    #[test]
    fn add_to_gradient_accumulates_instead_of_overwriting() {
        let mut atom = Atom::new("O", Point3::origin());
        atom.add_to_gradient(&Vector3::new(1.0, 0.0, -1.0));
        atom.add_to_gradient(&Vector3::new(0.5, 2.0, 1.0));
        assert_eq!(*atom.gradient(), Vector3::new(1.5, 2.0, 0.0));

        atom.clear_gradient();
        assert_eq!(*atom.gradient(), Vector3::zeros());
    }
}

use crate::core::crystal::Crystal;
use crate::core::forcefield::params::Forcefield;
use crate::core::io::system::BornData;
use crate::core::models::system::MolecularSystem;
use crate::engine::born::{BornGradient, BornInputs};
use crate::engine::config::NonbondedConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::vdw::VanDerWaals;
use nalgebra::Vector3;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvaluationOptions {
    pub gradient: bool,
    /// Lambda to evaluate at; `None` leaves the system fully coupled.
    pub lambda: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub energy: f64,
    pub interactions: usize,
    pub long_range_correction: f64,
    pub lambda: f64,
    /// Present when lambda terms are enabled.
    pub dedl: Option<f64>,
    pub d2edl2: Option<f64>,
    pub vdw_gradient: Option<Vec<Vector3<f64>>>,
    pub lambda_gradient: Option<Vec<Vector3<f64>>>,
    /// Present when a gradient was requested and Born data was supplied.
    pub born_gradient: Option<Vec<Vector3<f64>>>,
}

/// Evaluates the van der Waals energy of `system` once.
///
/// The input system is left untouched; gradients are computed on a working
/// copy and returned separately for each kernel.
#[instrument(skip_all, name = "evaluate_workflow")]
pub fn run(
    system: &MolecularSystem,
    forcefield: &Forcefield,
    crystal: &Crystal,
    config: &NonbondedConfig,
    born: Option<&BornData>,
    options: &EvaluationOptions,
    reporter: &ProgressReporter,
) -> Result<Evaluation, EngineError> {
    let mut working = system.clone();
    working.clear_gradients();

    let mut vdw = reporter.phase("Setup", || {
        VanDerWaals::new(&working, forcefield, crystal.clone(), config.clone())
    })?;
    if let Some(lambda) = options.lambda {
        vdw.set_lambda(lambda)?;
    }

    let energy = reporter.phase("Van der Waals", || vdw.energy(&mut working, options.gradient))?;
    let lambda_term = vdw.config().lambda_term;
    let n = working.num_atoms();

    let (vdw_gradient, lambda_gradient) = if options.gradient {
        let gradient = gradients_of(&working);
        let lambda_gradient = lambda_term.then(|| {
            let mut buffer = vec![Vector3::zeros(); n];
            vdw.add_lambda_gradient(&mut buffer);
            buffer
        });
        (Some(gradient), lambda_gradient)
    } else {
        (None, None)
    };

    let born_gradient = match (born, options.gradient) {
        (Some(data), true) => {
            working.clear_gradients();
            let inputs = BornInputs {
                born_radii: &data.born_radii,
                born_gradient: &data.born_gradient,
                base_radii: &data.base_radii,
                overlap_scales: &data.overlap_scales,
            };
            reporter.phase("Born chain rule", || -> Result<(), EngineError> {
                let mut pass = BornGradient::new(&working, &vdw, vdw.config());
                pass.compute(&mut working, &mut vdw, &inputs)
            })?;
            Some(gradients_of(&working))
        }
        _ => None,
    };

    info!(
        energy,
        interactions = vdw.interactions(),
        "Van der Waals evaluation finished."
    );
    reporter.report(Progress::Message(format!(
        "E(vdW) = {energy:.8} kcal/mol over {} interactions",
        vdw.interactions()
    )));

    Ok(Evaluation {
        energy,
        interactions: vdw.interactions(),
        long_range_correction: vdw.long_range_correction(),
        lambda: vdw.lambda(),
        dedl: lambda_term.then(|| vdw.dedl()),
        d2edl2: lambda_term.then(|| vdw.d2edl2()),
        vdw_gradient,
        lambda_gradient,
        born_gradient,
    })
}

fn gradients_of(system: &MolecularSystem) -> Vec<Vector3<f64>> {
    system.atoms().iter().map(|a| *a.gradient()).collect()
}

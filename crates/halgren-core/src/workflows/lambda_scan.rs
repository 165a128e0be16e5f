use crate::core::crystal::Crystal;
use crate::core::forcefield::params::Forcefield;
use crate::core::models::system::MolecularSystem;
use crate::engine::config::{ConfigError, NonbondedConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::vdw::VanDerWaals;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambdaPoint {
    pub lambda: f64,
    pub energy: f64,
    pub dedl: f64,
    pub d2edl2: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaScanResult {
    pub points: Vec<LambdaPoint>,
    /// Trapezoidal estimate of the integral of dE/dlambda over [0, 1].
    pub free_energy: f64,
}

/// Evaluates the softcore vdW energy at `windows + 1` evenly spaced lambda
/// values, from fully decoupled to fully coupled.
///
/// Lambda terms are switched on regardless of `config`. Only energies and
/// lambda derivatives are computed; no gradient is accumulated.
#[instrument(skip_all, name = "lambda_scan_workflow")]
pub fn run(
    system: &MolecularSystem,
    forcefield: &Forcefield,
    crystal: &Crystal,
    config: &NonbondedConfig,
    windows: usize,
    reporter: &ProgressReporter,
) -> Result<LambdaScanResult, EngineError> {
    if windows == 0 {
        return Err(ConfigError::InvalidValue {
            key: "windows",
            reason: "a lambda scan needs at least one window".to_string(),
        }
        .into());
    }

    let config = NonbondedConfig {
        lambda_term: true,
        ..config.clone()
    };
    let mut working = system.clone();
    let mut vdw = reporter.phase("Setup", || {
        VanDerWaals::new(&working, forcefield, crystal.clone(), config)
    })?;

    info!(windows, "Starting lambda scan.");
    reporter.report(Progress::TaskStart {
        total_steps: windows as u64 + 1,
    });

    let mut points = Vec::with_capacity(windows + 1);
    for step in 0..=windows {
        let lambda = step as f64 / windows as f64;
        vdw.set_lambda(lambda)?;
        let energy = vdw.energy(&mut working, false)?;
        let point = LambdaPoint {
            lambda,
            energy,
            dedl: vdw.dedl(),
            d2edl2: vdw.d2edl2(),
        };
        debug!(lambda, energy, dedl = point.dedl, "Lambda window evaluated.");
        reporter.report(Progress::ScanPoint {
            lambda,
            energy,
            dedl: point.dedl,
        });
        reporter.report(Progress::TaskIncrement);
        points.push(point);
    }
    reporter.report(Progress::TaskFinish);

    let free_energy = trapezoid(&points);
    info!(free_energy, "Lambda scan finished.");
    Ok(LambdaScanResult { points, free_energy })
}

fn trapezoid(points: &[LambdaPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| 0.5 * (w[0].dedl + w[1].dedl) * (w[1].lambda - w[0].lambda))
        .sum()
}

use super::{load_inputs, write_report};
use crate::cli::EnergyArgs;
use crate::config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use halgren::engine::progress::ProgressReporter;
use halgren::workflows::evaluate::{self, Evaluation, EvaluationOptions};
use nalgebra::Vector3;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct EnergyReport {
    energy: f64,
    interactions: usize,
    long_range_correction: f64,
    lambda: f64,
    dedl: Option<f64>,
    d2edl2: Option<f64>,
    gradient: Option<Vec<[f64; 3]>>,
    lambda_gradient: Option<Vec<[f64; 3]>>,
    born_gradient: Option<Vec<[f64; 3]>>,
}

impl From<Evaluation> for EnergyReport {
    fn from(e: Evaluation) -> Self {
        let rows = |g: Option<Vec<Vector3<f64>>>| g.map(|g| g.iter().map(|v| [v.x, v.y, v.z]).collect());
        Self {
            energy: e.energy,
            interactions: e.interactions,
            long_range_correction: e.long_range_correction,
            lambda: e.lambda,
            dedl: e.dedl,
            d2edl2: e.d2edl2,
            gradient: rows(e.vdw_gradient),
            lambda_gradient: rows(e.lambda_gradient),
            born_gradient: rows(e.born_gradient),
        }
    }
}

pub fn run(args: EnergyArgs, threads: Option<usize>) -> Result<()> {
    let mut config = config::resolve(args.inputs.config.as_deref(), &args.inputs.set_values, threads)?;
    if args.lambda.is_some() {
        config.lambda_term = true;
    }
    let (loaded, forcefield) = load_inputs(&args.inputs)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let options = EvaluationOptions {
        gradient: args.gradient,
        lambda: args.lambda,
    };

    info!("Invoking the evaluation workflow...");
    let evaluation = evaluate::run(
        &loaded.system,
        &forcefield,
        &loaded.crystal,
        &config,
        loaded.born.as_ref(),
        &options,
        &reporter,
    )?;

    println!(
        "E(vdW) = {:.8} kcal/mol ({} interactions, long-range {:.8})",
        evaluation.energy, evaluation.interactions, evaluation.long_range_correction
    );
    if let Some(dedl) = evaluation.dedl {
        println!("lambda = {:.4}  dE/dl = {:.8}", evaluation.lambda, dedl);
    }

    if let Some(path) = &args.inputs.output {
        write_report(path, &EnergyReport::from(evaluation))?;
    }
    Ok(())
}
